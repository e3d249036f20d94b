const INIT_SQL: &str = include_str!("../../../sql/init.sql");

/// Splits the schema script into individual statements, dropping blank fragments.
pub fn statements() -> Vec<&'static str> {
	INIT_SQL.split(';').map(str::trim).filter(|statement| !statement.is_empty()).collect()
}
