//! RFC 3339 (de)serialization for timestamps crossing the HTTP and index boundaries.

pub mod option;

use serde::{Deserialize, Deserializer, Serializer};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&format(*value).map_err(serde::ser::Error::custom)?)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse(&raw).ok_or_else(|| {
		serde::de::Error::custom(format!("Timestamp {raw:?} is not a valid RFC 3339 value."))
	})
}

pub(crate) fn format(value: OffsetDateTime) -> Result<String, time::error::Format> {
	value.format(&Rfc3339)
}

pub(crate) fn parse(raw: &str) -> Option<OffsetDateTime> {
	OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}
