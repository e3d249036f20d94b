pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn note_not_found(note_id: uuid::Uuid) -> Self {
		Self::NotFound { message: format!("Research note {note_id} does not exist.") }
	}
}

impl From<docex_storage::Error> for Error {
	fn from(err: docex_storage::Error) -> Self {
		match err {
			docex_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			docex_storage::Error::NotFound(message) => Self::NotFound { message },
			docex_storage::Error::Qdrant(inner) => Self::Index { message: inner.to_string() },
		}
	}
}

impl From<docex_providers::Error> for Error {
	fn from(err: docex_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
