pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Validation error: {message}")]
	Validation { message: String },
	#[error("Service unavailable: {message}")]
	ServiceUnavailable { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}

	pub(crate) fn conflict(message: impl Into<String>) -> Self {
		Self::Conflict { message: message.into() }
	}

	pub(crate) fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}

	pub(crate) fn unavailable(message: impl Into<String>) -> Self {
		Self::ServiceUnavailable { message: message.into() }
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		shelf_storage::Error::from(err).into()
	}
}
impl From<shelf_storage::Error> for Error {
	fn from(err: shelf_storage::Error) -> Self {
		if err.is_unique_violation() {
			return Self::Conflict { message: err.to_string() };
		}

		match err {
			shelf_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			shelf_storage::Error::InvalidArgument(message) => Self::Validation { message },
			shelf_storage::Error::NotFound(message) => Self::NotFound { message },
			shelf_storage::Error::Conflict(message) => Self::Conflict { message },
			shelf_storage::Error::Qdrant(inner) =>
				Self::ServiceUnavailable { message: inner.to_string() },
		}
	}
}
impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Storage { message: format!("Stored metadata is malformed: {err}.") }
	}
}
