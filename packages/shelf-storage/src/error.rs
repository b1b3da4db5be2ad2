#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl Error {
	/// A Postgres unique-constraint violation (SQLSTATE 23505), possibly raised at commit for
	/// deferred constraints.
	pub fn is_unique_violation(&self) -> bool {
		match self {
			Self::Sqlx(sqlx::Error::Database(err)) => err.code().as_deref() == Some("23505"),
			_ => false,
		}
	}
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
