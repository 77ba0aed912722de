pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Search cancelled.")]
	Cancelled,
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Document provider error: {message}")]
	DocumentProvider { message: String },
	#[error("Summarization error: {message}")]
	Summarization { message: String },
	#[error("Model error: {message}")]
	Model { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl Error {
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

impl From<tabrank_providers::Error> for Error {
	fn from(err: tabrank_providers::Error) -> Self {
		Self::Model { message: err.to_string() }
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<tokio::task::JoinError> for Error {
	fn from(err: tokio::task::JoinError) -> Self {
		Self::Internal { message: err.to_string() }
	}
}
