pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Protocol error: {message}")]
	Protocol { message: String },
	#[error(transparent)]
	Domain(#[from] lumen_domain::Error),
	#[error("A query is already running; it must end before another can start.")]
	QueryInFlight,
	#[error("No active connection to the retrieval backend.")]
	Disconnected,
	#[error("Unknown feature category {name:?}.")]
	UnknownFeature { name: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Snapshot error: {message}")]
	Snapshot { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("The engine task has stopped.")]
	EngineClosed,
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
impl Error {
	pub(crate) fn protocol(message: impl Into<String>) -> Self {
		Self::Protocol { message: message.into() }
	}
}
