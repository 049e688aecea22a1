use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::view::ResultView;

/// The closed set of change events subscribers can observe.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent {
	Started,
	Updated,
	Feature,
	Ended,
}

/// A committed change together with the view it produced.
#[derive(Clone, Debug)]
pub struct Notification {
	pub event: ChangeEvent,
	pub view: Arc<ResultView>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
	Connected,
	Disconnected,
	Error,
}

/// Side channel for everything that is not a result-set change.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusReport {
	Connection(ConnectionStatus),
	ProtocolError { message: String },
	Ping { status: Option<String> },
	QueryError { query_id: String, message: String },
}

#[derive(Clone, Debug)]
pub struct Notifier {
	changes: broadcast::Sender<Notification>,
	status: broadcast::Sender<StatusReport>,
}
impl Notifier {
	pub fn new(capacity: usize) -> Self {
		let (changes, _) = broadcast::channel(capacity);
		let (status, _) = broadcast::channel(capacity);

		Self { changes, status }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
		self.changes.subscribe()
	}

	pub fn subscribe_status(&self) -> broadcast::Receiver<StatusReport> {
		self.status.subscribe()
	}

	/// Building a view is skipped entirely while nobody listens.
	pub(crate) fn emit_with(&self, event: ChangeEvent, view: impl FnOnce() -> ResultView) {
		if self.changes.receiver_count() == 0 {
			return;
		}

		// A send only fails when every receiver dropped in between.
		let _ = self.changes.send(Notification { event, view: Arc::new(view()) });
	}

	pub(crate) fn report(&self, report: StatusReport) {
		let _ = self.status.send(report);
	}
}
