use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	#[default]
	Idle,
	Active,
}

/// Identity of the query whose results the store currently holds.
///
/// At most one session is active. The id survives `end()` so finished results stay attributable.
#[derive(Clone, Debug, Default)]
pub struct QuerySession {
	query_id: Option<String>,
	state: SessionState,
}
impl QuerySession {
	/// An idle session carrying the id of results restored from elsewhere.
	pub fn restored(query_id: Option<String>) -> Self {
		Self { query_id, state: SessionState::Idle }
	}

	pub fn query_id(&self) -> Option<&str> {
		self.query_id.as_deref()
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn is_active(&self) -> bool {
		self.state == SessionState::Active
	}

	/// Idle to Active. Returns `false`, changing nothing, when a session is already active.
	pub fn begin(&mut self, query_id: &str) -> bool {
		if self.is_active() {
			return false;
		}

		self.query_id = Some(query_id.to_string());
		self.state = SessionState::Active;

		true
	}

	/// Active to Idle. Returns `false` when already idle.
	pub fn end(&mut self) -> bool {
		if !self.is_active() {
			return false;
		}

		self.state = SessionState::Idle;

		true
	}

	/// Only messages of the active session are applied; anything else is stale.
	pub fn accepts(&self, query_id: &str) -> bool {
		self.is_active() && self.query_id.as_deref() == Some(query_id)
	}
}
