use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
	Error, Result,
	history::HistorySnapshot,
	message::{self, InboundMessage, OutboundMessage},
	notify::{ChangeEvent, ConnectionStatus, Notification, Notifier, StatusReport},
	session::QuerySession,
	store::ResultStore,
	transport::Transport,
	view::ResultView,
};
use lumen_config::Config;
use lumen_domain::{FeatureCategory, MediaType, SortOrder, WeightFunction, WeightFunctionKind};

pub const DEFAULT_FEATURE_WEIGHT: f64 = 1.0;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct EngineOptions {
	pub weight_function: WeightFunctionKind,
	pub sort_order: SortOrder,
	pub default_feature_weight: f64,
	pub channel_capacity: usize,
}
impl EngineOptions {
	pub fn from_config(cfg: &Config) -> Result<Self> {
		Ok(Self {
			weight_function: cfg.ranking.weight_function.parse()?,
			sort_order: cfg.ranking.sort_order.parse()?,
			default_feature_weight: cfg.ranking.default_feature_weight,
			channel_capacity: cfg.notify.channel_capacity,
		})
	}
}

impl Default for EngineOptions {
	fn default() -> Self {
		Self {
			weight_function: WeightFunctionKind::Default,
			sort_order: SortOrder::Descending,
			default_feature_weight: DEFAULT_FEATURE_WEIGHT,
			channel_capacity: DEFAULT_CHANNEL_CAPACITY,
		}
	}
}

/// Aggregation and ranking engine for one connection.
///
/// Every method runs to completion and leaves the store consistent; a change notification is
/// only emitted after the mutation it describes has been fully applied. The engine is not
/// shared between threads. [`crate::runtime`] serializes access to it.
pub struct Engine {
	session: QuerySession,
	store: ResultStore,
	weight_function: Arc<dyn WeightFunction>,
	sort_order: SortOrder,
	default_feature_weight: f64,
	connection: ConnectionStatus,
	notifier: Notifier,
}
impl Engine {
	pub fn new(options: EngineOptions) -> Self {
		Self {
			session: QuerySession::default(),
			store: ResultStore::new(options.default_feature_weight),
			weight_function: kind_to_function(options.weight_function),
			sort_order: options.sort_order,
			default_feature_weight: options.default_feature_weight,
			connection: ConnectionStatus::Disconnected,
			notifier: Notifier::new(options.channel_capacity.max(1)),
		}
	}

	pub fn notifier(&self) -> &Notifier {
		&self.notifier
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
		self.notifier.subscribe()
	}

	pub fn subscribe_status(&self) -> broadcast::Receiver<StatusReport> {
		self.notifier.subscribe_status()
	}

	pub fn session(&self) -> &QuerySession {
		&self.session
	}

	pub fn store(&self) -> &ResultStore {
		&self.store
	}

	pub fn connection(&self) -> ConnectionStatus {
		self.connection
	}

	pub fn view(&self) -> ResultView {
		ResultView::build(&self.session, &self.store, self.sort_order)
	}

	/// Decodes and applies one inbound frame.
	///
	/// Undecodable frames and frames whose content would break store integrity are reported on
	/// the status channel and leave the store untouched.
	pub fn handle_frame(&mut self, frame: &str) -> Result<()> {
		let message = match message::decode(frame) {
			Ok(message) => message,
			Err(err) => {
				self.report_protocol_error(&err);

				return Err(err);
			},
		};

		self.handle_message(message)
	}

	pub fn handle_message(&mut self, message: InboundMessage) -> Result<()> {
		let result = self.apply(message);

		if let Err(err) = &result {
			self.report_protocol_error(err);
		}

		result
	}

	/// Sends a query to the backend. The session itself starts when the backend answers with
	/// `SESSION_START`.
	pub fn submit(&self, message: &OutboundMessage, transport: &dyn Transport) -> Result<()> {
		message.validate()?;

		if self.session.is_active() {
			return Err(Error::QueryInFlight);
		}
		if !transport.send(message) {
			tracing::warn!("Query submission failed; the transport is not connected.");

			return Err(Error::Disconnected);
		}

		tracing::debug!("Submitted query to the backend.");

		Ok(())
	}

	/// Recomputes every container and emits exactly one `UPDATED`.
	///
	/// `features` and `function` default to the registered feature list and the configured
	/// weight function.
	pub fn rerank(
		&mut self,
		features: Option<&[FeatureCategory]>,
		function: Option<&dyn WeightFunction>,
	) {
		let function = function.unwrap_or(self.weight_function.as_ref());

		self.store.update_all(features, function);

		tracing::trace!(objects = self.store.object_count(), "Reranked result set.");

		self.notify(ChangeEvent::Updated);
	}

	pub fn set_weight_function(&mut self, function: Arc<dyn WeightFunction>) {
		self.weight_function = function;
	}

	pub fn set_weight_function_kind(&mut self, kind: WeightFunctionKind) {
		self.weight_function = kind_to_function(kind);
	}

	pub fn set_sort_order(&mut self, order: SortOrder) {
		self.sort_order = order;
	}

	/// Changes a weight without reranking; call [`Engine::rerank`] to apply it.
	pub fn set_feature_weight(&mut self, name: &str, weight: f64) -> Result<()> {
		self.store.set_feature_weight(name, weight)?;
		self.notify(ChangeEvent::Feature);

		Ok(())
	}

	pub fn reset_feature_weights(&mut self) {
		self.store.reset_feature_weights();
		self.notify(ChangeEvent::Feature);
	}

	/// Visibility only affects the view, so nothing is reranked.
	pub fn toggle_media_type(&mut self, media_type: MediaType, visible: bool) {
		if self.store.toggle_media_type(media_type, visible) {
			self.notify(ChangeEvent::Updated);
		}
	}

	pub fn clear(&mut self) {
		self.store.clear();
		self.notify(ChangeEvent::Updated);
	}

	/// Ends the active session locally. The backend is not told; its late messages are rejected.
	pub fn end_session(&mut self) -> bool {
		if !self.session.end() {
			return false;
		}

		tracing::debug!(query_id = ?self.session.query_id(), "Query session ended.");

		self.notify(ChangeEvent::Ended);

		true
	}

	pub fn set_connection(&mut self, status: ConnectionStatus) {
		if self.connection != status {
			tracing::info!(status = ?status, "Connection status changed.");
		}

		self.connection = status;
		self.notifier.report(StatusReport::Connection(status));
	}

	pub fn snapshot(&self) -> Result<HistorySnapshot> {
		HistorySnapshot::capture(self.session.query_id(), &self.store)
	}

	/// Replaces the result set with a saved one. The current store is untouched unless the
	/// whole snapshot is valid.
	pub fn restore(&mut self, snapshot: HistorySnapshot) -> Result<()> {
		snapshot.verify()?;

		let store = ResultStore::restore(snapshot.state, self.default_feature_weight)?;

		self.store = store;
		self.session = QuerySession::restored(snapshot.entry.query_id);

		tracing::debug!(id = %snapshot.entry.id, "Restored history snapshot.");

		self.rerank(None, None);

		Ok(())
	}

	fn apply(&mut self, message: InboundMessage) -> Result<()> {
		match message {
			InboundMessage::SessionStart { query_id } => {
				self.start_session(&query_id);

				return Ok(());
			},
			InboundMessage::Ping { status } => {
				self.notifier.report(StatusReport::Ping { status });

				return Ok(());
			},
			InboundMessage::QueryError { query_id, message } => {
				tracing::warn!(
					query_id = %query_id,
					message = %message,
					"Backend reported a query error."
				);

				let current = self.session.accepts(&query_id);

				self.notifier.report(StatusReport::QueryError { query_id, message });

				if current {
					self.end_session();
				}

				return Ok(());
			},
			_ => {},
		}

		let Some(query_id) = message.query_id() else {
			return Ok(());
		};

		if !self.session.accepts(query_id) {
			tracing::debug!(
				query_id,
				kind = message.kind(),
				current = ?self.session.query_id(),
				"Ignored message for an inactive session."
			);

			return Ok(());
		}

		match message {
			InboundMessage::SessionEnd { .. } => {
				self.end_session();
			},
			InboundMessage::ObjectResult { content, .. } => {
				let attached = self.store.process_object_result(&content)?;

				tracing::trace!(received = content.len(), attached, "Applied object descriptors.");

				self.notify(ChangeEvent::Updated);
			},
			InboundMessage::SegmentResult { content, .. } => {
				let attached = self.store.process_segment_result(&content)?;

				tracing::trace!(received = content.len(), attached, "Applied segment descriptors.");

				self.notify(ChangeEvent::Updated);
			},
			InboundMessage::SimilarityResult { category, content, .. } => {
				let outcome = self.store.process_similarity_result(&category, &content);

				if outcome.unresolved > 0 {
					tracing::debug!(
						category = %category,
						unresolved = outcome.unresolved,
						"Dropped similarities for segments not seen yet."
					);
				}
				// Scores are recomputed before any event so no view carries stale scores.
				if outcome.applied > 0 {
					self.store.update_all(None, self.weight_function.as_ref());
				}
				if outcome.new_feature {
					self.notify(ChangeEvent::Feature);
				}
				if outcome.applied > 0 {
					self.notify(ChangeEvent::Updated);
				}
			},
			InboundMessage::SessionStart { .. }
			| InboundMessage::Ping { .. }
			| InboundMessage::QueryError { .. } => {},
		}

		Ok(())
	}

	/// A start for the running session is a duplicate. A start for another id supersedes the
	/// running session and discards its results.
	fn start_session(&mut self, query_id: &str) {
		if self.session.accepts(query_id) {
			tracing::debug!(query_id, "Ignored duplicate session start.");

			return;
		}
		if let Some(previous) = self.session.query_id().map(str::to_string)
			&& self.session.end()
		{
			tracing::info!(
				previous = %previous,
				query_id,
				"New query session supersedes the running one."
			);
		}

		self.session.begin(query_id);
		self.store.clear();

		tracing::debug!(query_id, "Query session started.");

		self.notify(ChangeEvent::Started);
	}

	fn notify(&self, event: ChangeEvent) {
		self.notifier.emit_with(event, || self.view());
	}

	fn report_protocol_error(&self, err: &Error) {
		tracing::warn!(error = %err, "Dropped inbound message.");

		self.notifier.report(StatusReport::ProtocolError { message: err.to_string() });
	}
}

fn kind_to_function(kind: WeightFunctionKind) -> Arc<dyn WeightFunction> {
	match kind {
		WeightFunctionKind::Default => Arc::new(lumen_domain::DefaultWeightFunction),
		WeightFunctionKind::Average => Arc::new(lumen_domain::AverageWeightFunction),
	}
}
