//! The single serialization point in front of the [`Engine`].
//!
//! The engine lives inside one tokio task. Everything else, including the transport reader and
//! UI callers, talks to it through an [`EngineHandle`], so exactly one command is applied at a
//! time and each runs to completion before the next is taken.

use std::sync::Arc;

use tokio::{
	sync::{broadcast, mpsc, oneshot},
	task::JoinHandle,
};
use uuid::Uuid;

use crate::{
	Error, Result,
	engine::Engine,
	history::{HistoryEntry, HistoryStore},
	message::OutboundMessage,
	notify::{ConnectionStatus, Notification, Notifier, StatusReport},
	transport::Transport,
	view::ResultView,
};
use lumen_domain::{FeatureCategory, MediaType};

enum Command {
	Frame(String),
	Connection(ConnectionStatus),
	Rerank { features: Option<Vec<FeatureCategory>>, reply: oneshot::Sender<()> },
	SetFeatureWeight { name: String, weight: f64, reply: oneshot::Sender<Result<()>> },
	ResetFeatureWeights,
	ToggleMediaType { media_type: MediaType, visible: bool },
	Clear,
	EndSession { reply: oneshot::Sender<bool> },
	Submit { message: OutboundMessage, reply: oneshot::Sender<Result<()>> },
	View { reply: oneshot::Sender<ResultView> },
	Save { reply: oneshot::Sender<Result<HistoryEntry>> },
	Load { id: Uuid, reply: oneshot::Sender<Result<()>> },
	ListHistory { reply: oneshot::Sender<Result<Vec<HistoryEntry>>> },
}

/// Cloneable handle to a running engine task.
#[derive(Clone)]
pub struct EngineHandle {
	commands: mpsc::Sender<Command>,
	notifier: Notifier,
}
impl EngineHandle {
	pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
		self.notifier.subscribe()
	}

	pub fn subscribe_status(&self) -> broadcast::Receiver<StatusReport> {
		self.notifier.subscribe_status()
	}

	/// Queues one inbound frame. Waits while the queue is full.
	pub async fn frame(&self, frame: impl Into<String>) -> Result<()> {
		self.send(Command::Frame(frame.into())).await
	}

	pub async fn connection(&self, status: ConnectionStatus) -> Result<()> {
		self.send(Command::Connection(status)).await
	}

	pub async fn rerank(&self, features: Option<Vec<FeatureCategory>>) -> Result<()> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::Rerank { features, reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)
	}

	pub async fn set_feature_weight(&self, name: impl Into<String>, weight: f64) -> Result<()> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::SetFeatureWeight { name: name.into(), weight, reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)?
	}

	pub async fn reset_feature_weights(&self) -> Result<()> {
		self.send(Command::ResetFeatureWeights).await
	}

	pub async fn toggle_media_type(&self, media_type: MediaType, visible: bool) -> Result<()> {
		self.send(Command::ToggleMediaType { media_type, visible }).await
	}

	pub async fn clear(&self) -> Result<()> {
		self.send(Command::Clear).await
	}

	pub async fn end_session(&self) -> Result<bool> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::EndSession { reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)
	}

	pub async fn submit(&self, message: OutboundMessage) -> Result<()> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::Submit { message, reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)?
	}

	pub async fn view(&self) -> Result<ResultView> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::View { reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)
	}

	pub async fn save(&self) -> Result<HistoryEntry> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::Save { reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)?
	}

	pub async fn load(&self, id: Uuid) -> Result<()> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::Load { id, reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)?
	}

	pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
		let (reply, rx) = oneshot::channel();

		self.send(Command::ListHistory { reply }).await?;

		rx.await.map_err(|_| Error::EngineClosed)?
	}

	async fn send(&self, command: Command) -> Result<()> {
		self.commands.send(command).await.map_err(|_| Error::EngineClosed)
	}
}

/// Moves `engine` into its own task. The task ends, returning the engine, once every handle is
/// dropped.
pub fn spawn(
	engine: Engine,
	transport: Arc<dyn Transport>,
	history: Arc<dyn HistoryStore>,
	queue_capacity: usize,
) -> (EngineHandle, JoinHandle<Engine>) {
	let (commands, rx) = mpsc::channel(queue_capacity.max(1));
	let handle = EngineHandle { commands, notifier: engine.notifier().clone() };
	let task = tokio::spawn(run(engine, transport, history, rx));

	(handle, task)
}

async fn run(
	mut engine: Engine,
	transport: Arc<dyn Transport>,
	history: Arc<dyn HistoryStore>,
	mut commands: mpsc::Receiver<Command>,
) -> Engine {
	while let Some(command) = commands.recv().await {
		match command {
			Command::Frame(frame) => {
				// Failures are already logged and reported on the status channel.
				let _ = engine.handle_frame(&frame);
			},
			Command::Connection(status) => engine.set_connection(status),
			Command::Rerank { features, reply } => {
				engine.rerank(features.as_deref(), None);

				let _ = reply.send(());
			},
			Command::SetFeatureWeight { name, weight, reply } => {
				let _ = reply.send(engine.set_feature_weight(&name, weight));
			},
			Command::ResetFeatureWeights => engine.reset_feature_weights(),
			Command::ToggleMediaType { media_type, visible } => {
				engine.toggle_media_type(media_type, visible);
			},
			Command::Clear => engine.clear(),
			Command::EndSession { reply } => {
				let _ = reply.send(engine.end_session());
			},
			Command::Submit { message, reply } => {
				let _ = reply.send(engine.submit(&message, transport.as_ref()));
			},
			Command::View { reply } => {
				let _ = reply.send(engine.view());
			},
			Command::Save { reply } => {
				let result = match engine.snapshot() {
					Ok(snapshot) => history.save(&snapshot).await,
					Err(err) => Err(err),
				};

				let _ = reply.send(result);
			},
			Command::Load { id, reply } => {
				let result = match history.load(id).await {
					Ok(snapshot) => engine.restore(snapshot),
					Err(err) => Err(err),
				};

				let _ = reply.send(result);
			},
			Command::ListHistory { reply } => {
				let _ = reply.send(history.list().await);
			},
		}
	}

	tracing::debug!("Engine task stopped; all handles were dropped.");

	engine
}
