use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::message::OutboundMessage;

/// Outbound half of the connection to the retrieval backend.
pub trait Transport
where
	Self: Send + Sync,
{
	/// Returns `false` when there is no active connection; the message was not sent.
	fn send(&self, message: &OutboundMessage) -> bool;
}

/// Serializes outbound messages onto a channel drained by the connection task.
#[derive(Debug)]
pub struct ChannelTransport {
	outbound: mpsc::UnboundedSender<String>,
	connected: AtomicBool,
}
impl ChannelTransport {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
		let (outbound, rx) = mpsc::unbounded_channel();

		(Self { outbound, connected: AtomicBool::new(false) }, rx)
	}

	pub fn set_connected(&self, connected: bool) {
		self.connected.store(connected, Ordering::SeqCst);
	}

	pub fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}
}

impl Transport for ChannelTransport {
	fn send(&self, message: &OutboundMessage) -> bool {
		if !self.is_connected() {
			return false;
		}

		let frame = match serde_json::to_string(message) {
			Ok(frame) => frame,
			Err(err) => {
				tracing::error!(error = %err, "Failed to encode outbound message.");

				return false;
			},
		};

		self.outbound.send(frame).is_ok()
	}
}
