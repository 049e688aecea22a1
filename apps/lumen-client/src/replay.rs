use std::path::Path;

use color_eyre::{Result, eyre};
use tokio::{
	fs::File,
	io::{self, AsyncBufRead, AsyncBufReadExt, BufReader},
	sync::broadcast::{self, error::RecvError},
	task::JoinHandle,
};

use lumen_service::{EngineHandle, Notification, StatusReport};

const STDIN_MARKER: &str = "-";

/// A `NAME=VALUE` feature weight override.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightOverride {
	pub name: String,
	pub weight: f64,
}

/// Clap value parser for `--weight`.
pub fn parse_weight(raw: &str) -> Result<WeightOverride, String> {
	let Some((name, value)) = raw.split_once('=') else {
		return Err(format!("Weight override {raw:?} must look like NAME=VALUE."));
	};
	let name = name.trim();

	if name.is_empty() {
		return Err(format!("Weight override {raw:?} has an empty category name."));
	}

	let weight = value
		.trim()
		.parse::<f64>()
		.map_err(|err| format!("Weight override {raw:?} has an invalid value: {err}."))?;

	Ok(WeightOverride { name: name.to_string(), weight })
}

/// Feeds every non-blank line of `source` (a path, or `-` for stdin) to the engine in order.
pub async fn replay(handle: &EngineHandle, source: &Path) -> Result<usize> {
	if source.as_os_str() == STDIN_MARKER {
		return replay_lines(handle, BufReader::new(io::stdin())).await;
	}

	let file = File::open(source)
		.await
		.map_err(|err| eyre::eyre!("Failed to open frame log {}: {err}.", source.display()))?;

	replay_lines(handle, BufReader::new(file)).await
}

pub async fn replay_lines<R>(handle: &EngineHandle, reader: R) -> Result<usize>
where
	R: AsyncBufRead + Unpin,
{
	let mut lines = reader.lines();
	let mut replayed = 0;

	while let Some(line) = lines.next_line().await? {
		let line = line.trim();

		if line.is_empty() {
			continue;
		}

		handle.frame(line).await?;

		replayed += 1;
	}

	tracing::debug!(frames = replayed, "Replayed frame log.");

	Ok(replayed)
}

/// Logs change notifications until the engine goes away.
pub fn watch_changes(mut rx: broadcast::Receiver<Notification>) -> JoinHandle<()> {
	tokio::spawn(async move {
		loop {
			match rx.recv().await {
				Ok(notification) => tracing::info!(
					event = ?notification.event,
					query_id = ?notification.view.query_id,
					objects = notification.view.objects.len(),
					"Result set changed."
				),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Change listener fell behind.");
				},
				Err(RecvError::Closed) => return,
			}
		}
	})
}

pub fn watch_status(mut rx: broadcast::Receiver<StatusReport>) -> JoinHandle<()> {
	tokio::spawn(async move {
		loop {
			match rx.recv().await {
				Ok(StatusReport::ProtocolError { message }) => {
					tracing::warn!(message = %message, "Backend sent an unusable frame.");
				},
				Ok(StatusReport::QueryError { query_id, message }) => {
					tracing::error!(query_id = %query_id, message = %message, "Query failed.");
				},
				Ok(report) => tracing::debug!(report = ?report, "Status update."),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Status listener fell behind.");
				},
				Err(RecvError::Closed) => return,
			}
		}
	})
}
