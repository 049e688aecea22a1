pub mod replay;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use uuid::Uuid;

use lumen_service::{
	ChannelTransport, ConnectionStatus, Engine, EngineOptions, FileHistory, HistoryStore, runtime,
};

#[derive(Debug, Parser)]
#[command(
	version = lumen_cli::VERSION,
	rename_all = "kebab",
	styles = lumen_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON Lines log of backend frames to replay, or `-` for stdin.
	#[arg(long, value_name = "FILE")]
	pub frames: Option<PathBuf>,
	/// Feature weight override applied after replay, as NAME=VALUE. Repeatable.
	#[arg(long = "weight", value_name = "NAME=VALUE", value_parser = replay::parse_weight)]
	pub weights: Vec<replay::WeightOverride>,
	/// Restore a saved result set before replaying.
	#[arg(long, value_name = "ID")]
	pub load: Option<Uuid>,
	/// Save the final result set to history.
	#[arg(long)]
	pub save: bool,
	/// Print saved history entries instead of the ranking.
	#[arg(long)]
	pub list_history: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = lumen_config::load(&args.config)?;

	lumen_cli::init_tracing(&config.service.log_level);

	let history = Arc::new(FileHistory::from_config(&config.history));

	if args.list_history {
		let entries = history.list().await?;

		println!("{}", serde_json::to_string_pretty(&entries)?);

		return Ok(());
	}

	let options = EngineOptions::from_config(&config)?;
	let (transport, mut outbound) = ChannelTransport::new();
	let transport = Arc::new(transport);
	let (handle, task) = runtime::spawn(
		Engine::new(options),
		transport.clone(),
		history,
		config.transport.queue_capacity,
	);
	let changes = replay::watch_changes(handle.subscribe());
	let status = replay::watch_status(handle.subscribe_status());
	let outbound_log = tokio::spawn(async move {
		while let Some(frame) = outbound.recv().await {
			tracing::debug!(frame = %frame, "Outbound frame.");
		}
	});

	tracing::info!(endpoint = %config.transport.endpoint, "Replaying backend session.");

	transport.set_connected(true);
	handle.connection(ConnectionStatus::Connected).await?;

	if let Some(id) = args.load {
		handle.load(id).await?;
	}
	if let Some(source) = &args.frames {
		replay::replay(&handle, source).await?;
	}
	if !args.weights.is_empty() {
		for weight in &args.weights {
			handle.set_feature_weight(weight.name.as_str(), weight.weight).await?;
		}

		handle.rerank(None).await?;
	}

	let view = handle.view().await?;

	if args.save {
		let entry = handle.save().await?;

		tracing::info!(id = %entry.id, objects = entry.object_count, "Saved result set.");
	}

	transport.set_connected(false);
	handle.connection(ConnectionStatus::Disconnected).await?;

	println!("{}", serde_json::to_string_pretty(&view)?);

	drop(handle);

	let engine = task.await.map_err(|err| eyre::eyre!("Engine task failed: {err}."))?;

	drop(engine);
	drop(transport);

	for listener in [changes, status, outbound_log] {
		listener.await?;
	}

	Ok(())
}
