use std::path::PathBuf;

use serde::Deserialize;

pub const WEIGHT_FUNCTIONS: [&str; 2] = ["default", "average"];
pub const SORT_ORDERS: [&str; 2] = ["ascending", "descending"];

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub transport: Transport,
	pub ranking: Ranking,
	pub notify: Notify,
	pub history: History,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Transport {
	pub endpoint: String,
	/// Inbound frames queued in front of the engine before senders are back-pressured.
	pub queue_capacity: usize,
	/// Advisory only. Reconnection is owned by the transport collaborator.
	pub reconnect_backoff_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Ranking {
	/// One of `default` or `average`.
	pub weight_function: String,
	/// One of `ascending` or `descending`.
	pub sort_order: String,
	/// Weight assigned to a feature category the first time a similarity message names it.
	pub default_feature_weight: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Notify {
	pub channel_capacity: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct History {
	pub dir: PathBuf,
	pub max_entries: usize,
}
