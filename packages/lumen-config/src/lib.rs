mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, History, Notify, Ranking, SORT_ORDERS, Service, Transport, WEIGHT_FUNCTIONS};

use std::{fs, path::Path};

const DEFAULT_HISTORY_DIR: &str = "history";

pub fn load(path: &Path) -> Result<Config> {
	let raw =
		fs::read_to_string(path).map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::Parse { source, .. } => Error::Parse { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::Parse { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.is_empty() {
		return Err(Error::invalid("service.log_level", "must be non-empty."));
	}
	if cfg.transport.endpoint.is_empty() {
		return Err(Error::invalid("transport.endpoint", "must be non-empty."));
	}
	if cfg.transport.queue_capacity == 0 {
		return Err(Error::invalid("transport.queue_capacity", "must be greater than zero."));
	}
	if cfg.transport.reconnect_backoff_ms == 0 {
		return Err(Error::invalid("transport.reconnect_backoff_ms", "must be greater than zero."));
	}
	if !WEIGHT_FUNCTIONS.contains(&cfg.ranking.weight_function.as_str()) {
		return Err(Error::invalid(
			"ranking.weight_function",
			format!("must be one of {}.", WEIGHT_FUNCTIONS.join(", ")),
		));
	}
	if !SORT_ORDERS.contains(&cfg.ranking.sort_order.as_str()) {
		return Err(Error::invalid(
			"ranking.sort_order",
			format!("must be one of {}.", SORT_ORDERS.join(", ")),
		));
	}
	if !cfg.ranking.default_feature_weight.is_finite() {
		return Err(Error::invalid("ranking.default_feature_weight", "must be a finite number."));
	}
	if cfg.ranking.default_feature_weight <= 0.0 {
		return Err(Error::invalid("ranking.default_feature_weight", "must be greater than zero."));
	}
	if cfg.notify.channel_capacity == 0 {
		return Err(Error::invalid("notify.channel_capacity", "must be greater than zero."));
	}
	if cfg.history.max_entries == 0 {
		return Err(Error::invalid("history.max_entries", "must be greater than zero."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.transport.endpoint = cfg.transport.endpoint.trim().to_string();
	cfg.ranking.weight_function = cfg.ranking.weight_function.trim().to_ascii_lowercase();
	cfg.ranking.sort_order = cfg.ranking.sort_order.trim().to_ascii_lowercase();

	if cfg.history.dir.as_os_str().to_str().map(|dir| dir.trim().is_empty()).unwrap_or(false) {
		cfg.history.dir = DEFAULT_HISTORY_DIR.into();
	}
}
