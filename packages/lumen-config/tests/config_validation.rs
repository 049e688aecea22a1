use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use lumen_config::Error;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let table = root
		.as_table_mut()
		.and_then(|root| root.get_mut(section))
		.and_then(Value::as_table_mut)
		.expect("Sample config must include the requested section.");

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn validation_message(raw: &str) -> String {
	match lumen_config::parse(raw) {
		Err(Error::Validation { key, message }) => format!("{key} {message}"),
		Err(other) => panic!("Expected a validation error, got {other:?}."),
		Ok(_) => panic!("Expected a validation error, got a valid config."),
	}
}

fn write_temp_config(payload: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("System time went backwards.");
	let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
	let path = env::temp_dir().join(format!("lumen_config_{}_{seq}.toml", nanos.as_nanos()));

	fs::write(&path, payload).expect("Failed to write temp config.");

	path
}

#[test]
fn sample_config_is_valid() {
	let cfg = lumen_config::parse(SAMPLE_CONFIG_TOML).expect("Sample config must be valid.");

	assert_eq!(cfg.ranking.weight_function, "default");
	assert_eq!(cfg.ranking.sort_order, "descending");
	assert_eq!(cfg.transport.queue_capacity, 256);
	assert_eq!(cfg.history.max_entries, 20);
}

#[test]
fn load_reads_from_disk() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML);
	let cfg = lumen_config::load(&path).expect("Config must load from disk.");

	fs::remove_file(&path).expect("Failed to remove temp config.");

	assert_eq!(cfg.service.log_level, "info");
}

#[test]
fn load_reports_missing_file() {
	let path = env::temp_dir().join("lumen_config_missing_file.toml");
	let err = lumen_config::load(&path).expect_err("Missing file must fail.");

	assert!(matches!(err, Error::Read { .. }));
}

#[test]
fn load_reports_parse_errors_with_path() {
	let path = write_temp_config("[service\nlog_level = ");
	let err = lumen_config::load(&path).expect_err("Broken TOML must fail.");

	fs::remove_file(&path).expect("Failed to remove temp config.");

	match err {
		Error::Parse { path: reported, .. } => assert_eq!(reported, path),
		other => panic!("Expected a parse error, got {other:?}."),
	}
}

#[test]
fn weight_function_is_normalized_and_validated() {
	let raw = sample_with("ranking", "weight_function", Value::String(" Average ".to_string()));
	let cfg = lumen_config::parse(&raw).expect("Mixed case weight function must normalize.");

	assert_eq!(cfg.ranking.weight_function, "average");

	let raw = sample_with("ranking", "weight_function", Value::String("median".to_string()));

	assert_eq!(
		validation_message(&raw),
		"ranking.weight_function must be one of default, average."
	);
}

#[test]
fn sort_order_must_be_known() {
	let raw = sample_with("ranking", "sort_order", Value::String("random".to_string()));

	assert_eq!(validation_message(&raw), "ranking.sort_order must be one of ascending, descending.");
}

#[test]
fn default_feature_weight_must_be_positive() {
	let raw = sample_with("ranking", "default_feature_weight", Value::Float(0.0));

	assert_eq!(
		validation_message(&raw),
		"ranking.default_feature_weight must be greater than zero."
	);

	let raw = sample_with("ranking", "default_feature_weight", Value::Float(f64::INFINITY));

	assert_eq!(validation_message(&raw), "ranking.default_feature_weight must be a finite number.");
}

#[test]
fn capacities_must_be_positive() {
	let raw = sample_with("transport", "queue_capacity", Value::Integer(0));

	assert_eq!(validation_message(&raw), "transport.queue_capacity must be greater than zero.");

	let raw = sample_with("notify", "channel_capacity", Value::Integer(0));

	assert_eq!(validation_message(&raw), "notify.channel_capacity must be greater than zero.");

	let raw = sample_with("history", "max_entries", Value::Integer(0));

	assert_eq!(validation_message(&raw), "history.max_entries must be greater than zero.");
}

#[test]
fn endpoint_must_be_non_empty() {
	let raw = sample_with("transport", "endpoint", Value::String("   ".to_string()));

	assert_eq!(validation_message(&raw), "transport.endpoint must be non-empty.");
}

#[test]
fn blank_history_dir_falls_back_to_default() {
	let raw = sample_with("history", "dir", Value::String("  ".to_string()));
	let cfg = lumen_config::parse(&raw).expect("Blank history dir must normalize.");

	assert_eq!(cfg.history.dir, PathBuf::from("history"));
}
