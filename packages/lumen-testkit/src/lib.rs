mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	path::{Path, PathBuf},
};

use serde_json::{Value, json};
use uuid::Uuid;

use lumen_domain::{MediaObject, MediaSegment, MediaType, Similarity};

/// A scratch directory removed on drop.
pub struct TempDir {
	path: PathBuf,
}
impl TempDir {
	pub fn new(prefix: &str) -> Result<Self> {
		let path = env::temp_dir().join(format!("{prefix}_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&path)?;

		Ok(Self { path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl Drop for TempDir {
	fn drop(&mut self) {
		if let Err(err) = fs::remove_dir_all(&self.path) {
			eprintln!("Temp directory cleanup failed: {err}.");
		}
	}
}

pub fn object(object_id: &str, mediatype: MediaType) -> MediaObject {
	MediaObject {
		object_id: object_id.to_string(),
		mediatype,
		name: format!("{object_id}.bin"),
		path: format!("/media/{object_id}.bin"),
	}
}

pub fn segment(segment_id: &str, object_id: &str, start: f64, end: f64) -> MediaSegment {
	MediaSegment {
		segment_id: segment_id.to_string(),
		object_id: object_id.to_string(),
		start,
		end,
	}
}

pub fn similarity(key: &str, value: f64) -> Similarity {
	Similarity { key: key.to_string(), value }
}

pub fn session_start(query_id: &str) -> String {
	json!({ "messageType": "SESSION_START", "queryId": query_id }).to_string()
}

pub fn session_end(query_id: &str) -> String {
	json!({ "messageType": "SESSION_END", "queryId": query_id }).to_string()
}

pub fn object_result(query_id: &str, objects: &[MediaObject]) -> String {
	with_count(result_frame("OBJECT_RESULT", query_id, json!(objects)), objects.len())
}

pub fn segment_result(query_id: &str, segments: &[MediaSegment]) -> String {
	with_count(result_frame("SEGMENT_RESULT", query_id, json!(segments)), segments.len())
}

pub fn similarity_result(query_id: &str, category: &str, similarities: &[Similarity]) -> String {
	let mut frame = result_frame("SIMILARITY_RESULT", query_id, json!(similarities));

	frame["category"] = json!(category);

	with_count(frame, similarities.len())
}

/// An object frame without the optional `count` field.
pub fn object_result_uncounted(query_id: &str, objects: &[MediaObject]) -> String {
	result_frame("OBJECT_RESULT", query_id, json!(objects)).to_string()
}

/// An object frame whose `count` disagrees with its content.
pub fn object_result_miscounted(query_id: &str, objects: &[MediaObject], count: usize) -> String {
	with_count(result_frame("OBJECT_RESULT", query_id, json!(objects)), count)
}

pub fn ping(status: Option<&str>) -> String {
	match status {
		Some(status) => json!({ "messageType": "PING", "status": status }).to_string(),
		None => json!({ "messageType": "PING" }).to_string(),
	}
}

pub fn query_error(query_id: &str, message: &str) -> String {
	json!({ "messageType": "QUERY_ERROR", "queryId": query_id, "message": message }).to_string()
}

/// Reads a JSON Lines frame log, skipping blank lines.
pub fn load_frames(path: impl AsRef<Path>) -> Result<Vec<String>> {
	let path = path.as_ref();
	let raw = fs::read_to_string(path)?;
	let mut frames = Vec::new();

	for (index, line) in raw.lines().enumerate() {
		let line = line.trim();

		if line.is_empty() {
			continue;
		}

		serde_json::from_str::<Value>(line).map_err(|err| {
			Error::Message(format!("{}:{} is not a JSON frame: {err}.", path.display(), index + 1))
		})?;
		frames.push(line.to_string());
	}

	Ok(frames)
}

fn result_frame(message_type: &str, query_id: &str, content: Value) -> Value {
	json!({ "messageType": message_type, "queryId": query_id, "content": content })
}

fn with_count(mut frame: Value, count: usize) -> String {
	frame["count"] = json!(count);

	frame.to_string()
}
