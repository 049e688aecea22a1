use std::{fmt, io::ErrorKind, path::PathBuf, sync::Mutex};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::fs;
use uuid::Uuid;

use crate::{
	BoxFuture, Error, Result,
	store::{ResultStore, StoreState},
};

const SNAPSHOT_EXTENSION: &str = "json";

/// Wall-clock time of a snapshot, written as RFC 3339.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Timestamp(OffsetDateTime);
impl Timestamp {
	pub fn now() -> Self {
		Self(OffsetDateTime::now_utc())
	}
}

impl From<OffsetDateTime> for Timestamp {
	fn from(value: OffsetDateTime) -> Self {
		Self(value)
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;

		f.write_str(&formatted)
	}
}

impl Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let formatted = self.0.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

		serializer.serialize_str(&formatted)
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		OffsetDateTime::parse(&raw, &Rfc3339).map(Self).map_err(serde::de::Error::custom)
	}
}

/// Summary of one saved result set.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HistoryEntry {
	pub id: Uuid,
	pub timestamp: Timestamp,
	pub query_id: Option<String>,
	pub object_count: usize,
	pub segment_count: usize,
	pub features: Vec<String>,
}

/// A saved result set. `digest` is the blake3 hash of the serialized `state`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HistorySnapshot {
	#[serde(flatten)]
	pub entry: HistoryEntry,
	pub digest: String,
	pub state: StoreState,
}
impl HistorySnapshot {
	pub fn capture(query_id: Option<&str>, store: &ResultStore) -> Result<Self> {
		let state = store.snapshot();
		let digest = digest(&state)?;

		Ok(Self {
			entry: HistoryEntry {
				id: Uuid::new_v4(),
				timestamp: Timestamp::now(),
				query_id: query_id.map(str::to_string),
				object_count: store.object_count(),
				segment_count: store.segment_count(),
				features: store.features().iter().map(|feature| feature.name.clone()).collect(),
			},
			digest,
			state,
		})
	}

	pub fn id(&self) -> Uuid {
		self.entry.id
	}

	/// Rejects snapshots whose content no longer matches what was saved.
	pub fn verify(&self) -> Result<()> {
		if digest(&self.state)? != self.digest {
			return Err(Error::Snapshot {
				message: format!("Snapshot {} does not match its digest.", self.entry.id),
			});
		}

		let segment_count: usize = self.state.objects.iter().map(|object| object.segments.len()).sum();

		if self.state.objects.len() != self.entry.object_count
			|| segment_count != self.entry.segment_count
		{
			return Err(Error::Snapshot {
				message: format!("Snapshot {} has inconsistent counts.", self.entry.id),
			});
		}

		Ok(())
	}
}

/// Persistence of result-set snapshots.
pub trait HistoryStore
where
	Self: Send + Sync,
{
	fn save<'a>(&'a self, snapshot: &'a HistorySnapshot) -> BoxFuture<'a, Result<HistoryEntry>>;

	fn load<'a>(&'a self, id: Uuid) -> BoxFuture<'a, Result<HistorySnapshot>>;

	/// Newest first.
	fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<HistoryEntry>>>;
}

/// One JSON file per snapshot under `dir`, keeping the newest `max_entries`.
#[derive(Clone, Debug)]
pub struct FileHistory {
	dir: PathBuf,
	max_entries: usize,
}
impl FileHistory {
	pub fn new(dir: impl Into<PathBuf>, max_entries: usize) -> Self {
		Self { dir: dir.into(), max_entries: max_entries.max(1) }
	}

	pub fn from_config(cfg: &lumen_config::History) -> Self {
		Self::new(cfg.dir.clone(), cfg.max_entries)
	}

	fn path_for(&self, id: Uuid) -> PathBuf {
		self.dir.join(format!("{id}.{SNAPSHOT_EXTENSION}"))
	}

	async fn save_inner(&self, snapshot: &HistorySnapshot) -> Result<HistoryEntry> {
		fs::create_dir_all(&self.dir).await?;

		let path = self.path_for(snapshot.id());
		let staging = path.with_extension("tmp");
		let bytes = serde_json::to_vec_pretty(snapshot)?;

		fs::write(&staging, bytes).await?;
		fs::rename(&staging, &path).await?;

		tracing::debug!(id = %snapshot.id(), path = %path.display(), "Saved history snapshot.");

		self.prune().await?;

		Ok(snapshot.entry.clone())
	}

	async fn load_inner(&self, id: Uuid) -> Result<HistorySnapshot> {
		let bytes = match fs::read(self.path_for(id)).await {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == ErrorKind::NotFound => {
				return Err(Error::NotFound { message: format!("No history entry {id}.") });
			},
			Err(err) => return Err(err.into()),
		};
		let snapshot: HistorySnapshot = serde_json::from_slice(&bytes)?;

		if snapshot.id() != id {
			return Err(Error::Snapshot {
				message: format!("History file for {id} holds snapshot {}.", snapshot.id()),
			});
		}

		snapshot.verify()?;

		Ok(snapshot)
	}

	async fn list_inner(&self) -> Result<Vec<HistoryEntry>> {
		let mut dir = match fs::read_dir(&self.dir).await {
			Ok(dir) => dir,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err.into()),
		};
		let mut entries = Vec::new();

		while let Some(file) = dir.next_entry().await? {
			let path = file.path();

			if path.extension().and_then(|ext| ext.to_str()) != Some(SNAPSHOT_EXTENSION) {
				continue;
			}

			let parsed = fs::read(&path)
				.await
				.map_err(Error::from)
				.and_then(|bytes| Ok(serde_json::from_slice::<HistorySnapshot>(&bytes)?));

			match parsed {
				Ok(snapshot) => entries.push(snapshot.entry),
				Err(err) => {
					tracing::warn!(path = %path.display(), error = %err, "Skipped unreadable history file.");
				},
			}
		}

		sort_newest_first(&mut entries);

		Ok(entries)
	}

	async fn prune(&self) -> Result<()> {
		let entries = self.list_inner().await?;

		for entry in entries.iter().skip(self.max_entries) {
			fs::remove_file(self.path_for(entry.id)).await?;

			tracing::debug!(id = %entry.id, "Pruned history snapshot.");
		}

		Ok(())
	}
}

impl HistoryStore for FileHistory {
	fn save<'a>(&'a self, snapshot: &'a HistorySnapshot) -> BoxFuture<'a, Result<HistoryEntry>> {
		Box::pin(self.save_inner(snapshot))
	}

	fn load<'a>(&'a self, id: Uuid) -> BoxFuture<'a, Result<HistorySnapshot>> {
		Box::pin(self.load_inner(id))
	}

	fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<HistoryEntry>>> {
		Box::pin(self.list_inner())
	}
}

/// Process-local history, newest `max_entries` snapshots.
#[derive(Debug)]
pub struct MemoryHistory {
	snapshots: Mutex<Vec<HistorySnapshot>>,
	max_entries: usize,
}
impl MemoryHistory {
	pub fn new(max_entries: usize) -> Self {
		Self { snapshots: Mutex::new(Vec::new()), max_entries: max_entries.max(1) }
	}
}

impl HistoryStore for MemoryHistory {
	fn save<'a>(&'a self, snapshot: &'a HistorySnapshot) -> BoxFuture<'a, Result<HistoryEntry>> {
		let mut snapshots = self.snapshots.lock().unwrap_or_else(|err| err.into_inner());

		snapshots.retain(|saved| saved.id() != snapshot.id());
		snapshots.push(snapshot.clone());
		snapshots.sort_by(|a, b| b.entry.timestamp.cmp(&a.entry.timestamp));
		snapshots.truncate(self.max_entries);

		let entry = snapshot.entry.clone();

		Box::pin(async move { Ok(entry) })
	}

	fn load<'a>(&'a self, id: Uuid) -> BoxFuture<'a, Result<HistorySnapshot>> {
		let snapshots = self.snapshots.lock().unwrap_or_else(|err| err.into_inner());
		let found = snapshots
			.iter()
			.find(|snapshot| snapshot.id() == id)
			.cloned()
			.ok_or_else(|| Error::NotFound { message: format!("No history entry {id}.") })
			.and_then(|snapshot| snapshot.verify().map(|()| snapshot));

		Box::pin(async move { found })
	}

	fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<HistoryEntry>>> {
		let snapshots = self.snapshots.lock().unwrap_or_else(|err| err.into_inner());
		let mut entries = snapshots.iter().map(|snapshot| snapshot.entry.clone()).collect::<Vec<_>>();

		sort_newest_first(&mut entries);

		Box::pin(async move { Ok(entries) })
	}
}

fn digest(state: &StoreState) -> Result<String> {
	let bytes = serde_json::to_vec(state)?;

	Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn sort_newest_first(entries: &mut [HistoryEntry]) {
	entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn timestamp_is_written_as_rfc3339() {
		let timestamp = Timestamp::from(datetime!(2024-03-01 08:30:15 UTC));

		assert_eq!(timestamp.to_string(), "2024-03-01T08:30:15Z");

		let json = serde_json::to_string(&timestamp).unwrap();

		assert_eq!(json, "\"2024-03-01T08:30:15Z\"");
		assert_eq!(serde_json::from_str::<Timestamp>(&json).unwrap(), timestamp);
	}
}
