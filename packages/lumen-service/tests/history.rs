use std::{fs, time::Duration};

use uuid::Uuid;

use lumen_domain::MediaType;
use lumen_service::{Engine, EngineOptions, Error, FileHistory, HistoryStore, MemoryHistory};
use lumen_testkit::{
	TempDir, object, object_result, segment, segment_result, session_start, similarity,
	similarity_result,
};

fn populated(query_id: &str) -> Engine {
	let mut engine = Engine::new(EngineOptions::default());

	engine.handle_frame(&session_start(query_id)).unwrap();
	engine.handle_frame(&object_result(query_id, &[object("o1", MediaType::Audio)])).unwrap();
	engine.handle_frame(&segment_result(query_id, &[segment("s1", "o1", 0.0, 3.5)])).unwrap();
	engine
		.handle_frame(&similarity_result(query_id, "audio", &[similarity("s1", 0.4375)]))
		.unwrap();

	engine
}

#[tokio::test]
async fn file_history_round_trips_a_snapshot() {
	let dir = TempDir::new("lumen_history").unwrap();
	let history = FileHistory::new(dir.path(), 5);
	let snapshot = populated("q1").snapshot().unwrap();
	let entry = history.save(&snapshot).await.unwrap();

	assert_eq!(entry.id, snapshot.id());
	assert_eq!(entry.query_id.as_deref(), Some("q1"));

	let loaded = history.load(entry.id).await.unwrap();

	assert_eq!(loaded, snapshot);

	let mut restored = Engine::new(EngineOptions::default());

	restored.restore(loaded).unwrap();

	assert_eq!(restored.view().object_ids(), vec!["o1"]);
	assert!((restored.view().objects[0].score - 0.4375).abs() < 1e-12);
}

#[tokio::test]
async fn file_history_keeps_the_newest_entries() {
	let dir = TempDir::new("lumen_history").unwrap();
	let history = FileHistory::new(dir.path(), 2);
	let mut ids = Vec::new();

	for query_id in ["q1", "q2", "q3"] {
		let snapshot = populated(query_id).snapshot().unwrap();

		ids.push(history.save(&snapshot).await.unwrap().id);

		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	let entries = history.list().await.unwrap();

	assert_eq!(entries.iter().map(|entry| entry.id).collect::<Vec<_>>(), vec![ids[2], ids[1]]);
	assert!(matches!(history.load(ids[0]).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn file_history_rejects_edited_files_and_skips_garbage() {
	let dir = TempDir::new("lumen_history").unwrap();
	let history = FileHistory::new(dir.path(), 5);
	let snapshot = populated("q1").snapshot().unwrap();
	let entry = history.save(&snapshot).await.unwrap();
	let path = dir.path().join(format!("{}.json", entry.id));
	let edited = fs::read_to_string(&path).unwrap().replace("0.4375", "0.9375");

	fs::write(&path, edited).unwrap();
	fs::write(dir.path().join("broken.json"), "{").unwrap();

	assert!(matches!(history.load(entry.id).await, Err(Error::Snapshot { .. })));
	assert_eq!(history.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_history_directory_lists_nothing() {
	let dir = TempDir::new("lumen_history").unwrap();
	let history = FileHistory::new(dir.path().join("absent"), 5);

	assert!(history.list().await.unwrap().is_empty());
	assert!(matches!(history.load(Uuid::new_v4()).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn memory_history_is_bounded() {
	let history = MemoryHistory::new(1);
	let first = populated("q1").snapshot().unwrap();

	history.save(&first).await.unwrap();
	tokio::time::sleep(Duration::from_millis(5)).await;

	let second = populated("q2").snapshot().unwrap();

	history.save(&second).await.unwrap();

	let entries = history.list().await.unwrap();

	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].query_id.as_deref(), Some("q2"));
	assert!(matches!(history.load(first.id()).await, Err(Error::NotFound { .. })));
}
