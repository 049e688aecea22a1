use lumen_domain::{
	AverageWeightFunction, DefaultWeightFunction, Error, FeatureCategory, MediaObject,
	MediaSegment, MediaType, ObjectScoreContainer, Scored, SegmentScoreContainer, SortOrder,
	WeightFunction, WeightFunctionKind, score_descending,
};

const EPSILON: f64 = 1e-9;

fn assert_close(actual: f64, expected: f64) {
	assert!((actual - expected).abs() < EPSILON, "expected {expected}, got {actual}");
}

fn features(names: &[(&str, f64)]) -> Vec<FeatureCategory> {
	names.iter().map(|(name, weight)| FeatureCategory::new(*name, *weight)).collect()
}

fn video(object_id: &str) -> MediaObject {
	MediaObject {
		object_id: object_id.to_string(),
		mediatype: MediaType::Video,
		name: format!("{object_id}.mp4"),
		path: format!("videos/{object_id}.mp4"),
	}
}

fn segment_descriptor(segment_id: &str, object_id: &str) -> MediaSegment {
	MediaSegment {
		segment_id: segment_id.to_string(),
		object_id: object_id.to_string(),
		start: 0.0,
		end: 1.0,
	}
}

/// Builds an object whose segments score exactly `scores` under equal single-category weights.
fn object_with_segment_scores(
	scores: &[f64],
	function: &dyn WeightFunction,
) -> ObjectScoreContainer {
	let mut object = ObjectScoreContainer::new("o1");
	let features = features(&[("color", 1.0)]);

	for (idx, score) in scores.iter().enumerate() {
		let segment = object.segment_or_insert(&format!("s{idx}"), "o1").unwrap();

		if *score > 0.0 {
			segment.record("color", *score);
		}
	}

	object.update(&features, function);

	object
}

#[test]
fn segment_with_mismatched_object_id_cannot_be_constructed() {
	let err = SegmentScoreContainer::for_owner("o1", "s1", "o2").unwrap_err();

	assert_eq!(
		err,
		Error::SegmentOwnerMismatch {
			segment_id: "s1".to_string(),
			expected: "o1".to_string(),
			found: "o2".to_string(),
		}
	);

	let mut object = ObjectScoreContainer::new("o1");

	assert!(object.segment_or_insert("s1", "o2").is_err());
	assert_eq!(object.segment_count(), 0);
}

#[test]
fn segment_descriptor_for_another_object_is_rejected() {
	let mut segment = SegmentScoreContainer::for_owner("o1", "s1", "o1").unwrap();

	assert!(matches!(
		segment.attach(segment_descriptor("s1", "o2")),
		Err(Error::SegmentOwnerMismatch { .. })
	));
	assert!(segment.descriptor().is_none());
	assert!(segment.attach(segment_descriptor("s1", "o1")).unwrap());
	assert!(!segment.attach(segment_descriptor("s1", "o1")).unwrap());
}

#[test]
fn ready_requires_descriptor_and_segment() {
	let mut object = ObjectScoreContainer::new("o1");

	assert!(!object.is_ready());

	object.attach(video("o1")).unwrap();

	assert!(!object.is_ready());

	object.segment_or_insert("s1", "o1").unwrap();

	assert!(object.is_ready());

	let mut segments_only = ObjectScoreContainer::new("o2");

	segments_only.segment_or_insert("s2", "o2").unwrap();

	assert!(!segments_only.is_ready());
}

#[test]
fn default_segment_score_is_weighted_mean_of_present_categories() {
	let mut segment = SegmentScoreContainer::for_owner("o1", "s1", "o1").unwrap();
	let all = features(&[("color", 1.0), ("edge", 1.0), ("text", 1.0)]);

	segment.record("color", 0.8);
	segment.record("edge", 0.6);
	segment.update(&all, &DefaultWeightFunction);

	assert_close(segment.score(), 0.7);

	segment.record("text", 0.2);
	segment.update(&all, &DefaultWeightFunction);

	assert_close(segment.score(), (0.8 + 0.6 + 0.2) / 3.0);
}

#[test]
fn categories_missing_from_the_feature_list_do_not_contribute() {
	let mut segment = SegmentScoreContainer::for_owner("o1", "s1", "o1").unwrap();

	segment.record("color", 0.8);
	segment.record("audio", 0.1);
	segment.update(&features(&[("color", 2.0)]), &DefaultWeightFunction);

	assert_close(segment.score(), 0.8);
}

#[test]
fn segment_score_follows_changed_weights() {
	let mut segment = SegmentScoreContainer::for_owner("o1", "s1", "o1").unwrap();

	segment.record("color", 0.8);
	segment.record("edge", 0.6);
	segment.update(&features(&[("color", 3.0), ("edge", 1.0)]), &DefaultWeightFunction);

	assert_close(segment.score(), (0.8 * 3.0 + 0.6) / 4.0);
}

#[test]
fn default_object_score_is_max_of_segments() {
	let object = object_with_segment_scores(&[0.7, 0.9], &DefaultWeightFunction);

	assert_close(object.score(), 0.9);
	assert_eq!(object.representative_segment().unwrap().segment_id(), "s1");
}

#[test]
fn average_object_score_ignores_unscored_segments() {
	let object = object_with_segment_scores(&[0.7, 0.9, 0.0], &AverageWeightFunction);

	assert_close(object.score(), 0.8);
}

#[test]
fn incomplete_containers_score_zero() {
	let all = features(&[("color", 1.0)]);

	for kind in [WeightFunctionKind::Default, WeightFunctionKind::Average] {
		let mut empty = ObjectScoreContainer::new("o1");

		empty.update(&all, kind.function());

		assert_eq!(empty.score(), 0.0);

		let unscored = object_with_segment_scores(&[0.0, 0.0], kind.function());

		assert_eq!(unscored.score(), 0.0);
	}
}

#[test]
fn object_update_refreshes_children_first() {
	let mut object = ObjectScoreContainer::new("o1");

	object.segment_or_insert("s1", "o1").unwrap().record("color", 0.4);
	object.update(&features(&[("color", 1.0)]), &DefaultWeightFunction);

	assert_close(object.score(), 0.4);

	object.segment_mut("s1").unwrap().record("color", 0.6);
	object.update(&features(&[("color", 1.0)]), &DefaultWeightFunction);

	assert_close(object.segment("s1").unwrap().score(), 0.6);
	assert_close(object.score(), 0.6);
}

#[test]
fn comparators_order_by_score_and_keep_ties_equal() {
	let low = object_with_segment_scores(&[0.2], &DefaultWeightFunction);
	let high = object_with_segment_scores(&[0.9], &DefaultWeightFunction);
	let tie = object_with_segment_scores(&[0.9], &DefaultWeightFunction);

	assert_eq!(score_descending(&high, &low), std::cmp::Ordering::Less);
	assert_eq!(SortOrder::Ascending.compare(&high, &low), std::cmp::Ordering::Greater);
	assert_eq!(SortOrder::Descending.compare(&high, &tie), std::cmp::Ordering::Equal);
}

#[test]
fn descriptors_use_the_wire_field_names() {
	let object: MediaObject = serde_json::from_str(
		r#"{"objectId":"o1","mediatype":"VIDEO","name":"clip.mp4","path":"v/clip.mp4"}"#,
	)
	.unwrap();
	let segment: MediaSegment =
		serde_json::from_str(r#"{"segmentId":"s1","objectId":"o1","start":2,"end":5}"#).unwrap();
	let unknown: MediaObject =
		serde_json::from_str(r#"{"objectId":"o2","mediatype":"HOLOGRAM"}"#).unwrap();

	assert_eq!(object.mediatype, MediaType::Video);
	assert_eq!(segment.object_id, "o1");
	assert_eq!(segment.end, 5.0);
	assert_eq!(unknown.mediatype, MediaType::Unknown);
}
