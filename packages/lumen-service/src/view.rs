use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{session::QuerySession, store::ResultStore};
use lumen_domain::{FeatureCategory, MediaType, Scored, SortOrder};

/// Read-only ranking handed to subscribers. It owns its data; nothing in it points back into the
/// engine.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ResultView {
	pub query_id: Option<String>,
	pub active: bool,
	pub objects: Vec<RankedObject>,
	pub features: Vec<FeatureCategory>,
	pub media_types: Vec<MediaTypeSummary>,
}
impl ResultView {
	/// Ready objects of visible media types, ordered by `order`. Segments follow the same order.
	pub fn build(session: &QuerySession, store: &ResultStore, order: SortOrder) -> Self {
		let mut counts: BTreeMap<MediaType, usize> = BTreeMap::new();
		let mut objects = Vec::new();

		for object in store.objects() {
			let Some(descriptor) = object.descriptor() else {
				continue;
			};

			*counts.entry(descriptor.mediatype).or_default() += 1;

			if !object.is_ready() || !store.is_visible(descriptor.mediatype) {
				continue;
			}

			let mut segments = object
				.segments()
				.map(|segment| RankedSegment {
					segment_id: segment.segment_id().to_string(),
					start: segment.descriptor().map(|descriptor| descriptor.start).unwrap_or(0.0),
					end: segment.descriptor().map(|descriptor| descriptor.end).unwrap_or(0.0),
					score: segment.score(),
					scores: segment.raw_scores().clone(),
				})
				.collect::<Vec<_>>();

			segments.sort_by(|a, b| order.compare(a, b));

			objects.push(RankedObject {
				object_id: object.object_id().to_string(),
				mediatype: descriptor.mediatype,
				name: descriptor.name.clone(),
				path: descriptor.path.clone(),
				score: object.score(),
				representative_segment: object
					.representative_segment()
					.map(|segment| segment.segment_id().to_string()),
				segments,
			});
		}

		objects.sort_by(|a, b| order.compare(a, b));

		let media_types = store
			.media_types()
			.map(|(media_type, visible)| MediaTypeSummary {
				media_type,
				visible,
				objects: counts.get(&media_type).copied().unwrap_or(0),
			})
			.collect();

		Self {
			query_id: session.query_id().map(str::to_string),
			active: session.is_active(),
			objects,
			features: store.features().to_vec(),
			media_types,
		}
	}

	pub fn object_ids(&self) -> Vec<&str> {
		self.objects.iter().map(|object| object.object_id.as_str()).collect()
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RankedObject {
	pub object_id: String,
	pub mediatype: MediaType,
	pub name: String,
	pub path: String,
	pub score: f64,
	pub representative_segment: Option<String>,
	pub segments: Vec<RankedSegment>,
}

impl Scored for RankedObject {
	fn score(&self) -> f64 {
		self.score
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RankedSegment {
	pub segment_id: String,
	pub start: f64,
	pub end: f64,
	pub score: f64,
	pub scores: BTreeMap<String, f64>,
}

impl Scored for RankedSegment {
	fn score(&self) -> f64 {
		self.score
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MediaTypeSummary {
	pub media_type: MediaType,
	pub visible: bool,
	pub objects: usize,
}
