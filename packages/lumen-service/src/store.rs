use std::collections::{BTreeMap, btree_map::Entry};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use lumen_domain::{
	FeatureCategory, MediaObject, MediaSegment, MediaType, ObjectScoreContainer, Similarity,
	WeightFunction,
};

/// What a similarity message did to the store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SimilarityOutcome {
	pub new_feature: bool,
	pub applied: usize,
	/// Values whose segment was not known yet. They are dropped, not buffered.
	pub unresolved: usize,
}

/// Per-session result collection.
///
/// Containers are created lazily on first reference and only disappear on `clear()`.
#[derive(Clone, Debug)]
pub struct ResultStore {
	objects: BTreeMap<String, ObjectScoreContainer>,
	segment_owners: AHashMap<String, String>,
	features: Vec<FeatureCategory>,
	media_types: BTreeMap<MediaType, bool>,
	default_feature_weight: f64,
}
impl ResultStore {
	pub fn new(default_feature_weight: f64) -> Self {
		Self {
			objects: BTreeMap::new(),
			segment_owners: AHashMap::new(),
			features: Vec::new(),
			media_types: BTreeMap::new(),
			default_feature_weight,
		}
	}

	pub fn object(&self, object_id: &str) -> Option<&ObjectScoreContainer> {
		self.objects.get(object_id)
	}

	pub fn objects(&self) -> impl Iterator<Item = &ObjectScoreContainer> {
		self.objects.values()
	}

	pub fn object_count(&self) -> usize {
		self.objects.len()
	}

	pub fn segment_count(&self) -> usize {
		self.objects.values().map(ObjectScoreContainer::segment_count).sum()
	}

	pub fn features(&self) -> &[FeatureCategory] {
		&self.features
	}

	pub fn media_types(&self) -> impl Iterator<Item = (MediaType, bool)> + '_ {
		self.media_types.iter().map(|(media_type, visible)| (*media_type, *visible))
	}

	/// Unknown types are visible.
	pub fn is_visible(&self, media_type: MediaType) -> bool {
		self.media_types.get(&media_type).copied().unwrap_or(true)
	}

	/// The object owning `segment_id`, if its segment descriptor has been seen.
	pub fn resolve(&self, segment_id: &str) -> Option<&str> {
		self.segment_owners.get(segment_id).map(String::as_str)
	}

	/// Attaches object descriptors, creating containers as needed.
	///
	/// The whole batch is checked before anything is applied. Returns how many descriptors were
	/// new.
	pub fn process_object_result(&mut self, objects: &[MediaObject]) -> Result<usize> {
		let mut pending: AHashMap<&str, &MediaObject> = AHashMap::new();

		for object in objects {
			if let Some(container) = self.objects.get(&object.object_id) {
				container.can_attach(object)?;
			}
			if let Some(previous) = pending.insert(object.object_id.as_str(), object)
				&& previous != object
			{
				return Err(lumen_domain::Error::DescriptorConflict { id: object.object_id.clone() }
					.into());
			}
		}

		let mut attached = 0;

		for object in objects {
			let container = self
				.objects
				.entry(object.object_id.clone())
				.or_insert_with(|| ObjectScoreContainer::new(object.object_id.clone()));

			if container.attach(object.clone())? {
				attached += 1;
			}

			self.media_types.entry(object.mediatype).or_insert(true);
		}

		Ok(attached)
	}

	/// Attaches segment descriptors under their owning objects and records the
	/// segment-to-object resolution.
	///
	/// A segment already known under another object is an integrity violation and rejects the
	/// whole batch. Returns how many descriptors were new.
	pub fn process_segment_result(&mut self, segments: &[MediaSegment]) -> Result<usize> {
		let mut pending: AHashMap<&str, &MediaSegment> = AHashMap::new();

		for segment in segments {
			if let Some(owner) = self.segment_owners.get(&segment.segment_id)
				&& *owner != segment.object_id
			{
				return Err(lumen_domain::Error::SegmentOwnerMismatch {
					segment_id: segment.segment_id.clone(),
					expected: owner.clone(),
					found: segment.object_id.clone(),
				}
				.into());
			}
			if let Some(existing) = self
				.objects
				.get(&segment.object_id)
				.and_then(|object| object.segment(&segment.segment_id))
			{
				existing.can_attach(segment)?;
			}
			if let Some(previous) = pending.insert(segment.segment_id.as_str(), segment)
				&& previous != segment
			{
				return Err(if previous.object_id != segment.object_id {
					lumen_domain::Error::SegmentOwnerMismatch {
						segment_id: segment.segment_id.clone(),
						expected: previous.object_id.clone(),
						found: segment.object_id.clone(),
					}
				} else {
					lumen_domain::Error::DescriptorConflict { id: segment.segment_id.clone() }
				}
				.into());
			}
		}

		let mut attached = 0;

		for segment in segments {
			let object = self
				.objects
				.entry(segment.object_id.clone())
				.or_insert_with(|| ObjectScoreContainer::new(segment.object_id.clone()));
			let container = object.segment_or_insert(&segment.segment_id, &segment.object_id)?;

			if container.attach(segment.clone())? {
				attached += 1;
			}

			self.segment_owners.insert(segment.segment_id.clone(), segment.object_id.clone());
		}

		Ok(attached)
	}

	/// Records raw values for `category`. Values for segments that have not been seen yet are
	/// dropped.
	pub fn process_similarity_result(
		&mut self,
		category: &str,
		similarities: &[Similarity],
	) -> SimilarityOutcome {
		let mut outcome =
			SimilarityOutcome { new_feature: self.register_feature(category), ..Default::default() };

		for similarity in similarities {
			let segment = self
				.segment_owners
				.get(&similarity.key)
				.and_then(|owner| self.objects.get_mut(owner))
				.and_then(|object| object.segment_mut(&similarity.key));
			let Some(segment) = segment else {
				tracing::trace!(
					segment_id = %similarity.key,
					category,
					"Dropped similarity for an unknown segment."
				);

				outcome.unresolved += 1;

				continue;
			};

			segment.record(category, similarity.value);

			outcome.applied += 1;
		}

		outcome
	}

	pub fn set_feature_weight(&mut self, name: &str, weight: f64) -> Result<()> {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::InvalidRequest {
				message: format!(
					"Feature weight must be a finite number of zero or more, got {weight}."
				),
			});
		}

		let feature = self
			.features
			.iter_mut()
			.find(|feature| feature.name == name)
			.ok_or_else(|| Error::UnknownFeature { name: name.to_string() })?;

		feature.weight = weight;

		Ok(())
	}

	pub fn reset_feature_weights(&mut self) {
		for feature in &mut self.features {
			feature.weight = self.default_feature_weight;
		}
	}

	/// Returns `true` when the flag changed.
	pub fn toggle_media_type(&mut self, media_type: MediaType, visible: bool) -> bool {
		match self.media_types.entry(media_type) {
			Entry::Occupied(mut entry) => {
				let changed = *entry.get() != visible;

				entry.insert(visible);

				changed
			},
			Entry::Vacant(entry) => {
				entry.insert(visible);

				!visible
			},
		}
	}

	/// Recomputes every container with `features` (the registered list when `None`).
	pub fn update_all(
		&mut self,
		features: Option<&[FeatureCategory]>,
		function: &dyn WeightFunction,
	) {
		let features = features.unwrap_or(&self.features);

		for object in self.objects.values_mut() {
			object.update(features, function);
		}
	}

	pub fn clear(&mut self) {
		self.objects.clear();
		self.segment_owners.clear();
		self.features.clear();
		self.media_types.clear();
	}

	pub fn snapshot(&self) -> StoreState {
		StoreState {
			features: self.features.clone(),
			media_types: self
				.media_types
				.iter()
				.map(|(media_type, visible)| MediaTypeVisibility {
					media_type: *media_type,
					visible: *visible,
				})
				.collect(),
			objects: self
				.objects
				.values()
				.map(|object| ObjectRecord {
					object_id: object.object_id().to_string(),
					descriptor: object.descriptor().cloned(),
					segments: object
						.segments()
						.map(|segment| SegmentRecord {
							segment_id: segment.segment_id().to_string(),
							descriptor: segment.descriptor().cloned(),
							scores: segment.raw_scores().clone(),
						})
						.collect(),
				})
				.collect(),
		}
	}

	/// Rebuilds a store from `state` through the same checked constructors live ingestion uses.
	///
	/// Cached scores are not part of the state; callers rerank afterwards.
	pub fn restore(state: StoreState, default_feature_weight: f64) -> Result<Self> {
		let mut store = Self::new(default_feature_weight);

		for feature in state.features {
			if !feature.weight.is_finite() || feature.weight < 0.0 {
				return Err(Error::Snapshot {
					message: format!("Feature {} has an invalid weight.", feature.name),
				});
			}
			if store.features.iter().any(|known| known.name == feature.name) {
				return Err(Error::Snapshot {
					message: format!("Feature {} is listed twice.", feature.name),
				});
			}

			store.features.push(feature);
		}
		for entry in state.media_types {
			store.media_types.insert(entry.media_type, entry.visible);
		}
		for record in state.objects {
			let mut object = ObjectScoreContainer::new(record.object_id.clone());

			if let Some(descriptor) = record.descriptor {
				object.attach(descriptor)?;
			}

			for segment_record in record.segments {
				let claimed_owner = segment_record
					.descriptor
					.as_ref()
					.map(|descriptor| descriptor.object_id.clone())
					.unwrap_or_else(|| record.object_id.clone());
				let segment = object.segment_or_insert(&segment_record.segment_id, &claimed_owner)?;

				if let Some(descriptor) = segment_record.descriptor {
					segment.attach(descriptor)?;
				}
				for (category, value) in segment_record.scores {
					segment.record(category, value);
				}

				if let Some(previous) = store
					.segment_owners
					.insert(segment_record.segment_id.clone(), record.object_id.clone())
				{
					return Err(lumen_domain::Error::SegmentOwnerMismatch {
						segment_id: segment_record.segment_id,
						expected: previous,
						found: record.object_id.clone(),
					}
					.into());
				}
			}

			if store.objects.insert(record.object_id.clone(), object).is_some() {
				return Err(Error::Snapshot {
					message: format!("Object {} is listed twice.", record.object_id),
				});
			}
		}

		Ok(store)
	}

	fn register_feature(&mut self, category: &str) -> bool {
		if self.features.iter().any(|feature| feature.name == category) {
			return false;
		}

		self.features.push(FeatureCategory::new(category, self.default_feature_weight));

		true
	}
}

/// Serializable content of a [`ResultStore`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct StoreState {
	pub features: Vec<FeatureCategory>,
	pub media_types: Vec<MediaTypeVisibility>,
	pub objects: Vec<ObjectRecord>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MediaTypeVisibility {
	pub media_type: MediaType,
	pub visible: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ObjectRecord {
	pub object_id: String,
	pub descriptor: Option<MediaObject>,
	pub segments: Vec<SegmentRecord>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SegmentRecord {
	pub segment_id: String,
	pub descriptor: Option<MediaSegment>,
	pub scores: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn segment(segment_id: &str, object_id: &str) -> MediaSegment {
		MediaSegment {
			segment_id: segment_id.to_string(),
			object_id: object_id.to_string(),
			start: 0.0,
			end: 1.0,
		}
	}

	#[test]
	fn toggling_an_unseen_type_only_changes_when_hiding() {
		let mut store = ResultStore::new(1.0);

		assert!(!store.toggle_media_type(MediaType::Audio, true));
		assert!(store.toggle_media_type(MediaType::Video, false));
		assert!(!store.toggle_media_type(MediaType::Video, false));
		assert!(!store.is_visible(MediaType::Video));
		assert!(store.is_visible(MediaType::Image));
	}

	#[test]
	fn segment_batch_with_conflicting_owners_is_rejected_whole() {
		let mut store = ResultStore::new(1.0);
		let batch = [segment("s1", "o1"), segment("s2", "o1"), segment("s1", "o2")];

		assert!(store.process_segment_result(&batch).is_err());
		assert_eq!(store.object_count(), 0);
		assert_eq!(store.resolve("s1"), None);
	}

	#[test]
	fn restore_rejects_duplicate_segments_across_objects() {
		let mut state = StoreState::default();

		for object_id in ["o1", "o2"] {
			state.objects.push(ObjectRecord {
				object_id: object_id.to_string(),
				descriptor: None,
				segments: vec![SegmentRecord {
					segment_id: "s1".to_string(),
					descriptor: None,
					scores: BTreeMap::new(),
				}],
			});
		}

		assert!(ResultStore::restore(state, 1.0).is_err());
	}
}
