use std::collections::{BTreeMap, btree_map::Entry};

use crate::{
	Error, Result,
	descriptor::{MediaObject, MediaSegment},
	feature::FeatureCategory,
	weight::WeightFunction,
};

/// Anything the comparators can order.
pub trait Scored {
	fn score(&self) -> f64;
}

/// Scoring unit for one segment of a media object.
///
/// Raw per-category values are recorded as they arrive; the cached score only changes through
/// [`SegmentScoreContainer::update`].
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentScoreContainer {
	segment_id: String,
	object_id: String,
	descriptor: Option<MediaSegment>,
	scores: BTreeMap<String, f64>,
	score: f64,
}
impl SegmentScoreContainer {
	/// Builds a segment container for the object `owner_object_id`.
	///
	/// Fails when `object_id` disagrees with the owner; a segment is never constructed under the
	/// wrong object.
	pub fn for_owner(
		owner_object_id: &str,
		segment_id: impl Into<String>,
		object_id: impl Into<String>,
	) -> Result<Self> {
		let segment_id = segment_id.into();
		let object_id = object_id.into();

		if object_id != owner_object_id {
			return Err(Error::SegmentOwnerMismatch {
				segment_id,
				expected: owner_object_id.to_string(),
				found: object_id,
			});
		}

		Ok(Self { segment_id, object_id, descriptor: None, scores: BTreeMap::new(), score: 0.0 })
	}

	pub fn segment_id(&self) -> &str {
		&self.segment_id
	}

	pub fn object_id(&self) -> &str {
		&self.object_id
	}

	pub fn descriptor(&self) -> Option<&MediaSegment> {
		self.descriptor.as_ref()
	}

	pub fn raw_scores(&self) -> &BTreeMap<String, f64> {
		&self.scores
	}

	pub fn raw(&self, category: &str) -> Option<f64> {
		self.scores.get(category).copied()
	}

	/// Attaches the descriptor. Returns `false` when the identical descriptor was already present.
	pub fn attach(&mut self, descriptor: MediaSegment) -> Result<bool> {
		self.can_attach(&descriptor)?;

		if self.descriptor.is_some() {
			return Ok(false);
		}

		self.descriptor = Some(descriptor);

		Ok(true)
	}

	/// Checks whether [`SegmentScoreContainer::attach`] would succeed without mutating.
	pub fn can_attach(&self, descriptor: &MediaSegment) -> Result<()> {
		if descriptor.segment_id != self.segment_id {
			return Err(Error::DescriptorMismatch {
				expected: self.segment_id.clone(),
				found: descriptor.segment_id.clone(),
			});
		}
		if descriptor.object_id != self.object_id {
			return Err(Error::SegmentOwnerMismatch {
				segment_id: descriptor.segment_id.clone(),
				expected: self.object_id.clone(),
				found: descriptor.object_id.clone(),
			});
		}
		if let Some(existing) = &self.descriptor
			&& existing != descriptor
		{
			return Err(Error::DescriptorConflict { id: self.segment_id.clone() });
		}

		Ok(())
	}

	/// Records the raw value for `category`, replacing any earlier value for the same category.
	pub fn record(&mut self, category: impl Into<String>, value: f64) {
		self.scores.insert(category.into(), value);
	}

	pub fn update(&mut self, features: &[FeatureCategory], function: &dyn WeightFunction) {
		self.score = function.score_for_segment(features, self);
	}
}

impl Scored for SegmentScoreContainer {
	fn score(&self) -> f64 {
		self.score
	}
}

/// Aggregate scoring unit for one media object and all of its segments.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectScoreContainer {
	object_id: String,
	descriptor: Option<MediaObject>,
	segments: BTreeMap<String, SegmentScoreContainer>,
	score: f64,
}
impl ObjectScoreContainer {
	pub fn new(object_id: impl Into<String>) -> Self {
		Self { object_id: object_id.into(), descriptor: None, segments: BTreeMap::new(), score: 0.0 }
	}

	pub fn object_id(&self) -> &str {
		&self.object_id
	}

	pub fn descriptor(&self) -> Option<&MediaObject> {
		self.descriptor.as_ref()
	}

	pub fn segment(&self, segment_id: &str) -> Option<&SegmentScoreContainer> {
		self.segments.get(segment_id)
	}

	pub fn segment_mut(&mut self, segment_id: &str) -> Option<&mut SegmentScoreContainer> {
		self.segments.get_mut(segment_id)
	}

	pub fn segments(&self) -> impl Iterator<Item = &SegmentScoreContainer> {
		self.segments.values()
	}

	pub fn segment_count(&self) -> usize {
		self.segments.len()
	}

	/// Ready to be shown: the descriptor is known and at least one segment exists.
	pub fn is_ready(&self) -> bool {
		self.descriptor.is_some() && !self.segments.is_empty()
	}

	/// The best-scoring segment. Ties keep the lowest segment id.
	pub fn representative_segment(&self) -> Option<&SegmentScoreContainer> {
		self.segments.values().fold(None, |best: Option<&SegmentScoreContainer>, segment| {
			match best {
				Some(current) if current.score >= segment.score => Some(current),
				_ => Some(segment),
			}
		})
	}

	/// Attaches the descriptor. Returns `false` when the identical descriptor was already present.
	pub fn attach(&mut self, descriptor: MediaObject) -> Result<bool> {
		self.can_attach(&descriptor)?;

		if self.descriptor.is_some() {
			return Ok(false);
		}

		self.descriptor = Some(descriptor);

		Ok(true)
	}

	pub fn can_attach(&self, descriptor: &MediaObject) -> Result<()> {
		if descriptor.object_id != self.object_id {
			return Err(Error::DescriptorMismatch {
				expected: self.object_id.clone(),
				found: descriptor.object_id.clone(),
			});
		}
		if let Some(existing) = &self.descriptor
			&& existing != descriptor
		{
			return Err(Error::DescriptorConflict { id: self.object_id.clone() });
		}

		Ok(())
	}

	/// Returns the segment container for `segment_id`, creating it on first reference.
	///
	/// `object_id` is the owner claimed by the caller and must match this container.
	pub fn segment_or_insert(
		&mut self,
		segment_id: &str,
		object_id: &str,
	) -> Result<&mut SegmentScoreContainer> {
		if object_id != self.object_id {
			return Err(Error::SegmentOwnerMismatch {
				segment_id: segment_id.to_string(),
				expected: self.object_id.clone(),
				found: object_id.to_string(),
			});
		}
		let segment = match self.segments.entry(segment_id.to_string()) {
			Entry::Occupied(entry) => entry.into_mut(),
			Entry::Vacant(entry) => entry.insert(SegmentScoreContainer::for_owner(
				&self.object_id,
				segment_id,
				object_id,
			)?),
		};

		Ok(segment)
	}

	/// Recomputes every child segment first, then the object score from the fresh children.
	pub fn update(&mut self, features: &[FeatureCategory], function: &dyn WeightFunction) {
		for segment in self.segments.values_mut() {
			segment.update(features, function);
		}

		self.score = function.score_for_object(features, self);
	}
}

impl Scored for ObjectScoreContainer {
	fn score(&self) -> f64 {
		self.score
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::descriptor::MediaType;

	fn object(object_id: &str) -> MediaObject {
		MediaObject {
			object_id: object_id.to_string(),
			mediatype: MediaType::Video,
			name: format!("{object_id}.mp4"),
			path: format!("videos/{object_id}.mp4"),
		}
	}

	#[test]
	fn object_attach_is_idempotent_and_rejects_conflicts() {
		let mut container = ObjectScoreContainer::new("o1");

		assert!(container.attach(object("o1")).unwrap());
		assert!(!container.attach(object("o1")).unwrap());

		let mut renamed = object("o1");

		renamed.name = "other.mp4".to_string();

		assert_eq!(
			container.attach(renamed),
			Err(Error::DescriptorConflict { id: "o1".to_string() })
		);
		assert_eq!(container.descriptor().unwrap().name, "o1.mp4");
	}

	#[test]
	fn segment_attach_agrees_with_can_attach() {
		let mut container = SegmentScoreContainer::for_owner("o1", "s1", "o1").unwrap();
		let descriptor = MediaSegment {
			segment_id: "s1".to_string(),
			object_id: "o1".to_string(),
			start: 0.0,
			end: 2.0,
		};
		let mut shifted = descriptor.clone();

		shifted.start = 1.0;

		assert!(container.attach(descriptor.clone()).unwrap());
		assert_eq!(container.can_attach(&descriptor), Ok(()));
		assert!(!container.attach(descriptor).unwrap());
		assert_eq!(
			container.can_attach(&shifted),
			Err(Error::DescriptorConflict { id: "s1".to_string() })
		);
		assert_eq!(
			container.attach(shifted),
			Err(Error::DescriptorConflict { id: "s1".to_string() })
		);
		assert_eq!(container.descriptor().unwrap().start, 0.0);
	}

	#[test]
	fn segment_or_insert_reuses_existing_container() {
		let mut container = ObjectScoreContainer::new("o1");

		container.segment_or_insert("s1", "o1").unwrap().record("color", 0.5);
		container.segment_or_insert("s1", "o1").unwrap();

		assert_eq!(container.segment_count(), 1);
		assert_eq!(container.segment("s1").unwrap().raw("color"), Some(0.5));
	}
}
