use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
	Error,
	container::{ObjectScoreContainer, Scored, SegmentScoreContainer},
	feature::FeatureCategory,
};

/// Strategy that turns raw per-category values and category weights into container scores.
///
/// Implementations must be total: a container without segments or raw values scores `0.0`.
pub trait WeightFunction
where
	Self: fmt::Debug + Send + Sync,
{
	fn score_for_object(&self, features: &[FeatureCategory], object: &ObjectScoreContainer) -> f64;

	fn score_for_segment(
		&self,
		features: &[FeatureCategory],
		segment: &SegmentScoreContainer,
	) -> f64;
}

/// Maximum over the segments; segments use the weighted mean of the categories they carry.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultWeightFunction;

/// Mean over the segments that already scored above zero; segments as in
/// [`DefaultWeightFunction`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AverageWeightFunction;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightFunctionKind {
	#[default]
	Default,
	Average,
}
impl WeightFunctionKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Default => "default",
			Self::Average => "average",
		}
	}

	pub fn function(self) -> &'static dyn WeightFunction {
		match self {
			Self::Default => &DefaultWeightFunction,
			Self::Average => &AverageWeightFunction,
		}
	}
}

impl fmt::Display for WeightFunctionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for WeightFunctionKind {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"default" => Ok(Self::Default),
			"average" => Ok(Self::Average),
			_ => Err(Error::UnknownVariant { kind: "weight function", value: value.to_string() }),
		}
	}
}

impl WeightFunction for DefaultWeightFunction {
	fn score_for_object(&self, _: &[FeatureCategory], object: &ObjectScoreContainer) -> f64 {
		object.segments().map(Scored::score).reduce(f64::max).unwrap_or(0.0)
	}

	fn score_for_segment(
		&self,
		features: &[FeatureCategory],
		segment: &SegmentScoreContainer,
	) -> f64 {
		weighted_mean(features, segment)
	}
}

impl WeightFunction for AverageWeightFunction {
	fn score_for_object(&self, _: &[FeatureCategory], object: &ObjectScoreContainer) -> f64 {
		// Zero means "no similarity data yet" and must not drag the mean down.
		let (sum, count) = object
			.segments()
			.map(Scored::score)
			.filter(|score| *score > 0.0)
			.fold((0.0, 0_usize), |(sum, count), score| (sum + score, count + 1));

		if count == 0 { 0.0 } else { sum / count as f64 }
	}

	fn score_for_segment(
		&self,
		features: &[FeatureCategory],
		segment: &SegmentScoreContainer,
	) -> f64 {
		weighted_mean(features, segment)
	}
}

/// `Σ(value·weight) / Σ(weight)` over the categories present on the segment.
///
/// The denominator only counts categories the segment carries, so a missing category neither
/// raises nor lowers the mean. Weights are read on every call.
pub fn weighted_mean(features: &[FeatureCategory], segment: &SegmentScoreContainer) -> f64 {
	let mut weighted = 0.0;
	let mut total_weight = 0.0;

	for feature in features {
		let Some(value) = segment.raw(&feature.name) else {
			continue;
		};

		weighted += value * feature.weight;
		total_weight += feature.weight;
	}

	if total_weight > 0.0 { weighted / total_weight } else { 0.0 }
}
