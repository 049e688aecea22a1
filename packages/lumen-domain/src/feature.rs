use serde::{Deserialize, Serialize};

/// A named similarity metric. The weight is mutable and only read at scoring time.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FeatureCategory {
	pub name: String,
	pub weight: f64,
}
impl FeatureCategory {
	pub fn new(name: impl Into<String>, weight: f64) -> Self {
		Self { name: name.into(), weight }
	}
}
