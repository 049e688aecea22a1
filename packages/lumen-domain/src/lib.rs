//! Descriptors, feature categories, score containers, and the weight functions that score them.
//!
//! Everything here is synchronous and free of I/O. Containers are built lazily by the result
//! store and only change score through `update()`.

pub mod container;
pub mod descriptor;
pub mod feature;
pub mod order;
pub mod weight;

mod error;

pub use container::{ObjectScoreContainer, Scored, SegmentScoreContainer};
pub use descriptor::{MediaObject, MediaSegment, MediaType, Similarity};
pub use error::{Error, Result};
pub use feature::FeatureCategory;
pub use order::{SortOrder, score_ascending, score_descending};
pub use weight::{AverageWeightFunction, DefaultWeightFunction, WeightFunction, WeightFunctionKind};
