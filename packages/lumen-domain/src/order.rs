use std::{cmp::Ordering, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, container::Scored};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	Ascending,
	#[default]
	Descending,
}
impl SortOrder {
	pub fn compare<T>(self, a: &T, b: &T) -> Ordering
	where
		T: Scored + ?Sized,
	{
		match self {
			Self::Ascending => score_ascending(a, b),
			Self::Descending => score_descending(a, b),
		}
	}
}

impl FromStr for SortOrder {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"ascending" => Ok(Self::Ascending),
			"descending" => Ok(Self::Descending),
			_ => Err(Error::UnknownVariant { kind: "sort order", value: value.to_string() }),
		}
	}
}

/// Ties, including incomparable scores, are `Equal`.
pub fn score_ascending<T>(a: &T, b: &T) -> Ordering
where
	T: Scored + ?Sized,
{
	a.score().partial_cmp(&b.score()).unwrap_or(Ordering::Equal)
}

pub fn score_descending<T>(a: &T, b: &T) -> Ordering
where
	T: Scored + ?Sized,
{
	score_ascending(b, a)
}
