use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
	Image,
	ImageSequence,
	Video,
	Audio,
	Model3d,
	#[serde(other)]
	Unknown,
}
impl MediaType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Image => "IMAGE",
			Self::ImageSequence => "IMAGE_SEQUENCE",
			Self::Video => "VIDEO",
			Self::Audio => "AUDIO",
			Self::Model3d => "MODEL3D",
			Self::Unknown => "UNKNOWN",
		}
	}
}

impl fmt::Display for MediaType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for MediaType {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_uppercase().as_str() {
			"IMAGE" => Ok(Self::Image),
			"IMAGE_SEQUENCE" => Ok(Self::ImageSequence),
			"VIDEO" => Ok(Self::Video),
			"AUDIO" => Ok(Self::Audio),
			"MODEL3D" => Ok(Self::Model3d),
			_ => Err(Error::UnknownVariant { kind: "media type", value: value.to_string() }),
		}
	}
}

/// Descriptor of one media object as announced by the backend.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaObject {
	pub object_id: String,
	pub mediatype: MediaType,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub path: String,
}

/// Descriptor of one segment. `object_id` names the owning media object.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSegment {
	pub segment_id: String,
	pub object_id: String,
	#[serde(default)]
	pub start: f64,
	#[serde(default)]
	pub end: f64,
}

/// One raw score for one feature category; `key` is a segment id.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Similarity {
	pub key: String,
	pub value: f64,
}
