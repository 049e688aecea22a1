use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use lumen_domain::{MediaObject, MediaSegment, Similarity};

/// Every inbound frame the backend can send, decoded once at the transport boundary.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "messageType", rename_all_fields = "camelCase")]
pub enum InboundMessage {
	#[serde(rename = "SESSION_START", alias = "QR_START")]
	SessionStart { query_id: String },
	#[serde(rename = "SESSION_END", alias = "QR_END")]
	SessionEnd { query_id: String },
	#[serde(rename = "OBJECT_RESULT", alias = "QR_OBJECT")]
	ObjectResult {
		query_id: String,
		#[serde(default)]
		count: Option<usize>,
		content: Vec<MediaObject>,
	},
	#[serde(rename = "SEGMENT_RESULT", alias = "QR_SEGMENT")]
	SegmentResult {
		query_id: String,
		#[serde(default)]
		count: Option<usize>,
		content: Vec<MediaSegment>,
	},
	#[serde(rename = "SIMILARITY_RESULT", alias = "QR_SIMILARITY")]
	SimilarityResult {
		query_id: String,
		category: String,
		#[serde(default)]
		count: Option<usize>,
		content: Vec<Similarity>,
	},
	#[serde(rename = "PING")]
	Ping {
		#[serde(default)]
		status: Option<String>,
	},
	#[serde(rename = "QUERY_ERROR", alias = "QR_ERROR")]
	QueryError {
		query_id: String,
		#[serde(default)]
		message: String,
	},
}
impl InboundMessage {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::SessionStart { .. } => "SESSION_START",
			Self::SessionEnd { .. } => "SESSION_END",
			Self::ObjectResult { .. } => "OBJECT_RESULT",
			Self::SegmentResult { .. } => "SEGMENT_RESULT",
			Self::SimilarityResult { .. } => "SIMILARITY_RESULT",
			Self::Ping { .. } => "PING",
			Self::QueryError { .. } => "QUERY_ERROR",
		}
	}

	pub fn query_id(&self) -> Option<&str> {
		match self {
			Self::SessionStart { query_id }
			| Self::SessionEnd { query_id }
			| Self::ObjectResult { query_id, .. }
			| Self::SegmentResult { query_id, .. }
			| Self::SimilarityResult { query_id, .. }
			| Self::QueryError { query_id, .. } => Some(query_id),
			Self::Ping { .. } => None,
		}
	}

	fn validate(&self) -> Result<()> {
		if let Some(query_id) = self.query_id()
			&& query_id.trim().is_empty()
		{
			return Err(Error::protocol(format!("{} carries an empty queryId.", self.kind())));
		}

		match self {
			Self::ObjectResult { count, content, .. } => {
				check_count(self.kind(), *count, content.len())?;

				if content.iter().any(|object| object.object_id.is_empty()) {
					return Err(Error::protocol("OBJECT_RESULT contains an empty objectId."));
				}
			},
			Self::SegmentResult { count, content, .. } => {
				check_count(self.kind(), *count, content.len())?;

				if content
					.iter()
					.any(|segment| segment.segment_id.is_empty() || segment.object_id.is_empty())
				{
					return Err(Error::protocol(
						"SEGMENT_RESULT contains an empty segmentId or objectId.",
					));
				}
			},
			Self::SimilarityResult { category, count, content, .. } => {
				check_count(self.kind(), *count, content.len())?;

				if category.trim().is_empty() {
					return Err(Error::protocol("SIMILARITY_RESULT carries an empty category."));
				}
				if content.iter().any(|similarity| !similarity.value.is_finite()) {
					return Err(Error::protocol("SIMILARITY_RESULT contains a non-finite value."));
				}
			},
			_ => {},
		}

		Ok(())
	}
}

/// Decodes and validates one text frame. Nothing downstream sees a message that failed here.
pub fn decode(frame: &str) -> Result<InboundMessage> {
	let message: InboundMessage = serde_json::from_str(frame)
		.map_err(|err| Error::protocol(format!("Undecodable frame: {err}.")))?;

	message.validate()?;

	Ok(message)
}

fn check_count(kind: &str, count: Option<usize>, len: usize) -> Result<()> {
	match count {
		Some(count) if count != len => Err(Error::protocol(format!(
			"{kind} announces {count} entries but carries {len}."
		))),
		_ => Ok(()),
	}
}

/// Requests sent to the backend.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "messageType")]
pub enum OutboundMessage {
	#[serde(rename = "Q_SIM")]
	Similarity(SimilarityQuery),
	#[serde(rename = "Q_MLT")]
	MoreLikeThis(MoreLikeThisQuery),
}
impl OutboundMessage {
	pub fn validate(&self) -> Result<()> {
		match self {
			Self::Similarity(query) => {
				if query.containers.is_empty() {
					return Err(invalid("A similarity query needs at least one container."));
				}

				for container in &query.containers {
					if container.terms.is_empty() {
						return Err(invalid("Every query container needs at least one term."));
					}
					if container.terms.iter().any(|term| term.categories.is_empty()) {
						return Err(invalid("Every query term needs at least one category."));
					}
				}
			},
			Self::MoreLikeThis(query) => {
				if query.segment_id.trim().is_empty() {
					return Err(invalid("A more-like-this query needs a segment id."));
				}
				if query.categories.is_empty() {
					return Err(invalid("A more-like-this query needs at least one category."));
				}
			},
		}

		Ok(())
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SimilarityQuery {
	pub containers: Vec<QueryContainer>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct QueryContainer {
	pub terms: Vec<QueryTerm>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct QueryTerm {
	#[serde(rename = "type")]
	pub kind: String,
	pub data: String,
	pub categories: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoreLikeThisQuery {
	pub segment_id: String,
	pub categories: Vec<String>,
}

fn invalid(message: &str) -> Error {
	Error::InvalidRequest { message: message.to_string() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_backend_names_decode_as_aliases() {
		let message = decode(r#"{"messageType":"QR_START","queryId":"q1"}"#).unwrap();

		assert_eq!(message, InboundMessage::SessionStart { query_id: "q1".to_string() });
	}

	#[test]
	fn ping_needs_no_query_id() {
		let message = decode(r#"{"messageType":"PING","status":"OK"}"#).unwrap();

		assert_eq!(message.query_id(), None);
	}

	#[test]
	fn unknown_kind_is_a_protocol_error() {
		let err = decode(r#"{"messageType":"QR_TELEPORT","queryId":"q1"}"#).unwrap_err();

		assert!(matches!(err, Error::Protocol { .. }));
	}

	#[test]
	fn count_mismatch_is_a_protocol_error() {
		let frame = r#"{"messageType":"SIMILARITY_RESULT","queryId":"q1","category":"color","count":2,"content":[{"key":"s1","value":0.5}]}"#;

		assert!(matches!(decode(frame), Err(Error::Protocol { .. })));
	}

	#[test]
	fn similarity_query_serializes_with_wire_tag() {
		let message = OutboundMessage::Similarity(SimilarityQuery {
			containers: vec![QueryContainer {
				terms: vec![QueryTerm {
					kind: "TEXT".to_string(),
					data: "sunset".to_string(),
					categories: vec!["ocr".to_string()],
				}],
			}],
		});
		let value = serde_json::to_value(&message).unwrap();

		assert_eq!(value["messageType"], "Q_SIM");
		assert_eq!(value["containers"][0]["terms"][0]["type"], "TEXT");
		assert!(message.validate().is_ok());
	}

	#[test]
	fn empty_queries_are_rejected() {
		let empty = OutboundMessage::Similarity(SimilarityQuery::default());
		let no_categories = OutboundMessage::MoreLikeThis(MoreLikeThisQuery {
			segment_id: "s1".to_string(),
			categories: Vec::new(),
		});

		assert!(matches!(empty.validate(), Err(Error::InvalidRequest { .. })));
		assert!(matches!(no_categories.validate(), Err(Error::InvalidRequest { .. })));
	}
}
