pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
	#[error(
		"Segment {segment_id} belongs to object {found} but was attached to object {expected}."
	)]
	SegmentOwnerMismatch { segment_id: String, expected: String, found: String },
	#[error("Descriptor for {found} cannot be attached to container {expected}.")]
	DescriptorMismatch { expected: String, found: String },
	#[error("Descriptor for {id} is already attached with different content.")]
	DescriptorConflict { id: String },
	#[error("Unknown {kind} {value:?}.")]
	UnknownVariant { kind: &'static str, value: String },
}
