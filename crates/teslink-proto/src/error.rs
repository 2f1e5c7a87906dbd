//! Codec error types.

/// Errors raised while encoding or decoding wire payloads and metadata.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid length for {field}: expected {expected}, got {actual}")]
    InvalidFieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field} exceeds {max} bytes: got {actual}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("metadata tags must be strictly ascending")]
    MetadataTagOrder,

    #[error("metadata value exceeds 255 bytes")]
    MetadataValueTooLong,

    #[error("unsupported metadata tag: {0}")]
    UnsupportedTag(u8),
}
