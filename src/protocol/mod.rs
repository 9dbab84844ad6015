//! Binary frame encoding.
//!
//! Pure, stateless serialization of protocol requests into exact wire
//! bytes. The encoder is the one place where byte-level correctness
//! matters, so it bypasses any client library and is the only constructor
//! of [`EncodedMessage`] values.

mod encode;
mod request;

pub use encode::{
    encode_int16, encode_int32, encode_nullable_string, encode_tagged_fields_empty, encode_uint32,
    to_hex, EMPTY_TAGGED_FIELDS, NULL_STRING_LEN,
};
pub use request::{
    api_versions_request, build_request, metadata_request, EncodedMessage, RequestFrame,
    API_KEY_API_VERSIONS, API_KEY_METADATA, DEFAULT_CLIENT_ID, LENGTH_PREFIX_SIZE,
    SHUTDOWN_CLIENT_ID,
};
