//! Request frames and the length-prefixed message builder.
//!
//! A request message on the wire:
//!
//! ```text
//! ┌──────────┬─────────┬─────────────┬────────────────┬───────────┬──────┐
//! │ length   │ api_key │ api_version │ correlation_id │ client_id │ ...  │
//! │ 4 bytes  │ 2 bytes │ 2 bytes     │ 4 bytes        │ nullable  │ body │
//! │ uint32 BE│ int16 BE│ int16 BE    │ int32 BE       │ string    │      │
//! └──────────┴─────────┴─────────────┴────────────────┴───────────┴──────┘
//! ```
//!
//! plus a one-byte empty tagged-field section between `client_id` and the
//! body. The length prefix counts everything after itself.

use bytes::Bytes;

use super::encode::{
    encode_int16, encode_int32, encode_nullable_string, encode_tagged_fields_empty, encode_uint32,
    to_hex,
};
use crate::error::Result;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// API key of an ApiVersions request.
pub const API_KEY_API_VERSIONS: i16 = 18;

/// API key of a Metadata request.
pub const API_KEY_METADATA: i16 = 3;

/// Client id sent by the basic request/response check.
pub const DEFAULT_CLIENT_ID: &str = "test-client";

/// Client id sent by clients in the graceful-shutdown check.
pub const SHUTDOWN_CLIENT_ID: &str = "shutdown-test-client";

/// One logical protocol request before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    /// Identifies the request type (18 = ApiVersions, 3 = Metadata).
    pub api_key: i16,
    /// Version of the request schema.
    pub api_version: i16,
    /// Caller-chosen id a well-behaved broker must echo back.
    pub correlation_id: i32,
    /// Optional client id. `None` encodes as the null marker, which is
    /// distinct from an empty string.
    pub client_id: Option<String>,
    /// Request-type-specific body, possibly empty.
    pub body: Bytes,
}

impl RequestFrame {
    /// Serialize into a length-prefixed [`EncodedMessage`].
    pub fn encode(&self) -> Result<EncodedMessage> {
        build_request(
            i64::from(self.api_key),
            i64::from(self.api_version),
            i64::from(self.correlation_id),
            self.client_id.as_deref(),
            &self.body,
        )
    }
}

/// An immutable, fully serialized message: 4-byte big-endian unsigned
/// length prefix followed by header and body.
///
/// Invariant: the prefix always equals the byte length of everything that
/// follows it. [`build_request`] is the only constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage(Bytes);

impl EncodedMessage {
    /// The full message bytes, prefix included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Total message size in bytes, prefix included.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True only for a message with an empty byte sequence; never the
    /// case for a built request (the prefix alone is 4 bytes).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The length declared by the 4-byte prefix.
    pub fn declared_len(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Lowercase hex dump of the full message.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

/// Build a complete length-prefixed request message.
///
/// Concatenates `int16(api_key) || int16(api_version) ||
/// int32(correlation_id) || nullable_string(client_id) ||
/// tagged_fields_empty() || body`, then prepends the uint32 byte length
/// of that concatenation.
///
/// Guarantee: `message[0..4]` decoded as big-endian unsigned equals
/// `message.len() - 4` exactly.
///
/// # Errors
///
/// Returns [`HarnessError::Encoding`](crate::HarnessError::Encoding) if
/// any value is out of range for its wire type.
pub fn build_request(
    api_key: i64,
    api_version: i64,
    correlation_id: i64,
    client_id: Option<&str>,
    body: &[u8],
) -> Result<EncodedMessage> {
    let mut payload = Vec::with_capacity(16 + body.len());
    payload.extend_from_slice(&encode_int16(api_key)?);
    payload.extend_from_slice(&encode_int16(api_version)?);
    payload.extend_from_slice(&encode_int32(correlation_id)?);
    payload.extend_from_slice(&encode_nullable_string(client_id)?);
    payload.extend_from_slice(&encode_tagged_fields_empty());
    payload.extend_from_slice(body);

    let mut message = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    message.extend_from_slice(&encode_uint32(payload.len() as u64)?);
    message.extend_from_slice(&payload);
    Ok(EncodedMessage(Bytes::from(message)))
}

/// Build an ApiVersions request (api_key = 18, version 1).
///
/// Carries a non-null client id and an empty body. This is the request a
/// real client typically sends first, so it is the harness's default
/// probe frame.
pub fn api_versions_request(correlation_id: i32, client_id: &str) -> Result<EncodedMessage> {
    build_request(
        i64::from(API_KEY_API_VERSIONS),
        1,
        i64::from(correlation_id),
        Some(client_id),
        &[],
    )
}

/// Build a Metadata request (api_key = 3, version 1).
///
/// Carries a *null* client id — exercising the null-string decode path —
/// and a body consisting solely of a 4-byte signed topic count of zero
/// ("no topics requested").
pub fn metadata_request(correlation_id: i32) -> Result<EncodedMessage> {
    let body = encode_int32(0)?;
    build_request(
        i64::from(API_KEY_METADATA),
        1,
        i64::from(correlation_id),
        None,
        &body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_prefix_matches_remainder() {
        let msg = build_request(18, 1, 1, Some("test-client"), &[]).unwrap();
        assert_eq!(msg.declared_len() as usize, msg.len() - LENGTH_PREFIX_SIZE);
    }

    #[test]
    fn test_api_versions_worked_example() {
        // (api_key=18, api_version=1, correlation_id=1, "test-client"):
        // header = 2 + 2 + 4 + (2 + 11) + 1 = 22 bytes, total 26.
        let msg = api_versions_request(1, DEFAULT_CLIENT_ID).unwrap();
        assert_eq!(msg.declared_len(), 22);
        assert_eq!(msg.len(), 26);

        let bytes = msg.as_bytes();
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x00, 0x16]); // length = 22
        assert_eq!(&bytes[4..6], &[0x00, 0x12]); // api_key = 18
        assert_eq!(&bytes[6..8], &[0x00, 0x01]); // api_version = 1
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x00, 0x01]); // correlation_id
        assert_eq!(&bytes[12..14], &[0x00, 0x0B]); // client_id len = 11
        assert_eq!(&bytes[14..25], b"test-client");
        assert_eq!(bytes[25], 0x00); // empty tagged fields
    }

    #[test]
    fn test_metadata_worked_example() {
        // (api_key=3, api_version=1, correlation_id=2, null client_id,
        // body = int32 topic count 0): 2 + 2 + 4 + 2 + 0 + 1 + 4 = 15,
        // total 19.
        let msg = metadata_request(2).unwrap();
        assert_eq!(msg.declared_len(), 15);
        assert_eq!(msg.len(), 19);

        let bytes = msg.as_bytes();
        assert_eq!(&bytes[4..6], &[0x00, 0x03]); // api_key = 3
        assert_eq!(&bytes[12..14], &[0xFF, 0xFF]); // null client_id
        assert_eq!(bytes[14], 0x00); // empty tagged fields
        assert_eq!(&bytes[15..19], &[0x00, 0x00, 0x00, 0x00]); // topic count
    }

    #[test]
    fn test_length_prefix_holds_across_inputs() {
        let cases: &[(i64, i64, i64, Option<&str>, &[u8])] = &[
            (18, 1, 1, Some("test-client"), &[]),
            (3, 1, 2, None, &[0, 0, 0, 0]),
            (18, 0, i64::from(i32::MAX), Some(""), &[]),
            (3, 4, -7, Some("x"), &[1, 2, 3, 4, 5]),
            (0, 0, 0, None, &[]),
        ];
        for &(key, version, corr, client, body) in cases {
            let msg = build_request(key, version, corr, client, body).unwrap();
            assert_eq!(
                msg.declared_len() as usize,
                msg.len() - LENGTH_PREFIX_SIZE,
                "prefix mismatch for api_key={key}"
            );
        }
    }

    #[test]
    fn test_null_and_empty_client_id_differ() {
        let with_empty = build_request(18, 1, 1, Some(""), &[]).unwrap();
        let with_null = build_request(18, 1, 1, None, &[]).unwrap();
        assert_ne!(with_empty.as_bytes(), with_null.as_bytes());
        assert_eq!(with_empty.declared_len(), 11); // 2+2+4+2+0+1
        assert_eq!(with_null.declared_len(), 11); // same size, different bytes
        assert_eq!(&with_empty.as_bytes()[12..14], &[0x00, 0x00]);
        assert_eq!(&with_null.as_bytes()[12..14], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_out_of_range_api_key_rejected() {
        assert!(build_request(i64::from(i16::MAX) + 1, 1, 1, None, &[]).is_err());
        assert!(build_request(18, 1, i64::from(i32::MAX) + 1, None, &[]).is_err());
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let a = api_versions_request(1, DEFAULT_CLIENT_ID).unwrap();
        let b = api_versions_request(1, DEFAULT_CLIENT_ID).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let frame = RequestFrame {
            api_key: API_KEY_METADATA,
            api_version: 1,
            correlation_id: 2,
            client_id: None,
            body: Bytes::from_static(&[0, 0, 0, 0]),
        };
        assert_eq!(
            frame.encode().unwrap().as_bytes(),
            frame.encode().unwrap().as_bytes()
        );
    }

    #[test]
    fn test_request_frame_matches_free_function() {
        let frame = RequestFrame {
            api_key: API_KEY_API_VERSIONS,
            api_version: 1,
            correlation_id: 1,
            client_id: Some(DEFAULT_CLIENT_ID.to_string()),
            body: Bytes::new(),
        };
        let from_frame = frame.encode().unwrap();
        let from_builder = api_versions_request(1, DEFAULT_CLIENT_ID).unwrap();
        assert_eq!(from_frame.as_bytes(), from_builder.as_bytes());
    }

    #[test]
    fn test_hex_dump_of_metadata_request() {
        let msg = metadata_request(2).unwrap();
        assert_eq!(msg.to_hex(), "0000000f0003000100000002ffff0000000000");
    }
}
