//! Packed identity record and event verification.
//!
//! The packed record is the fixed-width binary summary of an event that the
//! ingest side builds once and the writer and storage engine read without
//! re-parsing JSON:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 32 | content id |
//! | 32 | 32 | author public key |
//! | 64 | 8 | `created_at` (little endian) |
//! | 72 | 8 | `kind` (little endian) |

use nostr::JsonUtil;
use thiserror::Error;

/// Length in bytes of a packed identity record.
pub const PACKED_EVENT_LEN: usize = 80;

/// Errors raised while verifying an event or reading a packed record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// The binary record does not have the expected length.
    #[error("packed record has length {0}, expected {PACKED_EVENT_LEN}")]
    BadLength(usize),

    /// The event JSON is not a well-formed event.
    #[error("malformed event: {0}")]
    Parse(String),

    /// The stated id is not the hash of the event content.
    #[error("event id does not match content")]
    IdMismatch,

    /// The signature does not verify against the author's key.
    #[error("bad signature")]
    BadSignature,
}

/// Parses event JSON and checks both its content id and its signature.
///
/// # Errors
///
/// Returns `EventError::Parse` for JSON that is not an event,
/// `EventError::IdMismatch` if the id is not the hash of
/// `[0, pubkey, created_at, kind, tags, content]`, and
/// `EventError::BadSignature` if the Schnorr signature is invalid.
pub fn verify_event(json: &str) -> Result<nostr::Event, EventError> {
    let event = nostr::Event::from_json(json).map_err(|e| EventError::Parse(e.to_string()))?;
    if !event.verify_id() {
        return Err(EventError::IdMismatch);
    }
    if !event.verify_signature() {
        return Err(EventError::BadSignature);
    }
    Ok(event)
}

/// The compact binary identity record of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedEvent {
    bytes: Vec<u8>,
}

impl PackedEvent {
    /// Wraps raw record bytes, checking only the layout length.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, EventError> {
        if bytes.len() != PACKED_EVENT_LEN {
            return Err(EventError::BadLength(bytes.len()));
        }
        Ok(Self { bytes })
    }

    /// Builds a record from raw fields.
    pub fn new(id: &[u8; 32], pubkey: &[u8; 32], created_at: u64, kind: u64) -> Self {
        let mut bytes = Vec::with_capacity(PACKED_EVENT_LEN);
        bytes.extend_from_slice(id);
        bytes.extend_from_slice(pubkey);
        bytes.extend_from_slice(&created_at.to_le_bytes());
        bytes.extend_from_slice(&kind.to_le_bytes());
        Self { bytes }
    }

    /// Builds a record from a parsed event.
    pub fn from_event(event: &nostr::Event) -> Self {
        Self::new(
            event.id.as_bytes(),
            event.pubkey.as_bytes(),
            event.created_at.as_u64(),
            u64::from(event.kind.as_u16()),
        )
    }

    /// The content id.
    pub fn id(&self) -> &[u8] {
        &self.bytes[0..32]
    }

    /// Lowercase hex of the content id, as sent in acknowledgements.
    pub fn id_hex(&self) -> String {
        hex::encode(self.id())
    }

    /// The author's public key.
    pub fn pubkey(&self) -> &[u8] {
        &self.bytes[32..64]
    }

    /// The author-supplied creation timestamp, in seconds.
    pub fn created_at(&self) -> u64 {
        read_u64(&self.bytes[64..72])
    }

    /// The event kind.
    pub fn kind(&self) -> u64 {
        read_u64(&self.bytes[72..80])
    }

    /// The raw record bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the record, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::{EventBuilder, Keys, Timestamp};
    use serde_json::Value;

    fn signed_event(content: &str) -> nostr::Event {
        EventBuilder::text_note(content)
            .custom_created_at(Timestamp::from(1_700_000_000))
            .sign_with_keys(&Keys::generate())
            .expect("should sign event")
    }

    fn tampered(event: &nostr::Event, field: &str, value: Value) -> String {
        let mut doc: Value = serde_json::from_str(&event.as_json()).unwrap();
        doc[field] = value;
        doc.to_string()
    }

    #[test]
    fn verified_event_packs_fields() {
        let event = verify_event(&signed_event("hello").as_json()).expect("event should verify");
        let packed = PackedEvent::from_event(&event);

        assert_eq!(packed.as_bytes().len(), PACKED_EVENT_LEN);
        assert_eq!(packed.id_hex(), event.id.to_hex());
        assert_eq!(hex::encode(packed.pubkey()), event.pubkey.to_hex());
        assert_eq!(packed.created_at(), 1_700_000_000);
        assert_eq!(packed.kind(), 1);
    }

    #[test]
    fn tampered_content_fails_verification() {
        let json = tampered(&signed_event("hello"), "content", Value::from("goodbye"));
        assert!(verify_event(&json).is_err());
    }

    #[test]
    fn forged_signature_fails_verification() {
        let event = signed_event("hello");
        let mut sig = event.sig.to_string();
        // Flip the last hex digit; the signature stays well-formed.
        let last = if sig.ends_with('0') { "1" } else { "0" };
        sig.replace_range(sig.len() - 1.., last);

        let json = tampered(&event, "sig", Value::from(sig));
        assert!(verify_event(&json).is_err());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(verify_event("not json"), Err(EventError::Parse(_))));
        assert!(matches!(
            verify_event(r#"{"kind":1}"#),
            Err(EventError::Parse(_))
        ));
    }

    #[test]
    fn from_bytes_checks_length() {
        let err = PackedEvent::from_bytes(vec![0u8; 79]).unwrap_err();
        assert_eq!(err, EventError::BadLength(79));
        assert_eq!(err.to_string(), "packed record has length 79, expected 80");

        let packed = PackedEvent::new(&[7u8; 32], &[9u8; 32], 42, 30023);
        let restored = PackedEvent::from_bytes(packed.clone().into_bytes()).unwrap();
        assert_eq!(restored, packed);
        assert_eq!(restored.created_at(), 42);
        assert_eq!(restored.kind(), 30023);
        assert_eq!(restored.id_hex(), "07".repeat(32));
    }
}
