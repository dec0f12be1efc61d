//! Encoded envelopes
//!
//! An `EncodedResponse` is either an `EncodedMessage` (at least one transform
//! was applied) or the raw passthrough value. On the wire the two shapes are
//! told apart only by a non-empty `mxf` tag.

use super::model::Transform;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A message that has undergone encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedMessage {
    /// Sentinel set by the executor; non-empty on every encoded message
    #[serde(default)]
    pub mxf: String,
    /// Plaintext residue (everything outside the private paths)
    #[serde(default)]
    pub message: Value,
    /// Applied transforms, carrying bodies
    #[serde(default)]
    pub transforms: Vec<Transform>,
}

/// Result of encoding; can be decoded later
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedResponse {
    Encoded(EncodedMessage),
    Raw(Value),
}

impl EncodedResponse {
    /// Classify a JSON value: a well-formed envelope with a non-empty tag is
    /// `Encoded`, anything else is `Raw`
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<EncodedMessage>(value.clone()) {
            Ok(msg) if !msg.mxf.is_empty() => EncodedResponse::Encoded(msg),
            _ => EncodedResponse::Raw(value),
        }
    }

    pub fn is_encoded(&self) -> bool {
        matches!(self, EncodedResponse::Encoded(_))
    }

    pub fn encoded_message(&self) -> Option<&EncodedMessage> {
        match self {
            EncodedResponse::Encoded(msg) => Some(msg),
            EncodedResponse::Raw(_) => None,
        }
    }
}

impl Serialize for EncodedResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EncodedResponse::Encoded(msg) => msg.serialize(serializer),
            EncodedResponse::Raw(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EncodedResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(EncodedResponse::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::model::{Dsid, TransformBody};
    use serde_json::json;

    fn sample_envelope() -> EncodedMessage {
        EncodedMessage {
            mxf: "1".into(),
            message: json!({"customer": {"email": "a@example.com"}}),
            transforms: vec![Transform {
                context_path: "customer".into(),
                header: None,
                body: Some(TransformBody {
                    dsid: Dsid::new("dsid-1"),
                    encrypted_base64: "aGFuZGxl".into(),
                }),
            }],
        }
    }

    #[test]
    fn test_untagged_value_is_raw() {
        let resp: EncodedResponse =
            serde_json::from_str(r#"{"message": {"a": 1}, "transforms": []}"#).unwrap();
        assert!(!resp.is_encoded());

        let resp: EncodedResponse = serde_json::from_str(r#"[1, 2, 3]"#).unwrap();
        assert_eq!(resp, EncodedResponse::Raw(json!([1, 2, 3])));

        let resp: EncodedResponse = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(resp, EncodedResponse::Raw(json!("hello")));
    }

    #[test]
    fn test_empty_tag_is_raw() {
        let resp: EncodedResponse = serde_json::from_str(r#"{"mxf": "", "message": 1}"#).unwrap();
        assert!(matches!(resp, EncodedResponse::Raw(_)));
    }

    #[test]
    fn test_malformed_envelope_is_raw() {
        // Tag present but transforms are not transforms
        let raw = json!({"mxf": "1", "transforms": "nope"});
        let resp = EncodedResponse::from_value(raw.clone());
        assert_eq!(resp, EncodedResponse::Raw(raw));
    }

    #[test]
    fn test_tagged_value_is_encoded() {
        let env = sample_envelope();
        let bytes = serde_json::to_vec(&env).unwrap();
        let resp: EncodedResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(resp.encoded_message(), Some(&env));
    }

    #[test]
    fn test_serializes_as_exactly_one_shape() {
        let encoded = EncodedResponse::Encoded(sample_envelope());
        let v = serde_json::to_value(&encoded).unwrap();
        assert_eq!(v["mxf"], "1");
        assert!(v.get("Encoded").is_none());

        let raw = EncodedResponse::Raw(json!({"name": "bob"}));
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!({"name": "bob"}));
    }
}
