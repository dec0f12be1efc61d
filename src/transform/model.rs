//! Transform model — what to protect and how
//!
//! A `Transform` anchors a header (the requested protection) or a body (the
//! executor's output) at a context path inside a message. Paths are opaque
//! here; only the executor interprets them.

use crate::error::{PrivateError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Encryption algorithm applied to private paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encryptor {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "AES-256")]
    Aes256,
}

/// Compression algorithm applied before encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compressor {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "zlib")]
    Zlib,
}

impl Encryptor {
    pub fn token(&self) -> &'static str {
        match self {
            Encryptor::None => "none",
            Encryptor::Aes256 => "AES-256",
        }
    }
}

impl Compressor {
    pub fn token(&self) -> &'static str {
        match self {
            Compressor::None => "none",
            Compressor::Zlib => "zlib",
        }
    }
}

/// Identifier of a data subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dsid(String);

impl Dsid {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short form for log lines
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for Dsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Dsid {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Dsid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Description of a transformation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformHeader {
    /// Paths that compose the data subject profile
    pub profile_paths: Vec<String>,
    /// Paths that select private data
    pub private_paths: Vec<String>,
    pub encryptor: Encryptor,
    pub compressor: Compressor,
}

/// Output of a transformation, present on encoded messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformBody {
    pub dsid: Dsid,
    pub encrypted_base64: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Where in the message the transform applies; header paths are relative
    /// to this
    pub context_path: String,
    #[serde(default)]
    pub header: Option<TransformHeader>,
    #[serde(default)]
    pub body: Option<TransformBody>,
}

impl Transform {
    /// Request-side transform at `context_path`
    pub fn new(context_path: impl Into<String>) -> Self {
        Self {
            context_path: context_path.into(),
            header: Some(TransformHeader::default()),
            body: None,
        }
    }

    pub fn profile_path(mut self, path: impl Into<String>) -> Self {
        self.header_mut().profile_paths.push(path.into());
        self
    }

    pub fn private_path(mut self, path: impl Into<String>) -> Self {
        self.header_mut().private_paths.push(path.into());
        self
    }

    pub fn encryptor(mut self, encryptor: Encryptor) -> Self {
        self.header_mut().encryptor = encryptor;
        self
    }

    pub fn compressor(mut self, compressor: Compressor) -> Self {
        self.header_mut().compressor = compressor;
        self
    }

    fn header_mut(&mut self) -> &mut TransformHeader {
        self.header.get_or_insert_with(TransformHeader::default)
    }

    /// A transform must describe a transformation or carry its result
    pub fn validate(&self) -> Result<()> {
        if self.header.is_none() && self.body.is_none() {
            return Err(PrivateError::InvalidArgument(format!(
                "transform at '{}' has neither header nor body",
                self.context_path
            )));
        }
        if let Some(body) = &self.body {
            if body.dsid.is_empty() {
                return Err(PrivateError::InvalidArgument(format!(
                    "transform at '{}' has a body with an empty DSID",
                    self.context_path
                )));
            }
        }
        Ok(())
    }
}

/// Request to encode a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeRequest {
    pub message: Value,
    pub transforms: Vec<Transform>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_algorithm_tokens() {
        assert_eq!(serde_json::to_value(Encryptor::Aes256).unwrap(), json!("AES-256"));
        assert_eq!(serde_json::to_value(Encryptor::None).unwrap(), json!("none"));
        assert_eq!(serde_json::to_value(Compressor::Zlib).unwrap(), json!("zlib"));
        assert_eq!(Encryptor::Aes256.token(), "AES-256");

        let c: Compressor = serde_json::from_value(json!("none")).unwrap();
        assert_eq!(c, Compressor::None);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        assert!(serde_json::from_value::<Encryptor>(json!("DES")).is_err());
        assert!(serde_json::from_value::<Compressor>(json!("gzip")).is_err());

        let header = json!({
            "profile_paths": [],
            "private_paths": ["ssn"],
            "encryptor": "aes-256",
            "compressor": "none",
        });
        assert!(serde_json::from_value::<TransformHeader>(header).is_err());
    }

    #[test]
    fn test_transform_wire_shape() {
        let t = Transform::new("customer")
            .profile_path("email")
            .private_path("ssn")
            .encryptor(Encryptor::Aes256)
            .compressor(Compressor::Zlib);
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(
            v,
            json!({
                "context_path": "customer",
                "header": {
                    "profile_paths": ["email"],
                    "private_paths": ["ssn"],
                    "encryptor": "AES-256",
                    "compressor": "zlib",
                },
                "body": null,
            })
        );
    }

    #[test]
    fn test_response_side_transform_parses_without_header() {
        let t: Transform = serde_json::from_value(json!({
            "context_path": "",
            "body": {"dsid": "dsid-1", "encrypted_base64": "AAAA"},
        }))
        .unwrap();
        assert!(t.header.is_none());
        assert_eq!(t.body.unwrap().dsid.as_str(), "dsid-1");
    }

    #[test]
    fn test_validate() {
        assert!(Transform::new("").private_path("a").validate().is_ok());

        let empty = Transform {
            context_path: "x".into(),
            header: None,
            body: None,
        };
        assert!(matches!(empty.validate(), Err(PrivateError::InvalidArgument(_))));

        let bad_body = Transform {
            context_path: "x".into(),
            header: None,
            body: Some(TransformBody {
                dsid: Dsid::default(),
                encrypted_base64: String::new(),
            }),
        };
        assert!(bad_body.validate().is_err());
    }

    #[test]
    fn test_dsid_short() {
        assert_eq!(Dsid::new("abcdefghijkl").short(), "abcdefgh");
        assert_eq!(Dsid::new("abc").short(), "abc");
        assert_eq!(serde_json::to_value(Dsid::new("x")).unwrap(), json!("x"));
    }
}
