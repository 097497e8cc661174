//! Error types for the relay pipeline.
//!
//! `DispatchError` is the terminal taxonomy every command ends in when it does
//! not succeed; the other enums feed into it.

use std::error::Error as StdError;

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// A request body violated its command schema. Carries the first violation only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("\"{0}\" is required")]
    Required(String),

    #[error("\"{path}\" must be {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("\"{0}\" is not allowed to be empty")]
    Empty(String),

    #[error("\"{0}\" must be a valid GUID")]
    InvalidUuid(String),

    #[error("\"{path}\" with value \"{value}\" fails to match the SHA-256 hex digest pattern")]
    DigestPattern { path: String, value: String },

    #[error("\"{path}\" must be one of [{}]", .allowed.join(", "))]
    NotAllowed {
        path: String,
        allowed: &'static [&'static str],
    },

    #[error("\"{path}\" {reason}")]
    Malformed { path: String, reason: String },
}

impl ValidationError {
    /// Dotted path of the offending field (`"value"` for the body itself).
    pub fn path(&self) -> &str {
        match self {
            ValidationError::Required(path)
            | ValidationError::Empty(path)
            | ValidationError::InvalidUuid(path) => path,
            ValidationError::WrongType { path, .. }
            | ValidationError::DigestPattern { path, .. }
            | ValidationError::NotAllowed { path, .. }
            | ValidationError::Malformed { path, .. } => path,
        }
    }
}

/// Decoding failures while turning validated requests into content objects.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("\"{field}\" must be valid base64 text: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("\"{field}\" must be a hex encoded SHA-256 digest: {source}")]
    Digest {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
}

impl From<ContentError> for ValidationError {
    fn from(err: ContentError) -> Self {
        let (path, reason) = match &err {
            ContentError::Base64 { field, source } => {
                (*field, format!("must be valid base64 text ({source})"))
            }
            ContentError::Digest { field, source } => {
                (*field, format!("must decode to a 32 byte digest ({source})"))
            }
        };
        ValidationError::Malformed {
            path: path.to_string(),
            reason,
        }
    }
}

/// Failures raised by the messaging client behind an instance.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Instance \"{0}\" not found.")]
    UnknownInstance(String),

    #[error("Message \"{message_id}\" not found in conversation \"{conversation_id}\".")]
    MessageNotFound {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl ClientError {
    pub fn remote(message: impl Into<String>) -> Self {
        ClientError::Remote {
            message: message.into(),
            source: None,
        }
    }

    pub fn remote_with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        ClientError::Remote {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Terminal outcome of a command that did not succeed.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Instance \"{0}\" not found.")]
    InstanceNotFound(String),

    #[error("{message}")]
    Dispatch { message: String, trace: String },
}

impl DispatchError {
    /// HTTP status the gateway answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::Validation(_) => 422,
            DispatchError::InstanceNotFound(_) => 400,
            DispatchError::Dispatch { .. } => 500,
        }
    }

    pub fn from_client(err: ClientError) -> Self {
        DispatchError::Dispatch {
            message: err.to_string(),
            trace: render_trace(&err),
        }
    }
}

impl From<ContentError> for DispatchError {
    fn from(err: ContentError) -> Self {
        DispatchError::Validation(err.into())
    }
}

/// Renders an error and its whole source chain, one cause per line.
pub fn render_trace(err: &(dyn StdError + 'static)) -> String {
    let mut out = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n    caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[test]
    fn status_codes_follow_taxonomy() {
        let validation = DispatchError::from(ValidationError::Required("text".into()));
        assert_eq!(validation.status_code(), 422);
        assert_eq!(validation.to_string(), "Validation error: \"text\" is required");

        let missing = DispatchError::InstanceNotFound("abc".into());
        assert_eq!(missing.status_code(), 400);
        assert_eq!(missing.to_string(), "Instance \"abc\" not found.");

        let failed = DispatchError::from_client(ClientError::remote("backend offline"));
        assert_eq!(failed.status_code(), 500);
        assert_eq!(failed.to_string(), "backend offline");
    }

    #[test]
    fn trace_includes_source_chain() {
        let err = ClientError::remote_with_source("send failed", SocketClosed);
        let DispatchError::Dispatch { message, trace } = DispatchError::from_client(err) else {
            panic!("expected dispatch failure");
        };
        assert_eq!(message, "send failed");
        assert!(trace.contains("Remote"));
        assert!(trace.contains("caused by: socket closed"));
    }

    #[test]
    fn not_allowed_lists_values() {
        let err = ValidationError::NotAllowed {
            path: "type".into(),
            allowed: &["LIKE", "NONE"],
        };
        assert_eq!(err.to_string(), "\"type\" must be one of [LIKE, NONE]");
        assert_eq!(err.path(), "type");
    }
}
