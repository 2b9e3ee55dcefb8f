//! Error types for the replica registry and shadow store.

use std::fmt;

use codec::{CodecError, ObjectId};
use model::ModelError;

use crate::registry::ConnectionId;

/// Result type for replica operations.
pub type ReplicaResult<T> = Result<T, ReplicaError>;

/// Errors raised by the registry or the shadow store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaError {
    /// No registered object with this id.
    UnknownObject { id: ObjectId },

    /// No open connection with this id.
    UnknownConnection { connection: ConnectionId },

    /// The registry already holds `max_objects` objects.
    CapacityExceeded { max: usize },

    /// Every object id has been handed out.
    IdsExhausted,

    /// The connection used up its sequence space.
    SequenceExhausted { connection: ConnectionId },

    /// Encoding or decoding failed.
    Codec(CodecError),

    /// The object violates the model.
    Model(ModelError),
}

impl fmt::Display for ReplicaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownObject { id } => write!(f, "unknown object {id}"),
            Self::UnknownConnection { connection } => {
                write!(f, "unknown connection {connection}")
            }
            Self::CapacityExceeded { max } => {
                write!(f, "registry is full ({max} objects)")
            }
            Self::IdsExhausted => f.write_str("object ids exhausted"),
            Self::SequenceExhausted { connection } => {
                write!(f, "connection {connection} ran out of sequence numbers")
            }
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
        }
    }
}

impl std::error::Error for ReplicaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for ReplicaError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

impl From<ModelError> for ReplicaError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_names_the_object() {
        let err = ReplicaError::UnknownObject {
            id: ObjectId::new(12),
        };
        assert_eq!(err.to_string(), "unknown object #12");
    }

    #[test]
    fn codec_errors_keep_their_source() {
        let err: ReplicaError = CodecError::MalformedGeometry { count: 40 }.into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("40"));
    }
}
