//! Construction error types.

use std::fmt;

use model::{ModelError, ObjectTypeId};

/// Result type for entity construction.
pub type ConstructionResult<T> = Result<T, ConstructionError>;

/// Errors raised while building an object from level arguments.
///
/// Malformed numbers are never errors; they fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// Fewer positional arguments than the type requires.
    InsufficientArguments {
        type_id: ObjectTypeId,
        required: usize,
        found: usize,
    },

    /// A well-formed team number outside the declared teams.
    InvalidTeam { team: i32, team_count: u8 },

    /// A coordinate that is out of range once scaled by the grid size.
    CoordinateOutOfRange { token: String },

    /// The tag names no known object type.
    UnknownEntity { tag: String },

    /// The built object failed model validation.
    Model(ModelError),
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientArguments {
                type_id,
                required,
                found,
            } => {
                write!(
                    f,
                    "{type_id} needs at least {required} arguments, found {found}"
                )
            }
            Self::InvalidTeam { team, team_count } => {
                write!(f, "team {team} is not one of {team_count} declared teams")
            }
            Self::CoordinateOutOfRange { token } => {
                write!(f, "coordinate {token} is out of range at this grid size")
            }
            Self::UnknownEntity { tag } => write!(f, "unknown entity {tag:?}"),
            Self::Model(err) => write!(f, "model error: {err}"),
        }
    }
}

impl std::error::Error for ConstructionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for ConstructionError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidTeam { team, team_count } => Self::InvalidTeam { team, team_count },
            other => Self::Model(other),
        }
    }
}
