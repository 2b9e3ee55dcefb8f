//! Model validation errors.

use std::fmt;

use crate::geometry::GeometryKind;
use crate::types::ObjectTypeId;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when an object or context violates the model invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Team is not a valid index, neutral, or hostile.
    InvalidTeam { team: i32, team_count: u8 },

    /// Team count exceeds what the wire format can carry.
    InvalidTeamCount { team_count: u8, max: u8 },

    /// Precision is wider than the coordinate encoding supports.
    InvalidPrecision { bits: u8, max: u8 },

    /// Geometry has more points than allowed.
    TooManyPoints { count: usize, max: usize },

    /// Geometry point count does not fit the type's geometry kind.
    GeometryArity { kind: GeometryKind, count: usize },

    /// A coordinate was NaN or infinite.
    NonFiniteCoordinate { index: usize },

    /// Scalar index is not declared by the object type.
    UnknownScalar { type_id: ObjectTypeId, index: usize },

    /// Scalar value does not match the declared codec.
    ScalarTypeMismatch { type_id: ObjectTypeId, index: usize },

    /// Float scalar outside its declared range.
    ScalarOutOfRange { type_id: ObjectTypeId, index: usize },

    /// Number of scalars does not match the type table.
    ScalarCount {
        type_id: ObjectTypeId,
        expected: usize,
        actual: usize,
    },

    /// Raw type id with no entry in the type table.
    UnknownTypeId { raw: u8 },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTeam { team, team_count } => {
                write!(f, "invalid team {team} (team count {team_count})")
            }
            Self::InvalidTeamCount { team_count, max } => {
                write!(f, "team count {team_count} exceeds maximum {max}")
            }
            Self::InvalidPrecision { bits, max } => {
                write!(f, "precision of {bits} bits exceeds maximum {max}")
            }
            Self::TooManyPoints { count, max } => {
                write!(f, "geometry has {count} points, maximum is {max}")
            }
            Self::GeometryArity { kind, count } => {
                write!(f, "{kind} geometry cannot have {count} points")
            }
            Self::NonFiniteCoordinate { index } => {
                write!(f, "point {index} has a non-finite coordinate")
            }
            Self::UnknownScalar { type_id, index } => {
                write!(f, "{type_id} has no scalar {index}")
            }
            Self::ScalarTypeMismatch { type_id, index } => {
                write!(f, "{type_id} scalar {index} has the wrong value type")
            }
            Self::ScalarOutOfRange { type_id, index } => {
                write!(f, "{type_id} scalar {index} is out of range")
            }
            Self::ScalarCount {
                type_id,
                expected,
                actual,
            } => {
                write!(f, "{type_id} expects {expected} scalars, got {actual}")
            }
            Self::UnknownTypeId { raw } => write!(f, "unknown object type id {raw}"),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_team() {
        let err = ModelError::InvalidTeam {
            team: 5,
            team_count: 2,
        };
        assert_eq!(err.to_string(), "invalid team 5 (team count 2)");
    }

    #[test]
    fn display_arity_names_kind() {
        let err = ModelError::GeometryArity {
            kind: GeometryKind::Polygon,
            count: 2,
        };
        assert!(err.to_string().contains("polygon"));
    }

    #[test]
    fn display_scalar_names_type() {
        let err = ModelError::UnknownScalar {
            type_id: ObjectTypeId::Ship,
            index: 7,
        };
        assert!(err.to_string().contains("Ship"));
    }
}
