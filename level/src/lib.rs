//! Level loading and entity construction for ghostwire.
//!
//! Turns level-file text into [`NetworkObject`](model::NetworkObject)s ready
//! for registration:
//! - [`parse`] builds one object from a tag and its raw argument tokens
//! - [`load_level`] reads a whole level, handling directives and comments
//! - [`MessageSink`] receives the success and error strings meant for users
//!
//! Construction is lenient by default: unknown named parameters are ignored
//! and malformed numbers fall back to defaults, so levels written for newer
//! or older versions still load.

mod construct;
mod context;
mod error;
mod loader;
mod sink;

pub use construct::{is_named_token, parse, read_polygon};
pub use context::{LevelContext, DEFAULT_GRID_SIZE, DEFAULT_TEAM_COUNT};
pub use error::{ConstructionError, ConstructionResult};
pub use loader::{load_level, LoadWarning, LoadedLevel, TeamDecl};
pub use sink::{LogSink, MessageLevel, MessageSink, VecSink};
