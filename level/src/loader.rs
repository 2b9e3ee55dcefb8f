//! Level-file loader.
//!
//! A level is line oriented text. Each line is split on whitespace; `#`
//! starts a comment. The first token is either a directive or an entity tag.
//!
//! ```text
//! GridSize 255
//! Team Blue 0 0 1
//! Team Red 1 0 0
//! SlipZone 0.4 0 0 4 0 4 4
//! LoadoutZone 1 10 10 12 10 12 12
//! ```
//!
//! Directives are read before any entity, so `GridSize` and `Team` lines may
//! appear anywhere. A line that fails to build is skipped with a warning.

use std::fmt;

use model::{NetworkObject, MAX_TEAMS};

use crate::construct::parse;
use crate::context::LevelContext;
use crate::error::ConstructionError;
use crate::sink::{MessageLevel, MessageSink};

/// Directives that carry no replicated state.
const IGNORED_DIRECTIVES: &[&str] = &[
    "LevelDescription",
    "LevelCredits",
    "Script",
    "MinPlayers",
    "MaxPlayers",
];

/// A declared team.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamDecl {
    pub name: String,
    pub color: [f32; 3],
}

/// A skipped or partially applied line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadWarning {
    /// One-based line number.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Result of loading a level.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadedLevel {
    pub name: Option<String>,
    pub objects: Vec<NetworkObject>,
    pub warnings: Vec<LoadWarning>,
    pub teams: Vec<TeamDecl>,
    pub team_count: u8,
    pub grid_size: f32,
}

impl LoadedLevel {
    /// Context the level's entities were built with.
    #[must_use]
    pub const fn context(&self, precision_bits: u8) -> LevelContext {
        LevelContext::new(self.grid_size, self.team_count, precision_bits)
    }
}

struct Line<'a> {
    number: usize,
    tokens: Vec<&'a str>,
}

fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    text.lines().enumerate().filter_map(|(index, raw)| {
        let content = raw.split_once('#').map_or(raw, |(before, _)| before);
        let tokens: Vec<&str> = content.split_whitespace().collect();
        (!tokens.is_empty()).then_some(Line {
            number: index + 1,
            tokens,
        })
    })
}

#[derive(Default)]
struct Warnings(Vec<LoadWarning>);

impl Warnings {
    fn push(&mut self, line: usize, message: impl Into<String>, sink: &mut dyn MessageSink) {
        let warning = LoadWarning {
            line,
            message: message.into(),
        };
        log::warn!("{warning}");
        sink.display(MessageLevel::Error, &warning.to_string());
        self.0.push(warning);
    }
}

/// Loads every entity in `text`.
///
/// `ctx` supplies the precision and the defaults for grid size and team
/// count; `GridSize` and `Team` directives override them. Never fails: bad
/// lines become warnings, also reported through `sink`.
pub fn load_level(text: &str, ctx: &LevelContext, sink: &mut dyn MessageSink) -> LoadedLevel {
    let mut warnings = Warnings::default();
    let mut grid_size = ctx.grid_size;
    let mut teams = Vec::new();
    let mut name = None;

    for line in lines(text) {
        match line.tokens[0] {
            "GridSize" => match line.tokens.get(1).and_then(|t| t.parse::<f32>().ok()) {
                Some(size) if size.is_finite() && size > 0.0 => grid_size = size,
                _ => warnings.push(line.number, "invalid GridSize", sink),
            },
            "Team" => {
                let Some(team_name) = line.tokens.get(1) else {
                    warnings.push(line.number, "Team needs a name", sink);
                    continue;
                };
                if teams.len() >= usize::from(MAX_TEAMS) {
                    warnings.push(
                        line.number,
                        format!("team {team_name} ignored, at most {MAX_TEAMS} teams"),
                        sink,
                    );
                    continue;
                }
                let mut color = [0.0; 3];
                for (slot, token) in color.iter_mut().zip(line.tokens.iter().skip(2)) {
                    *slot = token.parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
                }
                teams.push(TeamDecl {
                    name: (*team_name).to_owned(),
                    color,
                });
            }
            "LevelName" => name = Some(line.tokens[1..].join(" ")),
            _ => {}
        }
    }

    let team_count = if teams.is_empty() {
        ctx.team_count
    } else {
        teams.len() as u8
    };
    let build_ctx = LevelContext::new(grid_size, team_count, ctx.precision_bits);

    let mut objects = Vec::new();
    for line in lines(text) {
        let tag = line.tokens[0];
        if is_directive(tag) {
            continue;
        }
        match parse(tag, &line.tokens[1..], &build_ctx) {
            Ok(object) => objects.push(object),
            Err(ConstructionError::UnknownEntity { .. }) => {
                warnings.push(line.number, format!("unknown entity {tag}"), sink);
            }
            Err(err) => warnings.push(line.number, format!("{tag}: {err}"), sink),
        }
    }

    let level = LoadedLevel {
        name,
        objects,
        warnings: warnings.0,
        teams,
        team_count,
        grid_size,
    };
    log::debug!(
        "loaded {} objects with {} warnings",
        level.objects.len(),
        level.warnings.len()
    );
    sink.display(
        MessageLevel::Success,
        &format!("loaded {} objects", level.objects.len()),
    );
    level
}

fn is_directive(tag: &str) -> bool {
    matches!(tag, "GridSize" | "Team" | "LevelName")
        || IGNORED_DIRECTIVES.contains(&tag)
        || tag.ends_with("GameType")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;
    use model::{ObjectTypeId, Point, Team};

    const LEVEL: &str = "\
# test arena
LevelName Slip Arena
CTFGameType 8 5
GridSize 10
Team Blue 0 0 1
Team Red 1 0 0
Team Green 0 1 0

SlipZone 0.4 0 0 4 0 4 4   # odd count: slip amount first
LoadoutZone 2 1 1 2 1 2 2
GoalZone 1 0 0 1 0 1 1 Flag=yes
Ship 0 3 3
";

    #[test]
    fn loads_entities_with_directives() {
        let mut sink = VecSink::new();
        let level = load_level(LEVEL, &LevelContext::default(), &mut sink);
        assert_eq!(level.name.as_deref(), Some("Slip Arena"));
        assert_eq!(level.grid_size, 10.0);
        assert_eq!(level.team_count, 3);
        assert_eq!(level.teams[1].name, "Red");
        assert_eq!(level.teams[1].color, [1.0, 0.0, 0.0]);
        assert!(level.warnings.is_empty(), "{:?}", level.warnings);

        let types: Vec<_> = level.objects.iter().map(NetworkObject::type_id).collect();
        assert_eq!(
            types,
            vec![
                ObjectTypeId::SlipZone,
                ObjectTypeId::LoadoutZone,
                ObjectTypeId::GoalZone,
                ObjectTypeId::Ship
            ]
        );
        assert_eq!(level.objects[0].geometry()[1], Point::new(40.0, 0.0));
        assert_eq!(level.objects[1].team(), Team::new(2));
        assert_eq!(level.objects[3].geometry(), &[Point::new(30.0, 30.0)]);
        assert_eq!(
            sink.at(MessageLevel::Success).collect::<Vec<_>>(),
            vec!["loaded 4 objects"]
        );
    }

    #[test]
    fn bad_lines_become_warnings() {
        let text = "Team Blue\nTurret 1 2 3\nLoadoutZone 4 0 0 1 0 1 1\nSlipZone 1 2\nShip 0 1 1\n";
        let mut sink = VecSink::new();
        let level = load_level(text, &LevelContext::for_testing(), &mut sink);
        assert_eq!(level.team_count, 1);
        assert_eq!(level.objects.len(), 1);
        let lines: Vec<_> = level.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert_eq!(sink.at(MessageLevel::Error).count(), 3);
        assert!(level.warnings[0].to_string().starts_with("line 2: unknown entity Turret"));
    }

    #[test]
    fn defaults_without_directives() {
        let level = load_level("Ship 1 0 0", &LevelContext::for_testing(), &mut VecSink::new());
        assert_eq!(level.team_count, 2);
        assert_eq!(level.grid_size, 1.0);
        assert!(level.teams.is_empty());
        assert_eq!(level.objects.len(), 1);
    }

    #[test]
    fn out_of_range_geometry_is_a_warning() {
        let mut sink = VecSink::new();
        let text = "LoadoutZone 0 0 0 200 0 200 200\nLoadoutZone 0 0 0 100 0 100 100\n";
        let level = load_level(text, &LevelContext::default(), &mut sink);
        assert_eq!(level.objects.len(), 1);
        assert_eq!(level.objects[0].geometry()[1], Point::new(25500.0, 0.0));
        assert_eq!(level.warnings.len(), 1);
        assert_eq!(level.warnings[0].line, 1);
        assert!(level.warnings[0].message.contains("coordinate 200"));
        assert_eq!(sink.at(MessageLevel::Error).count(), 1);
    }

    #[test]
    fn invalid_grid_size_is_reported() {
        let level = load_level("GridSize -3\n", &LevelContext::default(), &mut VecSink::new());
        assert_eq!(level.grid_size, LevelContext::default().grid_size);
        assert_eq!(level.warnings.len(), 1);
    }
}
