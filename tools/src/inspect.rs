//! Level file inspection.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use level::{load_level, LevelContext, LoadWarning, TeamDecl, VecSink};
use model::{NetworkObject, ObjectTypeId, Point, ScalarValue, Team};
use serde::Serialize;

/// One built object as shown to a level author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub type_id: ObjectTypeId,
    pub team: Team,
    pub location: Point,
    pub geometry: Vec<Point>,
    pub scalars: BTreeMap<&'static str, ScalarValue>,
}

impl ObjectSummary {
    #[must_use]
    pub fn of(object: &NetworkObject) -> Self {
        let scalars = object
            .info()
            .scalars
            .iter()
            .zip(object.scalars())
            .map(|(def, value)| (def.name, *value))
            .collect();
        Self {
            type_id: object.type_id(),
            team: object.team(),
            location: object.location(),
            geometry: object.geometry().to_vec(),
            scalars,
        }
    }
}

/// Everything the loader made of one level file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub path: PathBuf,
    pub name: Option<String>,
    pub grid_size: f32,
    pub team_count: u8,
    pub teams: Vec<TeamDecl>,
    pub objects: Vec<ObjectSummary>,
    pub warnings: Vec<LoadWarning>,
}

/// Loads `path` and summarizes the result.
pub fn inspect_level(path: &Path, ctx: &LevelContext) -> Result<LevelReport> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read level {}", path.display()))?;
    let level = load_level(&text, ctx, &mut VecSink::new());
    Ok(LevelReport {
        path: path.to_path_buf(),
        name: level.name,
        grid_size: level.grid_size,
        team_count: level.team_count,
        teams: level.teams,
        objects: level.objects.iter().map(ObjectSummary::of).collect(),
        warnings: level.warnings,
    })
}

/// Level files directly inside `dir`, optionally filtered by a glob on the
/// path or file name. Sorted by path.
pub fn collect_level_paths(dir: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    let pattern = glob
        .map(Pattern::new)
        .transpose()
        .context("invalid glob pattern")?;

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !pattern.matches_path(&path) && !matches_name {
                continue;
            }
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

/// Human-readable rendering of a report.
#[must_use]
pub fn format_level_pretty(report: &LevelReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", report.path.display());
    if let Some(name) = &report.name {
        let _ = writeln!(out, "name: {name}");
    }
    let _ = writeln!(
        out,
        "grid size: {} teams: {}",
        report.grid_size, report.team_count
    );
    for (index, team) in report.teams.iter().enumerate() {
        let [r, g, b] = team.color;
        let _ = writeln!(out, "  team {index}: {} ({r} {g} {b})", team.name);
    }
    let _ = writeln!(out, "objects: {}", report.objects.len());
    for object in &report.objects {
        let _ = write!(
            out,
            "  {} ({}) at ({}, {}) with {} points",
            object.type_id,
            object.team,
            object.location.x,
            object.location.y,
            object.geometry.len()
        );
        for (name, value) in &object.scalars {
            match value {
                ScalarValue::Bool(b) => {
                    let _ = write!(out, " {name}={b}");
                }
                ScalarValue::Float(v) => {
                    let _ = write!(out, " {name}={v:.3}");
                }
            }
        }
        out.push('\n');
    }
    if !report.warnings.is_empty() {
        let _ = writeln!(out, "warnings: {}", report.warnings.len());
        for warning in &report.warnings {
            let _ = writeln!(out, "  {warning}");
        }
    }
    out
}
