/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Parameter-file artifacts written after a run.
//!
//! | Outcome               | Artifacts                                   |
//! |-----------------------|---------------------------------------------|
//! | finished              | full schedule                               |
//! | interrupted at day k  | truncated to `k` days, then full schedule   |
//! | not started           | full schedule                               |
//!
//! Existing files are overwritten.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::codec;
use crate::config::OutputPaths;
use crate::error::ExportError;
use crate::params::ParameterSet;
use crate::protocol::RunOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Truncated,
    Full,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Truncated => "truncated",
            Self::Full => "full",
        })
    }
}

/// One parameter file to write: which days, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Number of days kept per zone.
    pub day_limit: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ScheduleExporter {
    truncated: PathBuf,
    full: PathBuf,
}

impl From<&OutputPaths> for ScheduleExporter {
    fn from(paths: &OutputPaths) -> Self {
        Self::new(&paths.truncated, &paths.full)
    }
}

impl ScheduleExporter {
    pub fn new(truncated: impl Into<PathBuf>, full: impl Into<PathBuf>) -> Self {
        Self {
            truncated: truncated.into(),
            full: full.into(),
        }
    }

    /// Artifacts `outcome` calls for, in write order.
    pub fn plan(&self, params: &ParameterSet, outcome: &RunOutcome) -> Vec<Artifact> {
        let mut artifacts = Vec::with_capacity(2);
        if let Some(day) = outcome.interrupted_at() {
            artifacts.push(Artifact {
                kind: ArtifactKind::Truncated,
                day_limit: day,
                path: self.truncated.clone(),
            });
        }
        artifacts.push(Artifact {
            kind: ArtifactKind::Full,
            day_limit: params.num_days(),
            path: self.full.clone(),
        });
        artifacts
    }

    /// Encode and write every planned artifact.
    ///
    /// # Errors
    /// * [`ExportError::Range`] – an interruption day past the schedule.
    /// * [`ExportError::Write`] – a file could not be written.  Artifacts
    ///   earlier in the plan are already on disk.
    pub fn export(
        &self,
        params: &ParameterSet,
        outcome: &RunOutcome,
    ) -> Result<Vec<Artifact>, ExportError> {
        let artifacts = self.plan(params, outcome);
        for artifact in &artifacts {
            let text = codec::encode(params, artifact.day_limit)?;
            write_artifact(&artifact.path, &text)?;
            info!(
                kind = %artifact.kind,
                days = artifact.day_limit,
                path = %artifact.path.display(),
                "schedule artifact written"
            );
        }
        Ok(artifacts)
    }
}

fn write_artifact(path: &Path, text: &str) -> Result<(), ExportError> {
    let wrap = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, text).map_err(wrap)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ModelParams;
    use crate::protocol::InterruptCause;
    use tempfile::tempdir;

    fn params(days: usize) -> ParameterSet {
        let zone: Vec<Vec<f64>> = (0..days).map(|d| vec![d as f64, 1.5]).collect();
        ParameterSet::from_parts(
            vec![zone.clone(), zone],
            (0..days).map(|d| 100.0 * (d + 1) as f64).collect(),
            vec![10.0, 20.0],
            ModelParams {
                p: 1.0,
                n0: 2.0,
                e: 3.0,
                m: 4.0,
            },
        )
        .unwrap()
    }

    fn interrupted(day: usize) -> RunOutcome {
        RunOutcome::Interrupted {
            day,
            cause: InterruptCause::StopSignal,
        }
    }

    #[test]
    fn finished_run_plans_only_the_full_schedule() {
        let exporter = ScheduleExporter::new("t.txt", "f.txt");
        let plan = exporter.plan(&params(3), &RunOutcome::Finished { days: 3 });
        assert_eq!(
            plan,
            vec![Artifact {
                kind: ArtifactKind::Full,
                day_limit: 3,
                path: PathBuf::from("f.txt"),
            }]
        );
    }

    #[test]
    fn interrupted_run_plans_truncated_then_full() {
        let exporter = ScheduleExporter::new("t.txt", "f.txt");
        let plan = exporter.plan(&params(3), &interrupted(1));
        let limits: Vec<_> = plan.iter().map(|a| (a.kind, a.day_limit)).collect();
        assert_eq!(
            limits,
            vec![(ArtifactKind::Truncated, 1), (ArtifactKind::Full, 3)]
        );
    }

    #[test]
    fn not_started_run_plans_only_the_full_schedule() {
        let exporter = ScheduleExporter::new("t.txt", "f.txt");
        let plan = exporter.plan(
            &params(3),
            &RunOutcome::NotStarted {
                cause: InterruptCause::ChannelFailure,
            },
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, ArtifactKind::Full);
    }

    #[test]
    fn export_writes_decodable_files() {
        let dir = tempdir().unwrap();
        let exporter = ScheduleExporter::new(dir.path().join("t.txt"), dir.path().join("f.txt"));
        let set = params(3);

        let written = exporter.export(&set, &interrupted(2)).unwrap();
        assert_eq!(written.len(), 2);

        let truncated = codec::decode(&std::fs::read_to_string(dir.path().join("t.txt")).unwrap())
            .unwrap();
        let full =
            codec::decode(&std::fs::read_to_string(dir.path().join("f.txt")).unwrap()).unwrap();
        assert_eq!(truncated.num_days(), 2);
        assert_eq!(full.num_days(), 3);
        assert_eq!(full.reservoir(), set.reservoir());
        assert_eq!(truncated.reservoir(), &[100.0, 200.0]);
        assert_eq!(truncated.habitants(), set.habitants());
    }

    #[test]
    fn export_overwrites_existing_files() {
        let dir = tempdir().unwrap();
        let full = dir.path().join("f.txt");
        std::fs::write(&full, "stale").unwrap();

        ScheduleExporter::new(dir.path().join("t.txt"), &full)
            .export(&params(2), &RunOutcome::Finished { days: 2 })
            .unwrap();
        let text = std::fs::read_to_string(&full).unwrap();
        assert!(text.starts_with(codec::HEADER));
        assert!(!dir.path().join("t.txt").exists());
    }

    #[test]
    fn export_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let full = dir.path().join("runs/today/f.txt");
        ScheduleExporter::new(dir.path().join("t.txt"), &full)
            .export(&params(1), &RunOutcome::Finished { days: 1 })
            .unwrap();
        assert!(full.exists());
    }

    #[test]
    fn write_failure_names_the_path() {
        let dir = tempdir().unwrap();
        // a directory where the file should go
        let err = ScheduleExporter::new("t.txt", dir.path())
            .export(&params(1), &RunOutcome::Finished { days: 1 })
            .unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn interruption_past_schedule_is_a_range_error() {
        let dir = tempdir().unwrap();
        let err = ScheduleExporter::new(dir.path().join("t.txt"), dir.path().join("f.txt"))
            .export(&params(2), &interrupted(5))
            .unwrap_err();
        assert!(matches!(err, ExportError::Range(_)));
    }
}
