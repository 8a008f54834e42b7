//! Per-component outcomes and the run summary.

use std::fmt;

use chrono::{DateTime, Utc};
use daopub_common::{CallNumber, ComponentId, Error, ErrorKind};
use serde::Serialize;

use crate::ead::DaoOutcome;
use crate::pipeline::{Stage, StageFailure};
use crate::state::RunMode;

/// Why a component was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The PDF marker exists.
    AlreadyPublished,
    /// METS-only run on a component without a PDF.
    NotPublished,
}

/// What happened to one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Skipped {
        reason: SkipReason,
    },
    /// Dry run: the component would be processed.
    WouldRun,
    Published {
        #[serde(skip_serializing_if = "Option::is_none")]
        dao: Option<DaoOutcome>,
    },
    Failed {
        stage: Stage,
        kind: ErrorKind,
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
    },
}

impl OutcomeStatus {
    /// Record a failure, keeping captured tool stderr when there is any.
    pub fn failed(stage: Stage, error: &Error) -> Self {
        let stderr = match error {
            Error::ExternalTool { stderr, .. } if !stderr.trim().is_empty() => {
                Some(stderr.trim().to_string())
            }
            _ => None,
        };
        OutcomeStatus::Failed {
            stage,
            kind: error.kind(),
            reason: error.to_string(),
            stderr,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeStatus::Failed { .. })
    }
}

impl From<StageFailure> for OutcomeStatus {
    fn from(failure: StageFailure) -> Self {
        OutcomeStatus::failed(failure.stage, &failure.error)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Skipped {
                reason: SkipReason::AlreadyPublished,
            } => f.write_str("skipped-already-published"),
            OutcomeStatus::Skipped {
                reason: SkipReason::NotPublished,
            } => f.write_str("skipped-not-published"),
            OutcomeStatus::WouldRun => f.write_str("would-run"),
            OutcomeStatus::Published {
                dao: Some(DaoOutcome::AlreadyPresent),
            } => f.write_str("published (link already present)"),
            OutcomeStatus::Published { .. } => f.write_str("published"),
            OutcomeStatus::Failed { stage, reason, .. } => {
                write!(f, "failed: [{stage}] {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentOutcome {
    pub component: ComponentId,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// Totals by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub published: usize,
    pub skipped: usize,
    pub would_run: usize,
    pub failed: usize,
}

/// Result of processing one call number.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub call_number: CallNumber,
    pub mode: RunMode,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when the collection could not be resolved; every pending
    /// component then fails with this reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_error: Option<String>,
    pub outcomes: Vec<ComponentOutcome>,
    pub summary: Summary,
}

impl RunReport {
    pub fn new(call_number: CallNumber, mode: RunMode, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            call_number,
            mode,
            dry_run,
            started_at: now,
            finished_at: now,
            collection_error: None,
            outcomes: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn record(&mut self, component: ComponentId, status: OutcomeStatus) {
        match &status {
            OutcomeStatus::Skipped { .. } => self.summary.skipped += 1,
            OutcomeStatus::WouldRun => self.summary.would_run += 1,
            OutcomeStatus::Published { .. } => self.summary.published += 1,
            OutcomeStatus::Failed { .. } => self.summary.failed += 1,
        }
        self.outcomes.push(ComponentOutcome { component, status });
    }

    /// Sort outcomes by component and stamp the finish time.
    pub fn finish(&mut self) {
        self.outcomes.sort_by(|a, b| a.component.cmp(&b.component));
        self.finished_at = Utc::now();
    }

    /// No component failed and the collection resolved.
    pub fn is_success(&self) -> bool {
        self.collection_error.is_none() && self.summary.failed == 0
    }

    pub fn status_of(&self, component: &ComponentId) -> Option<&OutcomeStatus> {
        self.outcomes
            .iter()
            .find(|o| &o.component == component)
            .map(|o| &o.status)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "{}: {}", outcome.component, outcome.status)?;
            if let OutcomeStatus::Failed {
                stderr: Some(stderr),
                ..
            } = &outcome.status
            {
                for line in stderr.lines() {
                    writeln!(f, "    | {line}")?;
                }
            }
        }
        if let Some(reason) = &self.collection_error {
            writeln!(f, "collection {}: {}", self.call_number, reason)?;
        }
        let s = &self.summary;
        write!(
            f,
            "{}: {} published, {} skipped, {} failed",
            self.call_number, s.published, s.skipped, s.failed
        )?;
        if self.dry_run {
            write!(f, ", {} would run (dry run)", s.would_run)?;
        }
        Ok(())
    }
}
