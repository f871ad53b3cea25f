//! Data records for a running tournament: the `Tournament`/`Stage`/`Worker`
//! shapes named in spec.md's Data Model, narrowed from the teacher's
//! `ParallelResult`/`SubagentResult` pair (`agents/orchestrator.rs`,
//! `agents/spawner.rs`) to the stage-sequential, worker-parallel shape this
//! runtime needs.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::CompletionRecord;
use crate::status::AgentState;
use crate::tools::reveal::RevealedArtifact;
use crate::workspace::WorkspaceError;

#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("stages must be non-empty, each >= 1, and strictly non-increasing")]
    InvalidStages,
    #[error("stage {stage} produced zero surviving artifacts")]
    AllWorkersFailed { stage: usize },
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

/// One worker's terminal record within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: String,
    pub tournament_id: String,
    pub stage_index: usize,
    pub workspace_path: PathBuf,
    pub state: AgentState,
    pub revealed: Vec<RevealedArtifact>,
    pub completion: Option<CompletionRecord>,
}

/// One fixed-width horizontal slice of a tournament.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage_index: usize,
    pub workers: Vec<WorkerRecord>,
    /// One line per debate-round critique a worker produced.
    pub debate_transcript: Vec<String>,
    /// Filename collisions noted while merging the previous stage's reveals
    /// into this stage's input set.
    pub conflict_notes: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// A staged pipeline of parallel worker agents narrowing to a synthesized
/// artifact set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: String,
    pub topic: String,
    pub stages: Vec<usize>,
    pub debate_rounds: usize,
    pub current_stage_index: usize,
    pub status: TournamentStatus,
    pub stage_records: Vec<StageRecord>,
    pub final_artifacts: Option<Vec<RevealedArtifact>>,
}

impl Tournament {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, stages: Vec<usize>, debate_rounds: usize) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            stages,
            debate_rounds,
            current_stage_index: 0,
            status: TournamentStatus::Pending,
            stage_records: Vec::new(),
            final_artifacts: None,
        }
    }
}

/// `stages` must be non-empty, every count at least 1, and non-increasing
/// stage-over-stage (a tournament narrows, it never widens).
pub fn validate_stages(stages: &[usize]) -> Result<(), TournamentError> {
    if stages.is_empty() || stages.iter().any(|&n| n < 1) {
        return Err(TournamentError::InvalidStages);
    }
    if stages.windows(2).any(|w| w[1] > w[0]) {
        return Err(TournamentError::InvalidStages);
    }
    Ok(())
}

/// Merge a stage's worker reveals by filename; a later reveal (by worker
/// iteration order) overwrites an earlier one of the same filename, and each
/// overwrite produces a conflict note for the transcript.
pub fn merge_revealed(artifacts: Vec<RevealedArtifact>) -> (Vec<RevealedArtifact>, Vec<String>) {
    let mut merged: Vec<RevealedArtifact> = Vec::new();
    let mut notes = Vec::new();

    for artifact in artifacts {
        if let Some(existing) = merged.iter_mut().find(|a| a.filename == artifact.filename) {
            notes.push(format!(
                "{}: {} overwrote {}",
                artifact.filename, artifact.description, existing.description
            ));
            *existing = artifact;
        } else {
            merged.push(artifact);
        }
    }

    merged.sort_by(|a, b| a.filename.cmp(&b.filename));
    (merged, notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(filename: &str, description: &str) -> RevealedArtifact {
        RevealedArtifact {
            filename: filename.to_string(),
            description: description.to_string(),
            content: description.to_string(),
        }
    }

    #[test]
    fn validate_stages_rejects_empty() {
        assert!(matches!(validate_stages(&[]), Err(TournamentError::InvalidStages)));
    }

    #[test]
    fn validate_stages_rejects_increasing() {
        assert!(matches!(validate_stages(&[2, 4]), Err(TournamentError::InvalidStages)));
    }

    #[test]
    fn validate_stages_accepts_non_increasing() {
        assert!(validate_stages(&[4, 2, 1]).is_ok());
        assert!(validate_stages(&[3, 3, 1]).is_ok());
    }

    #[test]
    fn merge_revealed_dedupes_and_notes_collisions() {
        let (merged, notes) = merge_revealed(vec![artifact("choice.md", "A"), artifact("choice.md", "B")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description, "B");
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("choice.md"));
    }

    #[test]
    fn merge_revealed_passes_through_distinct_filenames() {
        let (merged, notes) = merge_revealed(vec![artifact("a.md", "A"), artifact("b.md", "B")]);
        assert_eq!(merged.len(), 2);
        assert!(notes.is_empty());
    }
}
