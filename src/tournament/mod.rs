pub mod engine;
pub mod types;

pub use engine::TournamentEngine;
pub use types::{
    merge_revealed, validate_stages, StageRecord, Tournament, TournamentError, TournamentStatus, WorkerRecord,
};
