//! Poll engine: candidate fetch, claim, per-cycle coordination and the loop.

pub mod claim;
pub mod control;
pub mod cycle;
pub mod fetch;

pub use claim::Claimer;
pub use control::{ControlPlane, PollConfig};
pub use cycle::{CycleOutcome, CycleReport, PollCycle};
pub use fetch::CandidateFetcher;
