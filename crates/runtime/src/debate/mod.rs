//! The reviewer-disagreement subsystem: detection, bounded debates, and
//! weighted consensus.

pub mod consensus;
pub mod detector;
pub mod engine;

pub use consensus::ConsensusEngine;
pub use detector::DisagreementDetector;
pub use engine::{DebateCycleResult, DebateEngine};
