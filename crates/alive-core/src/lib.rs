//! # Alive Core Library
//!
//! Core business logic for the Alive 28-day accountability challenge. A
//! participant submits one reflection per calendar day; the system commits
//! to it with a salted Keccak-256 proof, advances a streak/progress record,
//! and tracks when milestone rewards become mintable. The CLI binary is a
//! thin layer over this library; HTTP transports can wrap the same surface.
//!
//! ## Architecture
//!
//! - **Pipeline**: an explicit staged state machine per flow (`checkin`,
//!   `tx_confirm`, reports) -- fixed topology, no graph engine
//! - **Storage**: SQLite behind the [`storage::Store`] seam; one
//!   transaction per logical operation, with a unique index enforcing
//!   at most one check-in per participant and calendar day
//! - **Streak engine**: pure functions over the append-only log set,
//!   replayable from scratch
//! - **Reflection**: an opaque, bounded generator with fixed fallbacks --
//!   a degraded reflection never fails a check-in
//!
//! ## Key Components
//!
//! - [`ChallengeService`]: the operation surface over the pipeline
//! - [`Database`]: progress and daily-log persistence
//! - [`ChallengeConfig`]: injected configuration, no globals

pub mod config;
pub mod dates;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod proof;
pub mod reflection;
pub mod report;
pub mod storage;
pub mod streaks;
pub mod tasks;

pub use config::{ChallengeConfig, GeneratorConfig};
pub use error::{CoreError, Result};
pub use model::{
    DailyLog, LogStatus, MilestoneId, Milestones, Progress, Reflection, SubmitHint,
};
pub use pipeline::{
    ChallengeService, CheckinRequest, CheckinResponse, DayMintRequest, FinalConfirmRequest,
    MilestoneConfirmRequest, ProgressSnapshot, TxConfirmRequest,
};
pub use reflection::{HttpGenerator, NullGenerator, ReflectionGenerator};
pub use report::{Report, ReportRange};
pub use storage::{Database, Store};
