//! Quorum - distributed signal verification
//!
//! A signal is a proposed fact. Verifiers record verdicts against it; a
//! quorum check compares the verification count with a required quorum and,
//! once quorum is reached, executes a ritual recording the approval.
//!
//! ## State machine
//!
//! ```text
//! pending  ── verify(true)  ──► verified
//! pending  ── verify(false) ──► rejected
//! verified ── verify(false) ──► rejected
//! rejected ── verify(true)  ──► verified
//! ```
//!
//! Status follows the latest verdict; the verification count only grows.

pub mod engine;
pub mod ritual;
pub mod types;

pub use engine::QuorumEngine;
pub use ritual::RitualLog;
pub use types::*;
