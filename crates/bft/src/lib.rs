//! Per-slot Byzantine agreement among a notary set.
//!
//! An [`Agreement`] decides a single block for one (chain, height)
//! [`Position`](notary_types::Position). Notaries exchange three kinds of
//! votes per period (init, pre-commit, commit); a block is finalized once a
//! quorum of `floor(n/3)*2+1` commit votes agree on it.
//!
//! # Architecture
//!
//! The instance is a passive, thread-safe object driven from outside:
//!
//! - `process_block` / `process_vote` → validate, buffer or record input
//! - `next_state` → fire the current sub-state on a clock tick, proposing votes
//! - `done` → poll for finalization or a pending fast-forward
//! - `restart` → move to a new position and replay buffered input
//!
//! All I/O happens through the [`AgreementReceiver`](notary_core::AgreementReceiver)
//! the instance was built with.

mod agreement;
mod auth;
mod config;
mod error;
mod fast_forward;
mod leader;
mod pending;
mod round;
mod state;

pub use agreement::{Agreement, Progress};
pub use auth::KeyAuthenticator;
pub use config::{required_votes, AgreementConfig};
pub use error::AgreementError;
pub use leader::HashLeaderSelector;
pub use state::AgreementState;
