//! Async driver for notary agreement.
//!
//! [`AgreementRunner`] owns the clock of a single agreement instance and
//! steps it through its states on tokio time. [`ActionReceiver`] turns the
//! instance's callbacks into [`AgreementAction`](notary_core::AgreementAction)s
//! on a channel, for a network layer to sign, gossip and fetch.

mod config;
mod receiver;
mod runner;

pub use config::RunnerConfig;
pub use receiver::{ActionReceiver, BlockSource};
pub use runner::{AgreementRunner, RunOutcome, RunnerError, ShutdownHandle};
