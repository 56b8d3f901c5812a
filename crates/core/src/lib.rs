//! Collaborator contracts for the notary agreement engine.
//!
//! The agreement instance decides which block a slot finalizes, but it
//! does not produce blocks, choose leaders, sign votes or talk to the
//! network. Those concerns are supplied through the traits in this crate:
//!
//! - [`AgreementReceiver`] → sink for proposed votes, confirmations and block pulls
//! - [`LeaderSelector`] → validates candidate blocks and names the leader's block
//! - [`Authenticator`] → signs the local notary's votes
//!
//! [`AgreementAction`] expresses the receiver callbacks as data, for
//! runners that prefer to process them from a queue.

mod action;
mod error;
mod traits;

pub use action::AgreementAction;
pub use error::{AuthError, LeaderError};
pub use traits::{AgreementReceiver, Authenticator, LeaderSelector};
