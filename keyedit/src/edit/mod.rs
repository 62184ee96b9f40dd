//! Per-operation conversation handlers.
//!
//! Each handler owns a copy of the caller's options plus the cursors it needs
//! to know how far the conversation has progressed. Handlers are built fresh
//! for every session, so replaying a session with the same options produces
//! the same answers.

use chrono::NaiveDate;

use crate::{
    error::Error,
    format::{Event, Response},
};

mod addkey;
mod delsig;
mod expire;
mod passwd;
mod revsig;
mod sign;
mod toggle;
mod trust;

pub use addkey::{AddSubkeyOptions, Capabilities};
pub use delsig::DeleteSignatureOptions;
pub use expire::ExpireOptions;
pub use passwd::ChangePassphraseOptions;
pub use revsig::{RevocationReason, RevokeSignatureOptions};
pub use sign::{SignOptions, TrustSignature};
pub use trust::OwnerTrust;

pub(crate) use addkey::AddSubkeyEdit;
pub(crate) use delsig::DeleteSignatureEdit;
pub(crate) use expire::ExpireEdit;
pub(crate) use passwd::ChangePassphraseEdit;
pub(crate) use revsig::RevokeSignatureEdit;
pub(crate) use sign::SignEdit;
pub(crate) use toggle::ToggleEdit;
pub(crate) use trust::TrustEdit;

const YES: &str = "Y";
const NO: &str = "N";
const SAVE: &str = "save";
const QUIT: &str = "quit";

/// The eight kinds of key edit this crate can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Sign,
    Passphrase,
    RevokeSignature,
    DeleteSignature,
    EnableDisable,
    Trust,
    AddSubkey,
    Expire,
}

impl OperationKind {
    pub(crate) const COUNT: usize = 8;

    pub(crate) fn index(self) -> usize {
        match self {
            OperationKind::Sign => 0,
            OperationKind::Passphrase => 1,
            OperationKind::RevokeSignature => 2,
            OperationKind::DeleteSignature => 3,
            OperationKind::EnableDisable => 4,
            OperationKind::Trust => 5,
            OperationKind::AddSubkey => 6,
            OperationKind::Expire => 7,
        }
    }
}

/// A state machine answering the prompts of one operation.
pub(crate) trait Handler {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error>;
}

/// The operation running in a session, with its progress so far.
pub(crate) enum Operation {
    Sign(SignEdit),
    Passphrase(ChangePassphraseEdit),
    RevokeSignature(RevokeSignatureEdit),
    DeleteSignature(DeleteSignatureEdit),
    EnableDisable(ToggleEdit),
    Trust(TrustEdit),
    AddSubkey(AddSubkeyEdit),
    Expire(ExpireEdit),
}

impl Operation {
    pub(crate) fn kind(&self) -> OperationKind {
        match self {
            Operation::Sign(_) => OperationKind::Sign,
            Operation::Passphrase(_) => OperationKind::Passphrase,
            Operation::RevokeSignature(_) => OperationKind::RevokeSignature,
            Operation::DeleteSignature(_) => OperationKind::DeleteSignature,
            Operation::EnableDisable(_) => OperationKind::EnableDisable,
            Operation::Trust(_) => OperationKind::Trust,
            Operation::AddSubkey(_) => OperationKind::AddSubkey,
            Operation::Expire(_) => OperationKind::Expire,
        }
    }
}

fn yes_no(yes: bool) -> Response {
    Response::line(if yes { YES } else { NO })
}

/// Emits `"<command> <index>"` for each selected index, one per call.
#[derive(Clone, Debug)]
struct Selection {
    command: &'static str,
    indices: Vec<usize>,
    sent: usize,
}

impl Selection {
    fn new(command: &'static str, indices: Vec<usize>) -> Self {
        Selection {
            command,
            indices,
            sent: 0,
        }
    }

    fn next(&mut self) -> Option<Response> {
        let index = self.indices.get(self.sent)?;
        self.sent += 1;
        Some(Response::line(format!("{} {}", self.command, index)))
    }
}

/// Answers the backend's walk over the signatures of a user ID, one per turn.
///
/// Selected indices are 1-based, counted in the order the backend visits them.
#[derive(Clone, Debug)]
struct SignatureWalk {
    selected: Vec<usize>,
    visited: usize,
}

impl SignatureWalk {
    fn new(selected: Vec<usize>) -> Self {
        SignatureWalk {
            selected,
            visited: 0,
        }
    }

    fn next(&mut self) -> Response {
        self.visited += 1;
        yes_no(self.selected.contains(&self.visited))
    }
}

/// The answer to a validity-period prompt: whole days from `today` until
/// `expiration`, or `0` (never expires) when there is no expiration or it is
/// not in the future.
fn validity_days(expiration: Option<NaiveDate>, today: NaiveDate) -> Response {
    let days = expiration.map_or(0, |date| (date - today).num_days().max(0));
    Response::line(days.to_string())
}

fn check_indices(indices: &[usize], what: &'static str) -> Result<(), Error> {
    if indices.contains(&0) {
        Err(Error::InvalidOptions(what))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn answers<H: Handler>(handler: &mut H, events: &[Event<'_>]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match handler.respond(event) {
            Ok(Response::Line(answer)) => Some(answer),
            Ok(_) => None,
            Err(e) => panic!("unexpected error: {}", e),
        })
        .collect()
}
