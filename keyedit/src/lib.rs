//! Key editing for OpenPGP backends.
//!
//! The backend (GnuPG) only exposes key metadata changes through an interactive
//! "edit" conversation: it emits a status line naming the question it is asking,
//! and blocks until a single line of text is written back. This crate answers
//! that conversation for eight operations:
//!
//! - signing user IDs ([`Context::sign`]),
//! - revoking and deleting signatures on a user ID
//!   ([`Context::revoke_signature`], [`Context::delete_signature`]),
//! - enabling or disabling a key ([`Context::set_enabled`]),
//! - setting owner trust ([`Context::set_owner_trust`]),
//! - changing expiration dates ([`Context::set_expiration`]),
//! - adding a subkey ([`Context::add_subkey`]),
//! - changing the passphrase ([`Context::change_passphrase`]).
//!
//! # Protocol
//!
//! Each turn of the conversation is a status line:
//!
//! ```text
//! [GNUPG:] KEYWORD ARGS
//! ```
//!
//! - `GET_LINE`, `GET_BOOL` and `GET_HIDDEN` carry a prompt identifier such as
//!   `keyedit.prompt` or `sign_uid.okay`, and require exactly one line in reply.
//!   `GET_HIDDEN` asks for a secret.
//! - Every other keyword is advisory. The passphrase advisories (`USERID_HINT`,
//!   `NEED_PASSPHRASE`, `GOOD_PASSPHRASE`, `BAD_PASSPHRASE`,
//!   `MISSING_PASSPHRASE`) are tracked across the session; `ALREADY_SIGNED`
//!   ends a signing session with an error.
//!
//! Prompts that no operation understands are left unanswered, so new backend
//! questions with a sensible default do not break existing operations.
//!
//! The conversation ends when the operation answers `keyedit.prompt` with
//! `save` (commit the changes) or `quit` (leave without committing).
//!
//! ## Passphrases
//!
//! Any operation may need the key unlocked. Passphrase prompts are answered
//! before the operation sees them, from a passphrase given up front or from
//! [`Callbacks`]. Once the user cancels, the rest of the session is answered
//! with empty secrets. Changing the passphrase is the exception: it tells the
//! current and the new passphrase apart itself.
//!
//! # Example interaction
//!
//! - `B`: backend
//! - `K`: keyedit
//!
//! Signing the second and fifth user IDs:
//!
//! ```text
//! B --> K | GET_LINE keyedit.prompt
//! B <-- K | uid 2
//! B --> K | GET_LINE keyedit.prompt
//! B <-- K | uid 5
//! B --> K | GET_LINE keyedit.prompt
//! B <-- K | sign
//! B --> K | USERID_HINT 1111222233334444 Alice <alice@example.org>
//! B --> K | NEED_PASSPHRASE 1111222233334444 1111222233334444 1 3072
//! B --> K | GET_HIDDEN passphrase.enter
//! B <-- K | PASSPHRASE
//! B --> K | GOOD_PASSPHRASE
//! B --> K | GET_BOOL sign_uid.okay
//! B <-- K | Y
//! B --> K | GET_LINE keyedit.prompt
//! B <-- K | save
//! ```
//!
//! # Sessions
//!
//! A [`Key`] allows one session per operation kind at a time, and every
//! session also holds the key's passphrase lock, so sessions on one key run
//! one after another while sessions on different keys proceed independently.

use secrecy::SecretString;

mod edit;
mod error;
mod format;
mod gpg;
mod key;
mod passphrase;
mod session;

pub use edit::{
    AddSubkeyOptions, Capabilities, ChangePassphraseOptions, DeleteSignatureOptions,
    ExpireOptions, OperationKind, OwnerTrust, RevocationReason, RevokeSignatureOptions,
    SignOptions, TrustSignature,
};
pub use error::Error;
pub use format::{Event, Prompt, Response, Status};
pub use gpg::Gpg;
pub use key::{Context, Key};
pub use passphrase::{CallbackResult, PassphraseInfo, PassphraseState, Purpose};

/// Supplies passphrases while a key is being edited.
pub trait Callbacks {
    /// Requests a passphrase from the user.
    ///
    /// Returns `None` if the user canceled. The rest of the session will not
    /// ask again.
    fn request_passphrase(&mut self, info: &PassphraseInfo) -> Option<SecretString>;
}

/// One side of an edit session: produces the answer to each backend event.
pub trait Conversation {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error>;
}

/// Runs edit sessions against the backend.
pub trait EditEngine {
    /// Starts an edit session for the key with the given fingerprint and feeds
    /// every backend event to `conversation` until the session ends.
    ///
    /// Implementations must stop the session without writing anything further
    /// when `conversation` returns an error or [`Response::Abort`].
    fn edit_key(
        &mut self,
        fingerprint: &str,
        conversation: &mut dyn Conversation,
    ) -> Result<(), Error>;
}
