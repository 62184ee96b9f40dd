//! Passphrase bookkeeping shared by every edit operation.
//!
//! The backend announces which key it is about to unlock (`USERID_HINT`,
//! `NEED_PASSPHRASE`), asks for the secret (`GET_HIDDEN passphrase.enter`), and
//! then reports the outcome (`GOOD_PASSPHRASE`, `BAD_PASSPHRASE`). This module
//! tracks those advisories and answers the secret prompt on behalf of whichever
//! operation is running.

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    format::{read, Event, Prompt, Response, Status},
    Callbacks,
};

/// The outcome of the most recent passphrase request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackResult {
    Success,
    Canceled,
}

/// Why a passphrase is being requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    /// Unlock the key so that an edit can be made.
    Unlock,
    /// The current passphrase, while changing it.
    Current,
    /// The replacement passphrase, while changing it.
    New,
}

/// What the backend told us about the passphrase it wants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassphraseInfo {
    pub purpose: Purpose,
    /// The user ID of the key being unlocked, if announced.
    pub uid_hint: Option<String>,
    /// The key the secret unlocks. May be a subkey.
    pub key_id: Option<String>,
    pub main_key_id: Option<String>,
    pub algorithm: Option<u8>,
    pub key_length: Option<u32>,
    /// Set when the previous attempt was rejected by the backend.
    pub previous_was_bad: bool,
}

/// Passphrase state for a single key, carried from one session to the next.
#[derive(Clone, Debug)]
pub struct PassphraseState {
    uid_hint: Option<String>,
    info: Option<String>,
    previous_was_bad: bool,
    last_result: CallbackResult,
}

impl Default for PassphraseState {
    fn default() -> Self {
        PassphraseState {
            uid_hint: None,
            info: None,
            previous_was_bad: false,
            last_result: CallbackResult::Success,
        }
    }
}

impl PassphraseState {
    /// The raw `USERID_HINT` argument of the last announced key.
    pub fn uid_hint(&self) -> Option<&str> {
        self.uid_hint.as_deref()
    }

    /// The raw `NEED_PASSPHRASE` argument of the last announced key.
    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn previous_was_bad(&self) -> bool {
        self.previous_was_bad
    }

    pub fn last_result(&self) -> CallbackResult {
        self.last_result
    }

    /// A cancellation only lasts until the next session starts.
    pub(crate) fn begin_session(&mut self) {
        self.last_result = CallbackResult::Success;
    }

    pub(crate) fn passphrase_accepted(&mut self) {
        self.previous_was_bad = false;
    }

    /// Records the passphrase advisories that need no answer.
    ///
    /// Returns `true` if the event was one of them.
    pub(crate) fn observe(&mut self, event: &Event<'_>) -> bool {
        match event.status() {
            Status::UseridHint => {
                self.uid_hint = event.args().map(str::to_owned);
                true
            }
            Status::NeedPassphrase | Status::NeedPassphraseSym => {
                self.info = event.args().map(str::to_owned);
                true
            }
            Status::BadPassphrase => {
                debug!("Backend rejected the passphrase");
                self.previous_was_bad = true;
                true
            }
            Status::MissingPassphrase => true,
            _ => false,
        }
    }

    /// Builds the info object handed to the passphrase callback.
    pub fn request(&self, purpose: Purpose) -> PassphraseInfo {
        let uid_hint = self.uid_hint.as_deref().map(|hint| {
            match read::userid_hint(hint) {
                Ok((_, (_, Some(uid)))) => uid.to_owned(),
                _ => hint.to_owned(),
            }
        });
        let parsed = self
            .info
            .as_deref()
            .and_then(|info| read::passphrase_info(info).ok())
            .map(|(_, parsed)| parsed);

        PassphraseInfo {
            purpose,
            uid_hint,
            key_id: parsed.map(|(key_id, _, _, _)| key_id.to_owned()),
            main_key_id: parsed.map(|(_, main_key_id, _, _)| main_key_id.to_owned()),
            algorithm: parsed.map(|(_, _, algorithm, _)| algorithm),
            key_length: parsed.map(|(_, _, _, length)| length),
            previous_was_bad: self.previous_was_bad,
        }
    }

    /// Obtains a secret from `source`, or an empty one once the user has
    /// canceled during this session.
    pub(crate) fn supply(&mut self, source: &mut PassphraseSource, purpose: Purpose) -> SecretString {
        if self.last_result == CallbackResult::Canceled {
            return SecretString::new(String::new());
        }

        let request = self.request(purpose);
        match source.obtain(&request) {
            Some(secret) => {
                self.last_result = CallbackResult::Success;
                secret
            }
            None => {
                warn!("Passphrase request was canceled");
                self.last_result = CallbackResult::Canceled;
                SecretString::new(String::new())
            }
        }
    }
}

/// Where passphrases come from during an edit session.
pub enum PassphraseSource {
    /// No passphrase is available; every request counts as canceled.
    None,
    /// A passphrase supplied up front, repeated whenever it is asked for.
    Secret(SecretString),
    /// Ask the caller each time.
    Callbacks(Box<dyn Callbacks>),
}

impl PassphraseSource {
    pub(crate) fn obtain(&mut self, request: &PassphraseInfo) -> Option<SecretString> {
        match self {
            PassphraseSource::None => None,
            PassphraseSource::Secret(secret) => {
                Some(SecretString::new(secret.expose_secret().clone()))
            }
            PassphraseSource::Callbacks(callbacks) => callbacks.request_passphrase(request),
        }
    }

    /// Returns `true` if distinct passphrases can be requested for distinct purposes.
    pub(crate) fn is_interactive(&self) -> bool {
        matches!(self, PassphraseSource::Callbacks(_))
    }
}

/// Answers the passphrase prompts common to every operation except changing
/// the passphrase, returning `None` for events it does not handle.
pub(crate) fn intercept(
    state: &mut PassphraseState,
    source: &mut PassphraseSource,
    event: &Event<'_>,
) -> Option<Response> {
    if state.observe(event) {
        return Some(Response::Nothing);
    }

    match (event.status(), event.prompt()) {
        (Status::GetHidden, Prompt::PassphraseEnter) => {
            Some(Response::Secret(state.supply(source, Purpose::Unlock)))
        }
        _ => None,
    }
}
