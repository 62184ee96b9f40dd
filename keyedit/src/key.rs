//! Entry points for editing a key.

use log::{debug, info};
use secrecy::SecretString;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    edit::{
        AddSubkeyEdit, AddSubkeyOptions, ChangePassphraseEdit, ChangePassphraseOptions,
        DeleteSignatureEdit, DeleteSignatureOptions, ExpireEdit, ExpireOptions, Operation,
        OperationKind, OwnerTrust, RevokeSignatureEdit, RevokeSignatureOptions, SignEdit,
        SignOptions, ToggleEdit, TrustEdit,
    },
    error::Error,
    passphrase::{CallbackResult, PassphraseSource, PassphraseState, Purpose},
    session::Session,
    Callbacks, EditEngine,
};

/// Holds one lock per operation kind. A held lock means a session of that
/// kind is running against the key.
struct SessionLocks {
    locks: Vec<Mutex<()>>,
}

/// Released when the session ends, on every path.
struct SessionGuard<'a> {
    _operation: MutexGuard<'a, ()>,
    _passphrase: Option<MutexGuard<'a, ()>>,
}

impl SessionLocks {
    fn new() -> Self {
        SessionLocks {
            locks: (0..OperationKind::COUNT).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock(&self, kind: OperationKind) -> MutexGuard<'_, ()> {
        // The locks guard no data, so a poisoned lock is still usable.
        self.locks[kind.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Every operation shares the key's passphrase state, so sessions of any
    /// kind also hold the passphrase lock. It is always taken second.
    fn acquire(&self, kind: OperationKind) -> SessionGuard<'_> {
        let operation = self.lock(kind);
        let passphrase = match kind {
            OperationKind::Passphrase => None,
            _ => Some(self.lock(OperationKind::Passphrase)),
        };
        SessionGuard {
            _operation: operation,
            _passphrase: passphrase,
        }
    }
}

/// A key held by the backend, identified by its fingerprint.
pub struct Key {
    fingerprint: String,
    passphrase: Mutex<PassphraseState>,
    sessions: SessionLocks,
}

impl Key {
    pub fn new<S: Into<String>>(fingerprint: S) -> Self {
        Key {
            fingerprint: fingerprint.into(),
            passphrase: Mutex::new(PassphraseState::default()),
            sessions: SessionLocks::new(),
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// A snapshot of the passphrase state left by the most recent session.
    pub fn passphrase_state(&self) -> PassphraseState {
        self.passphrase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_passphrase_state(&self, state: PassphraseState) {
        *self
            .passphrase
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// Drives edit sessions through an [`EditEngine`].
pub struct Context<E> {
    engine: E,
    passphrase: PassphraseSource,
}

impl<E: EditEngine> Context<E> {
    pub fn new(engine: E) -> Self {
        Context {
            engine,
            passphrase: PassphraseSource::None,
        }
    }

    /// Answers every passphrase request with `passphrase`.
    pub fn with_passphrase(mut self, passphrase: SecretString) -> Self {
        self.passphrase = PassphraseSource::Secret(passphrase);
        self
    }

    /// Asks `callbacks` whenever a passphrase is needed.
    pub fn with_callbacks<C: Callbacks + 'static>(mut self, callbacks: C) -> Self {
        self.passphrase = PassphraseSource::Callbacks(Box::new(callbacks));
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Signs the selected user IDs of `key`.
    pub fn sign(&mut self, key: &Key, options: &SignOptions) -> Result<(), Error> {
        options.validate()?;
        self.run(key, Operation::Sign(SignEdit::new(options.clone())))
            .map(|_| ())
    }

    /// Revokes the selected signatures on one user ID of `key`.
    pub fn revoke_signature(
        &mut self,
        key: &Key,
        options: &RevokeSignatureOptions,
    ) -> Result<(), Error> {
        options.validate()?;
        self.run(
            key,
            Operation::RevokeSignature(RevokeSignatureEdit::new(options.clone())),
        )
        .map(|_| ())
    }

    /// Deletes the selected signatures from one user ID of `key`.
    pub fn delete_signature(
        &mut self,
        key: &Key,
        options: &DeleteSignatureOptions,
    ) -> Result<(), Error> {
        options.validate()?;
        self.run(
            key,
            Operation::DeleteSignature(DeleteSignatureEdit::new(options.clone())),
        )
        .map(|_| ())
    }

    pub fn set_enabled(&mut self, key: &Key, enabled: bool) -> Result<(), Error> {
        self.run(key, Operation::EnableDisable(ToggleEdit::new(enabled)))
            .map(|_| ())
    }

    pub fn set_owner_trust(&mut self, key: &Key, trust: OwnerTrust) -> Result<(), Error> {
        self.run(key, Operation::Trust(TrustEdit::new(trust)))
            .map(|_| ())
    }

    /// Changes the expiration date of `key`, or of the selected subkeys.
    pub fn set_expiration(&mut self, key: &Key, options: &ExpireOptions) -> Result<(), Error> {
        options.validate()?;
        self.run(key, Operation::Expire(ExpireEdit::new(options.clone())))
            .map(|_| ())
    }

    /// Adds a subkey to `key`.
    ///
    /// Returns [`Error::CustomizationIgnored`] if the backend would only create
    /// a subkey with its default algorithm. No subkey is saved in that case.
    pub fn add_subkey(&mut self, key: &Key, options: &AddSubkeyOptions) -> Result<(), Error> {
        options.validate()?;
        match self.run(key, Operation::AddSubkey(AddSubkeyEdit::new(options.clone())))? {
            Operation::AddSubkey(edit) if edit.customization_ignored() => {
                Err(Error::CustomizationIgnored)
            }
            _ => Ok(()),
        }
    }

    /// Changes the passphrase protecting `key`.
    pub fn change_passphrase(
        &mut self,
        key: &Key,
        options: &ChangePassphraseOptions,
    ) -> Result<(), Error> {
        if options.new_passphrase.is_none() && !self.passphrase.is_interactive() {
            return Err(Error::InvalidOptions(
                "a new passphrase is required without passphrase callbacks",
            ));
        }
        self.run(
            key,
            Operation::Passphrase(ChangePassphraseEdit::new(options)),
        )
        .map(|_| ())
    }

    fn run(&mut self, key: &Key, operation: Operation) -> Result<Operation, Error> {
        let kind = operation.kind();
        let _guard = key.sessions.acquire(kind);
        info!("Editing key {} ({:?})", key.fingerprint, kind);

        let mut state = key.passphrase_state();
        state.begin_session();

        let mut session = Session::new(operation, state, &mut self.passphrase);
        let outcome = self.engine.edit_key(&key.fingerprint, &mut session);
        let (operation, state) = session.finish();

        let result = outcome.map_err(|e| classify(e, &state));
        key.store_passphrase_state(state);
        if let Err(e) = &result {
            debug!("Editing key {} failed: {}", key.fingerprint, e);
        }
        result.map(|()| operation)
    }
}

/// Explains a failed session in terms of what happened to the passphrase.
fn classify(error: Error, state: &PassphraseState) -> Error {
    match error {
        Error::Aborted | Error::Backend { .. }
            if state.last_result() == CallbackResult::Canceled =>
        {
            Error::Canceled
        }
        Error::Backend { .. } if state.previous_was_bad() => {
            let info = state.request(Purpose::Unlock);
            Error::BadPassphrase {
                uid_hint: info.uid_hint,
                key_id: info.key_id,
            }
        }
        other => other,
    }
}
