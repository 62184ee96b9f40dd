//! Changing the passphrase of a key.
//!
//! This operation answers its own passphrase prompts: the backend asks for the
//! current passphrase first, and only once it reports `GOOD_PASSPHRASE` does
//! the next secret prompt mean the replacement.

use log::warn;
use secrecy::{ExposeSecret, SecretString};

use super::{yes_no, QUIT, SAVE, YES};
use crate::{
    error::Error,
    format::{Event, Prompt, Response, Status},
    passphrase::{CallbackResult, PassphraseSource, PassphraseState, Purpose},
};

/// `MISSING_PASSPHRASE` advisories tolerated in a row before giving up. The
/// count restarts whenever a passphrase is supplied or accepted.
const MISSING_PASSPHRASE_LIMIT: u32 = 3;

#[derive(Default)]
pub struct ChangePassphraseOptions {
    /// The replacement passphrase. When absent it is requested from the
    /// context's callbacks.
    pub new_passphrase: Option<SecretString>,
    /// Accept the backend's warning about an empty passphrase.
    pub allow_empty: bool,
}

pub(crate) struct ChangePassphraseEdit {
    new_passphrase: Option<SecretString>,
    allow_empty: bool,
    need_old: bool,
    missing: u32,
    command_sent: bool,
    saved: bool,
}

impl ChangePassphraseEdit {
    pub(crate) fn new(options: &ChangePassphraseOptions) -> Self {
        ChangePassphraseEdit {
            new_passphrase: options
                .new_passphrase
                .as_ref()
                .map(|secret| SecretString::new(secret.expose_secret().clone())),
            allow_empty: options.allow_empty,
            need_old: true,
            missing: 0,
            command_sent: false,
            saved: false,
        }
    }

    pub(crate) fn respond(
        &mut self,
        event: &Event<'_>,
        state: &mut PassphraseState,
        source: &mut PassphraseSource,
    ) -> Result<Response, Error> {
        match event.status() {
            Status::GoodPassphrase => {
                // The first acceptance is for the current passphrase.
                if self.need_old {
                    self.need_old = false;
                }
                self.missing = 0;
                state.passphrase_accepted();
                return Ok(Response::Nothing);
            }
            Status::MissingPassphrase => {
                self.missing += 1;
                if self.missing >= MISSING_PASSPHRASE_LIMIT {
                    warn!("No passphrase after {} requests; giving up", self.missing);
                    return Err(Error::MissingPassphrase);
                }
                return Ok(Response::Nothing);
            }
            _ => {}
        }
        if state.observe(event) {
            return Ok(Response::Nothing);
        }

        Ok(match event.prompt() {
            Prompt::KeyeditPrompt => {
                if !self.command_sent {
                    self.command_sent = true;
                    Response::line("passwd")
                } else if !self.saved {
                    self.saved = true;
                    Response::line(SAVE)
                } else {
                    Response::line(QUIT)
                }
            }
            Prompt::PassphraseEnter if event.status() == Status::GetHidden => {
                self.enter(state, source)
            }
            Prompt::ChangePasswdEmptyOkay => yes_no(self.allow_empty),
            Prompt::KeyeditSaveOkay => Response::line(YES),
            _ => Response::Nothing,
        })
    }

    fn enter(&mut self, state: &mut PassphraseState, source: &mut PassphraseSource) -> Response {
        if state.last_result() == CallbackResult::Canceled {
            return Response::Abort;
        }

        let secret = if self.need_old {
            state.supply(source, Purpose::Current)
        } else if let Some(new) = &self.new_passphrase {
            SecretString::new(new.expose_secret().clone())
        } else {
            state.supply(source, Purpose::New)
        };

        // Never let a cancellation turn into an empty replacement passphrase.
        if state.last_result() == CallbackResult::Canceled {
            Response::Abort
        } else {
            self.missing = 0;
            Response::Secret(secret)
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::{ExposeSecret, SecretString};

    use super::{ChangePassphraseEdit, ChangePassphraseOptions};
    use crate::{
        error::Error,
        format::{Event, Response, Status},
        passphrase::{PassphraseInfo, PassphraseSource, PassphraseState, Purpose},
        Callbacks,
    };

    /// Answers with the purpose it was asked for, or cancels new passphrases.
    struct ByPurpose {
        cancel_new: bool,
    }

    impl Callbacks for ByPurpose {
        fn request_passphrase(&mut self, info: &PassphraseInfo) -> Option<SecretString> {
            match info.purpose {
                Purpose::New if self.cancel_new => None,
                purpose => Some(SecretString::new(format!("{:?}", purpose))),
            }
        }
    }

    fn run(
        edit: &mut ChangePassphraseEdit,
        source: &mut PassphraseSource,
        events: &[Event<'_>],
    ) -> Vec<String> {
        let mut state = PassphraseState::default();
        events
            .iter()
            .map(|event| match edit.respond(event, &mut state, source) {
                Ok(Response::Line(line)) => line,
                Ok(Response::Secret(secret)) => format!("secret:{}", secret.expose_secret()),
                Ok(Response::Abort) => "abort".to_owned(),
                Ok(Response::Nothing) => String::new(),
                Err(e) => format!("error:{}", e),
            })
            .filter(|answer| !answer.is_empty())
            .collect()
    }

    #[test]
    fn asks_for_current_then_new() {
        let mut edit = ChangePassphraseEdit::new(&ChangePassphraseOptions::default());
        let mut source = PassphraseSource::Callbacks(Box::new(ByPurpose { cancel_new: false }));
        let events = [
            Event::get_line("keyedit.prompt"),
            Event::new(Status::NeedPassphrase, Some("1111222233334444 1111222233334444 1 2048")),
            Event::get_hidden("passphrase.enter"),
            Event::new(Status::GoodPassphrase, None),
            Event::get_hidden("passphrase.enter"),
            Event::new(Status::GoodPassphrase, None),
            Event::get_line("keyedit.prompt"),
        ];
        assert_eq!(
            run(&mut edit, &mut source, &events),
            vec!["passwd", "secret:Current", "secret:New", "save"]
        );
    }

    #[test]
    fn supplied_new_passphrase_wins() {
        let mut edit = ChangePassphraseEdit::new(&ChangePassphraseOptions {
            new_passphrase: Some(SecretString::new("correct horse".to_owned())),
            allow_empty: false,
        });
        let mut source = PassphraseSource::Secret(SecretString::new("old".to_owned()));
        let events = [
            Event::get_hidden("passphrase.enter"),
            Event::new(Status::GoodPassphrase, None),
            Event::get_hidden("passphrase.enter"),
            Event::get_bool("change_passwd.empty.okay"),
        ];
        assert_eq!(
            run(&mut edit, &mut source, &events),
            vec!["secret:old", "secret:correct horse", "N"]
        );
    }

    #[test]
    fn rejected_current_passphrase_is_asked_again() {
        let mut edit = ChangePassphraseEdit::new(&ChangePassphraseOptions::default());
        let mut source = PassphraseSource::Callbacks(Box::new(ByPurpose { cancel_new: false }));
        let events = [
            Event::get_hidden("passphrase.enter"),
            Event::new(Status::BadPassphrase, Some("1111222233334444")),
            Event::get_hidden("passphrase.enter"),
        ];
        assert_eq!(
            run(&mut edit, &mut source, &events),
            vec!["secret:Current", "secret:Current"]
        );
    }

    #[test]
    fn canceling_the_new_passphrase_aborts() {
        let mut edit = ChangePassphraseEdit::new(&ChangePassphraseOptions {
            new_passphrase: None,
            allow_empty: true,
        });
        let mut source = PassphraseSource::Callbacks(Box::new(ByPurpose { cancel_new: true }));
        let events = [
            Event::get_hidden("passphrase.enter"),
            Event::new(Status::GoodPassphrase, None),
            Event::get_hidden("passphrase.enter"),
            Event::get_hidden("passphrase.enter"),
        ];
        assert_eq!(
            run(&mut edit, &mut source, &events),
            vec!["secret:Current", "abort", "abort"]
        );
    }

    #[test]
    fn gives_up_after_repeated_missing_passphrases() {
        let mut edit = ChangePassphraseEdit::new(&ChangePassphraseOptions::default());
        let mut state = PassphraseState::default();
        let mut source = PassphraseSource::None;
        let missing = Event::new(Status::MissingPassphrase, None);

        assert!(edit.respond(&missing, &mut state, &mut source).is_ok());
        assert!(edit.respond(&missing, &mut state, &mut source).is_ok());
        match edit.respond(&missing, &mut state, &mut source) {
            Err(Error::MissingPassphrase) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn supplying_a_passphrase_restarts_the_missing_count() {
        let mut edit = ChangePassphraseEdit::new(&ChangePassphraseOptions::default());
        let mut state = PassphraseState::default();
        let mut source = PassphraseSource::Secret(SecretString::new("old".to_owned()));
        let missing = Event::new(Status::MissingPassphrase, None);
        let enter = Event::get_hidden("passphrase.enter");

        assert!(edit.respond(&missing, &mut state, &mut source).is_ok());
        assert!(edit.respond(&missing, &mut state, &mut source).is_ok());
        match edit.respond(&enter, &mut state, &mut source) {
            Ok(Response::Secret(secret)) => assert_eq!(secret.expose_secret(), "old"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(edit.respond(&missing, &mut state, &mut source).is_ok());
        assert!(edit.respond(&missing, &mut state, &mut source).is_ok());
        match edit.respond(&missing, &mut state, &mut source) {
            Err(Error::MissingPassphrase) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
