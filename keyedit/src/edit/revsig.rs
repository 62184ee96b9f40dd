//! Revoking signatures on a user ID.

use super::{check_indices, Handler, SignatureWalk, QUIT, SAVE, YES};
use crate::{
    error::Error,
    format::{Event, Prompt, Response},
};

/// Ends the reason text. The backend trims the line, so a lone space reads as
/// an empty line.
#[cfg(not(windows))]
const END_OF_REASON: &str = " ";
#[cfg(windows)]
const END_OF_REASON: &str = "";

/// Why a signature is being revoked, as numbered in the backend's menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationReason {
    NoReason,
    Compromised,
    Superseded,
    NoLongerUsed,
    UidInvalid,
}

impl RevocationReason {
    pub fn code(self) -> u8 {
        match self {
            RevocationReason::NoReason => 0,
            RevocationReason::Compromised => 1,
            RevocationReason::Superseded => 2,
            RevocationReason::NoLongerUsed => 3,
            RevocationReason::UidInvalid => 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RevokeSignatureOptions {
    /// 1-based index of the user ID carrying the signatures.
    pub uid: usize,
    /// 1-based indices of the signatures to revoke.
    pub signatures: Vec<usize>,
    pub reason: RevocationReason,
    pub description: String,
}

impl RevokeSignatureOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.uid == 0 {
            return Err(Error::InvalidOptions("user ID indices start at 1"));
        }
        if self.signatures.is_empty() {
            return Err(Error::InvalidOptions("no signatures selected"));
        }
        check_indices(&self.signatures, "signature indices start at 1")
    }
}

pub(crate) struct RevokeSignatureEdit {
    uid: usize,
    reason: RevocationReason,
    description: Vec<String>,
    signatures: SignatureWalk,
    uid_sent: bool,
    command_sent: bool,
    lines_sent: usize,
    saved: bool,
}

impl RevokeSignatureEdit {
    pub(crate) fn new(options: RevokeSignatureOptions) -> Self {
        // An empty line would end the description early.
        let description = options
            .description
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();

        RevokeSignatureEdit {
            uid: options.uid,
            reason: options.reason,
            description,
            signatures: SignatureWalk::new(options.signatures),
            uid_sent: false,
            command_sent: false,
            lines_sent: 0,
            saved: false,
        }
    }

    fn next_reason_line(&mut self) -> Response {
        match self.description.get(self.lines_sent) {
            Some(line) => {
                self.lines_sent += 1;
                Response::line(line.as_str())
            }
            None => Response::line(END_OF_REASON),
        }
    }
}

impl Handler for RevokeSignatureEdit {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        Ok(match event.prompt() {
            Prompt::KeyeditPrompt => {
                if !self.uid_sent {
                    self.uid_sent = true;
                    Response::line(format!("uid {}", self.uid))
                } else if !self.command_sent {
                    self.command_sent = true;
                    Response::line("revsig")
                } else if !self.saved {
                    self.saved = true;
                    Response::line(SAVE)
                } else {
                    Response::line(QUIT)
                }
            }
            Prompt::AskRevokeSigOne | Prompt::AskRevokeSigExpired => self.signatures.next(),
            Prompt::AskRevocationReasonCode => Response::line(self.reason.code().to_string()),
            Prompt::AskRevocationReasonText => self.next_reason_line(),
            Prompt::AskRevokeSigOkay
            | Prompt::AskRevocationReasonOkay
            | Prompt::KeyeditSaveOkay => Response::line(YES),
            _ => Response::Nothing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{RevocationReason, RevokeSignatureEdit, RevokeSignatureOptions, END_OF_REASON};
    use crate::{edit::answers, format::Event};

    fn options() -> RevokeSignatureOptions {
        RevokeSignatureOptions {
            uid: 3,
            signatures: vec![2],
            reason: RevocationReason::UidInvalid,
            description: "Left the project.\n\nAddress retired.".to_owned(),
        }
    }

    #[test]
    fn full_revocation_conversation() {
        let mut edit = RevokeSignatureEdit::new(options());
        let events = [
            Event::get_line("keyedit.prompt"),
            Event::get_line("keyedit.prompt"),
            Event::get_bool("ask_revoke_sig.one"),
            Event::get_bool("ask_revoke_sig.expired"),
            Event::get_bool("ask_revoke_sig.one"),
            Event::get_bool("ask_revoke_sig.okay"),
            Event::get_line("ask_revocation_reason.code"),
            Event::get_line("ask_revocation_reason.text"),
            Event::get_line("ask_revocation_reason.text"),
            Event::get_line("ask_revocation_reason.text"),
            Event::get_bool("ask_revocation_reason.okay"),
            Event::get_line("keyedit.prompt"),
            Event::get_bool("keyedit.save.okay"),
        ];
        assert_eq!(
            answers(&mut edit, &events),
            vec![
                "uid 3",
                "revsig",
                "N",
                "Y",
                "N",
                "Y",
                "4",
                "Left the project.",
                "Address retired.",
                END_OF_REASON,
                "Y",
                "save",
                "Y",
            ]
        );
    }

    #[test]
    fn empty_description_ends_immediately() {
        let mut edit = RevokeSignatureEdit::new(RevokeSignatureOptions {
            description: String::new(),
            ..options()
        });
        let events = [Event::get_line("ask_revocation_reason.text")];
        assert_eq!(answers(&mut edit, &events), vec![END_OF_REASON]);
    }

    #[test]
    fn requires_a_selection() {
        assert!(RevokeSignatureOptions {
            signatures: vec![],
            ..options()
        }
        .validate()
        .is_err());
        assert!(RevokeSignatureOptions { uid: 0, ..options() }.validate().is_err());
        assert!(options().validate().is_ok());
    }
}
