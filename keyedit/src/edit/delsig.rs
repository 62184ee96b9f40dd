//! Deleting signatures from a user ID.

use super::{check_indices, yes_no, Handler, SignatureWalk, QUIT, SAVE, YES};
use crate::{
    error::Error,
    format::{Event, Prompt, Response},
};

#[derive(Clone, Debug)]
pub struct DeleteSignatureOptions {
    /// 1-based index of the user ID carrying the signatures.
    pub uid: usize,
    /// 1-based indices of the signatures to delete.
    pub signatures: Vec<usize>,
    /// Confirm deletion when a selected signature is a self-signature.
    pub delete_self_signature: bool,
}

impl DeleteSignatureOptions {
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

pub(crate) struct DeleteSignatureEdit {
    uid: usize,
    delete_self_signature: bool,
    signatures: SignatureWalk,
    uid_sent: bool,
    command_sent: bool,
    saved: bool,
}

impl DeleteSignatureEdit {
    pub(crate) fn new(options: DeleteSignatureOptions) -> Self {
        DeleteSignatureEdit {
            uid: options.uid,
            delete_self_signature: options.delete_self_signature,
            signatures: SignatureWalk::new(options.signatures),
            uid_sent: false,
            command_sent: false,
            saved: false,
        }
    }
}

impl Handler for DeleteSignatureEdit {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        Ok(match event.prompt() {
            Prompt::KeyeditPrompt => {
                if !self.uid_sent {
                    self.uid_sent = true;
                    Response::line(format!("uid {}", self.uid))
                } else if !self.command_sent {
                    self.command_sent = true;
                    Response::line("delsig")
                } else if !self.saved {
                    self.saved = true;
                    Response::line(SAVE)
                } else {
                    Response::line(QUIT)
                }
            }
            Prompt::DelsigValid | Prompt::DelsigInvalid | Prompt::DelsigUnknown => {
                self.signatures.next()
            }
            Prompt::DelsigSelfsig => yes_no(self.delete_self_signature),
            Prompt::KeyeditSaveOkay => Response::line(YES),
            _ => Response::Nothing,
        })
    }
}
