//! Setting owner trust.

use super::{Handler, QUIT, YES};
use crate::{
    error::Error,
    format::{Event, Prompt, Response},
};

/// How far the key owner is trusted to certify other keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerTrust {
    /// "I don't know or won't say".
    Undefined,
    Never,
    Marginal,
    Full,
    Ultimate,
}

impl OwnerTrust {
    /// The numeral the backend's trust menu expects.
    pub fn value(self) -> u8 {
        match self {
            OwnerTrust::Undefined => 1,
            OwnerTrust::Never => 2,
            OwnerTrust::Marginal => 3,
            OwnerTrust::Full => 4,
            OwnerTrust::Ultimate => 5,
        }
    }
}

pub(crate) struct TrustEdit {
    trust: OwnerTrust,
    command_sent: bool,
}

impl TrustEdit {
    pub(crate) fn new(trust: OwnerTrust) -> Self {
        TrustEdit {
            trust,
            command_sent: false,
        }
    }
}

impl Handler for TrustEdit {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        Ok(match event.prompt() {
            Prompt::KeyeditPrompt if !self.command_sent => {
                self.command_sent = true;
                Response::line("trust")
            }
            Prompt::KeyeditPrompt => Response::line(QUIT),
            Prompt::OwnertrustValue => Response::line(self.trust.value().to_string()),
            Prompt::OwnertrustSetUltimateOkay | Prompt::KeyeditSaveOkay => Response::line(YES),
            _ => Response::Nothing,
        })
    }
}
