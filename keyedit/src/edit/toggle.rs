//! Enabling and disabling a key.

use super::{Handler, QUIT, YES};
use crate::{
    error::Error,
    format::{Event, Prompt, Response},
};

/// The flag lives in the trust database, which the backend updates at once,
/// so the session ends with `quit` rather than `save`.
pub(crate) struct ToggleEdit {
    enable: bool,
    command_sent: bool,
}

impl ToggleEdit {
    pub(crate) fn new(enable: bool) -> Self {
        ToggleEdit {
            enable,
            command_sent: false,
        }
    }
}

impl Handler for ToggleEdit {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        Ok(match event.prompt() {
            Prompt::KeyeditPrompt if !self.command_sent => {
                self.command_sent = true;
                Response::line(if self.enable { "enable" } else { "disable" })
            }
            Prompt::KeyeditPrompt => Response::line(QUIT),
            Prompt::KeyeditSaveOkay => Response::line(YES),
            _ => Response::Nothing,
        })
    }
}
