//! Adding a subkey.
//!
//! Algorithms beyond the backend's short menu, and capabilities other than
//! the algorithm's defaults, are only honoured in expert mode. Outside expert
//! mode the backend rejects the algorithm and asks for it again; the handler
//! then picks the backend's safe default and discards the session's result.

use chrono::{NaiveDate, Utc};
use log::warn;

use super::{validity_days, yes_no, Handler, QUIT, SAVE};
use crate::{
    error::Error,
    format::{Event, Prompt, Response},
};

const FALLBACK_ALGORITHM: &str = "2";

/// What a subkey may be used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub sign: bool,
    pub encrypt: bool,
    pub authenticate: bool,
}

impl Default for Capabilities {
    /// The backend's default for algorithms with selectable capabilities.
    fn default() -> Self {
        Capabilities {
            sign: true,
            encrypt: true,
            authenticate: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AddSubkeyOptions {
    /// The number of the algorithm in the backend's menu.
    pub algorithm: u8,
    /// Key length in bits.
    pub length: u32,
    pub expiration: Option<NaiveDate>,
    pub capabilities: Capabilities,
}

impl AddSubkeyOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.length == 0 {
            return Err(Error::InvalidOptions("key length must not be zero"));
        }
        Ok(())
    }
}

pub(crate) struct AddSubkeyEdit {
    options: AddSubkeyOptions,
    today: NaiveDate,
    command_sent: bool,
    saved: bool,
    algorithm_prompts: u32,
    customization_ignored: bool,
    /// Capabilities whose toggle has already been sent.
    toggled: Capabilities,
}

impl AddSubkeyEdit {
    pub(crate) fn new(options: AddSubkeyOptions) -> Self {
        AddSubkeyEdit::at(options, Utc::now().date_naive())
    }

    pub(crate) fn at(options: AddSubkeyOptions, today: NaiveDate) -> Self {
        AddSubkeyEdit {
            options,
            today,
            command_sent: false,
            saved: false,
            algorithm_prompts: 0,
            customization_ignored: false,
            toggled: Capabilities {
                sign: false,
                encrypt: false,
                authenticate: false,
            },
        }
    }

    /// Returns `true` if the backend refused the requested algorithm.
    pub(crate) fn customization_ignored(&self) -> bool {
        self.customization_ignored
    }

    fn algorithm(&mut self) -> Response {
        self.algorithm_prompts += 1;
        if self.algorithm_prompts > 1 {
            warn!(
                "Backend rejected algorithm {}; expert mode is required",
                self.options.algorithm
            );
            self.customization_ignored = true;
            Response::line(FALLBACK_ALGORITHM)
        } else {
            Response::line(self.options.algorithm.to_string())
        }
    }

    /// Each answer to the capability prompt flips one capability, so send a
    /// toggle for every capability that differs from the backend's default,
    /// then finish.
    fn next_toggle(&mut self) -> Response {
        let wanted = self.options.capabilities;
        let default = Capabilities::default();

        let toggle = if wanted.authenticate != default.authenticate && !self.toggled.authenticate {
            self.toggled.authenticate = true;
            "A"
        } else if wanted.sign != default.sign && !self.toggled.sign {
            self.toggled.sign = true;
            "S"
        } else if wanted.encrypt != default.encrypt && !self.toggled.encrypt {
            self.toggled.encrypt = true;
            "E"
        } else {
            "Q"
        };
        Response::line(toggle)
    }
}

impl Handler for AddSubkeyEdit {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        Ok(match event.prompt() {
            Prompt::KeyeditPrompt => {
                if !self.command_sent {
                    self.command_sent = true;
                    Response::line("addkey")
                } else if self.customization_ignored || self.saved {
                    Response::line(QUIT)
                } else {
                    self.saved = true;
                    Response::line(SAVE)
                }
            }
            Prompt::KeygenAlgo => self.algorithm(),
            Prompt::KeygenFlags => self.next_toggle(),
            Prompt::KeygenSize => Response::line(self.options.length.to_string()),
            Prompt::KeygenValid => validity_days(self.options.expiration, self.today),
            Prompt::KeyeditSaveOkay => yes_no(!self.customization_ignored),
            _ => Response::Nothing,
        })
    }
}
