//! Changing the expiration date of a key or its subkeys.

use chrono::{NaiveDate, Utc};

use super::{check_indices, validity_days, yes_no, Handler, Selection, QUIT, SAVE};
use crate::{
    error::Error,
    format::{Event, Prompt, Response},
};

#[derive(Clone, Debug, Default)]
pub struct ExpireOptions {
    /// 1-based indices of the subkeys to change. Empty changes the primary key.
    pub subkeys: Vec<usize>,
    /// `None` means the key never expires.
    pub expiration: Option<NaiveDate>,
}

impl ExpireOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        check_indices(&self.subkeys, "subkey indices start at 1")
    }
}

pub(crate) struct ExpireEdit {
    expiration: Option<NaiveDate>,
    today: NaiveDate,
    keys: Selection,
    command_sent: bool,
    saved: bool,
    quitting: bool,
}

impl ExpireEdit {
    pub(crate) fn new(options: ExpireOptions) -> Self {
        ExpireEdit::at(options, Utc::now().date_naive())
    }

    pub(crate) fn at(options: ExpireOptions, today: NaiveDate) -> Self {
        ExpireEdit {
            expiration: options.expiration,
            today,
            keys: Selection::new("key", options.subkeys),
            command_sent: false,
            saved: false,
            quitting: false,
        }
    }
}

impl Handler for ExpireEdit {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        Ok(match event.prompt() {
            Prompt::KeyeditPrompt => {
                if let Some(select) = self.keys.next() {
                    select
                } else if !self.command_sent {
                    self.command_sent = true;
                    Response::line("expire")
                } else if !self.saved {
                    self.saved = true;
                    Response::line(SAVE)
                } else {
                    // Asked again after saving: leave without saving twice.
                    self.quitting = true;
                    Response::line(QUIT)
                }
            }
            Prompt::KeygenValid => validity_days(self.expiration, self.today),
            Prompt::KeyeditSaveOkay => yes_no(!self.quitting),
            _ => Response::Nothing,
        })
    }
}
