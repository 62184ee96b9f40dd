//! Certifying user IDs.

use chrono::NaiveDate;

use super::{check_indices, yes_no, Handler, Selection, QUIT, SAVE, YES};
use crate::{
    error::Error,
    format::{Event, Prompt, Response, Status},
};

/// Parameters of a trust signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustSignature {
    /// 1 for marginal trust, 2 for full trust.
    pub level: u8,
    /// How far the trust extends beyond the signed key.
    pub depth: u8,
    /// Restricts the trust to user IDs in this domain.
    pub regexp: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SignOptions {
    /// 1-based indices of the user IDs to sign. Empty signs all of them.
    pub uids: Vec<usize>,
    /// Make a local signature that is never exported.
    pub local: bool,
    pub non_revocable: bool,
    pub trust: Option<TrustSignature>,
    /// How carefully the key owner's identity was verified, from 0 to 3.
    pub certification_level: u8,
    pub expiration: Option<NaiveDate>,
    /// Promote an existing local signature to an exportable one.
    pub promote_local: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        SignOptions {
            uids: vec![],
            local: false,
            non_revocable: false,
            trust: None,
            certification_level: 0,
            expiration: None,
            promote_local: true,
        }
    }
}

impl SignOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        check_indices(&self.uids, "user ID indices start at 1")?;
        if self.certification_level > 3 {
            return Err(Error::InvalidOptions(
                "certification level must be between 0 and 3",
            ));
        }
        match &self.trust {
            Some(trust) if !(1..=2).contains(&trust.level) => Err(Error::InvalidOptions(
                "trust signature level must be 1 or 2",
            )),
            _ => Ok(()),
        }
    }

    /// The sign command, prefixed with one flag per signature variant.
    fn command(&self) -> String {
        let mut command = String::new();
        if self.local {
            command.push('l');
        }
        if self.trust.is_some() {
            command.push('t');
        }
        if self.non_revocable {
            command.push_str("nr");
        }
        command.push_str("sign");
        command
    }
}

pub(crate) struct SignEdit {
    options: SignOptions,
    uids: Selection,
    command_sent: bool,
    saved: bool,
}

impl SignEdit {
    pub(crate) fn new(options: SignOptions) -> Self {
        let uids = Selection::new("uid", options.uids.clone());
        SignEdit {
            options,
            uids,
            command_sent: false,
            saved: false,
        }
    }

    fn trust_answer(&self, answer: impl Fn(&TrustSignature) -> String) -> Response {
        Response::line(self.options.trust.as_ref().map(answer).unwrap_or_default())
    }
}

impl Handler for SignEdit {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        if event.status() == Status::AlreadySigned {
            return Err(Error::AlreadySigned(
                event.args().unwrap_or_default().to_owned(),
            ));
        }

        Ok(match event.prompt() {
            Prompt::KeyeditPrompt => {
                if let Some(select) = self.uids.next() {
                    select
                } else if !self.command_sent {
                    self.command_sent = true;
                    Response::line(self.options.command())
                } else if !self.saved {
                    self.saved = true;
                    Response::line(SAVE)
                } else {
                    Response::line(QUIT)
                }
            }
            Prompt::SignUidClass => Response::line(self.options.certification_level.to_string()),
            Prompt::SignUidExpire => yes_no(self.options.expiration.is_some()),
            Prompt::SiggenValid => Response::line(match self.options.expiration {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => "0".to_owned(),
            }),
            Prompt::TrustsigTrustValue => self.trust_answer(|t| t.level.to_string()),
            Prompt::TrustsigTrustDepth => self.trust_answer(|t| t.depth.to_string()),
            Prompt::TrustsigTrustRegexp => self.trust_answer(|t| t.regexp.clone().unwrap_or_default()),
            Prompt::SignUidLocalPromoteOkay => yes_no(self.options.promote_local),
            Prompt::SignUidOkay | Prompt::KeyeditSignAllOkay | Prompt::KeyeditSaveOkay => {
                Response::line(YES)
            }
            _ => Response::Nothing,
        })
    }
}
