//! Status lines, prompt identifiers and answers exchanged with the backend.

use secrecy::SecretString;

pub(crate) const STATUS_PREFIX: &str = "[GNUPG:] ";

/// The kind of a status line emitted by the backend.
///
/// Only the `GET_*` family expects an answer; everything else is advisory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// `GET_LINE`: a free-form answer is expected.
    GetLine,
    /// `GET_BOOL`: a yes/no answer is expected.
    GetBool,
    /// `GET_HIDDEN`: a secret is expected.
    GetHidden,
    GoodPassphrase,
    BadPassphrase,
    MissingPassphrase,
    UseridHint,
    NeedPassphrase,
    NeedPassphraseSym,
    AlreadySigned,
    /// Any keyword this crate does not act on.
    Other,
}

impl Status {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "GET_LINE" => Status::GetLine,
            "GET_BOOL" => Status::GetBool,
            "GET_HIDDEN" => Status::GetHidden,
            "GOOD_PASSPHRASE" => Status::GoodPassphrase,
            "BAD_PASSPHRASE" => Status::BadPassphrase,
            "MISSING_PASSPHRASE" => Status::MissingPassphrase,
            "USERID_HINT" => Status::UseridHint,
            "NEED_PASSPHRASE" => Status::NeedPassphrase,
            "NEED_PASSPHRASE_SYM" => Status::NeedPassphraseSym,
            "ALREADY_SIGNED" => Status::AlreadySigned,
            _ => Status::Other,
        }
    }

    /// Returns `true` if the backend blocks until it receives an answer.
    pub fn needs_response(self) -> bool {
        matches!(self, Status::GetLine | Status::GetBool | Status::GetHidden)
    }
}

/// The question the backend is asking, derived once from its prompt identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    KeyeditPrompt,
    SignUidClass,
    SignUidExpire,
    SignUidOkay,
    SignUidLocalPromoteOkay,
    SiggenValid,
    TrustsigTrustValue,
    TrustsigTrustDepth,
    TrustsigTrustRegexp,
    KeyeditSignAllOkay,
    KeyeditSaveOkay,
    DelsigUnknown,
    DelsigValid,
    DelsigInvalid,
    DelsigSelfsig,
    AskRevokeSigOne,
    AskRevokeSigExpired,
    AskRevokeSigOkay,
    AskRevocationReasonOkay,
    AskRevocationReasonCode,
    AskRevocationReasonText,
    OwnertrustSetUltimateOkay,
    OwnertrustValue,
    KeygenAlgo,
    KeygenFlags,
    KeygenSize,
    KeygenValid,
    ChangePasswdEmptyOkay,
    PassphraseEnter,
    /// Not a prompt, or a prompt no handler understands.
    Unknown,
}

impl Prompt {
    pub fn from_id(id: &str) -> Self {
        match id {
            "keyedit.prompt" => Prompt::KeyeditPrompt,
            "sign_uid.class" => Prompt::SignUidClass,
            "sign_uid.expire" => Prompt::SignUidExpire,
            "sign_uid.okay" => Prompt::SignUidOkay,
            "sign_uid.local_promote_okay" => Prompt::SignUidLocalPromoteOkay,
            "siggen.valid" => Prompt::SiggenValid,
            "trustsig_prompt.trust_value" => Prompt::TrustsigTrustValue,
            "trustsig_prompt.trust_depth" => Prompt::TrustsigTrustDepth,
            "trustsig_prompt.trust_regexp" => Prompt::TrustsigTrustRegexp,
            "keyedit.sign_all.okay" => Prompt::KeyeditSignAllOkay,
            "keyedit.save.okay" => Prompt::KeyeditSaveOkay,
            "keyedit.delsig.unknown" => Prompt::DelsigUnknown,
            "keyedit.delsig.valid" => Prompt::DelsigValid,
            "keyedit.delsig.invalid" => Prompt::DelsigInvalid,
            "keyedit.delsig.selfsig" => Prompt::DelsigSelfsig,
            "ask_revoke_sig.one" => Prompt::AskRevokeSigOne,
            "ask_revoke_sig.expired" => Prompt::AskRevokeSigExpired,
            "ask_revoke_sig.okay" => Prompt::AskRevokeSigOkay,
            "ask_revocation_reason.okay" => Prompt::AskRevocationReasonOkay,
            "ask_revocation_reason.code" => Prompt::AskRevocationReasonCode,
            "ask_revocation_reason.text" => Prompt::AskRevocationReasonText,
            "edit_ownertrust.set_ultimate.okay" => Prompt::OwnertrustSetUltimateOkay,
            "edit_ownertrust.value" => Prompt::OwnertrustValue,
            "keygen.algo" => Prompt::KeygenAlgo,
            "keygen.flags" => Prompt::KeygenFlags,
            "keygen.size" => Prompt::KeygenSize,
            "keygen.valid" => Prompt::KeygenValid,
            "change_passwd.empty.okay" => Prompt::ChangePasswdEmptyOkay,
            "passphrase.enter" => Prompt::PassphraseEnter,
            _ => Prompt::Unknown,
        }
    }
}

/// A single turn of an edit session, as delivered by the backend.
#[derive(Clone, Copy, Debug)]
pub struct Event<'a> {
    status: Status,
    args: Option<&'a str>,
    prompt: Prompt,
}

impl<'a> Event<'a> {
    pub fn new(status: Status, args: Option<&'a str>) -> Self {
        // Advisory arguments are key IDs and user IDs, never prompt identifiers.
        let prompt = match args {
            Some(id) if status.needs_response() => Prompt::from_id(id),
            _ => Prompt::Unknown,
        };
        Event {
            status,
            args,
            prompt,
        }
    }

    pub fn get_line(id: &'a str) -> Self {
        Event::new(Status::GetLine, Some(id))
    }

    pub fn get_bool(id: &'a str) -> Self {
        Event::new(Status::GetBool, Some(id))
    }

    pub fn get_hidden(id: &'a str) -> Self {
        Event::new(Status::GetHidden, Some(id))
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn args(&self) -> Option<&'a str> {
        self.args
    }

    pub fn prompt(&self) -> Prompt {
        self.prompt
    }
}

/// The answer to one turn of an edit session.
#[derive(Debug)]
pub enum Response {
    /// The event was informational; nothing is written back.
    Nothing,
    /// A single line of text.
    Line(String),
    /// A passphrase. It is wiped from memory once written.
    Secret(SecretString),
    /// Terminate the session with a failure.
    Abort,
}

impl Response {
    pub(crate) fn line<S: Into<String>>(answer: S) -> Self {
        Response::Line(answer.into())
    }

    /// Returns the answer if this is a plain text line.
    pub fn as_line(&self) -> Option<&str> {
        match self {
            Response::Line(answer) => Some(answer),
            _ => None,
        }
    }
}

pub(crate) mod read {
    use nom::{
        bytes::complete::{tag, take_while1},
        character::complete::{char, digit1, space1},
        combinator::{map, map_res, opt, rest},
        sequence::{preceded, tuple},
        IResult,
    };

    use super::{Status, STATUS_PREFIX};

    fn key_id(input: &str) -> IResult<&str, &str> {
        take_while1(|c: char| c.is_ascii_hexdigit())(input)
    }

    fn keyword(input: &str) -> IResult<&str, &str> {
        take_while1(|c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')(input)
    }

    /// Parses `[GNUPG:] KEYWORD[ ARGS]`, without the trailing newline.
    pub(crate) fn status_line(input: &str) -> IResult<&str, (Status, Option<&str>)> {
        preceded(
            tag(STATUS_PREFIX),
            tuple((
                map(keyword, Status::from_keyword),
                opt(preceded(char(' '), rest)),
            )),
        )(input)
    }

    /// Parses the `NEED_PASSPHRASE` argument
    /// `<request key id> <main key id> <algorithm> <key length>`.
    pub(crate) fn passphrase_info(input: &str) -> IResult<&str, (&str, &str, u8, u32)> {
        tuple((
            key_id,
            preceded(space1, key_id),
            preceded(space1, map_res(digit1, |s: &str| s.parse::<u8>())),
            preceded(space1, map_res(digit1, |s: &str| s.parse::<u32>())),
        ))(input)
    }

    /// Parses the `USERID_HINT` argument `<key id> <user id>`.
    pub(crate) fn userid_hint(input: &str) -> IResult<&str, (&str, Option<&str>)> {
        tuple((key_id, opt(preceded(char(' '), rest))))(input)
    }
}

pub(crate) mod write {
    use cookie_factory::{
        combinator::{slice, string},
        sequence::tuple,
        SerializeFn,
    };
    use std::io::Write;

    pub(crate) fn line<'a, W: 'a + Write>(answer: &'a str) -> impl SerializeFn<W> + 'a {
        tuple((string(answer), string("\n")))
    }

    pub(crate) fn secret<'a, W: 'a + Write>(secret: &'a [u8]) -> impl SerializeFn<W> + 'a {
        tuple((slice(secret), string("\n")))
    }
}
