use chrono::NaiveDate;
use gumdrop::Options;
use keyedit::{
    AddSubkeyOptions, Callbacks, Capabilities, ChangePassphraseOptions, Context,
    DeleteSignatureOptions, ExpireOptions, Gpg, Key, OwnerTrust, PassphraseInfo, Purpose,
    RevocationReason, RevokeSignatureOptions, SignOptions, TrustSignature,
};
use log::{debug, error, info};
use pinentry::PassphraseInput;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::fmt;
use std::process;

const DEFAULT_ALGORITHM: u8 = 1;
const DEFAULT_LENGTH: u32 = 3072;

#[derive(Debug)]
enum Error {
    Date(String),
    Env(String),
    Keyedit(keyedit::Error),
    MissingCommand,
    MissingKey,
    Usage(String),
}

impl From<keyedit::Error> for Error {
    fn from(e: keyedit::Error) -> Self {
        Error::Keyedit(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Date(date) => write!(f, "Invalid date '{}' (expected YYYY-MM-DD)", date),
            Error::Env(var) => write!(f, "Environment variable {} is not set", var),
            Error::Keyedit(e) => e.fmt(f),
            Error::MissingCommand => write!(f, "Missing command (try --help)"),
            Error::MissingKey => write!(f, "Expected exactly one key fingerprint"),
            Error::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Options)]
struct KeyeditOptions {
    #[options(help = "print help message")]
    help: bool,

    #[options(help = "use the gpg binary at PATH", meta = "PATH", no_short)]
    gpg: Option<String>,

    #[options(help = "use DIR as the keyring directory", meta = "DIR", no_short)]
    homedir: Option<String>,

    #[options(help = "allow subkeys with any algorithm", no_short)]
    expert: bool,

    #[options(
        help = "read the passphrase from environment variable VAR",
        meta = "VAR",
        no_short
    )]
    passphrase_env: Option<String>,

    #[options(command)]
    command: Option<Command>,
}

#[derive(Debug, Options)]
enum Command {
    #[options(help = "sign user IDs of a key")]
    Sign(SignCommand),
    #[options(help = "revoke signatures on a user ID")]
    Revsig(RevsigCommand),
    #[options(help = "delete signatures from a user ID")]
    Delsig(DelsigCommand),
    #[options(help = "enable a key")]
    Enable(KeyCommand),
    #[options(help = "disable a key")]
    Disable(KeyCommand),
    #[options(help = "set the owner trust of a key")]
    Trust(TrustCommand),
    #[options(help = "change the expiration date of a key or its subkeys")]
    Expire(ExpireCommand),
    #[options(help = "add a subkey")]
    Addkey(AddkeyCommand),
    #[options(help = "change the passphrase of a key")]
    Passwd(PasswdCommand),
}

#[derive(Debug, Options)]
struct KeyCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,
}

#[derive(Debug, Options)]
struct SignCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,

    #[options(help = "sign user ID N (default: all)", meta = "N", no_short)]
    uid: Vec<usize>,

    #[options(help = "make a local signature", no_short)]
    local: bool,

    #[options(help = "make a non-revocable signature", no_short)]
    non_revocable: bool,

    #[options(help = "certification level, 0 to 3", meta = "LEVEL", no_short)]
    level: Option<u8>,

    #[options(help = "signature expires on DATE", meta = "DATE", no_short)]
    expire: Option<String>,

    #[options(help = "make a trust signature with trust LEVEL (1 or 2)", meta = "LEVEL", no_short)]
    trust_level: Option<u8>,

    #[options(help = "trust signature depth", meta = "DEPTH", no_short)]
    trust_depth: Option<u8>,

    #[options(help = "restrict the trust signature to a domain", meta = "REGEXP", no_short)]
    trust_regexp: Option<String>,

    #[options(help = "keep existing local signatures local", no_short)]
    no_promote: bool,
}

#[derive(Debug, Options)]
struct RevsigCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,

    #[options(help = "user ID carrying the signatures", meta = "N", no_short)]
    uid: usize,

    #[options(help = "revoke signature N", meta = "N", no_short)]
    sig: Vec<usize>,

    #[options(
        help = "none, compromised, superseded, retired or uid-invalid",
        meta = "REASON",
        no_short
    )]
    reason: Option<String>,

    #[options(help = "explain the revocation", meta = "TEXT", no_short)]
    description: Option<String>,
}

#[derive(Debug, Options)]
struct DelsigCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,

    #[options(help = "user ID carrying the signatures", meta = "N", no_short)]
    uid: usize,

    #[options(help = "delete signature N", meta = "N", no_short)]
    sig: Vec<usize>,

    #[options(help = "also delete self-signatures", no_short)]
    self_sig: bool,
}

#[derive(Debug, Options)]
struct TrustCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,

    #[options(
        help = "undefined, never, marginal, full or ultimate",
        meta = "TRUST",
        no_short
    )]
    level: Option<String>,
}

#[derive(Debug, Options)]
struct ExpireCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,

    #[options(help = "change subkey N instead of the primary key", meta = "N", no_short)]
    subkey: Vec<usize>,

    #[options(help = "expire on DATE (default: never)", meta = "DATE", no_short)]
    date: Option<String>,
}

#[derive(Debug, Options)]
struct AddkeyCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,

    #[options(help = "algorithm number from the gpg menu", meta = "N", no_short)]
    algo: Option<u8>,

    #[options(help = "key length in bits", meta = "BITS", no_short)]
    length: Option<u32>,

    #[options(help = "subkey expires on DATE", meta = "DATE", no_short)]
    expire: Option<String>,

    #[options(
        help = "capabilities as letters: s(ign), e(ncrypt), a(uthenticate)",
        meta = "FLAGS",
        no_short
    )]
    usage: Option<String>,
}

#[derive(Debug, Options)]
struct PasswdCommand {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "fingerprint of the key")]
    key: Vec<String>,

    #[options(
        help = "read the new passphrase from environment variable VAR",
        meta = "VAR",
        no_short
    )]
    new_passphrase_env: Option<String>,

    #[options(help = "accept an empty passphrase", no_short)]
    allow_empty: bool,
}

/// Asks for passphrases with pinentry, or on the terminal if pinentry is not
/// installed.
struct Terminal;

impl Callbacks for Terminal {
    fn request_passphrase(&mut self, info: &PassphraseInfo) -> Option<SecretString> {
        let mut description = match info.purpose {
            Purpose::Unlock => "Enter the passphrase to unlock".to_owned(),
            Purpose::Current => "Enter the current passphrase of".to_owned(),
            Purpose::New => "Enter a new passphrase for".to_owned(),
        };
        match (&info.uid_hint, &info.key_id) {
            (Some(uid), _) => description.push_str(&format!(" \"{}\"", uid)),
            (None, Some(key_id)) => description.push_str(&format!(" key {}", key_id)),
            (None, None) => description.push_str(" the key"),
        }
        if info.previous_was_bad {
            description.insert_str(0, "Bad passphrase, try again. ");
        }

        let confirm = match info.purpose {
            Purpose::New => Some("Confirm passphrase"),
            _ => None,
        };
        read_secret(&description, "Passphrase", confirm)
    }
}

fn read_secret(description: &str, prompt: &str, confirm: Option<&str>) -> Option<SecretString> {
    if let Some(mut input) = PassphraseInput::with_default_binary() {
        input.with_description(description).with_prompt(prompt);
        if let Some(confirm_prompt) = confirm {
            input.with_confirmation(confirm_prompt, "Passphrases do not match");
        }
        match input.interact() {
            Ok(secret) => Some(secret),
            Err(e) => {
                debug!("pinentry: {:?}", e);
                None
            }
        }
    } else {
        // Fall back to CLI interface.
        let passphrase =
            rpassword::read_password_from_tty(Some(format!("{}: ", description).as_str())).ok()?;
        if let Some(confirm_prompt) = confirm {
            let confirmation =
                rpassword::read_password_from_tty(Some(format!("{}: ", confirm_prompt).as_str())).ok()?;
            if confirmation != passphrase {
                error!("Passphrases do not match");
                return None;
            }
        }
        Some(SecretString::new(passphrase))
    }
}

fn secret_from_env(var: &str) -> Result<SecretString, Error> {
    env::var(var)
        .map(SecretString::new)
        .map_err(|_| Error::Env(var.to_owned()))
}

fn parse_date(date: Option<&str>) -> Result<Option<NaiveDate>, Error> {
    date.map(|date| {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| Error::Date(date.to_owned()))
    })
    .transpose()
}

fn single_key(free: &[String]) -> Result<Key, Error> {
    match free {
        [fingerprint] => Ok(Key::new(fingerprint.as_str())),
        _ => Err(Error::MissingKey),
    }
}

fn parse_reason(reason: Option<&str>) -> Result<RevocationReason, Error> {
    match reason.unwrap_or("none") {
        "none" => Ok(RevocationReason::NoReason),
        "compromised" => Ok(RevocationReason::Compromised),
        "superseded" => Ok(RevocationReason::Superseded),
        "retired" => Ok(RevocationReason::NoLongerUsed),
        "uid-invalid" => Ok(RevocationReason::UidInvalid),
        other => Err(Error::Usage(format!("Unknown revocation reason '{}'", other))),
    }
}

fn parse_trust(level: Option<&str>) -> Result<OwnerTrust, Error> {
    match level {
        Some("undefined") => Ok(OwnerTrust::Undefined),
        Some("never") => Ok(OwnerTrust::Never),
        Some("marginal") => Ok(OwnerTrust::Marginal),
        Some("full") => Ok(OwnerTrust::Full),
        Some("ultimate") => Ok(OwnerTrust::Ultimate),
        Some(other) => Err(Error::Usage(format!("Unknown trust level '{}'", other))),
        None => Err(Error::Usage("Missing --level".to_owned())),
    }
}

fn parse_usage(usage: Option<&str>) -> Result<Capabilities, Error> {
    let usage = match usage {
        Some(usage) => usage,
        None => return Ok(Capabilities::default()),
    };
    let mut capabilities = Capabilities {
        sign: false,
        encrypt: false,
        authenticate: false,
    };
    for flag in usage.chars() {
        match flag.to_ascii_lowercase() {
            's' => capabilities.sign = true,
            'e' => capabilities.encrypt = true,
            'a' => capabilities.authenticate = true,
            other => {
                return Err(Error::Usage(format!("Unknown capability '{}'", other)));
            }
        }
    }
    Ok(capabilities)
}

fn run(opts: KeyeditOptions) -> Result<(), Error> {
    let command = opts.command.ok_or(Error::MissingCommand)?;

    let gpg = match opts.gpg {
        Some(program) => Gpg::with_program(program),
        None => Gpg::new()?,
    };
    let gpg = match opts.homedir {
        Some(homedir) => gpg.homedir(homedir),
        None => gpg,
    }
    .expert(opts.expert);

    let ctx = Context::new(gpg);
    let mut ctx = match opts.passphrase_env {
        Some(var) => ctx.with_passphrase(secret_from_env(&var)?),
        None => ctx.with_callbacks(Terminal),
    };

    match command {
        Command::Sign(cmd) => {
            let key = single_key(&cmd.key)?;
            let trust = cmd.trust_level.map(|level| TrustSignature {
                level,
                depth: cmd.trust_depth.unwrap_or(1),
                regexp: cmd.trust_regexp.clone(),
            });
            let options = SignOptions {
                uids: cmd.uid,
                local: cmd.local,
                non_revocable: cmd.non_revocable,
                trust,
                certification_level: cmd.level.unwrap_or(0),
                expiration: parse_date(cmd.expire.as_deref())?,
                promote_local: !cmd.no_promote,
            };
            ctx.sign(&key, &options)?;
            info!("Signed {}", key.fingerprint());
        }
        Command::Revsig(cmd) => {
            let key = single_key(&cmd.key)?;
            let options = RevokeSignatureOptions {
                uid: cmd.uid,
                signatures: cmd.sig,
                reason: parse_reason(cmd.reason.as_deref())?,
                description: cmd.description.unwrap_or_default(),
            };
            ctx.revoke_signature(&key, &options)?;
        }
        Command::Delsig(cmd) => {
            let key = single_key(&cmd.key)?;
            let options = DeleteSignatureOptions {
                uid: cmd.uid,
                signatures: cmd.sig,
                delete_self_signature: cmd.self_sig,
            };
            ctx.delete_signature(&key, &options)?;
        }
        Command::Enable(cmd) => ctx.set_enabled(&single_key(&cmd.key)?, true)?,
        Command::Disable(cmd) => ctx.set_enabled(&single_key(&cmd.key)?, false)?,
        Command::Trust(cmd) => {
            let key = single_key(&cmd.key)?;
            ctx.set_owner_trust(&key, parse_trust(cmd.level.as_deref())?)?;
        }
        Command::Expire(cmd) => {
            let key = single_key(&cmd.key)?;
            let options = ExpireOptions {
                subkeys: cmd.subkey,
                expiration: parse_date(cmd.date.as_deref())?,
            };
            ctx.set_expiration(&key, &options)?;
        }
        Command::Addkey(cmd) => {
            let key = single_key(&cmd.key)?;
            let options = AddSubkeyOptions {
                algorithm: cmd.algo.unwrap_or(DEFAULT_ALGORITHM),
                length: cmd.length.unwrap_or(DEFAULT_LENGTH),
                expiration: parse_date(cmd.expire.as_deref())?,
                capabilities: parse_usage(cmd.usage.as_deref())?,
            };
            ctx.add_subkey(&key, &options)?;
            info!("Added a subkey to {}", key.fingerprint());
        }
        Command::Passwd(cmd) => {
            let key = single_key(&cmd.key)?;
            let new_passphrase = match &cmd.new_passphrase_env {
                Some(var) => Some(secret_from_env(var)?),
                None => None,
            };
            if let Some(secret) = &new_passphrase {
                if secret.expose_secret().is_empty() && !cmd.allow_empty {
                    return Err(Error::Usage(
                        "New passphrase is empty (use --allow-empty)".to_owned(),
                    ));
                }
            }
            let options = ChangePassphraseOptions {
                new_passphrase,
                allow_empty: cmd.allow_empty,
            };
            ctx.change_passphrase(&key, &options)?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::builder().format_timestamp(None).init();

    let opts = KeyeditOptions::parse_args_default_or_exit();

    if let Err(e) = run(opts) {
        error!("{}", e);
        process::exit(1);
    }
}
