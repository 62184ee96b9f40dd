//! An [`EditEngine`] that runs the `gpg` binary.

use cookie_factory::SerializeFn;
use log::{debug, trace, warn};
use secrecy::ExposeSecret;
use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    error::Error,
    format::{read, write, Event, Response},
    Conversation, EditEngine,
};

const BINARY_NAMES: &[&str] = &["gpg", "gpg2"];

/// Runs edit sessions by spawning `gpg --edit-key`.
#[derive(Clone, Debug)]
pub struct Gpg {
    program: PathBuf,
    homedir: Option<PathBuf>,
    expert: bool,
}

impl Gpg {
    /// Locates `gpg` (or `gpg2`) on the `PATH`.
    pub fn new() -> Result<Self, Error> {
        BINARY_NAMES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Gpg::with_program)
            .ok_or(Error::BackendNotFound)
    }

    /// Uses the given binary instead of searching the `PATH`.
    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Gpg {
            program: program.into(),
            homedir: None,
            expert: false,
        }
    }

    /// Uses `homedir` as the keyring directory.
    pub fn homedir<P: Into<PathBuf>>(mut self, homedir: P) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    /// Expert mode lets subkeys be created with any algorithm.
    pub fn expert(mut self, expert: bool) -> Self {
        self.expert = expert;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn args(&self, fingerprint: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--batch",
            "--no-tty",
            "--status-fd",
            "1",
            "--command-fd",
            "0",
            "--pinentry-mode",
            "loopback",
        ]
        .iter()
        .map(|&s| s.to_owned())
        .collect();
        if let Some(homedir) = &self.homedir {
            args.push("--homedir".to_owned());
            args.push(homedir.to_string_lossy().into_owned());
        }
        if self.expert {
            args.push("--expert".to_owned());
        }
        args.push("--edit-key".to_owned());
        args.push(fingerprint.to_owned());
        args
    }
}

impl EditEngine for Gpg {
    fn edit_key(
        &mut self,
        fingerprint: &str,
        conversation: &mut dyn Conversation,
    ) -> Result<(), Error> {
        let args = self.args(fingerprint);
        debug!("Running {} {}", self.program.display(), args.join(" "));

        let mut conn = Connection::open(&self.program, &args)?;
        match conn.converse(conversation) {
            Ok(()) => conn.finish(),
            Err(e) => {
                conn.kill();
                Err(e)
            }
        }
    }
}

struct Connection {
    child: Child,
    output: ChildStdin,
    input: BufReader<ChildStdout>,
    buffer: Vec<u8>,
}

fn pipe_error(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("could not open {}", name))
}

fn write_reply<'a, F: SerializeFn<&'a mut ChildStdin>>(
    output: &'a mut ChildStdin,
    f: F,
) -> io::Result<()> {
    cookie_factory::gen_simple(f, output)
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("failed to write answer: {}", e),
            )
        })?
        .flush()
}

/// Views `bytes` as text. Invalid UTF-8 is replaced in a copy held by
/// `scratch`, so the copy is wiped along with it.
fn decode<'a>(bytes: &'a [u8], scratch: &'a mut Zeroizing<String>) -> &'a str {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => text,
        Cow::Owned(text) => {
            **scratch = text;
            scratch.as_str()
        }
    }
}

impl Connection {
    fn open(program: &Path, args: &[String]) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let output = child.stdin.take().ok_or_else(|| pipe_error("stdin"))?;
        let input = match child.stdout.take() {
            Some(stdout) => BufReader::new(stdout),
            None => {
                let _ = child.kill();
                return Err(pipe_error("stdout"));
            }
        };
        Ok(Connection {
            child,
            output,
            input,
            buffer: Vec::new(),
        })
    }

    /// Feeds status lines to `conversation` until the backend closes its
    /// output.
    fn converse(&mut self, conversation: &mut dyn Conversation) -> Result<(), Error> {
        let Connection {
            output,
            input,
            buffer,
            ..
        } = self;

        loop {
            // We are finished with the previous turn, which may have echoed a user ID.
            buffer.zeroize();
            buffer.clear();
            if input.read_until(b'\n', buffer)? == 0 {
                return Ok(());
            }

            let mut decoded = Zeroizing::new(String::new());
            let line = decode(buffer, &mut decoded).trim_end_matches(&['\r', '\n'][..]);
            let (status, args) = match read::status_line(line) {
                Ok((_, parsed)) => parsed,
                Err(_) => {
                    trace!("Skipping non-status output");
                    continue;
                }
            };

            let event = Event::new(status, args);
            match conversation.respond(&event)? {
                Response::Nothing if status.needs_response() => {
                    // The backend blocks until it reads a line.
                    write_reply(output, write::line(""))?
                }
                Response::Nothing => (),
                Response::Line(answer) => write_reply(output, write::line(&answer))?,
                Response::Secret(secret) => write_reply(
                    output,
                    write::secret(secret.expose_secret().as_bytes()),
                )?,
                Response::Abort => return Err(Error::Aborted),
            }
        }
    }

    fn finish(self) -> Result<(), Error> {
        let Connection {
            mut child,
            output,
            mut buffer,
            ..
        } = self;
        buffer.zeroize();
        drop(output);

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            warn!("gpg exited with {}", status);
            Err(Error::Backend {
                code: status.code(),
            })
        }
    }

    fn kill(self) {
        let Connection {
            mut child,
            mut buffer,
            ..
        } = self;
        buffer.zeroize();
        if let Err(e) = child.kill() {
            debug!("Failed to kill gpg: {}", e);
        }
        let _ = child.wait();
    }
}

#[cfg(test)]
mod tests {
    use zeroize::Zeroizing;

    use super::{decode, Gpg};

    #[test]
    fn invalid_utf8_is_decoded_into_scratch() {
        let mut scratch = Zeroizing::new(String::new());
        assert_eq!(
            decode(b"[GNUPG:] GET_LINE keyedit.prompt", &mut scratch),
            "[GNUPG:] GET_LINE keyedit.prompt"
        );
        assert!(scratch.is_empty());

        let mut scratch = Zeroizing::new(String::new());
        let line = decode(b"[GNUPG:] USERID_HINT AAAABBBBCCCCDDDD Al\xffce", &mut scratch);
        assert_eq!(line, "[GNUPG:] USERID_HINT AAAABBBBCCCCDDDD Al\u{fffd}ce");
        assert_eq!(
            scratch.as_str(),
            "[GNUPG:] USERID_HINT AAAABBBBCCCCDDDD Al\u{fffd}ce"
        );
    }

    #[test]
    fn edit_key_arguments() {
        let gpg = Gpg::with_program("/usr/bin/gpg");
        assert_eq!(
            gpg.args("0123456789ABCDEF0123456789ABCDEF01234567"),
            vec![
                "--batch",
                "--no-tty",
                "--status-fd",
                "1",
                "--command-fd",
                "0",
                "--pinentry-mode",
                "loopback",
                "--edit-key",
                "0123456789ABCDEF0123456789ABCDEF01234567",
            ]
        );
    }

    #[test]
    fn homedir_and_expert_precede_the_key() {
        let gpg = Gpg::with_program("gpg")
            .homedir("/tmp/keyring")
            .expert(true);
        let args = gpg.args("ABCD");
        assert_eq!(
            &args[8..],
            &["--homedir", "/tmp/keyring", "--expert", "--edit-key", "ABCD"]
        );
    }
}
