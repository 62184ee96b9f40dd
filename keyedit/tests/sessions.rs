use keyedit::{
    AddSubkeyOptions, CallbackResult, Callbacks, Capabilities, ChangePassphraseOptions, Context,
    Conversation, EditEngine, Error, Event, Key, OwnerTrust, PassphraseInfo, Response,
    SignOptions, Status,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};

/// Replays a fixed transcript and records every answer.
struct Scripted {
    events: Vec<Event<'static>>,
    answers: Vec<String>,
    exit_code: Option<i32>,
}

impl Scripted {
    fn new(events: Vec<Event<'static>>) -> Self {
        Scripted {
            events,
            answers: vec![],
            exit_code: None,
        }
    }

    fn failing(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

impl EditEngine for Scripted {
    fn edit_key(
        &mut self,
        _fingerprint: &str,
        conversation: &mut dyn Conversation,
    ) -> Result<(), Error> {
        self.answers.clear();
        for event in &self.events {
            match conversation.respond(event)? {
                Response::Nothing => (),
                Response::Line(line) => self.answers.push(line),
                Response::Secret(secret) => self
                    .answers
                    .push(format!("secret:{}", secret.expose_secret())),
                Response::Abort => return Err(Error::Aborted),
            }
        }
        match self.exit_code {
            Some(code) => Err(Error::Backend { code: Some(code) }),
            None => Ok(()),
        }
    }
}

/// Records every request and answers from a queue.
#[derive(Clone)]
struct Recorder {
    answers: Arc<Mutex<Vec<Option<&'static str>>>>,
    requests: Arc<Mutex<Vec<PassphraseInfo>>>,
}

impl Recorder {
    fn new(answers: Vec<Option<&'static str>>) -> Self {
        Recorder {
            answers: Arc::new(Mutex::new(answers)),
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    fn requests(&self) -> Vec<PassphraseInfo> {
        self.requests.lock().unwrap().clone()
    }
}

impl Callbacks for Recorder {
    fn request_passphrase(&mut self, info: &PassphraseInfo) -> Option<SecretString> {
        self.requests.lock().unwrap().push(info.clone());
        let next = self.answers.lock().unwrap().remove(0);
        next.map(|s| SecretString::new(s.to_owned()))
    }
}

fn unlock() -> Vec<Event<'static>> {
    vec![
        Event::new(
            Status::UseridHint,
            Some("AAAABBBBCCCCDDDD Alice <alice@example.org>"),
        ),
        Event::new(
            Status::NeedPassphrase,
            Some("1111222233334444 AAAABBBBCCCCDDDD 1 3072"),
        ),
        Event::get_hidden("passphrase.enter"),
    ]
}

fn sign_transcript() -> Vec<Event<'static>> {
    let mut events = vec![
        Event::get_line("keyedit.prompt"),
        Event::get_line("keyedit.prompt"),
        Event::get_line("keyedit.prompt"),
    ];
    events.extend(unlock());
    events.extend(vec![
        Event::new(Status::GoodPassphrase, None),
        Event::get_bool("sign_uid.okay"),
        Event::get_line("keyedit.prompt"),
    ]);
    events
}

#[test]
fn sign_selected_user_ids() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut ctx = Context::new(Scripted::new(sign_transcript()))
        .with_passphrase(SecretString::new("sesame".to_owned()));
    let options = SignOptions {
        uids: vec![2, 5],
        ..Default::default()
    };

    ctx.sign(&key, &options).unwrap();
    assert_eq!(
        ctx.engine().answers,
        vec!["uid 2", "uid 5", "sign", "secret:sesame", "Y", "save"]
    );
    assert_eq!(
        key.passphrase_state().uid_hint(),
        Some("AAAABBBBCCCCDDDD Alice <alice@example.org>")
    );
}

#[test]
fn repeated_sessions_start_from_scratch() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut ctx = Context::new(Scripted::new(sign_transcript()))
        .with_passphrase(SecretString::new("sesame".to_owned()));
    let options = SignOptions {
        uids: vec![2, 5],
        ..Default::default()
    };

    ctx.sign(&key, &options).unwrap();
    let first = ctx.engine().answers.clone();
    ctx.sign(&key, &options).unwrap();
    assert_eq!(ctx.engine().answers, first);
}

#[test]
fn already_signed_is_an_error() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut ctx = Context::new(Scripted::new(vec![
        Event::get_line("keyedit.prompt"),
        Event::new(Status::AlreadySigned, Some("AAAABBBBCCCCDDDD")),
        Event::get_line("keyedit.prompt"),
    ]));

    match ctx.sign(&key, &SignOptions::default()) {
        Err(Error::AlreadySigned(signer)) => assert_eq!(signer, "AAAABBBBCCCCDDDD"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ctx.engine().answers, vec!["sign"]);
}

#[test]
fn invalid_options_never_start_a_session() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut ctx = Context::new(Scripted::new(sign_transcript()));
    ctx.engine_mut().answers.push("untouched".to_owned());

    let options = SignOptions {
        uids: vec![0],
        ..Default::default()
    };
    match ctx.sign(&key, &options) {
        Err(Error::InvalidOptions(_)) => (),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ctx.engine().answers, vec!["untouched"]);
}

#[test]
fn add_subkey_outside_expert_mode() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut ctx = Context::new(Scripted::new(vec![
        Event::get_line("keyedit.prompt"),
        Event::get_line("keygen.algo"),
        Event::get_line("keygen.algo"),
        Event::get_line("keygen.size"),
        Event::get_line("keygen.valid"),
        Event::get_line("keyedit.prompt"),
        Event::get_bool("keyedit.save.okay"),
    ]));
    let options = AddSubkeyOptions {
        algorithm: 8,
        length: 2048,
        expiration: None,
        capabilities: Capabilities::default(),
    };

    match ctx.add_subkey(&key, &options) {
        Err(Error::CustomizationIgnored) => (),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        ctx.engine().answers,
        vec!["addkey", "8", "2", "2048", "0", "quit", "N"]
    );
}

#[test]
fn bad_passphrase_is_reported_and_remembered() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut events = vec![Event::get_line("keyedit.prompt")];
    events.extend(unlock());
    events.push(Event::new(Status::BadPassphrase, Some("1111222233334444")));
    let recorder = Recorder::new(vec![Some("wrong"), Some("right")]);
    let mut ctx = Context::new(Scripted::new(events).failing(2)).with_callbacks(recorder.clone());

    match ctx.set_owner_trust(&key, OwnerTrust::Full) {
        Err(Error::BadPassphrase { uid_hint, key_id }) => {
            assert_eq!(uid_hint.as_deref(), Some("Alice <alice@example.org>"));
            assert_eq!(key_id.as_deref(), Some("1111222233334444"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(key.passphrase_state().previous_was_bad());

    // The next session tells the callback that the last attempt failed, and
    // clears the flag once the backend accepts the passphrase.
    let mut events = vec![Event::get_line("keyedit.prompt")];
    events.extend(unlock());
    events.extend(vec![
        Event::new(Status::GoodPassphrase, None),
        Event::get_line("edit_ownertrust.value"),
        Event::get_line("keyedit.prompt"),
    ]);
    *ctx.engine_mut() = Scripted::new(events);

    ctx.set_owner_trust(&key, OwnerTrust::Full).unwrap();
    assert_eq!(
        ctx.engine().answers,
        vec!["trust", "secret:right", "4", "quit"]
    );
    let requests = recorder.requests();
    assert!(!requests[0].previous_was_bad);
    assert!(requests[1].previous_was_bad);
    assert!(!key.passphrase_state().previous_was_bad());
}

#[test]
fn cancellation_ends_real_answers() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut events = vec![Event::get_line("keyedit.prompt")];
    events.extend(unlock());
    events.push(Event::get_hidden("passphrase.enter"));
    let recorder = Recorder::new(vec![None, Some("never asked")]);
    let mut ctx = Context::new(Scripted::new(events).failing(2)).with_callbacks(recorder.clone());

    match ctx.set_enabled(&key, false) {
        Err(Error::Canceled) => (),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ctx.engine().answers, vec!["disable", "secret:", "secret:"]);
    assert_eq!(recorder.requests().len(), 1);
    assert_eq!(key.passphrase_state().last_result(), CallbackResult::Canceled);
}

#[test]
fn change_passphrase_with_callbacks() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut events = vec![Event::get_line("keyedit.prompt")];
    events.extend(unlock());
    events.extend(vec![
        Event::new(Status::GoodPassphrase, None),
        Event::get_hidden("passphrase.enter"),
        Event::new(Status::GoodPassphrase, None),
        Event::get_line("keyedit.prompt"),
    ]);
    let recorder = Recorder::new(vec![Some("old"), Some("new")]);
    let mut ctx = Context::new(Scripted::new(events)).with_callbacks(recorder.clone());

    ctx.change_passphrase(&key, &ChangePassphraseOptions::default())
        .unwrap();
    assert_eq!(
        ctx.engine().answers,
        vec!["passwd", "secret:old", "secret:new", "save"]
    );
    let purposes: Vec<_> = recorder.requests().iter().map(|r| r.purpose).collect();
    assert_eq!(
        purposes,
        vec![keyedit::Purpose::Current, keyedit::Purpose::New]
    );
}

#[test]
fn change_passphrase_needs_a_new_passphrase() {
    let key = Key::new("0123456789ABCDEF0123456789ABCDEF01234567");
    let mut ctx = Context::new(Scripted::new(vec![]))
        .with_passphrase(SecretString::new("old".to_owned()));

    match ctx.change_passphrase(&key, &ChangePassphraseOptions::default()) {
        Err(Error::InvalidOptions(_)) => (),
        other => panic!("unexpected {:?}", other),
    }
}
