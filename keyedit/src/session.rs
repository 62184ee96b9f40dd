//! Routes each turn of an edit session to the handler for the running operation.

use log::{debug, trace};

use crate::{
    edit::{Handler, Operation},
    error::Error,
    format::{Event, Response, Status},
    passphrase::{self, PassphraseSource, PassphraseState},
    Conversation,
};

pub(crate) struct Session<'a> {
    operation: Operation,
    state: PassphraseState,
    source: &'a mut PassphraseSource,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        operation: Operation,
        state: PassphraseState,
        source: &'a mut PassphraseSource,
    ) -> Self {
        Session {
            operation,
            state,
            source,
        }
    }

    /// Ends the session, handing back the operation's progress and the
    /// updated passphrase state.
    pub(crate) fn finish(self) -> (Operation, PassphraseState) {
        (self.operation, self.state)
    }

    fn dispatch(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        let handler: &mut dyn Handler = match &mut self.operation {
            // Changing the passphrase needs to see every passphrase advisory itself.
            Operation::Passphrase(edit) => {
                return edit.respond(event, &mut self.state, self.source)
            }
            Operation::Sign(edit) => edit,
            Operation::RevokeSignature(edit) => edit,
            Operation::DeleteSignature(edit) => edit,
            Operation::EnableDisable(edit) => edit,
            Operation::Trust(edit) => edit,
            Operation::AddSubkey(edit) => edit,
            Operation::Expire(edit) => edit,
        };

        if event.status() == Status::GoodPassphrase {
            self.state.passphrase_accepted();
            return Ok(Response::Nothing);
        }
        if let Some(response) = passphrase::intercept(&mut self.state, self.source, event) {
            return Ok(response);
        }

        handler.respond(event)
    }
}

impl<'a> Conversation for Session<'a> {
    fn respond(&mut self, event: &Event<'_>) -> Result<Response, Error> {
        trace!("{:?}: {:?} {:?}", self.operation.kind(), event.status(), event.args());

        let response = self.dispatch(event);
        match &response {
            Ok(Response::Line(answer)) => debug!("{:?} -> {}", event.prompt(), answer),
            Ok(Response::Secret(_)) => debug!("{:?} -> <secret>", event.prompt()),
            Ok(Response::Abort) => debug!("{:?} -> abort", event.prompt()),
            Ok(Response::Nothing) => (),
            Err(e) => debug!("{:?} failed: {}", event.prompt(), e),
        }
        response
    }
}
