//! ZMTP command definitions.
//!
//! A command is a short name plus an opaque body. Decoded commands borrow
//! from the frame they were parsed out of; use [`Command::into_owned`] to
//! keep one past the frame's lifetime.

use std::borrow::Cow;

use zmtp_core::{Message, MessageKind};

use crate::codec::{self, ProtoError};

/// Longest name the one-byte length prefix can describe.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Command names defined by ZMTP 3.x.
///
/// These are opaque tokens here; the handshake layer gives them meaning.
pub mod names {
    pub const CANCEL: &str = "CANCEL";
    pub const ERROR: &str = "ERROR";
    pub const HELLO: &str = "HELLO";
    pub const INITIATE: &str = "INITIATE";
    pub const PING: &str = "PING";
    pub const PONG: &str = "PONG";
    pub const READY: &str = "READY";
    pub const SUBSCRIBE: &str = "SUBSCRIBE";
    pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
    pub const WELCOME: &str = "WELCOME";

    /// All standard names.
    pub const ALL: [&str; 10] = [
        CANCEL, ERROR, HELLO, INITIATE, PING, PONG, READY, SUBSCRIBE, UNSUBSCRIBE, WELCOME,
    ];
}

/// One ZMTP control command.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Command<'a> {
    pub name: Cow<'a, str>,
    pub body: Cow<'a, [u8]>,
}

impl<'a> Command<'a> {
    /// Create a command from a name and body.
    pub fn new(name: impl Into<Cow<'a, str>>, body: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Create a command with an empty body.
    pub fn named(name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            body: Cow::Borrowed(&[]),
        }
    }

    /// Detach from any borrowed input.
    pub fn into_owned(self) -> Command<'static> {
        Command {
            name: Cow::Owned(self.name.into_owned()),
            body: Cow::Owned(self.body.into_owned()),
        }
    }

    /// Length of the encoded form.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        1 + self.name.len() + self.body.len()
    }

    /// Encode into a single-frame message flagged as a command.
    pub fn to_message(&self) -> Result<Message, ProtoError> {
        let mut msg = Message::new(codec::encode(self)?);
        msg.set_kind(MessageKind::Command);
        Ok(msg)
    }

    /// Decode the first frame of a command message.
    ///
    /// The result borrows from `msg`.
    pub fn from_message(msg: &'a Message) -> Result<Self, ProtoError> {
        if !msg.is_command() {
            return Err(ProtoError::NotCommand);
        }
        let frame = msg.frame(0).ok_or(ProtoError::Truncated)?;
        codec::decode(frame)
    }
}
