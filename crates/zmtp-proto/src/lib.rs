//! ZMTP command codec.
//!
//! Commands travel as `[name length][name][body]` inside a single frame
//! of a command-kind message.

pub mod codec;
pub mod command;

pub use codec::{decode, encode, ProtoError};
pub use command::{names, Command, MAX_NAME_LEN};
