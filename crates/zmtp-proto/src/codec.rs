//! ZMTP command codec.
//!
//! Wire layout: `[name length: u8][name][body]`. The body runs to the end
//! of the frame.

use std::borrow::Cow;

use zmtp_core::Buffer;

use crate::command::{Command, MAX_NAME_LEN};

/// Codec error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    /// Input has no length byte.
    #[error("truncated command: no name length byte")]
    Truncated,

    /// Name length points past the end of the input.
    #[error("malformed command: name length {declared} exceeds {available} available bytes")]
    Malformed {
        /// Length from the prefix byte
        declared: usize,
        /// Bytes following the prefix
        available: usize,
    },

    /// Name does not fit the one-byte length prefix.
    #[error("command name is {len} bytes (max {max})", max = MAX_NAME_LEN)]
    NameTooLong {
        /// Name length in bytes
        len: usize,
    },

    /// Message is not flagged as a command.
    #[error("message is not a command")]
    NotCommand,
}

/// Parse a command from one frame.
///
/// The name is read as UTF-8, with invalid sequences replaced. The body
/// borrows from `data`.
#[inline]
pub fn decode(data: &[u8]) -> Result<Command<'_>, ProtoError> {
    let (&declared, rest) = data.split_first().ok_or(ProtoError::Truncated)?;
    let declared = declared as usize;

    if declared > rest.len() {
        return Err(ProtoError::Malformed {
            declared,
            available: rest.len(),
        });
    }

    let (name, body) = rest.split_at(declared);
    Ok(Command {
        name: String::from_utf8_lossy(name),
        body: Cow::Borrowed(body),
    })
}

/// Serialize a command into a new buffer of exactly its encoded length.
pub fn encode(cmd: &Command<'_>) -> Result<Buffer, ProtoError> {
    let name = cmd.name.as_bytes();
    if name.len() > MAX_NAME_LEN {
        return Err(ProtoError::NameTooLong { len: name.len() });
    }

    let mut buf = Vec::with_capacity(cmd.encoded_len());
    buf.push(name.len() as u8);
    buf.extend_from_slice(name);
    buf.extend_from_slice(&cmd.body);
    Ok(Buffer::from_vec(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::names;
    use proptest::prelude::*;

    #[test]
    fn test_ping_round_trip() {
        let cmd = Command::named(names::PING);
        let wire = encode(&cmd).unwrap();
        assert_eq!(wire, b"\x04PING");
        assert_eq!(wire.capacity(), 5);

        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded.name, "PING");
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn test_body_follows_name() {
        let wire = [5, b'H', b'E', b'L', b'L', b'O', 1, 2, 3];
        let cmd = decode(&wire).unwrap();
        assert_eq!(cmd.name, names::HELLO);
        assert_eq!(&cmd.body[..], &[1, 2, 3]);
    }

    #[test]
    fn test_body_aliases_input() {
        let wire = [4, b'P', b'O', b'N', b'G', 9, 9];
        let cmd = decode(&wire).unwrap();
        match cmd.body {
            Cow::Borrowed(body) => assert_eq!(body.as_ptr(), wire[5..].as_ptr()),
            Cow::Owned(_) => panic!("body was copied"),
        }
    }

    #[test]
    fn test_empty_name_allowed() {
        let cmd = decode(&[0, 7]).unwrap();
        assert_eq!(cmd.name, "");
        assert_eq!(&cmd.body[..], &[7]);
    }

    #[test]
    fn test_decode_empty_is_truncated() {
        assert_eq!(decode(&[]), Err(ProtoError::Truncated));
    }

    #[test]
    fn test_decode_short_name_is_malformed() {
        assert_eq!(
            decode(&[5, b'H', b'I']),
            Err(ProtoError::Malformed {
                declared: 5,
                available: 2
            })
        );
    }

    #[test]
    fn test_name_exactly_fills_input() {
        let cmd = decode(b"\x05READY").unwrap();
        assert_eq!(cmd.name, names::READY);
        assert!(cmd.body.is_empty());
    }

    #[test]
    fn test_encode_name_too_long() {
        let name = "X".repeat(256);
        let cmd = Command::named(name.as_str());
        assert_eq!(encode(&cmd), Err(ProtoError::NameTooLong { len: 256 }));

        let name = "X".repeat(255);
        let wire = encode(&Command::named(name.as_str())).unwrap();
        assert_eq!(wire[0], 255);
        assert_eq!(wire.len(), 256);
    }

    #[test]
    fn test_invalid_utf8_name_is_replaced() {
        let cmd = decode(&[2, 0xFF, b'A', 1]).unwrap();
        assert_eq!(cmd.name, "\u{FFFD}A");
        assert_eq!(&cmd.body[..], &[1]);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProtoError::NameTooLong { len: 300 }.to_string(),
            "command name is 300 bytes (max 255)"
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(name in "[A-Za-z0-9-]{0,255}", body in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cmd = Command::new(name.as_str(), body.as_slice());
            let wire = encode(&cmd).unwrap();
            prop_assert_eq!(wire.len(), 1 + name.len() + body.len());
            prop_assert_eq!(wire.capacity(), wire.len());

            let decoded = decode(&wire).unwrap();
            prop_assert_eq!(decoded, cmd);
        }

        #[test]
        fn prop_decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..300)) {
            match decode(&data) {
                Ok(cmd) => prop_assert_eq!(cmd.body.len(), data.len() - 1 - data[0] as usize),
                Err(ProtoError::Truncated) => prop_assert!(data.is_empty()),
                Err(ProtoError::Malformed { declared, available }) => {
                    prop_assert!(declared > available);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
