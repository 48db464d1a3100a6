//! Wire protocol for position synchronization.
//!
//! Messages travel as single-line ASCII commands terminated by one NUL
//! byte, e.g. `MOVE 1 100 200\0`. Three kinds exist:
//!
//! - `ID <n>` assigns slot `n` to the receiving client.
//! - `MOVE <id> <x> <y>` reports a player's new position.
//! - `SYNC <id> <x> <y>` is the server's authoritative snapshot of an
//!   existing player, sent to bring a joiner up to date or to announce a
//!   newcomer to everyone else.
//!
//! TCP delivers a byte stream, not datagrams, so a single read may carry
//! a partial message or several concatenated ones. [`FrameBuffer`]
//! reassembles NUL-delimited frames across reads; [`Message::decode`]
//! turns one frame into a message and reports malformed input as a
//! [`ParseError`] instead of failing hard.

use log::warn;
use thiserror::Error;

/// Byte that terminates every frame on the wire.
pub const FRAME_DELIMITER: u8 = 0;

/// Longest well-formed frame is `MOVE 255 -2147483648 -2147483648` at 32
/// bytes. Anything pending beyond this without a delimiter is garbage.
const MAX_FRAME_LEN: usize = 64;

/// A decoded wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Identity assignment for the receiving client.
    Id { slot: u8 },
    /// A player moved to `(x, y)`.
    Move { slot: u8, x: i32, y: i32 },
    /// Authoritative snapshot of a player's position.
    Sync { slot: u8, x: i32, y: i32 },
}

/// Why a frame failed to decode. Malformed frames are dropped by the
/// sessions, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty frame")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{command} takes {expected} fields, got {found}")]
    FieldCount {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("non-numeric field {0:?}")]
    InvalidNumber(String),
    #[error("frame is not valid UTF-8")]
    NotText,
}

impl Message {
    /// Encodes the message as ASCII text with the trailing delimiter.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = match self {
            Message::Id { slot } => format!("ID {slot}"),
            Message::Move { slot, x, y } => format!("MOVE {slot} {x} {y}"),
            Message::Sync { slot, x, y } => format!("SYNC {slot} {x} {y}"),
        }
        .into_bytes();
        bytes.push(FRAME_DELIMITER);
        bytes
    }

    /// Decodes one frame, with or without its trailing delimiter.
    pub fn decode(frame: &[u8]) -> Result<Message, ParseError> {
        let body = match frame.split_last() {
            Some((&FRAME_DELIMITER, body)) => body,
            _ => frame,
        };
        let text = std::str::from_utf8(body).map_err(|_| ParseError::NotText)?;

        let mut parts = text.split_whitespace();
        let command = parts.next().ok_or(ParseError::Empty)?;
        let fields: Vec<&str> = parts.collect();

        match command {
            "ID" => {
                expect_fields("ID", &fields, 1)?;
                Ok(Message::Id {
                    slot: parse_field(fields[0])?,
                })
            }
            "MOVE" => {
                expect_fields("MOVE", &fields, 3)?;
                Ok(Message::Move {
                    slot: parse_field(fields[0])?,
                    x: parse_field(fields[1])?,
                    y: parse_field(fields[2])?,
                })
            }
            "SYNC" => {
                expect_fields("SYNC", &fields, 3)?;
                Ok(Message::Sync {
                    slot: parse_field(fields[0])?,
                    x: parse_field(fields[1])?,
                    y: parse_field(fields[2])?,
                })
            }
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

fn expect_fields(
    command: &'static str,
    fields: &[&str],
    expected: usize,
) -> Result<(), ParseError> {
    if fields.len() != expected {
        return Err(ParseError::FieldCount {
            command,
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn parse_field<T: std::str::FromStr>(field: &str) -> Result<T, ParseError> {
    field
        .parse()
        .map_err(|_| ParseError::InvalidNumber(field.to_string()))
}

/// Reassembles NUL-delimited frames from an arbitrary sequence of reads.
///
/// Each session owns one buffer per connection. Bytes go in via
/// [`FrameBuffer::feed`]; complete frames (delimiter stripped) come out.
/// A partial frame stays pending until the rest arrives. Pending data
/// that outgrows [`MAX_FRAME_LEN`] without a delimiter cannot be a valid
/// message and is discarded.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly read bytes and returns every frame they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == FRAME_DELIMITER) {
            let mut frame: Vec<u8> = self.pending.drain(..=end).collect();
            frame.pop();
            frames.push(frame);
        }

        if self.pending.len() > MAX_FRAME_LEN {
            warn!(
                "discarding {} unterminated bytes from peer",
                self.pending.len()
            );
            self.pending.clear();
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_formats() {
        assert_eq!(Message::Id { slot: 1 }.encode(), b"ID 1\0");
        assert_eq!(
            Message::Move {
                slot: 1,
                x: 100,
                y: 200
            }
            .encode(),
            b"MOVE 1 100 200\0"
        );
        assert_eq!(
            Message::Sync {
                slot: 0,
                x: -5,
                y: 784
            }
            .encode(),
            b"SYNC 0 -5 784\0"
        );
    }

    #[test]
    fn test_roundtrip_all_kinds() {
        let messages = [
            Message::Id { slot: 3 },
            Message::Move {
                slot: 1,
                x: 100,
                y: 200,
            },
            Message::Move {
                slot: 2,
                x: -40,
                y: i32::MIN,
            },
            Message::Sync {
                slot: 0,
                x: 0,
                y: i32::MAX,
            },
        ];

        for message in messages {
            assert_eq!(Message::decode(&message.encode()), Ok(message));
        }
    }

    #[test]
    fn test_decode_without_delimiter() {
        assert_eq!(
            Message::decode(b"MOVE 1 10 20"),
            Ok(Message::Move {
                slot: 1,
                x: 10,
                y: 20
            })
        );
    }

    #[test]
    fn test_decode_unknown_command() {
        assert_eq!(
            Message::decode(b"JUMP 1 2 3\0"),
            Err(ParseError::UnknownCommand("JUMP".to_string()))
        );
    }

    #[test]
    fn test_decode_wrong_field_count() {
        assert_eq!(
            Message::decode(b"MOVE 1 10\0"),
            Err(ParseError::FieldCount {
                command: "MOVE",
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            Message::decode(b"ID\0"),
            Err(ParseError::FieldCount {
                command: "ID",
                expected: 1,
                found: 0
            })
        );
        assert_eq!(
            Message::decode(b"SYNC 1 2 3 4\0"),
            Err(ParseError::FieldCount {
                command: "SYNC",
                expected: 3,
                found: 4
            })
        );
    }

    #[test]
    fn test_decode_non_numeric_field() {
        assert_eq!(
            Message::decode(b"MOVE one 10 20\0"),
            Err(ParseError::InvalidNumber("one".to_string()))
        );
        // Slot ids are u8; negative or oversized values are rejected.
        assert_eq!(
            Message::decode(b"ID -1\0"),
            Err(ParseError::InvalidNumber("-1".to_string()))
        );
        assert_eq!(
            Message::decode(b"ID 300\0"),
            Err(ParseError::InvalidNumber("300".to_string()))
        );
    }

    #[test]
    fn test_decode_empty_and_binary_garbage() {
        assert_eq!(Message::decode(b""), Err(ParseError::Empty));
        assert_eq!(Message::decode(b"\0"), Err(ParseError::Empty));
        assert_eq!(Message::decode(b"   \0"), Err(ParseError::Empty));
        assert_eq!(
            Message::decode(&[0xFF, 0xFE, 0x01]),
            Err(ParseError::NotText)
        );
    }

    #[test]
    fn test_frame_buffer_partial_then_rest() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.feed(b"MOVE 1 1").is_empty());
        let frames = buffer.feed(b"0 20\0");
        assert_eq!(frames, vec![b"MOVE 1 10 20".to_vec()]);
    }

    #[test]
    fn test_frame_buffer_coalesced_messages() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.feed(b"ID 1\0SYNC 0 5 5\0MOVE 2 7");
        assert_eq!(frames, vec![b"ID 1".to_vec(), b"SYNC 0 5 5".to_vec()]);
        assert_eq!(buffer.feed(b" 8\0"), vec![b"MOVE 2 7 8".to_vec()]);
    }

    #[test]
    fn test_frame_buffer_drops_oversized_junk() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.feed(&[b'x'; 100]).is_empty());
        // Junk was discarded, so a fresh frame still decodes cleanly.
        assert_eq!(buffer.feed(b"ID 2\0"), vec![b"ID 2".to_vec()]);
    }
}
