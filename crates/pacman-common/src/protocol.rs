//! Wire codec for the named-pipe transport (C2, §4.2).
//!
//! Frames are fixed-width and native-endian, matching the reference
//! implementation's `struct` + `read`/`write` wire format. The opcode
//! (`kind`), `command`, and `result` fields are each a single byte, exactly
//! as the reference client/server read and write them; only the integer
//! payload fields (client_id, width, height, …) are 4-byte signed. Paths are
//! fixed 40-byte buffers, NUL-padded.

use std::io::{self, Read, Write};

pub const PATH_LEN: usize = 40;

pub const OP_CONNECT: u8 = 1;
pub const OP_DISCONNECT: u8 = 2;
pub const OP_PLAY: u8 = 3;
pub const OP_BOARD: u8 = 4;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("unexpected opcode {0}")]
    UnexpectedOpcode(u8),
    #[error("path field is not valid UTF-8")]
    InvalidPath,
    #[error("path longer than {PATH_LEN} bytes")]
    PathTooLong,
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError> {
    let mut read = 0;
    while read < buf.len() {
        let n = r.read(&mut buf[read..])?;
        if n == 0 {
            return Err(ProtocolError::ShortRead {
                expected: buf.len(),
                got: read,
            });
        }
        read += n;
    }
    Ok(())
}

fn read_kind<R: Read>(r: &mut R) -> Result<u8, ProtocolError> {
    let mut kind_buf = [0u8; 1];
    read_exact_or_eof(r, &mut kind_buf)?;
    Ok(kind_buf[0])
}

fn expect_kind<R: Read>(r: &mut R, expected: u8) -> Result<(), ProtocolError> {
    let kind = read_kind(r)?;
    if kind != expected {
        return Err(ProtocolError::UnexpectedOpcode(kind));
    }
    Ok(())
}

fn write_path_field(path: &str) -> Result<[u8; PATH_LEN], ProtocolError> {
    if path.len() >= PATH_LEN {
        return Err(ProtocolError::PathTooLong);
    }
    let mut buf = [0u8; PATH_LEN];
    buf[..path.len()].copy_from_slice(path.as_bytes());
    Ok(buf)
}

fn read_path_field(buf: &[u8; PATH_LEN]) -> Result<String, ProtocolError> {
    let nul = buf.iter().position(|&b| b == 0).unwrap_or(PATH_LEN);
    std::str::from_utf8(&buf[..nul])
        .map(|s| s.to_string())
        .map_err(|_| ProtocolError::InvalidPath)
}

/// Client -> host: request to join, naming the two pipes the server should
/// open back to reach this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub client_id: i32,
    pub request_pipe: String,
    pub board_pipe: String,
}

impl Connect {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ProtocolError> {
        w.write_all(&[OP_CONNECT])?;
        w.write_all(&self.client_id.to_ne_bytes())?;
        w.write_all(&write_path_field(&self.request_pipe)?)?;
        w.write_all(&write_path_field(&self.board_pipe)?)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, ProtocolError> {
        expect_kind(r, OP_CONNECT)?;
        let mut id_buf = [0u8; 4];
        read_exact_or_eof(r, &mut id_buf)?;
        let client_id = i32::from_ne_bytes(id_buf);
        let mut req_buf = [0u8; PATH_LEN];
        read_exact_or_eof(r, &mut req_buf)?;
        let mut board_buf = [0u8; PATH_LEN];
        read_exact_or_eof(r, &mut board_buf)?;
        Ok(Connect {
            client_id,
            request_pipe: read_path_field(&req_buf)?,
            board_pipe: read_path_field(&board_buf)?,
        })
    }
}

/// Host -> client: acknowledges a [`Connect`], reusing `OP_CONNECT` as the
/// reply's opcode byte (matching the reference server's `resp_op_code`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectAck {
    pub accepted: bool,
}

impl ConnectAck {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ProtocolError> {
        w.write_all(&[OP_CONNECT, !self.accepted as u8])?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, ProtocolError> {
        expect_kind(r, OP_CONNECT)?;
        let mut result_buf = [0u8; 1];
        read_exact_or_eof(r, &mut result_buf)?;
        Ok(ConnectAck {
            accepted: result_buf[0] == 0,
        })
    }
}

/// Client -> session: a directional move or quit command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Play {
    pub command: char,
}

impl Play {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ProtocolError> {
        w.write_all(&[OP_PLAY, self.command as u8])?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, ProtocolError> {
        expect_kind(r, OP_PLAY)?;
        let mut cmd_buf = [0u8; 1];
        read_exact_or_eof(r, &mut cmd_buf)?;
        Ok(Play {
            command: cmd_buf[0] as char,
        })
    }
}

/// Either side -> the other: session teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnect;

impl Disconnect {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ProtocolError> {
        w.write_all(&[OP_DISCONNECT]).map_err(ProtocolError::from)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, ProtocolError> {
        expect_kind(r, OP_DISCONNECT)?;
        Ok(Disconnect)
    }
}

/// Broadcaster -> client: one rendered game tick (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFrame {
    pub width: i32,
    pub height: i32,
    pub tempo: i32,
    pub victory: i32,
    pub game_over: i32,
    pub points: i32,
    pub cells: Vec<u8>,
}

impl BoardFrame {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ProtocolError> {
        w.write_all(&[OP_BOARD])?;
        w.write_all(&self.width.to_ne_bytes())?;
        w.write_all(&self.height.to_ne_bytes())?;
        w.write_all(&self.tempo.to_ne_bytes())?;
        w.write_all(&self.victory.to_ne_bytes())?;
        w.write_all(&self.game_over.to_ne_bytes())?;
        w.write_all(&self.points.to_ne_bytes())?;
        w.write_all(&self.cells)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, ProtocolError> {
        expect_kind(r, OP_BOARD)?;
        let mut ints = [0u8; 4 * 6];
        read_exact_or_eof(r, &mut ints)?;
        let w4 = |i: usize| i32::from_ne_bytes(ints[i * 4..i * 4 + 4].try_into().unwrap());
        let width = w4(0);
        let height = w4(1);
        let tempo = w4(2);
        let victory = w4(3);
        let game_over = w4(4);
        let points = w4(5);
        let mut cells = vec![0u8; (width.max(0) * height.max(0)) as usize];
        read_exact_or_eof(r, &mut cells)?;
        Ok(BoardFrame {
            width,
            height,
            tempo,
            victory,
            game_over,
            points,
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_frame_round_trips_and_is_85_bytes() {
        let original = Connect {
            client_id: 42,
            request_pipe: "/tmp/pm_req_42".to_string(),
            board_pipe: "/tmp/pm_board_42".to_string(),
        };
        let mut buf = Vec::new();
        original.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 1 + 4 + PATH_LEN + PATH_LEN);
        let decoded = Connect::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn connect_ack_reuses_connect_opcode_and_is_2_bytes() {
        let ack = ConnectAck { accepted: true };
        let mut buf = Vec::new();
        ack.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf[0], OP_CONNECT);
        assert_eq!(buf[1], 0);
        let decoded = ConnectAck::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.accepted, true);
    }

    #[test]
    fn play_frame_carries_a_single_command_byte_and_is_2_bytes() {
        let play = Play { command: 'D' };
        let mut buf = Vec::new();
        play.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 2);
        let decoded = Play::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.command, 'D');
    }

    #[test]
    fn disconnect_frame_is_a_single_byte() {
        let mut buf = Vec::new();
        Disconnect.write_to(&mut buf).unwrap();
        assert_eq!(buf, vec![OP_DISCONNECT]);
    }

    #[test]
    fn board_frame_length_depends_on_declared_dimensions() {
        let frame = BoardFrame {
            width: 3,
            height: 2,
            tempo: 100,
            victory: 0,
            game_over: 0,
            points: 5,
            cells: b"#C@...".to_vec(),
        };
        let mut buf = Vec::new();
        frame.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 1 + 4 * 6 + 6);
        let decoded = BoardFrame::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn path_field_longer_than_buffer_is_rejected() {
        let long_path = "x".repeat(PATH_LEN);
        let connect = Connect {
            client_id: 1,
            request_pipe: long_path,
            board_pipe: "/tmp/ok".to_string(),
        };
        let mut buf = Vec::new();
        let err = connect.write_to(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::PathTooLong));
    }

    #[test]
    fn truncated_frame_is_a_short_read_error() {
        let mut buf = vec![OP_CONNECT];
        buf.extend_from_slice(&1i32.to_ne_bytes());
        let err = Connect::read_from(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ProtocolError::ShortRead { .. }));
    }

    #[test]
    fn wrong_opcode_is_rejected() {
        let mut buf = vec![OP_PLAY];
        let err = Disconnect::read_from(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedOpcode(OP_PLAY)));
    }
}
