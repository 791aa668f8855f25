//! Byte-stream framing: turns a connection's accumulated input bytes into
//! decoded binary packets or admin-protocol lines, and serializes outbound
//! packets/lines back to bytes. Deliberately has no socket knowledge so it
//! can be unit-tested against plain buffers.

use jobhub_core::ids::ConnId;
use jobhub_proto::{AdminRequest, Packet, ProtoError, HEADER_LEN};

/// Default ceiling on a single binary frame's body, matching the
/// production default; configurable via [`crate::config::AppSettings`].
pub const DEFAULT_MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Whether a connection has been classified as speaking the binary
/// protocol or the line-oriented admin protocol. Decided from the first
/// byte received and latched for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First byte was NUL: binary framed protocol.
    Binary,
    /// First byte was anything else: newline-terminated admin commands.
    Admin,
}

/// One fully-decoded unit of input.
#[derive(Debug)]
pub enum Inbound {
    /// A decoded binary packet.
    Packet(Packet),
    /// A parsed admin-protocol line.
    Admin(AdminRequest),
}

/// Accumulates inbound bytes for one connection and yields decoded units as
/// enough data arrives.
#[derive(Debug)]
pub struct FrameReader {
    mode: Option<Mode>,
    buf: Vec<u8>,
    max_frame_bytes: u32,
}

impl FrameReader {
    /// Build a reader with the given per-frame body-size ceiling.
    pub fn new(max_frame_bytes: u32) -> Self {
        FrameReader {
            mode: None,
            buf: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Feed freshly-read bytes in.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull every fully-buffered unit out. Returns an error (and stops
    /// decoding further units from this buffer) the first time a frame is
    /// malformed; the caller should treat the connection as dead.
    pub fn drain(&mut self) -> Result<Vec<Inbound>, ProtoError> {
        let mut out = Vec::new();
        loop {
            if self.buf.is_empty() {
                break;
            }
            if self.mode.is_none() {
                self.mode = Some(if self.buf[0] == 0 {
                    Mode::Binary
                } else {
                    Mode::Admin
                });
            }
            match self.mode.unwrap() {
                Mode::Admin => match self.take_line() {
                    Some(line) => match AdminRequest::parse(&line) {
                        Ok(req) => out.push(Inbound::Admin(req)),
                        Err(e) => return Err(e),
                    },
                    None => break,
                },
                Mode::Binary => match self.take_packet()? {
                    Some(packet) => out.push(Inbound::Packet(packet)),
                    None => break,
                },
            }
        }
        Ok(out)
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line[..line.len() - 1]);
        Some(line.trim_end_matches('\r').to_string())
    }

    fn take_packet(&mut self) -> Result<Option<Packet>, ProtoError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let (magic, command, body_len) = Packet::decode_header(&self.buf[..HEADER_LEN])?;
        if body_len > self.max_frame_bytes {
            return Err(ProtoError::FrameTooLarge {
                got: body_len,
                limit: self.max_frame_bytes,
            });
        }
        let total = HEADER_LEN + body_len as usize;
        if self.buf.len() < total {
            return Ok(None);
        }
        let frame: Vec<u8> = self.buf.drain(..total).collect();
        let packet = Packet::decode_body(magic, command, &frame[HEADER_LEN..])?;
        Ok(Some(packet))
    }
}

/// Serialize a decoded unit's reply back to wire bytes. Admin replies are
/// plain UTF-8 text (the caller supplies pre-formatted lines); binary
/// replies use the standard framed encoding.
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    packet.encode()
}

/// Tag used only for log messages and metrics labels; never sent on the
/// wire.
pub fn mode_label(conn: ConnId, mode: Mode) -> String {
    match mode {
        Mode::Binary => format!("{conn} binary"),
        Mode::Admin => format!("{conn} admin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_proto::{CommandId, Magic};

    #[test]
    fn decodes_a_binary_frame_split_across_feeds() {
        let packet = Packet::new(
            Magic::Request,
            CommandId::EchoReq,
            vec![b"hi".to_vec()],
        );
        let wire = packet.encode();

        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_BYTES);
        reader.feed(&wire[..5]);
        assert!(reader.drain().unwrap().is_empty());
        reader.feed(&wire[5..]);
        let units = reader.drain().unwrap();
        assert_eq!(units.len(), 1);
        match &units[0] {
            Inbound::Packet(p) => assert_eq!(p.args[0], b"hi"),
            _ => panic!("expected a packet"),
        }
    }

    #[test]
    fn decodes_admin_lines() {
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_BYTES);
        reader.feed(b"status\nworkers\n");
        let units = reader.drain().unwrap();
        assert_eq!(units.len(), 2);
        assert!(matches!(units[0], Inbound::Admin(AdminRequest::Status)));
        assert!(matches!(units[1], Inbound::Admin(AdminRequest::Workers)));
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut reader = FrameReader::new(4);
        let packet = Packet::new(Magic::Request, CommandId::EchoReq, vec![b"hello".to_vec()]);
        reader.feed(&packet.encode());
        assert!(reader.drain().is_err());
    }
}
