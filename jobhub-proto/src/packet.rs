use crate::{CommandId, ProtoError};
use std::convert::TryFrom;

/// Length of the magic preamble, in bytes.
pub const MAGIC_LEN: usize = 4;
/// Length of the full fixed header (magic + command id + body length).
pub const HEADER_LEN: usize = 12;

const REQ_MAGIC: [u8; MAGIC_LEN] = *b"\0REQ";
const RES_MAGIC: [u8; MAGIC_LEN] = *b"\0RES";

/// Which direction a frame travels: a request from a connection to the
/// dispatcher, or a response the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    /// `\0REQ`
    Request,
    /// `\0RES`
    Response,
}

impl Magic {
    fn bytes(self) -> [u8; MAGIC_LEN] {
        match self {
            Magic::Request => REQ_MAGIC,
            Magic::Response => RES_MAGIC,
        }
    }

    fn from_bytes(raw: [u8; MAGIC_LEN]) -> Result<Self, ProtoError> {
        match raw {
            REQ_MAGIC => Ok(Magic::Request),
            RES_MAGIC => Ok(Magic::Response),
            other => Err(ProtoError::BadMagic(other)),
        }
    }
}

/// A single decoded binary-protocol packet: a command plus its
/// NUL-separated arguments. The final argument is the "opaque tail" for
/// commands that carry a workload or result payload, and may itself
/// contain embedded NUL bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Direction this packet was (or will be) sent in.
    pub magic: Magic,
    /// The command this packet carries.
    pub command: CommandId,
    /// NUL-separated arguments, in wire order.
    pub args: Vec<Vec<u8>>,
}

impl Packet {
    /// Build a new packet from already-split arguments.
    pub fn new(magic: Magic, command: CommandId, args: Vec<Vec<u8>>) -> Self {
        Packet {
            magic,
            command,
            args,
        }
    }

    /// Serialize this packet to its full wire representation (header and
    /// body together).
    pub fn encode(&self) -> Vec<u8> {
        let body = join_args(&self.args);
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(&self.magic.bytes());
        out.extend_from_slice(&(self.command as u32).to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Parse the 12-byte fixed header, returning the magic, command and
    /// declared body length. Does not touch the body; callers read exactly
    /// `body_len` further bytes and pass them to [`Packet::decode_body`].
    pub fn decode_header(header: &[u8]) -> Result<(Magic, CommandId, u32), ProtoError> {
        assert_eq!(header.len(), HEADER_LEN, "caller must supply a full header");
        let mut magic_raw = [0u8; MAGIC_LEN];
        magic_raw.copy_from_slice(&header[0..4]);
        let magic = Magic::from_bytes(magic_raw)?;

        let mut command_raw = [0u8; 4];
        command_raw.copy_from_slice(&header[4..8]);
        let command = CommandId::try_from(u32::from_be_bytes(command_raw))?;

        let mut len_raw = [0u8; 4];
        len_raw.copy_from_slice(&header[8..12]);
        let body_len = u32::from_be_bytes(len_raw);

        Ok((magic, command, body_len))
    }

    /// Split a fully-read body into a [`Packet`], given the magic and
    /// command already parsed from the header. `command.leading_arg_count()`
    /// decides how many leading arguments are plain tokens before the final,
    /// possibly NUL-containing, argument.
    pub fn decode_body(
        magic: Magic,
        command: CommandId,
        body: &[u8],
    ) -> Result<Self, ProtoError> {
        let args = split_args(body, command.leading_arg_count());
        Ok(Packet::new(magic, command, args))
    }
}

/// Join arguments with NUL separators, exactly as they go on the wire.
fn join_args(args: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(0);
        }
        out.extend_from_slice(arg);
    }
    out
}

/// Split a packet body on NUL bytes. `leading` bounds how many leading
/// arguments are plain NUL-terminated tokens; everything after the
/// `leading`-th separator is kept as one final argument, embedded NULs and
/// all. `None` means every argument is a plain token.
fn split_args(body: &[u8], leading: Option<usize>) -> Vec<Vec<u8>> {
    let leading = match leading {
        None => return body.split(|&b| b == 0).map(|s| s.to_vec()).collect(),
        Some(n) => n,
    };

    let mut args = Vec::with_capacity(leading + 1);
    let mut rest = body;
    for _ in 0..leading {
        match rest.iter().position(|&b| b == 0) {
            Some(pos) => {
                args.push(rest[..pos].to_vec());
                rest = &rest[pos + 1..];
            }
            None => {
                args.push(rest.to_vec());
                rest = &[];
            }
        }
    }
    args.push(rest.to_vec());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let pkt = Packet::new(
            Magic::Request,
            CommandId::SubmitJob,
            vec![b"reverse".to_vec(), b"".to_vec(), b"hello\0world".to_vec()],
        );
        let wire = pkt.encode();
        assert_eq!(&wire[0..4], b"\0REQ");

        let (magic, command, body_len) = Packet::decode_header(&wire[0..HEADER_LEN]).unwrap();
        assert_eq!(magic, Magic::Request);
        assert_eq!(command, CommandId::SubmitJob);
        let body = &wire[HEADER_LEN..HEADER_LEN + body_len as usize];
        let decoded = Packet::decode_body(magic, command, body).unwrap();
        assert_eq!(decoded.args[0], b"reverse");
        assert_eq!(decoded.args[1], b"");
        assert_eq!(decoded.args[2], b"hello\0world");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(b"FOOO");
        assert!(Packet::decode_header(&header).is_err());
    }

    #[test]
    fn simple_args_split_cleanly() {
        let args = split_args(b"foo\0bar\0baz", None);
        assert_eq!(args, vec![b"foo".to_vec(), b"bar".to_vec(), b"baz".to_vec()]);
    }
}
