//! Wire protocol for the job-dispatch server.
//!
//! This crate has no knowledge of sockets, threads or the dispatch data
//! model: it only knows how to turn bytes on a stream into [`Packet`]s and
//! back, and how to parse the line-oriented admin protocol.

mod admin;
mod command;
mod error;
mod packet;

pub use admin::AdminRequest;
pub use command::CommandId;
pub use error::ProtoError;
pub use packet::{Magic, Packet, HEADER_LEN, MAGIC_LEN};
