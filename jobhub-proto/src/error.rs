/// Errors produced while decoding wire or admin-protocol data.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum ProtoError {
    /// The 4-byte magic at the start of a frame was neither `\0REQ` nor `\0RES`.
    #[error("bad magic bytes: {0:?}")]
    BadMagic([u8; 4]),

    /// The command id in the frame header has no known meaning.
    #[error("unknown command id: {0}")]
    UnknownCommand(u32),

    /// The declared body length exceeds the configured frame limit.
    #[error("frame body of {got} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Declared body length.
        got: u32,
        /// Configured ceiling.
        limit: u32,
    },

    /// A command whose argument count is fixed received a different number
    /// of NUL-separated arguments.
    #[error("command {command:?} expects {expected} arguments, got {got}")]
    WrongArgCount {
        /// The command in question.
        command: crate::CommandId,
        /// Arguments required by the protocol.
        expected: usize,
        /// Arguments actually present in the body.
        got: usize,
    },

    /// An admin-protocol line did not parse as a known verb.
    #[error("unrecognized admin command: {0:?}")]
    UnknownAdminVerb(String),

    /// An admin-protocol line was missing a required argument.
    #[error("admin command {command:?} requires an argument")]
    MissingAdminArg {
        /// The admin verb in question.
        command: String,
    },
}
