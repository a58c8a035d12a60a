//! Closed error surface for the bytecode model and the NPE analyzer (§7).
//!
//! Every fallible operation in this crate returns one of these kinds so that the
//! top-level exception callback can match on kind, log a stable message, and
//! swallow the failure without ever propagating it back into the host.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("host adapter reported failure ({code}): {message}")]
    HostError { code: String, message: String },

    #[error("host reflection call raised {class}: {message}")]
    HostCallbackError { class: String, message: String },

    #[error("constant pool index {0} is out of range")]
    InvalidIndex(u16),

    #[error("malformed constant pool: {0}")]
    MalformedConstantPool(String),

    #[error("invalid type descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("no stack-effect rule for opcode 0x{0:02x}")]
    UnsupportedStackOpcode(u8),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
