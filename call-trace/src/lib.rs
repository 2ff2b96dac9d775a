use std::io;

pub mod call;

pub mod callset;

pub mod parser;

pub mod writer;

pub use call::{Call, Signature, Value};
pub use callset::CallSet;
pub use parser::{Bookmark, Parser};
pub use writer::Writer;

/// First eight bytes of every call-trace file.
pub static MAGIC_BYTES: &[u8; 8] = b"\x7fCALLTRC";

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("trace is missing magic bytes")]
    BadMagic,

    #[error("trace ends in the middle of a {0}")]
    Truncated(&'static str),

    #[error("malformed {0} field")]
    Malformed(&'static str),

    #[error("unknown value tag {0:#04x}")]
    UnknownValueTag(u8),

    #[error("IO Error:")]
    Io(#[from] io::Error),
}
