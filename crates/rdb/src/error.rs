use std::io;

use thiserror::Error;

/// Errors produced while decoding a snapshot.
///
/// Everything except [`SourceIneligible`](RdbError::SourceIneligible) and
/// [`ConsumerGone`](RdbError::ConsumerGone) means the byte stream can no
/// longer be trusted: the pass must be abandoned, there is no way to
/// resynchronize.
#[derive(Debug, Error)]
pub enum RdbError {
    /// An underlying I/O error, including a short read.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with `REDIS`.
    #[error("invalid magic {0:?}, not an RDB file")]
    BadMagic([u8; 5]),

    /// The four version bytes are not ASCII digits.
    #[error("invalid RDB version {0:?}")]
    BadVersion(String),

    /// A length byte with top bits `10` other than `0x80` / `0x81`.
    #[error("illegal length encoding byte {0:#04x}")]
    InvalidLength(u8),

    /// A special string encoding showed up where a plain length was expected.
    #[error("unexpected special encoding {0} where a length was expected")]
    UnexpectedSpecial(u8),

    /// A special string encoding selector other than int8/16/32 or LZF.
    #[error("unknown string encoding {0}")]
    UnknownStringEncoding(u8),

    /// LZF payload could not be expanded to its declared length.
    #[error("lzf decompression failed: {0}")]
    Decompress(String),

    #[error("corrupt ziplist: {0}")]
    Ziplist(String),

    #[error("corrupt listpack: {0}")]
    Listpack(String),

    #[error("corrupt intset: {0}")]
    Intset(String),

    /// A byte in opcode position that is neither an opcode nor a type tag.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// A recognized encoding that this decoder does not materialize.
    #[error("unsupported encoding: {0}")]
    Unsupported(&'static str),

    /// Any other structural violation.
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// The eligibility probe reported that the source may no longer be read.
    #[error("source is no longer eligible for analysis")]
    SourceIneligible,

    /// The receiving side of the entry channel was dropped.
    #[error("entry consumer hung up")]
    ConsumerGone,
}

impl RdbError {
    /// Returns `true` for errors caused by malformed input, as opposed to an
    /// aborted pass, an environmental I/O failure, or a well-formed record
    /// this decoder cannot materialize.
    #[must_use]
    pub fn is_framing(&self) -> bool {
        match self {
            RdbError::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            RdbError::Unsupported(_) | RdbError::SourceIneligible | RdbError::ConsumerGone => false,
            _ => true,
        }
    }
}

/// Result alias for decoder operations.
pub type Result<T> = std::result::Result<T, RdbError>;
