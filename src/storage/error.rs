use crate::controlled::ControlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown block version tag {0:?}")]
    UnknownVersion([u8; 4]),
    #[error("Unknown entry kind {0:#04x}")]
    UnknownKind(u8),
    #[error("Unknown entry usage {0:#04x}")]
    UnknownUsage(u8),
    #[error("Unknown compression {0}")]
    UnknownCompression(u8),
    #[error("Name is {len} bytes, version {version} allows at most {max}")]
    NameTooLong {
        len: usize,
        max: usize,
        version: &'static str,
    },
    #[error("Link target is {len} bytes, version {version} allows at most {max}")]
    LinkTooLong {
        len: usize,
        max: usize,
        version: &'static str,
    },
    #[error("Field {field} is {len} bytes, at most {max} fit")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("Field {field} records {recorded} bytes but holds {actual}")]
    SizeMismatch {
        field: &'static str,
        recorded: usize,
        actual: usize,
    },
    #[error("Field {field} is not valid text")]
    InvalidText { field: &'static str },
    #[error("Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("Expected a {expected} byte block, got {actual} bytes")]
    BadBlockLength { expected: usize, actual: usize },
    #[error("Index truncated: {0} trailing bytes do not form a block")]
    Truncated(usize),
    #[error("Entry needs {needed} overflow blocks, only {available} present")]
    MissingOverflow { needed: usize, available: usize },
    #[error("Invalid field value: {0}")]
    Control(#[from] ControlError),
    #[error("File too small")]
    FileTooSmall,
    #[error("File length {0} is not a multiple of the block size")]
    MisalignedLength(u64),
}
