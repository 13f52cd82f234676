pub mod entry;
pub mod error;
pub mod format;
pub mod mmap;
pub mod reader;
pub mod writer;

pub use entry::Entry;
pub use error::StorageError;
pub use format::{Block, Version, BLOCK_SIZE};
pub use mmap::MmapIndex;
pub use reader::IndexReader;
pub use writer::IndexWriter;
