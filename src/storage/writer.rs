use crate::storage::entry::Entry;
use crate::storage::error::StorageError;
use crate::storage::format::Version;
use std::io::Write;
use tracing::debug;

/// Appends entries to an index stream, one sealed header plus its overflow
/// blocks at a time.
pub struct IndexWriter<W: Write> {
    dest: W,
    version: Version,
    blocks_written: u64,
}

impl<W: Write> IndexWriter<W> {
    pub fn new(dest: W, version: Version) -> Self {
        Self {
            dest,
            version,
            blocks_written: 0,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    pub fn append(&mut self, entry: &Entry) -> Result<(), StorageError> {
        // Encode fully before touching the stream so a rejected entry writes nothing.
        let blocks = entry.encode(self.version)?;
        for block in &blocks {
            self.dest.write_all(block.as_bytes())?;
        }
        self.blocks_written += blocks.len() as u64;
        debug!(
            name = %entry.name,
            blocks = blocks.len(),
            version = %self.version,
            "appended index entry"
        );
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, StorageError> {
        self.dest.flush()?;
        Ok(self.dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::format::{EntryKind, BLOCK_SIZE};

    #[test]
    fn test_writes_whole_blocks() {
        let mut writer = IndexWriter::new(Vec::new(), Version::V1_1);
        assert_eq!(writer.version(), Version::V1_1);
        writer.append(&Entry::new(EntryKind::Directory, "usr")).unwrap();
        writer
            .append(&Entry::new(EntryKind::Regular, "a".repeat(400)))
            .unwrap();
        assert_eq!(writer.blocks_written(), 3);

        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), 3 * BLOCK_SIZE);
        assert_eq!(&bytes[0..4], b"1.1\0");
        assert_eq!(&bytes[BLOCK_SIZE..BLOCK_SIZE + 4], b"1.1\0");
        assert_eq!(&bytes[2 * BLOCK_SIZE..2 * BLOCK_SIZE + 4], b"aaaa");
    }

    #[test]
    fn test_rejected_entry_writes_nothing() {
        let mut writer = IndexWriter::new(Vec::new(), Version::V1_0);
        assert_eq!(writer.version(), Version::V1_0);
        assert!(writer
            .append(&Entry::new(EntryKind::Regular, "a".repeat(301)))
            .is_err());
        assert_eq!(writer.blocks_written(), 0);
        assert!(writer.finish().unwrap().is_empty());
    }
}
