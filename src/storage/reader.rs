use crate::storage::entry::Entry;
use crate::storage::error::StorageError;
use crate::storage::format::{Block, BLOCK_SIZE};
use std::io::{ErrorKind, Read};
use tracing::{trace, warn};

/// Streams entries back out of an index.
///
/// Iteration ends cleanly at EOF on a block boundary. Any error is yielded
/// once and then the iterator is exhausted.
pub struct IndexReader<R: Read> {
    src: R,
    verify_checksums: bool,
    blocks_read: u64,
    done: bool,
}

impl<R: Read> IndexReader<R> {
    pub fn new(src: R) -> Self {
        Self {
            src,
            verify_checksums: true,
            blocks_read: 0,
            done: false,
        }
    }

    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// `Ok(None)` on a clean EOF, `Truncated` on a partial block.
    fn read_block(&mut self) -> Result<Option<Block>, StorageError> {
        let mut raw = [0u8; BLOCK_SIZE];
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match self.src.read(&mut raw[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        match filled {
            0 => Ok(None),
            BLOCK_SIZE => {
                self.blocks_read += 1;
                Ok(Some(bytemuck::cast(raw)))
            }
            partial => Err(StorageError::Truncated(partial)),
        }
    }

    fn next_entry(&mut self) -> Result<Option<Entry>, StorageError> {
        let Some(header) = self.read_block()? else {
            return Ok(None);
        };
        let position = self.blocks_read - 1;
        if self.verify_checksums {
            header.verify_checksum()?;
        }

        let needed = Entry::overflow_count(&header)?;
        // `needed` comes from disk; grow only as blocks actually arrive.
        let mut blocks = vec![header];
        while blocks.len() <= needed {
            match self.read_block()? {
                Some(block) => blocks.push(block),
                None => {
                    return Err(StorageError::MissingOverflow {
                        needed,
                        available: blocks.len() - 1,
                    })
                }
            }
        }

        let (entry, _) = Entry::decode(&blocks)?;
        trace!(block = position, name = %entry.name, "read index entry");
        Ok(Some(entry))
    }
}

impl<R: Read> Iterator for IndexReader<R> {
    type Item = Result<Entry, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                warn!(block = self.blocks_read, error = %e, "index read failed");
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::format::{Block, EntryKind, Version};
    use crate::storage::writer::IndexWriter;
    use std::io::Cursor;

    fn build(version: Version, entries: &[Entry]) -> Vec<u8> {
        let mut writer = IndexWriter::new(Vec::new(), version);
        for e in entries {
            writer.append(e).unwrap();
        }
        writer.finish().unwrap()
    }

    fn entries() -> Vec<Entry> {
        let mut link = Entry::new(EntryKind::Symlink, "usr/lib/libfoo.so");
        link.link = format!("{}/libfoo.so.1", "deep/".repeat(80));
        vec![
            Entry::new(EntryKind::Directory, "usr/lib"),
            link,
            Entry::new(EntryKind::Regular, "usr/lib/libfoo.so.1"),
        ]
    }

    #[test]
    fn test_reads_back_written_entries() {
        let bytes = build(Version::V1_1, &entries());
        let read: Vec<Entry> = IndexReader::new(Cursor::new(bytes))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, entries());
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = IndexReader::new(Cursor::new(Vec::new()));
        assert!(reader.next().is_none());
        assert_eq!(reader.blocks_read(), 0);
    }

    #[test]
    fn test_truncated_stream() {
        let mut bytes = build(Version::V1_0, &entries()[..1]);
        bytes.extend_from_slice(&[1u8; 10]);
        let mut reader = IndexReader::new(Cursor::new(bytes));
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(StorageError::Truncated(10)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_missing_overflow_at_eof() {
        let bytes = build(Version::V1_1, &entries()[1..2]);
        let cut = bytes[..BLOCK_SIZE].to_vec();
        let mut reader = IndexReader::new(Cursor::new(cut));
        assert!(matches!(
            reader.next(),
            Some(Err(StorageError::MissingOverflow { needed: 1, available: 0 }))
        ));
    }

    #[test]
    fn test_huge_recorded_size_without_overflow() {
        let mut header = Block::new();
        header.set_version(Version::V1_1);
        header.set_kind(EntryKind::Regular);
        header.set_name_size(u32::MAX);
        header.set_link_size(u32::MAX);
        header.seal();

        let mut reader = IndexReader::new(Cursor::new(header.as_bytes().to_vec()));
        match reader.next() {
            Some(Err(StorageError::MissingOverflow { needed, available })) => {
                assert_eq!(needed, 2 * (u32::MAX as usize).div_ceil(BLOCK_SIZE));
                assert_eq!(available, 0);
            }
            other => panic!("expected MissingOverflow, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_unknown_version_in_stream() {
        let mut bytes = build(Version::V1_1, &entries()[..1]);
        bytes.extend(build(Version::V1_1, &entries()[2..]));
        bytes[BLOCK_SIZE..BLOCK_SIZE + 4].copy_from_slice(b"2.0\0");

        let mut reader = IndexReader::new(Cursor::new(bytes)).verify_checksums(false);
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(
            reader.next(),
            Some(Err(StorageError::UnknownVersion(tag))) if &tag == b"2.0\0"
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_checksum_verification_toggle() {
        let mut bytes = build(Version::V1_1, &entries()[..1]);
        // flip a bit inside the padding area
        bytes[1000] ^= 1;

        let mut strict = IndexReader::new(Cursor::new(bytes.clone()));
        assert!(matches!(
            strict.next(),
            Some(Err(StorageError::ChecksumMismatch { .. }))
        ));

        let lenient = IndexReader::new(Cursor::new(bytes)).verify_checksums(false);
        assert_eq!(lenient.count(), 1);
    }
}
