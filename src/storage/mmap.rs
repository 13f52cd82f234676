use crate::storage::entry::Entry;
use crate::storage::error::StorageError;
use crate::storage::format::{Block, BLOCK_SIZE};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Zero-copy view of an index file as a slice of blocks.
pub struct MmapIndex {
    mmap: Mmap,
}

impl MmapIndex {
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        if len == 0 {
            return Err(StorageError::FileTooSmall);
        }
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(StorageError::MisalignedLength(len));
        }

        let mmap = unsafe { Mmap::map(&file)? };
        // Page alignment makes this infallible in practice, but check rather than panic later.
        if bytemuck::try_cast_slice::<u8, Block>(&mmap).is_err() {
            return Err(StorageError::MisalignedLength(len));
        }

        info!(path = %path.display(), blocks = len / BLOCK_SIZE as u64, "mapped index");
        Ok(Self { mmap })
    }

    pub fn blocks(&self) -> &[Block] {
        bytemuck::cast_slice(&self.mmap)
    }

    pub fn block_count(&self) -> usize {
        self.mmap.len() / BLOCK_SIZE
    }

    /// Indices of header blocks, skipping overflow blocks.
    ///
    /// Stops at the first header whose version is unknown or whose overflow
    /// would run past the end of the file.
    pub fn header_offsets(&self) -> Result<Vec<usize>, StorageError> {
        let blocks = self.blocks();
        let mut offsets = Vec::new();
        let mut i = 0;
        while i < blocks.len() {
            let needed = Entry::overflow_count(&blocks[i])?;
            let available = blocks.len() - i - 1;
            if needed > available {
                return Err(StorageError::MissingOverflow { needed, available });
            }
            offsets.push(i);
            i += 1 + needed;
        }
        Ok(offsets)
    }

    pub fn entries(&self) -> Entries<'_> {
        Entries {
            blocks: self.blocks(),
            position: 0,
        }
    }

    pub fn find(&self, name: &str) -> Option<Result<Entry, StorageError>> {
        self.entries()
            .find(|r| r.as_ref().map_or(true, |e| e.name == name))
    }

    /// Verifies every header checksum in parallel and returns the failures.
    pub fn verify(&self) -> Result<Vec<(usize, StorageError)>, StorageError> {
        let offsets = self.header_offsets()?;
        let blocks = self.blocks();
        let failures: Vec<(usize, StorageError)> = offsets
            .par_iter()
            .filter_map(|&i| blocks[i].verify_checksum().err().map(|e| (i, e)))
            .collect();
        debug!(headers = offsets.len(), failures = failures.len(), "verified index");
        Ok(failures)
    }
}

/// Iterator over the decoded entries of an [`MmapIndex`]. Fused after the first error.
pub struct Entries<'a> {
    blocks: &'a [Block],
    position: usize,
}

impl Iterator for Entries<'_> {
    type Item = Result<Entry, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.blocks.len() {
            return None;
        }
        match Entry::decode(&self.blocks[self.position..]) {
            Ok((entry, used)) => {
                self.position += used;
                Some(Ok(entry))
            }
            Err(e) => {
                self.position = self.blocks.len();
                Some(Err(e))
            }
        }
    }
}
