use crate::controlled::Bounded;
use crate::storage::error::StorageError;
use crate::storage::format::{
    Block, Compression, EntryKind, ModeFlags, Usage, Version, BLOCK_SIZE, LINK_CAPACITY,
    NAME_CAPACITY,
};
use serde::{Deserialize, Serialize};

/// File metadata as owned values; the unit the writer and reader exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub kind: EntryKind,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub compression: Compression,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub uid: u32,
    #[serde(default)]
    pub gid: u32,
    #[serde(default)]
    pub mode: u32,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mtime: u64,
    #[serde(default)]
    pub dev_major: u32,
    #[serde(default)]
    pub dev_minor: u32,
    #[serde(default)]
    pub md5sum: [u8; 16],
}

fn spill_count(len: usize, inline_capacity: usize) -> usize {
    if len > inline_capacity {
        len.div_ceil(BLOCK_SIZE)
    } else {
        0
    }
}

fn spill(bytes: &[u8]) -> impl Iterator<Item = Block> + '_ {
    bytes.chunks(BLOCK_SIZE).map(|chunk| {
        let mut raw = [0u8; BLOCK_SIZE];
        raw[..chunk.len()].copy_from_slice(chunk);
        bytemuck::cast(raw)
    })
}

fn check_text(text: &str, field: &'static str) -> Result<(), StorageError> {
    if text.as_bytes().contains(&0) {
        return Err(StorageError::InvalidText { field });
    }
    Ok(())
}

fn to_string(bytes: Vec<u8>, field: &'static str) -> Result<String, StorageError> {
    String::from_utf8(bytes).map_err(|_| StorageError::InvalidText { field })
}

/// Returns the full value of a name or link field, pulling overflow blocks
/// off the front of `rest` when the recorded size exceeds the inline field.
///
/// An inline value must be exactly `size` bytes long. A spilled value must
/// hold no NUL within its first `size` bytes.
fn read_long(
    field: &'static str,
    inline: &[u8],
    size: usize,
    capacity: usize,
    rest: &mut &[Block],
) -> Result<Vec<u8>, StorageError> {
    let count = spill_count(size, capacity);
    if count == 0 {
        if inline.len() != size {
            return Err(StorageError::SizeMismatch {
                field,
                recorded: size,
                actual: inline.len(),
            });
        }
        return Ok(inline.to_vec());
    }
    let (spilled, remaining) = rest.split_at(count);
    *rest = remaining;
    let bytes: Vec<u8> = spilled
        .iter()
        .flat_map(|b| b.as_bytes().iter().copied())
        .take(size)
        .collect();
    if bytes.contains(&0) {
        return Err(StorageError::InvalidText { field });
    }
    Ok(bytes)
}

impl Entry {
    pub fn new(kind: EntryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            usage: Usage::Unknown,
            compression: Compression::None,
            name: name.into(),
            link: String::new(),
            user: String::new(),
            group: String::new(),
            uid: 0,
            gid: 0,
            mode: 0,
            size: 0,
            mtime: 0,
            dev_major: 0,
            dev_minor: 0,
            md5sum: [0; 16],
        }
    }

    /// Number of overflow blocks that follow `header` in the index.
    pub fn overflow_count(header: &Block) -> Result<usize, StorageError> {
        if !header.version()?.allows_overflow() {
            return Ok(0);
        }
        Ok(spill_count(header.name_size() as usize, NAME_CAPACITY)
            + spill_count(header.link_size() as usize, LINK_CAPACITY))
    }

    /// Header block (sealed) followed by any name and link overflow blocks.
    pub fn encode(&self, version: Version) -> Result<Vec<Block>, StorageError> {
        check_text(&self.name, "name")?;
        check_text(&self.link, "link")?;
        check_text(&self.user, "user")?;
        check_text(&self.group, "group")?;
        // Only permission bits live in `mode`; the file type is `kind`.
        let mode = Bounded::new(self.mode, 0, ModeFlags::all().bits())?;
        let name = self.name.as_bytes();
        let link = self.link.as_bytes();

        let (name_max, link_max) = if version.allows_overflow() {
            (u32::MAX as usize, u32::MAX as usize)
        } else {
            (NAME_CAPACITY, LINK_CAPACITY)
        };
        if name.len() > name_max {
            return Err(StorageError::NameTooLong {
                len: name.len(),
                max: name_max,
                version: version.as_str(),
            });
        }
        if link.len() > link_max {
            return Err(StorageError::LinkTooLong {
                len: link.len(),
                max: link_max,
                version: version.as_str(),
            });
        }

        let mut header = Block::new();
        header.set_version(version);
        header.set_kind(self.kind);
        header.set_usage(self.usage);
        header.set_compression(self.compression);
        header.set_uid(self.uid);
        header.set_gid(self.gid);
        header.set_mode(mode.get());
        header.set_size(self.size);
        header.set_mtime(self.mtime);
        header.set_device(self.dev_major, self.dev_minor);
        header.set_name(&name[..name.len().min(NAME_CAPACITY)])?;
        header.set_link(&link[..link.len().min(LINK_CAPACITY)])?;
        header.set_user(self.user.as_bytes())?;
        header.set_group(self.group.as_bytes())?;
        header.set_md5sum(self.md5sum);
        if version.allows_overflow() {
            header.set_name_size(name.len() as u32);
            header.set_link_size(link.len() as u32);
        }
        header.seal();

        let mut blocks = vec![header];
        if name.len() > NAME_CAPACITY && version.allows_overflow() {
            blocks.extend(spill(name));
        }
        if link.len() > LINK_CAPACITY && version.allows_overflow() {
            blocks.extend(spill(link));
        }
        Ok(blocks)
    }

    /// Decodes the entry starting at `blocks[0]`, returning it together
    /// with the number of blocks it occupies.
    pub fn decode(blocks: &[Block]) -> Result<(Self, usize), StorageError> {
        let (header, mut rest) = blocks.split_first().ok_or(StorageError::BadBlockLength {
            expected: BLOCK_SIZE,
            actual: 0,
        })?;
        let version = header.version()?;
        let needed = Self::overflow_count(header)?;
        if rest.len() < needed {
            return Err(StorageError::MissingOverflow {
                needed,
                available: rest.len(),
            });
        }

        let (name, link) = if version.allows_overflow() {
            let name = read_long(
                "name",
                header.name(),
                header.name_size() as usize,
                NAME_CAPACITY,
                &mut rest,
            )?;
            let link = read_long(
                "link",
                header.link(),
                header.link_size() as usize,
                LINK_CAPACITY,
                &mut rest,
            )?;
            (name, link)
        } else {
            (header.name().to_vec(), header.link().to_vec())
        };

        let entry = Self {
            kind: header.kind()?,
            usage: header.usage()?,
            compression: header.compression()?,
            name: to_string(name, "name")?,
            link: to_string(link, "link")?,
            user: to_string(header.user().to_vec(), "user")?,
            group: to_string(header.group().to_vec(), "group")?,
            uid: header.uid(),
            gid: header.gid(),
            mode: header.mode(),
            size: header.size(),
            mtime: header.mtime(),
            dev_major: header.dev_major(),
            dev_minor: header.dev_minor(),
            md5sum: header.md5sum(),
        };
        Ok((entry, 1 + needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled::ControlError;

    fn sample(name: &str) -> Entry {
        let mut e = Entry::new(EntryKind::Regular, name);
        e.usage = Usage::Data;
        e.compression = Compression::Gz;
        e.user = "root".into();
        e.group = "wheel".into();
        e.mode = 0o644;
        e.size = 4096;
        e.mtime = 1_300_000_000;
        e.md5sum = [7; 16];
        e
    }

    #[test]
    fn test_short_entry_is_one_block() {
        let entry = sample("usr/share/doc/wpkg/copyright");
        for version in [Version::V1_0, Version::V1_1] {
            let blocks = entry.encode(version).unwrap();
            assert_eq!(blocks.len(), 1);
            assert_eq!(blocks[0].version().unwrap(), version);
            blocks[0].verify_checksum().unwrap();
            let (decoded, used) = Entry::decode(&blocks).unwrap();
            assert_eq!(used, 1);
            assert_eq!(decoded, entry);
        }
    }

    #[test]
    fn test_v1_0_rejects_long_names() {
        let entry = sample(&"d/".repeat(151));
        assert!(matches!(
            entry.encode(Version::V1_0),
            Err(StorageError::NameTooLong { len: 302, max: 300, version: "1.0" })
        ));

        let mut link = Entry::new(EntryKind::Symlink, "usr/lib/libwpkg.so");
        link.link = "x".repeat(301);
        assert!(matches!(
            link.encode(Version::V1_0),
            Err(StorageError::LinkTooLong { len: 301, .. })
        ));
    }

    #[test]
    fn test_v1_1_overflow_blocks() {
        let mut entry = sample(&"n".repeat(1500));
        entry.kind = EntryKind::Symlink;
        entry.link = "l".repeat(301);

        let blocks = entry.encode(Version::V1_1).unwrap();
        // 1 header + 2 name blocks + 1 link block
        assert_eq!(blocks.len(), 4);
        assert_eq!(Entry::overflow_count(&blocks[0]).unwrap(), 3);
        assert_eq!(blocks[0].name_size(), 1500);
        assert_eq!(blocks[0].name().len(), NAME_CAPACITY);

        let (decoded, used) = Entry::decode(&blocks).unwrap();
        assert_eq!(used, 4);
        assert_eq!(decoded, entry);

        assert!(matches!(
            Entry::decode(&blocks[..2]),
            Err(StorageError::MissingOverflow { needed: 3, available: 1 })
        ));
    }

    #[test]
    fn test_exactly_capacity_stays_inline() {
        let entry = sample(&"x".repeat(NAME_CAPACITY));
        let blocks = entry.encode(Version::V1_1).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(Entry::decode(&blocks).unwrap().0.name.len(), NAME_CAPACITY);
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut blocks = sample("a").encode(Version::V1_1).unwrap();
        blocks[0].set_version_tag(*b"9.9\0");
        assert!(matches!(
            Entry::decode(&blocks),
            Err(StorageError::UnknownVersion(tag)) if &tag == b"9.9\0"
        ));
        assert!(matches!(
            Entry::decode(&[Block::new()]),
            Err(StorageError::UnknownVersion([0, 0, 0, 0]))
        ));
    }

    #[test]
    fn test_mode_outside_permission_bits() {
        let mut entry = sample("bin/sh");
        entry.mode = 0o100755;
        assert!(matches!(
            entry.encode(Version::V1_1),
            Err(StorageError::Control(ControlError::OutOfBounds { .. }))
        ));
        entry.mode = 0o7777;
        assert!(entry.encode(Version::V1_1).is_ok());
    }

    #[test]
    fn test_nul_in_name_rejected() {
        let entry = Entry::new(EntryKind::Regular, "bad\0name");
        assert!(matches!(
            entry.encode(Version::V1_1),
            Err(StorageError::InvalidText { field: "name" })
        ));
    }

    #[test]
    fn test_nul_in_user_or_group_rejected() {
        let mut entry = sample("etc/passwd");
        entry.user = "ro\0ot".into();
        assert!(matches!(
            entry.encode(Version::V1_1),
            Err(StorageError::InvalidText { field: "user" })
        ));

        entry.user = "root".into();
        entry.group = "wheel\0".into();
        assert!(matches!(
            entry.encode(Version::V1_0),
            Err(StorageError::InvalidText { field: "group" })
        ));
    }

    #[test]
    fn test_inline_size_must_match_field() {
        let mut blocks = sample("usr/bin/wpkg").encode(Version::V1_1).unwrap();
        blocks[0].set_name_size(5);
        blocks[0].seal();
        assert!(matches!(
            Entry::decode(&blocks),
            Err(StorageError::SizeMismatch { field: "name", recorded: 5, actual: 12 })
        ));

        let mut blocks = sample("usr/bin/wpkg").encode(Version::V1_1).unwrap();
        blocks[0].set_link_size(NAME_CAPACITY as u32);
        blocks[0].seal();
        assert!(matches!(
            Entry::decode(&blocks),
            Err(StorageError::SizeMismatch { field: "link", recorded: 300, actual: 0 })
        ));
    }

    #[test]
    fn test_nul_inside_overflow_rejected() {
        let mut blocks = sample(&"n".repeat(1500)).encode(Version::V1_1).unwrap();
        let mut raw = blocks[1].as_bytes().to_vec();
        raw[700] = 0;
        blocks[1] = Block::from_bytes(&raw).unwrap();
        assert!(matches!(
            Entry::decode(&blocks),
            Err(StorageError::InvalidText { field: "name" })
        ));

        // zero padding past the recorded size is fine
        let blocks = sample(&"n".repeat(1500)).encode(Version::V1_1).unwrap();
        assert_eq!(blocks[2].as_bytes()[1500 - BLOCK_SIZE], 0);
        assert!(Entry::decode(&blocks).is_ok());
    }

    #[test]
    fn test_json_shape() {
        let entry = sample("etc/wpkg.conf");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "regular");
        assert_eq!(json["usage"], "data");
        assert_eq!(json["compression"], "gz");
        assert!(json.get("link").is_none());
        let back: Entry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
