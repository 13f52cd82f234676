use crate::storage::error::StorageError;
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const BLOCK_SIZE: usize = 1024;
pub const NAME_CAPACITY: usize = 300;
pub const LINK_CAPACITY: usize = 300;
pub const USER_CAPACITY: usize = 32;
pub const GROUP_CAPACITY: usize = 32;

pub const VERSION_1_0: [u8; 4] = *b"1.0\0";
pub const VERSION_1_1: [u8; 4] = *b"1.1\0";

/// Structural revision of a block, taken from its first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    #[serde(rename = "1.0")]
    V1_0,
    #[serde(rename = "1.1")]
    V1_1,
}

impl Version {
    pub fn tag(self) -> [u8; 4] {
        match self {
            Version::V1_0 => VERSION_1_0,
            Version::V1_1 => VERSION_1_1,
        }
    }

    pub fn from_tag(tag: [u8; 4]) -> Result<Self, StorageError> {
        match tag {
            VERSION_1_0 => Ok(Version::V1_0),
            VERSION_1_1 => Ok(Version::V1_1),
            other => Err(StorageError::UnknownVersion(other)),
        }
    }

    /// Only 1.1 may spill names and links longer than 300 bytes into overflow blocks.
    pub fn allows_overflow(self) -> bool {
        matches!(self, Version::V1_1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Version::V1_0 => "1.0",
            Version::V1_1 => "1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Regular = b'0',
    HardLink = b'1',
    Symlink = b'2',
    CharacterSpecial = b'3',
    BlockSpecial = b'4',
    Directory = b'5',
    Fifo = b'6',
    Continuous = b'7',
    Package = b'P',
}

impl EntryKind {
    pub fn from_byte(b: u8) -> Result<Self, StorageError> {
        Ok(match b {
            b'0' => EntryKind::Regular,
            b'1' => EntryKind::HardLink,
            b'2' => EntryKind::Symlink,
            b'3' => EntryKind::CharacterSpecial,
            b'4' => EntryKind::BlockSpecial,
            b'5' => EntryKind::Directory,
            b'6' => EntryKind::Fifo,
            b'7' => EntryKind::Continuous,
            b'P' => EntryKind::Package,
            other => return Err(StorageError::UnknownKind(other)),
        })
    }

    /// Leading character of an `ls -l` style listing.
    pub fn type_char(self) -> char {
        match self {
            EntryKind::Regular => '-',
            EntryKind::HardLink => 'h',
            EntryKind::Symlink => 'l',
            EntryKind::CharacterSpecial => 'c',
            EntryKind::BlockSpecial => 'b',
            EntryKind::Directory => 'd',
            EntryKind::Fifo => 'p',
            EntryKind::Continuous => 'C',
            EntryKind::Package => 'P',
        }
    }
}

/// Which part of the package a file came from.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Usage {
    #[default]
    Unknown = 0,
    Control = b'c',
    Data = b'd',
    Special = b'@',
}

impl Usage {
    pub fn from_byte(b: u8) -> Result<Self, StorageError> {
        Ok(match b {
            0 => Usage::Unknown,
            b'c' => Usage::Control,
            b'd' => Usage::Data,
            b'@' => Usage::Special,
            other => return Err(StorageError::UnknownUsage(other)),
        })
    }
}

/// Compression the file had inside the original package.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    #[default]
    None = 0,
    Gz = 1,
    Bz2 = 2,
    Lzma = 3,
    Xz = 4,
}

impl Compression {
    pub fn from_byte(b: u8) -> Result<Self, StorageError> {
        Ok(match b {
            0 => Compression::None,
            1 => Compression::Gz,
            2 => Compression::Bz2,
            3 => Compression::Lzma,
            4 => Compression::Xz,
            other => return Err(StorageError::UnknownCompression(other)),
        })
    }
}

bitflags! {
    /// Permission bits of `Block::mode`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u32 {
        const SETUID = 0o4000;
        const SETGID = 0o2000;
        const STICKY = 0o1000;
        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXEC = 0o001;
    }
}

impl ModeFlags {
    /// `rwxr-xr-x` style rendering, with `s`/`t` for the special bits.
    pub fn permissions(self) -> String {
        let triple = |r: Self, w: Self, x: Self, special: Self, set: char| {
            let mut s = String::with_capacity(3);
            s.push(if self.contains(r) { 'r' } else { '-' });
            s.push(if self.contains(w) { 'w' } else { '-' });
            s.push(match (self.contains(x), self.contains(special)) {
                (true, true) => set,
                (false, true) => set.to_ascii_uppercase(),
                (true, false) => 'x',
                (false, false) => '-',
            });
            s
        };
        let mut out = triple(
            Self::OWNER_READ,
            Self::OWNER_WRITE,
            Self::OWNER_EXEC,
            Self::SETUID,
            's',
        );
        out += &triple(
            Self::GROUP_READ,
            Self::GROUP_WRITE,
            Self::GROUP_EXEC,
            Self::SETGID,
            's',
        );
        out += &triple(
            Self::OTHER_READ,
            Self::OTHER_WRITE,
            Self::OTHER_EXEC,
            Self::STICKY,
            't',
        );
        out
    }
}

/// One 1024-byte record of a wpkgar index.
///
/// All multi-byte integers are stored little-endian so the bytes are the same
/// on every platform. A zeroed block (including its version tag) is the
/// starting point; callers set the tag and metadata before writing.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Block {
    version: [u8; 4],
    kind: u8,
    usage: u8,
    compression: u8,
    reserved: u8,
    uid: u32,
    gid: u32,
    mode: u32,
    checksum: u32,
    size: u64,
    mtime: u64,
    dev_major: u32,
    dev_minor: u32,
    name_size: u32,
    link_size: u32,
    name: [u8; NAME_CAPACITY],
    link: [u8; LINK_CAPACITY],
    user: [u8; USER_CAPACITY],
    group: [u8; GROUP_CAPACITY],
    md5sum: [u8; 16],
    padding: [u8; 288],
}

// Ensure Block is exactly 1024 bytes
const _: () = assert!(std::mem::size_of::<Block>() == BLOCK_SIZE);

impl Default for Block {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Bytes of `buf` up to the first NUL.
fn trim_nul(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

fn fill(dst: &mut [u8], src: &[u8], field: &'static str) -> Result<(), StorageError> {
    if src.len() > dst.len() {
        return Err(StorageError::FieldTooLong {
            field,
            len: src.len(),
            max: dst.len(),
        });
    }
    dst.fill(0);
    dst[..src.len()].copy_from_slice(src);
    Ok(())
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() != BLOCK_SIZE {
            return Err(StorageError::BadBlockLength {
                expected: BLOCK_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn version_tag(&self) -> [u8; 4] {
        self.version
    }

    pub fn set_version_tag(&mut self, tag: [u8; 4]) {
        self.version = tag;
    }

    pub fn version(&self) -> Result<Version, StorageError> {
        Version::from_tag(self.version)
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version.tag();
    }

    pub fn kind(&self) -> Result<EntryKind, StorageError> {
        EntryKind::from_byte(self.kind)
    }

    pub fn set_kind(&mut self, kind: EntryKind) {
        self.kind = kind as u8;
    }

    pub fn usage(&self) -> Result<Usage, StorageError> {
        Usage::from_byte(self.usage)
    }

    pub fn set_usage(&mut self, usage: Usage) {
        self.usage = usage as u8;
    }

    pub fn compression(&self) -> Result<Compression, StorageError> {
        Compression::from_byte(self.compression)
    }

    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = compression as u8;
    }

    pub fn reserved(&self) -> u8 {
        self.reserved
    }

    pub fn uid(&self) -> u32 {
        u32::from_le(self.uid)
    }

    pub fn set_uid(&mut self, uid: u32) {
        self.uid = uid.to_le();
    }

    pub fn gid(&self) -> u32 {
        u32::from_le(self.gid)
    }

    pub fn set_gid(&mut self, gid: u32) {
        self.gid = gid.to_le();
    }

    pub fn mode(&self) -> u32 {
        u32::from_le(self.mode)
    }

    pub fn set_mode(&mut self, mode: u32) {
        self.mode = mode.to_le();
    }

    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags::from_bits_truncate(self.mode())
    }

    pub fn checksum(&self) -> u32 {
        u32::from_le(self.checksum)
    }

    pub fn size(&self) -> u64 {
        u64::from_le(self.size)
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size.to_le();
    }

    pub fn mtime(&self) -> u64 {
        u64::from_le(self.mtime)
    }

    pub fn set_mtime(&mut self, mtime: u64) {
        self.mtime = mtime.to_le();
    }

    pub fn dev_major(&self) -> u32 {
        u32::from_le(self.dev_major)
    }

    pub fn dev_minor(&self) -> u32 {
        u32::from_le(self.dev_minor)
    }

    pub fn set_device(&mut self, major: u32, minor: u32) {
        self.dev_major = major.to_le();
        self.dev_minor = minor.to_le();
    }

    /// Full name length (1.1 only; zero in 1.0 blocks).
    pub fn name_size(&self) -> u32 {
        u32::from_le(self.name_size)
    }

    pub fn set_name_size(&mut self, size: u32) {
        self.name_size = size.to_le();
    }

    pub fn link_size(&self) -> u32 {
        u32::from_le(self.link_size)
    }

    pub fn set_link_size(&mut self, size: u32) {
        self.link_size = size.to_le();
    }

    pub fn name(&self) -> &[u8] {
        trim_nul(&self.name)
    }

    pub fn set_name(&mut self, name: &[u8]) -> Result<(), StorageError> {
        fill(&mut self.name, name, "name")
    }

    pub fn link(&self) -> &[u8] {
        trim_nul(&self.link)
    }

    pub fn set_link(&mut self, link: &[u8]) -> Result<(), StorageError> {
        fill(&mut self.link, link, "link")
    }

    pub fn user(&self) -> &[u8] {
        trim_nul(&self.user)
    }

    pub fn set_user(&mut self, user: &[u8]) -> Result<(), StorageError> {
        fill(&mut self.user, user, "user")
    }

    pub fn group(&self) -> &[u8] {
        trim_nul(&self.group)
    }

    pub fn set_group(&mut self, group: &[u8]) -> Result<(), StorageError> {
        fill(&mut self.group, group, "group")
    }

    pub fn md5sum(&self) -> [u8; 16] {
        self.md5sum
    }

    pub fn set_md5sum(&mut self, sum: [u8; 16]) {
        self.md5sum = sum;
    }

    /// CRC-32 of the block with the checksum field read as zero.
    pub fn compute_checksum(&self) -> u32 {
        let mut copy = *self;
        copy.checksum = 0;
        crc32fast::hash(copy.as_bytes())
    }

    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum().to_le();
    }

    pub fn verify_checksum(&self) -> Result<(), StorageError> {
        let stored = self.checksum();
        let computed = self.compute_checksum();
        if stored != computed {
            return Err(StorageError::ChecksumMismatch { stored, computed });
        }
        Ok(())
    }
}
