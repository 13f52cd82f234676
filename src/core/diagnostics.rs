use crate::storage::entry::Entry;
use crate::storage::mmap::MmapIndex;
use tracing::warn;

fn tag_text(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(&tag[..3]).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Corrupted(String),
    Suspicious(String),
}

pub struct Diagnostics;

impl Diagnostics {
    /// Performs a full health check on the loaded index.
    ///
    /// Corruption (unknown version, bad checksum, undecodable entry, missing
    /// overflow) wins over anything merely suspicious.
    pub fn check_health(index: &MmapIndex) -> HealthStatus {
        let status = Self::inspect(index);
        if status != HealthStatus::Healthy {
            warn!(?status, "index health check failed");
        }
        status
    }

    fn inspect(index: &MmapIndex) -> HealthStatus {
        // Check 1: Structure. Version tags and overflow counts must line up.
        let offsets = match index.header_offsets() {
            Ok(offsets) => offsets,
            Err(e) => return HealthStatus::Corrupted(e.to_string()),
        };

        // Check 2: Checksums
        match index.verify() {
            Ok(failures) => {
                if let Some((block, e)) = failures.first() {
                    return HealthStatus::Corrupted(format!("block {block}: {e}"));
                }
            }
            Err(e) => return HealthStatus::Corrupted(e.to_string()),
        }

        // Check 3: Every entry decodes
        let blocks = index.blocks();
        for &i in &offsets {
            if let Err(e) = Entry::decode(&blocks[i..]) {
                return HealthStatus::Corrupted(format!("block {i}: {e}"));
            }
        }

        // Check 4: Consistency. A writer uses one version and leaves reserved bytes zero.
        // Every tag is known by now; check 1 walked them all.
        let mut first_tag: Option<[u8; 4]> = None;
        for &i in &offsets {
            let header = &blocks[i];
            if header.reserved() != 0 {
                return HealthStatus::Suspicious(format!(
                    "block {i}: reserved byte is {:#04x}",
                    header.reserved()
                ));
            }
            let tag = header.version_tag();
            match first_tag {
                None => first_tag = Some(tag),
                Some(first) if first != tag => {
                    return HealthStatus::Suspicious(format!(
                        "mixed versions: {} and {} (block {i})",
                        tag_text(&first),
                        tag_text(&tag)
                    ));
                }
                Some(_) => {}
            }
        }

        HealthStatus::Healthy
    }
}
