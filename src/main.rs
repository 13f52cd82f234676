use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use wpkgar::config::IndexOptions;
use wpkgar::controlled::{Bounded, Checked};
use wpkgar::core::diagnostics::Diagnostics;
use wpkgar::storage::format::{EntryKind, Usage};
use wpkgar::storage::{Entry, IndexWriter, MmapIndex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    println!("=== wpkgar Demo ===");

    let options = IndexOptions::default();

    // 1. Describe a small package
    println!("\n[1] Building entries (version {})...", options.version);
    let mut control = Entry::new(EntryKind::Regular, "control");
    control.usage = Usage::Control;
    control.mode = 0o644;
    control.size = 312;

    let mut bin = Entry::new(EntryKind::Regular, "usr/bin/wpkg");
    bin.usage = Usage::Data;
    bin.mode = 0o755;
    bin.size = 1_843_200;
    bin.user = "root".into();
    bin.group = "root".into();

    let mut deep = Entry::new(EntryKind::Symlink, format!("usr/share/{}/README", "nested".repeat(60)));
    deep.usage = Usage::Data;
    deep.mode = 0o777;
    deep.link = "../../doc/README".into();

    // 2. Save to Disk
    let path = Path::new("demo_index.wpkgar");
    println!("\n[2] Saving to disk: {:?}", path);
    let mut writer = IndexWriter::new(BufWriter::new(File::create(path)?), options.version);
    let mut entries: Checked<u32> = Checked::bounded(0, 16)?;
    entries.set(0)?;
    for entry in [&control, &bin, &deep] {
        writer.append(entry)?;
        entries.increment()?;
    }
    println!(
        "    Wrote {} entries in {} blocks (version {}).",
        entries.get()?,
        writer.blocks_written(),
        writer.version()
    );
    writer.finish()?;

    // 3. Load from Disk (Zero-Copy)
    println!("\n[3] Loading via mmap...");
    let index = MmapIndex::load(path)?;
    println!("    Health: {:?}", Diagnostics::check_health(&index));

    // 4. List
    println!("\n[4] Entries:");
    for entry in index.entries() {
        let entry = entry?;
        let mut shown = Bounded::new(0usize, 0, 60)?;
        if shown.set(entry.name.chars().count()).is_err() {
            shown.set(shown.max())?;
        }
        let name: String = entry.name.chars().take(shown.get()).collect();
        println!("    - {:?} {} ({} bytes)", entry.kind, name, entry.size);
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
