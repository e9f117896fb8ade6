//! Plain-text rendering of helper results.
//!
//! Entries print one per line in an `ls -l`-like layout:
//!
//! ```text
//! drwx         4096  1700000000000 www
//! lrwx            4  1700000000000 sh -> dash
//! ```
//!
//! The timestamp is the helper's modification time in milliseconds.

use std::io::{self, Write};

use rfs_client::DirectoryListing;
use rfs_protocol::FsEntry;

/// Formats one entry.
pub(crate) fn format_entry(entry: &FsEntry) -> String {
    let mut line = format!(
        "{}{} {:>12} {:>14} {}",
        entry.file_type().as_char(),
        entry.access(),
        entry.size(),
        entry.mtime_millis(),
        entry.name(),
    );
    if let Some(target) = entry.link_target() {
        line.push_str(" -> ");
        line.push_str(target);
    }
    line
}

pub(crate) fn write_entry<W: Write>(out: &mut W, entry: &FsEntry) -> io::Result<()> {
    writeln!(out, "{}", format_entry(entry))
}

pub(crate) fn write_entries<W: Write>(out: &mut W, entries: &[FsEntry]) -> io::Result<()> {
    entries.iter().try_for_each(|entry| write_entry(out, entry))
}

/// Writes each directory as a `path:` heading followed by its entries,
/// with a blank line between directories.
pub(crate) fn write_listing<W: Write>(out: &mut W, listing: &DirectoryListing) -> io::Result<()> {
    for (index, (directory, entries)) in listing.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{directory}:")?;
        write_entries(out, entries)?;
    }
    Ok(())
}

pub(crate) fn write_lines<W: Write>(out: &mut W, lines: &[String]) -> io::Result<()> {
    lines.iter().try_for_each(|line| writeln!(out, "{line}"))
}
