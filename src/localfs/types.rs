//! Stat record types
//!
//! These types represent the metadata returned by the stat, batch metadata
//! and delete endpoints. The field set mirrors the platform stat structure
//! (device, inode, mode, link count, owner, sizes, four timestamps) and adds
//! a decoded entry type and permission string for readability.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::time::UNIX_EPOCH;

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Block device
    BlockDevice,
    /// Character device
    CharDevice,
    /// Named pipe (FIFO)
    Fifo,
    /// Unix socket
    Socket,
    /// Unknown type
    Unknown,
}

impl EntryType {
    /// Decode the type bits of a Unix mode
    pub fn from_mode(mode: u32) -> Self {
        match mode & 0o170000 {
            0o100000 => EntryType::File,        // S_IFREG
            0o040000 => EntryType::Directory,   // S_IFDIR
            0o120000 => EntryType::Symlink,     // S_IFLNK
            0o060000 => EntryType::BlockDevice, // S_IFBLK
            0o020000 => EntryType::CharDevice,  // S_IFCHR
            0o010000 => EntryType::Fifo,        // S_IFIFO
            0o140000 => EntryType::Socket,      // S_IFSOCK
            _ => EntryType::Unknown,
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryType::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryType::Directory
    }
}

/// File permissions (Unix mode bits without type)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions(pub u32);

impl Permissions {
    /// Create from full mode (strips type bits)
    pub fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw permission bits
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Four digit octal form, e.g. `0644`
    pub fn to_octal_string(&self) -> String {
        format!("{:04o}", self.0)
    }
}

/// Serialized stat structure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRecord {
    pub dev: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub blksize: u64,
    pub ino: u64,
    pub size: u64,
    pub blocks: u64,
    pub atime_ms: f64,
    pub mtime_ms: f64,
    pub ctime_ms: f64,
    pub birthtime_ms: f64,
    pub atime: String,
    pub mtime: String,
    pub ctime: String,
    pub birthtime: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub permissions: String,
}

impl StatRecord {
    /// Build from platform metadata
    pub fn from_metadata(meta: &Metadata) -> Self {
        let atime_ms = to_millis(meta.atime(), meta.atime_nsec());
        let mtime_ms = to_millis(meta.mtime(), meta.mtime_nsec());
        let ctime_ms = to_millis(meta.ctime(), meta.ctime_nsec());

        // Not every filesystem records a creation time
        let birthtime_ms = meta
            .created()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(ctime_ms);

        let mode = meta.mode();

        Self {
            dev: meta.dev(),
            mode,
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            blksize: meta.blksize(),
            ino: meta.ino(),
            size: meta.size(),
            blocks: meta.blocks(),
            atime_ms,
            mtime_ms,
            ctime_ms,
            birthtime_ms,
            atime: format_millis(atime_ms),
            mtime: format_millis(mtime_ms),
            ctime: format_millis(ctime_ms),
            birthtime: format_millis(birthtime_ms),
            entry_type: EntryType::from_mode(mode),
            permissions: Permissions::from_mode(mode).to_octal_string(),
        }
    }

    /// Get the entry type
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }
}

fn to_millis(secs: i64, nsecs: i64) -> f64 {
    secs as f64 * 1000.0 + nsecs as f64 / 1_000_000.0
}

fn format_millis(ms: f64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms.floor() as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
