//! Batch operation and result types

use crate::error::FsError;
use crate::localfs::StatRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Filesystem operation applied to every path of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// stat, returns the stat record
    Metadata,
    /// full-read SHA-256, returns the hex digest
    Checksum,
    /// stat then unlink, returns the stat record as a receipt
    Delete,
}

impl Operation {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Metadata => "metadata",
            Operation::Checksum => "checksum",
            Operation::Delete => "delete",
        }
    }
}

/// Success payload of one item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    Stat(StatRecord),
    Digest(String),
}

/// Outcome of one item
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ItemData),
    Failure(FsError),
}

/// Result of one operation on one path
///
/// Serializes as `{"path", "err": null, "stat"}` or `{"path", "err": null,
/// "SHA256"}` on success and `{"path", "err": {...}}` on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub path: String,
    pub outcome: Outcome,
}

impl ItemResult {
    pub fn success(path: String, data: ItemData) -> Self {
        Self {
            path,
            outcome: Outcome::Success(data),
        }
    }

    pub fn failure(path: String, error: FsError) -> Self {
        Self {
            path,
            outcome: Outcome::Failure(error),
        }
    }

    /// Returns true if this item succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// The error, if the item failed
    pub fn error(&self) -> Option<&FsError> {
        match &self.outcome {
            Outcome::Failure(e) => Some(e),
            Outcome::Success(_) => None,
        }
    }
}

impl Serialize for ItemResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.outcome {
            Outcome::Success(data) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("path", &self.path)?;
                map.serialize_entry("err", &Option::<FsError>::None)?;
                match data {
                    ItemData::Stat(stat) => map.serialize_entry("stat", stat)?,
                    ItemData::Digest(digest) => map.serialize_entry("SHA256", digest)?,
                }
                map.end()
            }
            Outcome::Failure(err) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("path", &self.path)?;
                map.serialize_entry("err", err)?;
                map.end()
            }
        }
    }
}

/// All item results of one batch, in completion order
pub type BatchResult = Vec<ItemResult>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_success_digest_shape() {
        let item = ItemResult::success("/a".into(), ItemData::Digest("abc".into()));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json, serde_json::json!({"path": "/a", "err": null, "SHA256": "abc"}));
        assert!(item.is_success());
        assert!(item.error().is_none());
    }

    #[test]
    fn test_failure_shape_omits_payload() {
        let err = FsError::from_io("stat", "/missing", &io::Error::from_raw_os_error(libc::ENOENT));
        let item = ItemResult::failure("/missing".into(), err);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["path"], "/missing");
        assert_eq!(json["err"]["code"], "ENOENT");
        assert!(json.get("stat").is_none());
        assert!(!item.is_success());
    }
}
