//! SHA-256 checksums over file contents
//!
//! Files are streamed through the hasher in fixed-size chunks so memory use
//! does not depend on file size. Any error before end-of-file discards the
//! partial state.

use crate::error::{FsError, FsResult};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Compute the lowercase hex SHA-256 of an in-memory buffer
///
/// # Example
///
/// ```
/// use fs_bucket::content::checksum::sha256_hex;
///
/// let hash = sha256_hex(b"hello");
/// assert_eq!(hash, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
/// ```
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Stream a file through SHA-256 and return the lowercase hex digest
pub async fn sha256_file(path: &str, chunk_size: usize) -> FsResult<String> {
    let mut file = File::open(path)
        .await
        .map_err(|e| FsError::from_io("open", path, &e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| FsError::from_io("read", path, &e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
