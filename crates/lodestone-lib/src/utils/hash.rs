use anyhow::{Context, Result};
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const READ_CHUNK_SIZE: usize = 16384;

/// Hex SHA-512 of a file's full content
pub fn calculate_sha512(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?} for hashing", path))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha512::new();
    let mut buffer = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Same as [`calculate_sha512`] but off the async runtime's worker threads
pub async fn calculate_sha512_async(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || calculate_sha512(&path))
        .await
        .context("Hashing task panicked")?
}

pub fn sha512_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}
