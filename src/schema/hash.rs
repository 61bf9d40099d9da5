//! Schema fingerprints.

use std::io;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Feeds serialized bytes straight into the hasher.
struct DigestWriter(Sha256);

impl io::Write for DigestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Lowercase hex SHA-256 of the compact JSON encoding of `value`.
///
/// Struct fields encode in declaration order and sequences in element order,
/// so equal schemas digest equal and reordered attributes do not.
pub fn digest<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut writer = DigestWriter(Sha256::new());
    serde_json::to_writer(&mut writer, value)?;
    Ok(format!("{:x}", writer.0.finalize()))
}
