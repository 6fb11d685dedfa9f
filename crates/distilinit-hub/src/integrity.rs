use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{HubError, HubResult};

/// SHA-256 hex digest of a file, streamed so multi-GB checkpoints are not
/// read into memory at once.
pub fn sha256_file(path: &Path) -> HubResult<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Check `path` against an expected SHA-256 hex string (case-insensitive).
pub fn verify_integrity(path: &Path, expected_sha256: &str) -> HubResult<()> {
    let actual = sha256_file(path)?;
    debug!(
        path = %path.display(),
        expected = expected_sha256,
        actual = %actual,
        "Verifying cached file"
    );
    if actual.eq_ignore_ascii_case(expected_sha256) {
        return Ok(());
    }
    Err(HubError::IntegrityMismatch {
        file: path.to_string_lossy().to_string(),
        expected: expected_sha256.to_string(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn write_temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn sha256_of_known_content() {
        let path = write_temp_file("distilinit_sha_hello.txt", b"hello");
        assert_eq!(sha256_file(&path).unwrap(), HELLO_SHA256);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn sha256_of_empty_file() {
        let path = write_temp_file("distilinit_sha_empty.txt", b"");
        assert_eq!(
            sha256_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        let path = write_temp_file("distilinit_verify_upper.txt", b"hello");
        assert!(verify_integrity(&path, &HELLO_SHA256.to_uppercase()).is_ok());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn verify_rejects_tampered_file() {
        let path = write_temp_file("distilinit_verify_tampered.txt", b"hello!");
        let result = verify_integrity(&path, HELLO_SHA256);
        assert!(
            matches!(result, Err(HubError::IntegrityMismatch { .. })),
            "modified content must fail verification"
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn sha256_missing_file_is_io_error() {
        let path = temp_dir().join("distilinit_sha_does_not_exist.bin");
        assert!(matches!(sha256_file(&path), Err(HubError::Io(_))));
    }
}
