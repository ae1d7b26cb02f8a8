//! Content hashing for revision lookups
//!
//! The build service indexes revisions by the MD5 hex digest of each file.

use md5::{Digest, Md5};

/// MD5 hex digest of a file's content
pub fn content_hash(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_ref());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_matches_md5sum() {
        assert_eq!(content_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            content_hash("openapi: 3.1.0\n"),
            content_hash(b"openapi: 3.1.0\n".to_vec())
        );
        assert_eq!(content_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }
}
