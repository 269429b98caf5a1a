//! Content hashing for cache-busted filenames.
//!
//! Uses `blake3` for:
//! - Deterministic, collision-resistant digests of asset contents
//! - Streaming hashing of large files without buffering them
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint("some content"); // -> "a1b2c3d4"
//! let name = hash::cache_busted_name("index.css", &fp); // -> "index.a1b2c3d4.css"
//! ```

use std::io::{self, Read};

/// Hex characters in a fingerprint.
const FINGERPRINT_LEN: usize = 8;

/// Compute the full digest of a byte buffer.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> blake3::Hash {
    blake3::hash(data.as_ref())
}

/// Compute the digest of a reader (streaming, for large files).
pub fn compute_reader(mut reader: impl Read) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize())
}

/// Compute hash and return as an 8-char hex fingerprint.
///
/// Used for cache-busting filenames (e.g. `style.a1b2c3d4.css`).
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    truncate(&compute(value))
}

/// Streaming variant of [`fingerprint`].
pub fn fingerprint_reader(reader: impl Read) -> io::Result<String> {
    Ok(truncate(&compute_reader(reader)?))
}

fn truncate(hash: &blake3::Hash) -> String {
    hex::encode(&hash.as_bytes()[..FINGERPRINT_LEN / 2])
}

/// Insert a fingerprint fragment before the filename's extension.
///
/// `index.css` + `abcd1234` -> `index.abcd1234.css`; a name without an
/// extension gets the fragment appended: `README` -> `README.abcd1234`.
pub fn cache_busted_name(name: &str, fragment: &str) -> String {
    match name.rfind('.') {
        Some(idx) => format!("{}.{fragment}.{}", &name[..idx], &name[idx + 1..]),
        None => format!("{name}.{fragment}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(fingerprint("hello"), fingerprint("hello"));
    }

    #[test]
    fn test_fingerprint_length() {
        assert_eq!(fingerprint("hello").len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_ne!(fingerprint("hello"), fingerprint("hellp"));
    }

    #[test]
    fn test_fingerprint_reader_matches_buffer() {
        let data = vec![42u8; 100_000];
        let streamed = fingerprint_reader(&data[..]).unwrap();
        assert_eq!(streamed, fingerprint(&data));
    }

    #[test]
    fn test_cache_busted_name_with_extension() {
        assert_eq!(
            cache_busted_name("index.css", "abcd1234"),
            "index.abcd1234.css"
        );
    }

    #[test]
    fn test_cache_busted_name_without_extension() {
        assert_eq!(cache_busted_name("README", "abcd1234"), "README.abcd1234");
    }

    #[test]
    fn test_cache_busted_name_multiple_dots() {
        assert_eq!(
            cache_busted_name("app.min.js", "abcd1234"),
            "app.min.abcd1234.js"
        );
    }
}
