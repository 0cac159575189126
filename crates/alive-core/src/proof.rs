//! Proof commitments for daily check-ins.
//!
//! A proof binds a calendar day and the submitted content into a salted
//! Keccak-256 digest that an external contract can verify later. The exact
//! byte layout matters: verifiers outside this system recompute the digest
//! from `dateKey|normalizedText|saltHex`, so normalization is part of the
//! public contract, not an implementation detail.

use sha2::{Digest as Sha2Digest, Sha256};
use sha3::{Digest as Sha3Digest, Keccak256};

/// Maximum length of normalized text, in chars.
pub const MAX_TEXT_LEN: usize = 500;

/// Salt size in bytes. Hex-encoded with a `0x` prefix.
pub const SALT_BYTES: usize = 16;

/// Normalize submitted text: collapse whitespace runs to single spaces,
/// trim, truncate to [`MAX_TEXT_LEN`] chars.
///
/// Idempotent. Two submissions differing only in whitespace normalize to
/// the same string and therefore hash identically.
pub fn normalize_text(text: &str) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() > MAX_TEXT_LEN {
        cleaned.chars().take(MAX_TEXT_LEN).collect()
    } else {
        cleaned
    }
}

/// SHA-256 of the given text, lowercase hex without a prefix.
///
/// Used as the audit hash of normalized input, not for on-chain proofs.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh per-check-in salt from the OS CSPRNG.
///
/// # Errors
/// Returns an error only if the OS entropy source fails.
pub fn generate_salt_hex() -> Result<String, getrandom::Error> {
    let mut buf = [0u8; SALT_BYTES];
    getrandom::getrandom(&mut buf)?;
    Ok(format!("0x{}", hex::encode(buf)))
}

/// Compute the proof commitment for one day's submission.
///
/// Keccak-256 over the UTF-8 bytes of `"{date_key}|{normalized_text}|{salt_hex}"`,
/// rendered as `0x` + 64 lowercase hex digits. Deterministic; empty text is
/// valid and produces a defined hash.
pub fn compute_proof_hash(date_key: &str, normalized_text: &str, salt_hex: &str) -> String {
    let payload = format!("{date_key}|{normalized_text}|{salt_hex}");
    let mut hasher = Keccak256::new();
    hasher.update(payload.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn proof_hash_deterministic() {
        let h1 = compute_proof_hash("2026-01-29", "hello", "0xabc123");
        let h2 = compute_proof_hash("2026-01-29", "hello", "0xabc123");
        assert_eq!(h1, h2);
        assert!(h1.starts_with("0x"));
        assert_eq!(h1.len(), 66);
    }

    #[test]
    fn proof_hash_sensitive_to_each_input() {
        let base = compute_proof_hash("2026-01-29", "hello", "0xabc123");
        assert_ne!(base, compute_proof_hash("2026-01-30", "hello", "0xabc123"));
        assert_ne!(base, compute_proof_hash("2026-01-29", "hello!", "0xabc123"));
        assert_ne!(base, compute_proof_hash("2026-01-29", "hello", "0xabc124"));
    }

    #[test]
    fn empty_text_is_valid() {
        let h = compute_proof_hash("2026-01-29", "", "0xabc123");
        assert_eq!(h.len(), 66);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a   b\n c "), "a b c");
        assert_eq!(normalize_text("a\tb\r\nc"), "a b c");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n\t "), "");
    }

    #[test]
    fn normalize_truncates_by_chars() {
        let long = "x".repeat(MAX_TEXT_LEN + 50);
        assert_eq!(normalize_text(&long).chars().count(), MAX_TEXT_LEN);

        // Multi-byte chars count as one unit each.
        let wide = "語".repeat(MAX_TEXT_LEN + 10);
        assert_eq!(normalize_text(&wide).chars().count(), MAX_TEXT_LEN);
    }

    #[test]
    fn salt_has_fixed_shape() {
        let salt = generate_salt_hex().unwrap();
        assert!(salt.starts_with("0x"));
        assert_eq!(salt.len(), 2 + SALT_BYTES * 2);
        assert!(salt[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn salts_are_unique() {
        let a = generate_salt_hex().unwrap();
        let b = generate_salt_hex().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn input_hash_shape() {
        let h = sha256_hex("hello");
        assert_eq!(h.len(), 64);
        assert!(!h.starts_with("0x"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in ".{0,600}") {
            let once = normalize_text(&s);
            prop_assert_eq!(normalize_text(&once), once);
        }

        #[test]
        fn normalized_never_exceeds_limit(s in ".{0,2000}") {
            prop_assert!(normalize_text(&s).chars().count() <= MAX_TEXT_LEN);
        }

        #[test]
        fn whitespace_variants_hash_identically(
            words in proptest::collection::vec("[a-z]{1,8}", 1..10),
            gaps in proptest::collection::vec("[ \t\n]{1,3}", 10),
        ) {
            let mut noisy = String::new();
            for (i, w) in words.iter().enumerate() {
                noisy.push_str(&gaps[i % gaps.len()]);
                noisy.push_str(w);
            }
            let clean = words.join(" ");
            prop_assert_eq!(
                compute_proof_hash("2026-01-01", &normalize_text(&noisy), "0x00"),
                compute_proof_hash("2026-01-01", &normalize_text(&clean), "0x00")
            );
        }
    }
}
