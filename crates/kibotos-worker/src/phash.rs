//! Perceptual-hash computation for Stage 3 duplicate detection.
//!
//! A true DCT-based perceptual hash needs decoded frames, which this
//! workspace has no video-decoding dependency for. This computes a
//! locality-sensitive fingerprint directly over the downloaded bytes:
//! split into 64 equal windows, average each, and set one hash bit per
//! window relative to the overall mean — the same construction difference
//! hashing uses over pixel intensities, just applied to byte intensities.
//! Near-identical uploads (re-encodes, trims) will diverge somewhat more
//! than a frame-level hash would catch, but byte-identical and
//! near-byte-identical duplicates (the common re-upload case) hash
//! identically or near-identically.

const HASH_BITS: usize = 64;

pub fn compute_phash(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "0".repeat(HASH_BITS / 4);
    }

    let window_len = (bytes.len() / HASH_BITS).max(1);
    let averages: Vec<f64> = (0..HASH_BITS)
        .map(|i| {
            let start = i * window_len;
            if start >= bytes.len() {
                return 0.0;
            }
            let end = (start + window_len).min(bytes.len());
            let window = &bytes[start..end];
            window.iter().map(|&b| b as f64).sum::<f64>() / window.len() as f64
        })
        .collect();

    let mean = averages.iter().sum::<f64>() / averages.len() as f64;

    let mut hash: u64 = 0;
    for (i, &avg) in averages.iter().enumerate() {
        if avg >= mean {
            hash |= 1 << i;
        }
    }

    hex::encode(hash.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_hash_identically() {
        let data = vec![7u8; 4096];
        assert_eq!(compute_phash(&data), compute_phash(&data));
    }

    #[test]
    fn empty_bytes_do_not_panic() {
        let hash = compute_phash(&[]);
        assert_eq!(hash.len(), 16);
    }

    #[test]
    fn hash_is_sixteen_hex_chars() {
        let data: Vec<u8> = (0..2000u32).map(|n| (n % 256) as u8).collect();
        let hash = compute_phash(&data);
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
