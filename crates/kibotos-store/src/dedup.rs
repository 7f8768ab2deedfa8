use crate::{Store, StoreError};
use uuid::Uuid;

impl Store {
    /// Exact-match dedup check for admission: true if
    /// `(miner_uid, video_hash)` already exists on any non-rejected
    /// submission, in any cycle.
    pub async fn exists_duplicate_hash(
        &self,
        miner_uid: i64,
        video_hash: &str,
    ) -> Result<bool, StoreError> {
        let found: Option<Uuid> = sqlx::query_scalar(
            r#"
SELECT uuid FROM submissions
WHERE miner_uid = $1 AND video_hash = $2 AND state != 'REJECTED'
LIMIT 1
            "#,
        )
        .bind(miner_uid)
        .bind(video_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Perceptual-hash neighborhood search for Stage 3 quality scoring:
    /// scans SCORED submissions with a recorded `video_phash` in `cycle_id`
    /// and `cycle_id - 1`, and returns the closest match (by Hamming
    /// distance over the hex-encoded hash) if any, along with a similarity
    /// in `[0, 1]` (1.0 = identical).
    ///
    /// Bounded to the current and immediately prior cycle rather than an
    /// unbounded history scan, which would force a full-table scan with no
    /// natural cutoff.
    pub async fn find_near_duplicate(
        &self,
        cycle_id: i64,
        phash: &str,
    ) -> Result<Option<(Uuid, f64)>, StoreError> {
        let candidates: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
SELECT uuid, video_phash FROM submissions
WHERE cycle_id IN ($1, $2) AND state = 'SCORED' AND video_phash IS NOT NULL
            "#,
        )
        .bind(cycle_id)
        .bind(cycle_id - 1)
        .fetch_all(&self.pool)
        .await?;

        let mut best: Option<(Uuid, f64)> = None;
        for (candidate_uuid, candidate_phash) in candidates {
            let similarity = hamming_similarity(phash, &candidate_phash);
            let is_better = match &best {
                Some((_, s)) => similarity > *s,
                None => true,
            };
            if is_better {
                best = Some((candidate_uuid, similarity));
            }
        }

        Ok(best)
    }
}

/// Similarity between two equal-length hex-encoded perceptual hashes,
/// expressed as `1 - (hamming_distance / bit_length)`. Mismatched lengths
/// (corrupt data, different hash algorithm versions) are treated as
/// maximally dissimilar rather than erroring, since this feeds a
/// best-effort quality score, not a correctness-critical path.
fn hamming_similarity(a: &str, b: &str) -> f64 {
    let (Ok(a), Ok(b)) = (hex::decode(a), hex::decode(b)) else {
        return 0.0;
    };
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let differing_bits: u32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    let total_bits = (a.len() * 8) as f64;

    1.0 - (differing_bits as f64 / total_bits)
}

#[cfg(test)]
mod tests {
    use super::hamming_similarity;

    #[test]
    fn identical_hashes_are_fully_similar() {
        assert_eq!(hamming_similarity("abcd1234", "abcd1234"), 1.0);
    }

    #[test]
    fn fully_inverted_hashes_are_fully_dissimilar() {
        assert_eq!(hamming_similarity("00", "ff"), 0.0);
    }

    #[test]
    fn mismatched_lengths_are_dissimilar() {
        assert_eq!(hamming_similarity("ab", "abcd"), 0.0);
    }
}
