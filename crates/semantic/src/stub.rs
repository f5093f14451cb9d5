use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::SemanticConfig;

/// Deterministic feature-hashing embedder used in `"stub"` mode and when
/// the ONNX assets are unavailable.
///
/// Each token is hashed into a handful of signed buckets, so texts sharing
/// vocabulary land near each other under cosine similarity. Not a language
/// model, but deterministic, fast, and good enough to rank endpoint
/// descriptions against a query in tests and offline deployments.
pub(crate) fn hashed_embedding(text: &str, cfg: &SemanticConfig) -> Vec<f32> {
    let dim = cfg.embedding_dim.max(1);
    let mut v = vec![0f32; dim];

    let lowered = text.to_lowercase();
    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
    {
        let h = hash64(token.as_bytes());
        // Four buckets per token; the high bit of each rotation picks the sign.
        for k in 0..4u32 {
            let bits = h.rotate_right(k * 16);
            let idx = (bits as usize) % dim;
            let sign = if bits & (1u64 << 63) != 0 { -1.0 } else { 1.0 };
            v[idx] += sign;
        }
    }

    if cfg.normalize {
        l2_normalize_in_place(&mut v);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::cosine_similarity;

    fn cfg() -> SemanticConfig {
        SemanticConfig::stub()
    }

    #[test]
    fn embedding_has_configured_dimension() {
        let v = hashed_embedding("strategic market expansion", &cfg());
        assert_eq!(v.len(), 384);
    }

    #[test]
    fn same_text_same_vector() {
        let a = hashed_embedding("top strategic markets", &cfg());
        let b = hashed_embedding("top strategic markets", &cfg());
        assert_eq!(a, b);
    }

    #[test]
    fn shared_vocabulary_scores_higher_than_disjoint() {
        let config = cfg();
        let query = hashed_embedding("segment behavior profile", &config);
        let close = hashed_embedding("profiles each segment behavior across areas", &config);
        let far = hashed_embedding("quartile class break renderer palette", &config);
        assert!(
            cosine_similarity(&query, &close) > cosine_similarity(&query, &far),
            "vocabulary overlap should dominate"
        );
    }

    #[test]
    fn single_char_tokens_ignored() {
        let a = hashed_embedding("a b c", &cfg());
        assert!(a.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn normalized_vector_is_unit_length() {
        let v = hashed_embedding("market share difference", &cfg());
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let v = hashed_embedding("", &cfg());
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
