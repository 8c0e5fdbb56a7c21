use crate::llm::EMBEDDING_DIMENSIONS;

/// Cosine similarity in [-1, 1]; 0 when either vector has zero magnitude
/// or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        0.0
    } else {
        dot / magnitude
    }
}

pub fn is_valid_embedding(embedding: &[f32]) -> bool {
    embedding.len() == EMBEDDING_DIMENSIONS && embedding.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn embedding_validity() {
        assert!(is_valid_embedding(&vec![0.1; EMBEDDING_DIMENSIONS]));
        assert!(!is_valid_embedding(&[0.1; 3]));
        let mut bad = vec![0.0; EMBEDDING_DIMENSIONS];
        bad[7] = f32::NAN;
        assert!(!is_valid_embedding(&bad));
    }
}
