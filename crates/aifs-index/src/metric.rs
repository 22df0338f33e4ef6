use aifs_types::DistanceMetric;

/// Score a candidate against a query. Smaller is always closer: the
/// similarity metrics (cosine, dot) are negated/inverted so one ordering
/// rule serves every metric.
pub fn score(metric: DistanceMetric, query: &[f32], candidate: &[f32]) -> f32 {
    debug_assert_eq!(query.len(), candidate.len());
    match metric {
        DistanceMetric::Cosine => 1.0 - cosine_similarity(query, candidate),
        DistanceMetric::Euclidean => query
            .iter()
            .zip(candidate)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt(),
        DistanceMetric::Dot => -query.iter().zip(candidate).map(|(a, b)| a * b).sum::<f32>(),
        DistanceMetric::Manhattan => query
            .iter()
            .zip(candidate)
            .map(|(a, b)| (a - b).abs())
            .sum(),
        DistanceMetric::Hamming => query
            .iter()
            .zip(candidate)
            .filter(|(a, b)| a.to_bits() != b.to_bits())
            .count() as f32,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_score_zero() {
        let v = vec![1.0, 2.0, 3.0];
        assert!(score(DistanceMetric::Cosine, &v, &v).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors_score_one() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((score(DistanceMetric::Cosine, &a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn euclidean_is_l2() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((score(DistanceMetric::Euclidean, &a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn dot_prefers_larger_products() {
        let q = vec![1.0, 1.0];
        let near = vec![2.0, 2.0];
        let far = vec![0.1, 0.1];
        assert!(score(DistanceMetric::Dot, &q, &near) < score(DistanceMetric::Dot, &q, &far));
    }

    #[test]
    fn manhattan_is_l1() {
        let a = vec![1.0, 2.0];
        let b = vec![4.0, 6.0];
        assert!((score(DistanceMetric::Manhattan, &a, &b) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn hamming_counts_differing_positions() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![1.0, 9.0, 3.0, 8.0];
        assert_eq!(score(DistanceMetric::Hamming, &a, &b), 2.0);
    }

    #[test]
    fn zero_vector_cosine_is_defined() {
        let zero = vec![0.0, 0.0];
        let v = vec![1.0, 1.0];
        assert!((score(DistanceMetric::Cosine, &zero, &v) - 1.0).abs() < 1e-6);
    }
}
