//! Vector distance helpers

/// Squared Euclidean distance between two equal-length vectors
pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

pub(crate) fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; magnitudes may be passed in when already computed
pub(crate) fn cosine_similarity(
    a: &[f32],
    b: &[f32],
    mag_a: Option<f32>,
    mag_b: Option<f32>,
) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let ma = mag_a.unwrap_or_else(|| magnitude(a));
    let mb = mag_b.unwrap_or_else(|| magnitude(b));
    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }
    dot / (ma * mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_euclidean() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_euclidean(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = [0.6, 0.8];
        assert!((cosine_similarity(&v, &v, None, None) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!(cosine_similarity(&a, &b, None, None).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b, None, None), 0.0);
    }
}
