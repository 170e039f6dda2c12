//! Embedding BLOB conversion and cosine similarity computation.
//!
//! Blobs are raw `f64` arrays in native byte order. The dimension is not
//! stored per row; readers must know it out of band.

use crate::errors::Error;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Convert an embedding to a BLOB of native-endian `f64` values.
///
/// # Errors
///
/// Returns `Error::Validation` if the vector length is not `dimension`.
pub fn vec_to_blob(vec: &[f64], dimension: usize) -> Result<Vec<u8>, Error> {
    if vec.len() != dimension {
        return Err(Error::Validation(format!(
            "embedding has {} dimensions, store expects {}",
            vec.len(),
            dimension
        )));
    }
    Ok(vec.iter().flat_map(|x| x.to_ne_bytes()).collect())
}

/// Convert a BLOB back into an embedding.
///
/// Returns `None` if the blob is not exactly `dimension * 8` bytes, which the
/// scan treats as a not-yet-indexed row.
pub fn blob_to_vec(blob: &[u8], dimension: usize) -> Option<Vec<f64>> {
    if blob.len() != dimension * F64_BYTES {
        return None;
    }
    let mut vec = Vec::with_capacity(dimension);
    for chunk in blob.chunks_exact(F64_BYTES) {
        let mut bytes = [0u8; F64_BYTES];
        bytes.copy_from_slice(chunk);
        vec.push(f64::from_ne_bytes(bytes));
    }
    Some(vec)
}

/// Cosine similarity over the shared prefix `min(a.len(), b.len())`.
///
/// Returns `0.0` when either side has zero magnitude (including empty input)
/// or the result is not finite.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a * norm_b);
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_to_blob_size() {
        let blob = vec_to_blob(&[0.1; 384], 384).unwrap();
        assert_eq!(blob.len(), 384 * 8);
    }

    #[test]
    fn test_vec_to_blob_wrong_dimensions() {
        assert!(matches!(
            vec_to_blob(&[0.1; 256], 384),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_blob_round_trip_is_bit_exact() {
        let original = vec![
            0.1,
            -3.5e-300,
            f64::MAX,
            f64::MIN_POSITIVE,
            -0.0,
            1.0 / 3.0,
        ];
        let blob = vec_to_blob(&original, original.len()).unwrap();
        let decoded = blob_to_vec(&blob, original.len()).unwrap();
        for (a, b) in original.iter().zip(&decoded) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_blob_to_vec_wrong_size() {
        assert!(blob_to_vec(&[0u8; 1500], 384).is_none());
        assert!(blob_to_vec(&[], 384).is_none());
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.3, -1.2, 4.0, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0; 8], &[1.0; 8]), 0.0);
        assert_eq!(cosine_similarity(&[], &[1.0; 8]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_uses_shared_prefix() {
        // Tail of the longer vector is ignored.
        let sim = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 99.0, -7.0]);
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_bounded() {
        let a = [0.7, -0.2, 0.0, 5.5, -1.0];
        let b = [-3.0, 0.4, 2.2, 0.1, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((-1.0..=1.0).contains(&sim));
    }
}
