//! Offline feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with blake3; the first eight bytes pick a
//! bucket and the ninth picks a sign. The bucket counts are then L2-normalised so cosine
//! similarity behaves like it does for model embeddings.

/// Deterministic embedding of `text` into `dimensions` buckets.
///
/// Text without any alphanumeric token maps to the zero vector.
pub fn embed(text: &str, dimensions: usize) -> Vec<f32> {
	let mut vec = vec![0.0_f32; dimensions];

	if dimensions == 0 {
		return vec;
	}

	for token in text.to_lowercase().split(|ch: char| !ch.is_alphanumeric()) {
		if token.is_empty() {
			continue;
		}

		let hash = blake3::hash(token.as_bytes());
		let bytes = hash.as_bytes();
		let mut bucket_bytes = [0_u8; 8];

		bucket_bytes.copy_from_slice(&bytes[..8]);

		let bucket = (u64::from_le_bytes(bucket_bytes) % dimensions as u64) as usize;
		let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

		vec[bucket] += sign;
	}

	let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm > 0.0 {
		for value in &mut vec {
			*value /= norm;
		}
	}

	vec
}
