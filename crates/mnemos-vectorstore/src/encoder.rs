//! Sentence encoder seam (spec.md §6: "a local embedding model
//! (in-process)"). `mnemos-vectorstore` depends only on the trait;
//! `mnemos-memory` and `mnemos-retrieval` inject whichever encoder the
//! runtime wires up at boot.

use mnemos_core::MnemosError;

/// Fixed embedding width threaded through both vector stores
/// (DESIGN.md Open Question #1).
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Turns text into a fixed-width embedding. Implementations must always
/// return a vector of exactly [`EMBEDDING_DIMENSIONS`] length.
pub trait SentenceEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<f32>, MnemosError>;
}

/// Deterministic, dependency-free stand-in encoder used by tests and by
/// any deployment without a real local model wired in yet. Hashes
/// overlapping word shingles into a fixed-width vector and L2-normalizes
/// it, so cosine similarity behaves sanely even though it is not a
/// learned embedding.
#[derive(Debug, Default)]
pub struct HashingEncoder;

impl SentenceEncoder for HashingEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, MnemosError> {
        let mut vector = vec![0f32; EMBEDDING_DIMENSIONS];
        for token in text.to_lowercase().split_whitespace() {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash as usize) % EMBEDDING_DIMENSIONS;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_output_is_fixed_width_and_normalized() {
        let encoder = HashingEncoder;
        let vector = encoder.encode("hello world").unwrap();
        assert_eq!(vector.len(), EMBEDDING_DIMENSIONS);
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[test]
    fn identical_text_yields_identical_vector() {
        let encoder = HashingEncoder;
        assert_eq!(encoder.encode("repeat me").unwrap(), encoder.encode("repeat me").unwrap());
    }
}
