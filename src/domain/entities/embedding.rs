use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }

    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        self.cosine_similarity_with_norm(other, self.norm())
    }

    /// Cosine similarity with this vector's norm precomputed, for scoring one
    /// query against many records.
    pub fn cosine_similarity_with_norm(&self, other: &Embedding, self_norm: f32) -> f32 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }

        let dot_product: f32 = self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum();
        let other_norm = other.norm();

        if self_norm == 0.0 || other_norm == 0.0 {
            return 0.0;
        }

        let score = dot_product / (self_norm * other_norm);
        // Finite components can still overflow the norms.
        if score.is_finite() {
            score
        } else {
            0.0
        }
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vec: Vec<f32>) -> Self {
        Self(vec)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
