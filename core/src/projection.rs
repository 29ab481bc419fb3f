//! Random-hyperplane signatures (SimHash) over TF-IDF vectors.
//!
//! Bit `i` of a signature is set when the vector lies on the non-negative side
//! of hyperplane `i`. The fraction of differing bits between two signatures
//! estimates the angle between the original vectors, with an error that
//! shrinks as the number of hyperplanes grows.

use crate::config::ProjectionKind;
use crate::error::{Error, Result};
use crate::similarity::dot;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Packed bit signature of fixed length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    words: Vec<u64>,
    len: usize,
}

impl Signature {
    pub fn zeros(len: usize) -> Self {
        Self { words: vec![0; len.div_ceil(64)], len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, bit: usize) -> bool {
        bit < self.len && self.words[bit / 64] >> (bit % 64) & 1 == 1
    }

    pub fn set(&mut self, bit: usize, value: bool) {
        debug_assert!(bit < self.len);
        let mask = 1u64 << (bit % 64);
        if value {
            self.words[bit / 64] |= mask;
        } else {
            self.words[bit / 64] &= !mask;
        }
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Number of differing bits. Signatures must have the same length.
    pub fn hamming(&self, other: &Signature) -> u32 {
        debug_assert_eq!(self.len, other.len);
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// `k` random hyperplanes in vocabulary space, fixed for the run.
#[derive(Debug, Clone)]
pub struct RandomProjection {
    planes: Vec<Vec<f32>>,
    input_dim: usize,
    kind: ProjectionKind,
}

impl RandomProjection {
    pub fn new(input_dim: usize, k: usize, kind: ProjectionKind, seed: Option<u64>) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::config("random projection needs a non-empty vocabulary"));
        }
        if k == 0 {
            return Err(Error::config("random projection needs a positive dimension"));
        }
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let planes = (0..k)
            .map(|_| (0..input_dim).map(|_| sample(&mut rng, kind)).collect())
            .collect();
        tracing::info!(input_dim, k, ?kind, "initialised projection matrix");
        Ok(Self { planes, input_dim, kind })
    }

    /// Number of hyperplanes, i.e. signature length.
    pub fn dimensions(&self) -> usize {
        self.planes.len()
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    pub fn planes(&self) -> &[Vec<f32>] {
        &self.planes
    }

    pub fn project(&self, v: &[f32]) -> Signature {
        debug_assert_eq!(v.len(), self.input_dim);
        let mut sig = Signature::zeros(self.planes.len());
        for (i, plane) in self.planes.iter().enumerate() {
            sig.set(i, dot(v, plane) >= 0.0);
        }
        sig
    }
}

fn sample(rng: &mut StdRng, kind: ProjectionKind) -> f32 {
    match kind {
        ProjectionKind::Bipolar => {
            if rng.gen::<bool>() {
                1.0
            } else {
                -1.0
            }
        }
        ProjectionKind::Gaussian => {
            // Box-Muller; u1 in (0, 1] keeps ln finite.
            let u1: f32 = 1.0 - rng.gen::<f32>();
            let u2: f32 = rng.gen::<f32>();
            (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_shapes() {
        assert!(matches!(RandomProjection::new(0, 8, ProjectionKind::Gaussian, Some(1)), Err(Error::Configuration(_))));
        assert!(matches!(RandomProjection::new(8, 0, ProjectionKind::Gaussian, Some(1)), Err(Error::Configuration(_))));
    }

    #[test]
    fn seeded_matrix_is_reproducible() {
        let a = RandomProjection::new(16, 32, ProjectionKind::Gaussian, Some(7)).unwrap();
        let b = RandomProjection::new(16, 32, ProjectionKind::Gaussian, Some(7)).unwrap();
        assert_eq!(a.planes(), b.planes());
    }

    #[test]
    fn bipolar_components_are_unit() {
        let p = RandomProjection::new(10, 20, ProjectionKind::Bipolar, Some(3)).unwrap();
        assert!(p.planes().iter().flatten().all(|&x| x == 1.0 || x == -1.0));
    }

    #[test]
    fn projection_is_deterministic_and_scale_invariant() {
        let p = RandomProjection::new(5, 100, ProjectionKind::Gaussian, Some(11)).unwrap();
        let v = [0.2, 0.0, 1.3, 0.7, 0.0];
        let scaled: Vec<f32> = v.iter().map(|x| x * 4.0).collect();
        let s = p.project(&v);
        assert_eq!(s.len(), 100);
        assert_eq!(s, p.project(&v));
        assert_eq!(s.hamming(&p.project(&scaled)), 0);
    }

    #[test]
    fn opposite_vectors_differ_in_most_bits() {
        let p = RandomProjection::new(4, 128, ProjectionKind::Gaussian, Some(5)).unwrap();
        let v = [1.0, -2.0, 0.5, 3.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!(p.project(&v).hamming(&p.project(&neg)) > 120);
    }

    #[test]
    fn signature_bits() {
        let mut s = Signature::zeros(70);
        s.set(0, true);
        s.set(69, true);
        assert!(s.get(69) && s.get(0) && !s.get(1));
        assert_eq!(s.count_ones(), 2);
        s.set(0, false);
        assert_eq!(s.hamming(&Signature::zeros(70)), 1);
    }
}
