use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standardgröße eines Laufs (1 048 576 Elemente, 4 MiB pro Vektor).
pub const DEFAULT_ELEMENTS: usize = 1 << 20;

/// Die beiden Eingangsvektoren auf dem Host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostInputs {
    pub a: Vec<f32>,
    pub b: Vec<f32>,
}

impl HostInputs {
    pub fn new(a: Vec<f32>, b: Vec<f32>) -> Self {
        Self { a, b }
    }

    /// Ganzzahlige Zufallswerte in `[0, 2^31)` als `f32`.
    /// Mit `seed` reproduzierbar, sonst aus OS-Entropie.
    pub fn random(n: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut sample = || rng.gen_range(0..i32::MAX) as f32;
        let a = (0..n).map(|_| sample()).collect();
        let b = (0..n).map(|_| sample()).collect();
        Self { a, b }
    }

    /// `a = [0, 1, .., n-1]`, `b = [n-1, .., 0]`; jede Summe ist `n - 1`.
    pub fn ramp(n: usize) -> Self {
        let a = (0..n).map(|i| i as f32).collect();
        let b = (0..n).rev().map(|i| i as f32).collect();
        Self { a, b }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }
}
