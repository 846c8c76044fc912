//! Common test utilities
#![allow(dead_code)]

use numr_arena::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic RNG for reproducible random matrices
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// The 3x3 matrix [[0,1,0],[2,0,0],[0,0,3]]
pub fn sample_dense(device: Device) -> Matrix<f32> {
    Matrix::from_slice(
        &[0.0, 1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0],
        [3, 3],
        device,
    )
}

/// Dense matrix from row-major values, keeping roughly `density` of them
/// nonzero
pub fn random_dense(rng: &mut ChaCha8Rng, shape: [usize; 2], density: f64) -> Matrix<f64> {
    use rand::Rng;
    let values: Vec<f64> = (0..shape[0] * shape[1])
        .map(|_| {
            if rng.random::<f64>() < density {
                rng.random_range(1..10) as f64
            } else {
                0.0
            }
        })
        .collect();
    Matrix::from_slice(&values, shape, Device::Host)
}

/// Collect `(row, col, value)` triples in visiting order
#[cfg(feature = "sparse")]
pub fn row_triples<T: Element>(m: &SparseRowMatrix<T>) -> Vec<(usize, usize, T)> {
    let mut out = Vec::new();
    m.for_each(|i, j, v| out.push((i, j, v)));
    out
}

/// Collect `(row, col, value)` triples in visiting order
#[cfg(feature = "sparse")]
pub fn map_triples<T: Element>(m: &SparseMapMatrix<T>) -> Vec<(usize, usize, T)> {
    let mut out = Vec::new();
    m.forall_nonzero(|i, j, v| out.push((i, j, v)));
    out
}
