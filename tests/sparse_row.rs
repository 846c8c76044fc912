//! Integration tests for the packed row-major sparse matrix
#![cfg(feature = "sparse")]

mod common;

use common::{random_dense, row_triples, sample_dense, seeded_rng};
use numr_arena::prelude::*;
use proptest::prelude::*;

#[test]
fn test_from_dense_visits_in_row_order() {
    common::init_tracing();
    for device in [Device::Host, Device::Accelerator] {
        let m = SparseRowMatrix::from_dense(&sample_dense(device));
        assert_eq!(
            row_triples(&m),
            vec![(0, 1, 1.0), (1, 0, 2.0), (2, 2, 3.0)]
        );
        assert_eq!(m.element_lookup(2, 2), Ok(3.0));
        assert_eq!(
            m.element_lookup(0, 0),
            Err(Error::NotFound { row: 0, col: 0 })
        );
    }
}

#[test]
fn test_transpose_and_cache() {
    let m = SparseRowMatrix::from_dense(&sample_dense(Device::Host));
    let first = row_triples(m.transpose());
    assert_eq!(first, vec![(0, 1, 2.0), (1, 0, 1.0), (2, 2, 3.0)]);
    assert!(m.has_cached_transpose());
    assert_eq!(row_triples(m.transpose()), first);
}

#[test]
fn test_cached_transpose_goes_stale_after_append() {
    let dense = sample_dense(Device::Host);
    let mut m = SparseRowMatrix::from_dense(&dense);
    let before = row_triples(m.transpose());

    m.append_row(&[0, 2], &[4.0, 5.0]).unwrap();
    assert_eq!(m.shape(), [4, 3]);

    // The cache still describes the 3x3 matrix.
    let stale = m.transpose();
    assert_eq!(stale.shape(), [3, 3]);
    assert_eq!(row_triples(stale), before);
    assert!(stale.element_lookup(0, 3).is_err());

    m.invalidate_transpose();
    let fresh = m.transpose();
    assert_eq!(fresh.shape(), [3, 4]);
    assert_eq!(fresh.element_lookup(0, 3), Ok(4.0));
    assert_eq!(fresh.element_lookup(2, 3), Ok(5.0));
}

#[test]
fn test_from_entries_keeps_insertion_order() {
    let m = SparseRowMatrix::<i32>::from_entries(
        5,
        [(vec![4usize, 0, 2], vec![1i32, 2, 3]), (vec![], vec![]), (vec![1], vec![9])],
        Device::Host,
    )
    .unwrap();
    assert_eq!(m.shape(), [3, 5]);
    assert_eq!(m.nnz(), 4);
    assert_eq!(
        row_triples(&m),
        vec![(0, 4, 1), (0, 0, 2), (0, 2, 3), (2, 1, 9)]
    );
    assert_eq!(m.to_string(), "0: (4,1)(0,2)(2,3)\n1: \n2: (1,9)\n");
}

#[test]
fn test_append_grows_pool_by_doubling() {
    let mut m = SparseRowMatrix::<f64>::new(0, 100, Device::Host);
    m.append_row(&[1], &[1.0]).unwrap();
    assert_eq!(m.pool().capacity(), 1);
    m.append_row(&[2], &[1.0]).unwrap();
    assert_eq!(m.pool().capacity(), 2);
    m.append_row(&[3, 4, 5, 6, 7], &[1.0; 5]).unwrap();
    assert_eq!(m.pool().capacity(), 7);
    m.append_row(&[8], &[1.0]).unwrap();
    assert_eq!(m.pool().capacity(), 14);
}

#[test]
fn test_row_range_errors() {
    let m = SparseRowMatrix::from_dense(&sample_dense(Device::Host));
    assert_eq!(m.row_nnz(3), Err(Error::out_of_bounds(3, 3)));
    assert!(m.row(5).is_err());
    assert_eq!(m.element_lookup(9, 0), Err(Error::out_of_bounds(9, 3)));
}

#[test]
fn test_directory_mirror_matches_rows() {
    let m = SparseRowMatrix::from_dense(&sample_dense(Device::Host));
    let mirror = m.directory_mirror();
    assert_eq!(mirror.device(), Device::Accelerator);
    let spans = mirror.to_spans();
    assert_eq!(spans.len(), 3);
    assert_eq!(spans[2].offset, 2);
    assert_eq!(spans[2].len, 1);
}

#[test]
fn test_map_and_row_engines_agree() {
    let mut rng = seeded_rng(7);
    let dense = random_dense(&mut rng, [6, 9], 0.3);
    let direct = SparseRowMatrix::from_dense(&dense);
    let via_map = SparseMapMatrix::from_dense(&dense).to_row_matrix(Device::Host);
    assert_eq!(direct, via_map);
}

proptest! {
    #[test]
    fn dense_roundtrip(seed in any::<u64>(), rows in 1usize..12, cols in 1usize..12) {
        let mut rng = seeded_rng(seed);
        let dense = random_dense(&mut rng, [rows, cols], 0.25);
        let sparse = SparseRowMatrix::from_dense(&dense);
        prop_assert_eq!(sparse.to_dense(), dense);
    }

    #[test]
    fn double_transpose_equals_direct_build(
        seed in any::<u64>(),
        rows in 1usize..10,
        cols in 1usize..10,
    ) {
        let mut rng = seeded_rng(seed);
        let dense = random_dense(&mut rng, [rows, cols], 0.4);
        let sparse = SparseRowMatrix::from_dense(&dense);
        let twice = sparse.transpose().transpose();
        prop_assert_eq!(twice, &sparse);
    }
}
