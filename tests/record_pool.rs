//! Integration tests for the variable-length record pool
#![cfg(feature = "sparse")]

mod common;

use numr_arena::prelude::*;
use numr_arena::sparse::RecordSpan;
use proptest::prelude::*;

#[test]
fn test_pushes_grow_small_pool() {
    common::init_tracing();
    let mut pool = RecordPool::<f32>::with_capacity(2, Device::Host);
    let initial = pool.capacity();
    for len in [2, 3, 4] {
        pool.push_back(len);
    }
    assert!(pool.capacity() > initial);
    assert_eq!(pool.offset(2), Ok(5));
    assert_eq!(pool.size_of(2), Ok(4));
    assert_eq!(pool.len(), 3);
}

#[test]
fn test_out_of_range_carries_index_and_bound() {
    let mut pool = RecordPool::<i32>::new(Device::Host);
    pool.push_back(3);
    pool.push_back(1);
    match pool.size_of(7) {
        Err(Error::IndexOutOfBounds { index, size }) => {
            assert_eq!(index, 7);
            assert_eq!(size, 2);
        }
        other => panic!("expected range error, got {other:?}"),
    }
}

#[test]
fn test_device_pool_keeps_records_across_growth() {
    let mut pool = RecordPool::<i64>::with_capacity(1, Device::Accelerator);
    let mut expected = Vec::new();
    for len in 1..=6usize {
        let i = pool.push_back(len);
        let data: Vec<i64> = (0..len as i64).map(|v| v + 100 * i as i64).collect();
        pool.write(i, &data).unwrap();
        expected.push(data);
    }
    for (i, data) in expected.iter().enumerate() {
        assert_eq!(&pool.read(i).unwrap(), data);
    }
}

#[test]
fn test_directory_mirror_is_a_snapshot() {
    let mut pool = RecordPool::<f64>::new(Device::Host);
    pool.push_back(2);
    pool.push_back(3);
    let mirror = pool.directory_mirror();
    pool.push_back(1);
    assert_eq!(
        mirror.to_spans(),
        vec![
            RecordSpan { offset: 0, len: 2 },
            RecordSpan { offset: 2, len: 3 },
        ]
    );
    assert_eq!(pool.directory_mirror().records(), 3);
}

proptest! {
    #[test]
    fn offsets_are_prefix_sums(
        initial in 0usize..16,
        lens in proptest::collection::vec(0usize..20, 1..40),
    ) {
        let mut pool = RecordPool::<f32>::with_capacity(initial, Device::Host);
        for &len in &lens {
            pool.push_back(len);
        }
        let mut sum = 0;
        for (i, &len) in lens.iter().enumerate() {
            prop_assert_eq!(pool.offset(i).unwrap(), sum);
            prop_assert_eq!(pool.size_of(i).unwrap(), len);
            sum += len;
        }
        prop_assert_eq!(pool.tail(), sum);
        prop_assert!(pool.capacity() >= sum);
    }

    #[test]
    fn growth_never_corrupts_records(lens in proptest::collection::vec(1usize..12, 1..24)) {
        let mut pool = RecordPool::<u32>::with_capacity(1, Device::Host);
        for (i, &len) in lens.iter().enumerate() {
            let r = pool.push_back(len);
            pool.write(r, &vec![i as u32; len]).unwrap();
        }
        for (i, &len) in lens.iter().enumerate() {
            prop_assert_eq!(pool.read(i).unwrap(), vec![i as u32; len]);
        }
    }
}
