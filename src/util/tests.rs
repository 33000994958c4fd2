#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::thread;

use super::*;

#[test]
fn atomic_cells_alias_the_buffer() {
    let mut data = vec![1.5f32, -2.0, 0.0];
    {
        let cells = as_atomic_cells(&mut data);
        atomic_add_f32(&cells[0], 1.0);
        atomic_add_f32(&cells[2], 0.25);
    }
    assert_eq!(data, [2.5, -2.0, 0.25]);
}

#[test]
fn atomic_add_from_many_threads() {
    let mut data = vec![0f32; 4];
    {
        let cells = as_atomic_cells(&mut data);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for i in 0..1000 {
                        atomic_add_f32(&cells[i % 4], 1.0);
                    }
                });
            }
        });
    }
    // 8 threads * 1000 adds spread over 4 cells; small integers are exact in f32
    assert_eq!(data, [2000.0; 4]);
}

#[test]
fn atomic_add_propagates_nan() {
    let mut data = vec![1.0f32];
    atomic_add_f32(&as_atomic_cells(&mut data)[0], f32::NAN);
    assert!(data[0].is_nan());
}

#[test]
fn grid_len_is_product() {
    assert_eq!(grid_len(&[8, 8, 8]), 512);
    assert_eq!(grid_len(&[3, 0]), 0);
    assert_eq!(grid_len(&[]), 1);
}

#[test]
fn sample_dtypes() {
    assert_eq!(<f32 as Sample>::DTYPE, DType::F32);
    assert_eq!(<f64 as Sample>::DTYPE, DType::F64);
}
