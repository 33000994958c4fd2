#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::{collections::HashMap, path::PathBuf};

use super::*;

fn resource_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources")
}

fn bundled_sources() -> HashMap<&'static str, String> {
    let dir = resource_dir();
    RESOURCE_NAMES
        .iter()
        .map(|&name| (name, fs::read_to_string(dir.join(name)).unwrap()))
        .collect()
}

#[test]
fn parse_small_table() {
    let table = Table::<4>::parse("t", "1,0,0,0\n0,1,0,0\n\n0,0,1,0,\n 0 , 0 , 0 , 1 \n").unwrap();
    // Identity table: the weights are the monomials 1, t, t², t³ themselves
    assert_eq!(table.tap_weights(&[2.0]), [1.0, 2.0, 4.0, 8.0]);
    assert_eq!(table.tap_weights(&[0.0]), [1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn parse_rejects_ragged_rows() {
    let err = Table::<4>::parse("t", "1,0,0,0\n0,1,0\n0,0,1,0\n0,0,0,1\n").unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");

    let err = Table::<4>::parse("t", "1,0,0,0,0\n0,1,0,0\n0,0,1,0\n0,0,0,1\n").unwrap_err();
    assert!(err.to_string().contains("more than 4 values"), "{err}");
}

#[test]
fn parse_rejects_wrong_row_count() {
    assert!(Table::<4>::parse("t", "1,0,0,0\n0,1,0,0\n0,0,1,0\n").is_err());
    assert!(Table::<4>::parse("t", "1,0,0,0\n0,1,0,0\n0,0,1,0\n0,0,0,1\n1,1,1,1\n").is_err());
    assert!(Table::<4>::parse("t", "").is_err());
}

#[test]
fn parse_rejects_garbage() {
    let err = Table::<4>::parse("t", "1,0,0,0\n0,x,0,0\n0,0,1,0\n0,0,0,1\n").unwrap_err();
    assert!(format!("{err:#}").contains("invalid number"), "{err:#}");
    assert!(Table::<4>::parse("t", "1,,0,0\n0,1,0,0\n0,0,1,0\n0,0,0,1\n").is_err());
}

#[test]
fn bundled_matches_resource_dir() {
    let bundled = CoefficientTables::bundled().unwrap();
    let from_dir = CoefficientTables::load_dir(resource_dir()).unwrap();
    assert_eq!(bundled, from_dir);
}

#[test]
fn loading_twice_is_bit_identical() {
    let first = CoefficientTables::load_dir(resource_dir()).unwrap();
    let second = CoefficientTables::load_dir(resource_dir()).unwrap();
    assert_eq!(first, second);
    let offsets = [0.5, 0.0, 0.5];
    let (a, b) = (first.cubic_3d().tap_weights(&offsets), second.cubic_3d().tap_weights(&offsets));
    assert!(a.iter().zip(&b).all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn missing_directory_is_fatal() {
    let err = CoefficientTables::load_dir(resource_dir().join("does-not-exist")).unwrap_err();
    assert!(format!("{err:#}").contains(CUBIC_2D), "{err:#}");
}

#[test]
fn malformed_resource_is_fatal() {
    let mut sources = bundled_sources();
    sources.insert(CUBIC_3D_DY, "1,2,3\n".to_owned());
    let err = CoefficientTables::from_sources(|name| Ok(sources[name].clone())).unwrap_err();
    assert!(format!("{err:#}").contains(CUBIC_3D_DY), "{err:#}");
}

#[test]
fn loader_failure_is_fatal() {
    let err = CoefficientTables::from_sources(|name| {
        if name == CUBIC_2D_DX {
            bail!("disk on fire");
        }
        Ok(bundled_sources()[name].clone())
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("disk on fire"), "{err:#}");
}

#[test]
fn from_sources_requests_every_resource_once() {
    let sources = bundled_sources();
    let mut requested = Vec::new();
    CoefficientTables::from_sources(|name| {
        requested.push(name.to_owned());
        Ok(sources[name].clone())
    })
    .unwrap();
    assert_eq!(requested, RESOURCE_NAMES);
}

#[test]
fn weights_at_zero_offset_select_the_centre_tap() {
    let tables = CoefficientTables::bundled().unwrap();

    let w2 = tables.cubic_2d().tap_weights(&[0.0, 0.0]);
    let centre_2d = TAPS_PER_AXIS + 1;
    for (j, &w) in w2.iter().enumerate() {
        assert_eq!(w, if j == centre_2d { 1.0 } else { 0.0 }, "tap {j}");
    }

    let w3 = tables.cubic_3d().tap_weights(&[0.0, 0.0, 0.0]);
    let centre_3d = TAPS_2D + TAPS_PER_AXIS + 1;
    for (j, &w) in w3.iter().enumerate() {
        assert_eq!(w, if j == centre_3d { 1.0 } else { 0.0 }, "tap {j}");
    }
}

#[test]
fn weights_at_half_offset_are_catmull_rom() {
    let tables = CoefficientTables::bundled().unwrap();
    let row = [-0.0625f32, 0.5625, 0.5625, -0.0625];

    let w2 = tables.cubic_2d().tap_weights(&[0.5, 0.5]);
    for (j, &w) in w2.iter().enumerate() {
        assert_eq!(w, row[j / 4] * row[j % 4], "tap {j}");
    }

    let w3 = tables.cubic_3d().tap_weights(&[0.5, 0.5, 0.5]);
    for (j, &w) in w3.iter().enumerate() {
        assert_eq!(w, row[j / 16] * row[j / 4 % 4] * row[j % 4], "tap {j}");
    }
}

#[test]
fn weights_are_a_partition_of_unity() {
    let tables = CoefficientTables::bundled().unwrap();
    for &(t0, t1) in &[(0.25f32, 0.75f32), (0.1, 0.9), (0.5, 0.0)] {
        let sum: f32 = tables.cubic_2d().tap_weights(&[t0, t1]).iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "{sum}");
    }
    let sum: f32 = tables.cubic_3d().tap_weights(&[0.3, 0.6, 0.9]).iter().sum();
    assert!((sum - 1.0).abs() < 1e-5, "{sum}");
}

#[test]
fn derivative_tables_recover_ramp_slopes() {
    let tables = CoefficientTables::bundled().unwrap();

    // f(i, j) = 3 i - 2 j sampled on the 4x4 neighbourhood
    let taps_2d: Vec<f32> = (0..TAPS_2D)
        .map(|j| 3.0 * (j / 4) as f32 - 2.0 * (j % 4) as f32)
        .collect();
    let offsets = [0.25, 0.75];
    let dx: f32 = dot(&tables.derivative_2d(0).unwrap().tap_weights(&offsets), &taps_2d);
    let dy: f32 = dot(&tables.derivative_2d(1).unwrap().tap_weights(&offsets), &taps_2d);
    assert!((dx - 3.0).abs() < 1e-5, "{dx}");
    assert!((dy + 2.0).abs() < 1e-5, "{dy}");

    // f(i, j, k) = i + 5 j - 4 k
    let taps_3d: Vec<f32> = (0..TAPS_3D)
        .map(|j| (j / 16) as f32 + 5.0 * (j / 4 % 4) as f32 - 4.0 * (j % 4) as f32)
        .collect();
    let offsets = [0.5, 0.1, 0.9];
    let slopes = [1.0, 5.0, -4.0];
    for (axis, slope) in slopes.into_iter().enumerate() {
        let weights = tables.derivative_3d(axis).unwrap().tap_weights(&offsets);
        let d = dot(&weights, &taps_3d);
        assert!((d - slope).abs() < 1e-4, "axis {axis}: {d}");
    }
}

#[test]
fn derivative_axis_out_of_range() {
    let tables = CoefficientTables::bundled().unwrap();
    assert!(tables.derivative_2d(2).is_err());
    assert!(tables.derivative_3d(3).is_err());
}

#[test]
#[should_panic]
fn tap_weights_rank_mismatch_panics() {
    let tables = CoefficientTables::bundled().unwrap();
    let _ = tables.cubic_2d().tap_weights(&[0.5, 0.5, 0.5]);
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}
