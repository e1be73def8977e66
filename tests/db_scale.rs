use num_complex::Complex64;
use tfscope::decibel::{power_to_decibel, to_decibel};
use tfscope::{Error, Matrix};

/// The strongest entry sits at exactly 0 dB and the rest below it.
#[test]
fn peak_is_zero_db() {
    let m = Matrix::from_rows(vec![
        vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.1)],
        vec![Complex64::new(3.0, 4.0), Complex64::new(0.5, 0.0)],
    ])
    .expect("Invariant: operation should succeed");
    let db = to_decibel(&m).expect("Invariant: operation should succeed");
    assert_eq!(db[(1, 0)], 0.0);
    assert!(db.as_slice().iter().all(|&v| v <= 0.0));
    // |1|^2 against |5|^2
    assert!((db[(0, 0)] + 10.0 * 25f64.log10()).abs() < 1e-9);
}

/// Silence maps to 0 dB everywhere rather than NaN.
#[test]
fn all_zero_is_flat() {
    let m = Matrix::filled(4, 3, 0.0f64);
    let db = power_to_decibel(&m).expect("Invariant: operation should succeed");
    assert!(db.as_slice().iter().all(|&v| v == 0.0));
}

/// The power floor bounds how far below the peak an entry can sit.
#[test]
fn floor_bounds_dynamic_range() {
    let m = Matrix::from_rows(vec![vec![1.0f64, 0.0]]).expect("Invariant: operation should succeed");
    let db = power_to_decibel(&m).expect("Invariant: operation should succeed");
    assert!((db[(0, 1)] + 120.0).abs() < 1e-6);
}

/// An empty matrix has no reference level.
#[test]
fn empty_matrix_is_rejected() {
    let m: Matrix<f64> = Matrix::new(0, 0, Vec::new()).expect("Invariant: operation should succeed");
    assert!(matches!(power_to_decibel(&m), Err(Error::EmptyInput)));
}
