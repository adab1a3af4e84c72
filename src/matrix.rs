//! Dense matrix types and their text encoding.
//!
//! Matrices are stored as blobs of text inside serialized layers: a header
//! line `rows cols`, followed by one line per row of whitespace separated
//! values. Values are printed in the shortest exponent form that parses back
//! to the same `f64`, so a round trip is exact.

use crate::{Error, Result};

use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::fmt::Write;

/// A row-major dense matrix.
pub type Mat = Array2<f64>;

/// A dense column vector.
pub type Vector = Array1<f64>;

/// Encodes `m` as a text blob.
pub fn stringify(m: ArrayView2<f64>) -> String {
    let mut out = format!("{} {}", m.nrows(), m.ncols());
    for row in m.axis_iter(Axis(0)) {
        out.push('\n');
        for (j, x) in row.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            // Writing into a String cannot fail.
            let _ = write!(out, "{:e}", x);
        }
    }
    out
}

/// Encodes a vector as an `n x 1` blob.
pub fn stringify_vector(v: &Vector) -> String {
    stringify(v.view().insert_axis(Axis(1)))
}

/// Parses a blob produced by [`stringify`].
pub fn destringify(field: &'static str, s: &str) -> Result<Mat> {
    let malformed = |reason: String| Error::Malformed { field, reason };

    let mut tokens = s.split_whitespace();
    let mut dim = |name: &str| -> Result<usize> {
        tokens
            .next()
            .ok_or_else(|| malformed(format!("missing {} count", name)))?
            .parse::<usize>()
            .map_err(|e| malformed(format!("bad {} count: {}", name, e)))
    };
    let rows = dim("row")?;
    let cols = dim("column")?;
    let len = rows.checked_mul(cols).ok_or_else(|| {
        malformed(format!("{}x{} matrix is too large", rows, cols))
    })?;

    let values = tokens
        .map(|t| {
            t.parse::<f64>()
                .map_err(|e| malformed(format!("bad value {:?}: {}", t, e)))
        })
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != len {
        return Err(malformed(format!(
            "expected {} values for a {}x{} matrix, found {}",
            len,
            rows,
            cols,
            values.len()
        )));
    }
    Mat::from_shape_vec((rows, cols), values)
        .map_err(|e| malformed(e.to_string()))
}

/// Parses an `n x 1` blob back into a vector.
pub fn destringify_vector(field: &'static str, s: &str) -> Result<Vector> {
    let m = destringify(field, s)?;
    if m.ncols() != 1 {
        return Err(Error::Malformed {
            field,
            reason: format!("expected a single column, found {}", m.ncols()),
        });
    }
    Ok(m.column(0).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn blob_layout() {
        let m = array![[1.0, -2.5], [0.125, 3.0], [4.0, 1e-300]];
        assert_eq!(stringify(m.view()), "3 2\n1e0 -2.5e0\n1.25e-1 3e0\n4e0 1e-300");
    }

    #[test]
    fn blob_is_exact() {
        let m = array![[0.1 + 0.2, std::f64::consts::PI], [-1.0 / 3.0, 6.02e23]];
        let back = destringify("weights", &stringify(m.view())).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn vector_blob_is_a_column() {
        let v = array![0.5, -0.75];
        let s = stringify_vector(&v);
        assert!(s.starts_with("2 1\n"));
        assert_eq!(destringify_vector("bias", &s).unwrap(), v);
    }

    #[test]
    fn empty_matrix() {
        let m = Mat::zeros((0, 4));
        let back = destringify("weights", &stringify(m.view())).unwrap();
        assert_eq!(back.dim(), (0, 4));
    }

    #[test]
    fn rejects_short_blob() {
        match destringify("weights", "2 2\n1 2 3") {
            Err(Error::Malformed { field, .. }) => assert_eq!(field, "weights"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(destringify("weights", "one two").is_err());
        assert!(destringify("weights", "1 1\nabc").is_err());
        assert!(destringify("weights", "").is_err());
        assert!(destringify_vector("bias", "1 2\n1 2").is_err());
    }

    #[test]
    fn rejects_overflowing_shape() {
        match destringify("weights", "18446744073709551615 2\n") {
            Err(Error::Malformed { field, reason }) => {
                assert_eq!(field, "weights");
                assert!(reason.contains("too large"), "{}", reason);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(destringify("weights", "4294967296 4294967296\n").is_err());
    }
}
