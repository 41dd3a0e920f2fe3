use crate::errors::{DoeError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayViewMut1, Axis, Data, Ix1, Ix2, Zip};
use ndarray_stats::{interpolate::Linear, Quantile1dExt};
use noisy_float::types::N64;

/// Computes discrete gradient of `values` along `axis` where `coords` are
/// the (possibly non uniform) coordinates of the values along that axis.
///
/// Second order accurate central differences are used for interior points
/// and first order one-sided differences at the boundaries.
///
/// *Panics* if `coords` length does not match `values` length along `axis`
/// or if this length is less than 2.
pub fn gradient<F: Float>(
    values: &ArrayBase<impl Data<Elem = F>, Ix2>,
    coords: &ArrayBase<impl Data<Elem = F>, Ix1>,
    axis: Axis,
) -> Array2<F> {
    let n = values.len_of(axis);
    assert!(
        n == coords.len(),
        "gradient: {} coordinates given for {} values along axis {}",
        coords.len(),
        n,
        axis.index()
    );
    assert!(n > 1, "gradient: at least 2 values required along axis");

    let mut grad = Array2::zeros(values.raw_dim());
    Zip::from(grad.lanes_mut(axis))
        .and(values.lanes(axis))
        .for_each(|g, f| gradient_1d(&f, &coords.view(), g));
    grad
}

fn gradient_1d<F: Float>(f: &ArrayView1<F>, x: &ArrayView1<F>, mut g: ArrayViewMut1<F>) {
    let n = f.len();
    g[0] = (f[1] - f[0]) / (x[1] - x[0]);
    g[n - 1] = (f[n - 1] - f[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        let hs = x[i] - x[i - 1];
        let hd = x[i + 1] - x[i];
        g[i] = (hs * hs * f[i + 1] + (hd * hd - hs * hs) * f[i] - hd * hd * f[i - 1])
            / (hs * hd * (hd + hs));
    }
}

/// Computes the `q`-quantile of `values` using linear interpolation between
/// the closest ranks: with sorted values `v` and `h = (n - 1) * q`,
/// the result is `v[floor(h)] + (h - floor(h)) * (v[floor(h) + 1] - v[floor(h)])`.
///
/// Fails if `values` is empty, if `q` is not in [0, 1] or if a value is not finite.
pub fn quantile<F: Float>(values: &ArrayBase<impl Data<Elem = F>, Ix1>, q: F) -> Result<F> {
    let q = q
        .to_f64()
        .and_then(N64::try_new)
        .ok_or_else(|| DoeError::NonFiniteValue(format!("quantile {q}")))?;
    let mut values = values
        .iter()
        .map(|v| v.to_f64().and_then(N64::try_new))
        .collect::<Option<Array1<N64>>>()
        .ok_or_else(|| DoeError::NonFiniteValue("quantile of non finite values".to_string()))?;
    let value = values.quantile_mut(q, &Linear)?;
    Ok(F::cast(value.raw()))
}
