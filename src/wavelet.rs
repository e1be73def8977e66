//! Continuous wavelet transform.
//!
//! Each mother wavelet is sampled over its effective support and integrated
//! once. For every scale the integrated wavelet is resampled, reversed and
//! convolved with the signal (via FFT); differencing the convolution and
//! weighting by `-sqrt(scale)` yields the coefficients, trimmed back to the
//! signal length.

use core::f64::consts::PI;
use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::progress::{RunControl, Stage};
use crate::signal::Signal;
use crate::transform::TransformResult;

/// log2 of the number of points used to sample a mother wavelet.
pub const PRECISION: u32 = 10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Mother wavelet family.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WaveletKind {
    /// Real Morlet, `exp(-x^2/2) cos(5x)` (`morl`).
    #[default]
    Morlet,
    /// Ricker / Mexican hat (`mexh`).
    MexicanHat,
    /// Derivative of a Gaussian of the given order, 1 through 8 (`gausN`).
    Gaussian { order: u8 },
    /// Complex Morlet with bandwidth `B` and centre frequency `C` (`cmorB-C`).
    ComplexMorlet { bandwidth: f64, center: f64 },
    /// Derivative of `exp(-x^2) exp(-ix)` of the given order, 1 through 8 (`cgauN`).
    ComplexGaussian { order: u8 },
}

impl WaveletKind {
    /// Interval outside which the wavelet is treated as zero.
    pub fn support(&self) -> (f64, f64) {
        match self {
            WaveletKind::Gaussian { .. } | WaveletKind::ComplexGaussian { .. } => (-5.0, 5.0),
            _ => (-8.0, 8.0),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            WaveletKind::ComplexMorlet { .. } | WaveletKind::ComplexGaussian { .. }
        )
    }

    /// Evaluate the mother wavelet at `x`.
    pub fn psi(&self, x: f64) -> Complex64 {
        match *self {
            WaveletKind::Morlet => Complex64::new((-x * x / 2.0).exp() * (5.0 * x).cos(), 0.0),
            WaveletKind::MexicanHat => {
                let norm = 2.0 / (3f64.sqrt() * PI.powf(0.25));
                Complex64::new(norm * (1.0 - x * x) * (-x * x / 2.0).exp(), 0.0)
            }
            WaveletKind::Gaussian { order } => Complex64::new(gaussian_derivative(order, x), 0.0),
            WaveletKind::ComplexMorlet { bandwidth, center } => {
                let amp = (-x * x / bandwidth).exp() / (PI * bandwidth).sqrt();
                Complex64::from_polar(amp, 2.0 * PI * center * x)
            }
            WaveletKind::ComplexGaussian { order } => complex_gaussian_derivative(order, x),
        }
    }

    /// Sample the wavelet at `2^precision` points spanning its support.
    pub fn sample(&self, precision: u32) -> (Vec<f64>, Vec<Complex64>) {
        let n = 1usize << precision;
        let (lo, hi) = self.support();
        let step = (hi - lo) / (n - 1) as f64;
        let x: Vec<f64> = (0..n).map(|i| lo + i as f64 * step).collect();
        let psi = x.iter().map(|&v| self.psi(v)).collect();
        (x, psi)
    }

    fn validate(&self) -> Result<()> {
        match *self {
            WaveletKind::Gaussian { order } if !(1..=8).contains(&order) => {
                Err(Error::UnsupportedVariant {
                    kind: "wavelet",
                    name: format!("gaus{order}"),
                })
            }
            WaveletKind::ComplexGaussian { order } if !(1..=8).contains(&order) => {
                Err(Error::UnsupportedVariant {
                    kind: "wavelet",
                    name: format!("cgau{order}"),
                })
            }
            WaveletKind::ComplexMorlet { bandwidth, center }
                if !(bandwidth.is_finite() && bandwidth > 0.0 && center.is_finite() && center > 0.0) =>
            {
                Err(Error::config(
                    "wavelet",
                    "complex Morlet bandwidth and center must be positive",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for WaveletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveletKind::Morlet => f.write_str("morl"),
            WaveletKind::MexicanHat => f.write_str("mexh"),
            WaveletKind::Gaussian { order } => write!(f, "gaus{order}"),
            WaveletKind::ComplexMorlet { bandwidth, center } => {
                write!(f, "cmor{bandwidth}-{center}")
            }
            WaveletKind::ComplexGaussian { order } => write!(f, "cgau{order}"),
        }
    }
}

impl FromStr for WaveletKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let unsupported = || Error::UnsupportedVariant {
            kind: "wavelet",
            name: s.to_string(),
        };
        match name.as_str() {
            "morl" | "morlet" => return Ok(WaveletKind::Morlet),
            "mexh" | "mexican_hat" | "ricker" => return Ok(WaveletKind::MexicanHat),
            "cmor" => {
                return Ok(WaveletKind::ComplexMorlet {
                    bandwidth: 1.0,
                    center: 1.0,
                })
            }
            _ => {}
        }
        if let Some(order) = name.strip_prefix("cgau") {
            let order: u8 = order.parse().map_err(|_| unsupported())?;
            let kind = WaveletKind::ComplexGaussian { order };
            kind.validate().map_err(|_| unsupported())?;
            return Ok(kind);
        }
        if let Some(order) = name.strip_prefix("gaus") {
            let order: u8 = order.parse().map_err(|_| unsupported())?;
            let kind = WaveletKind::Gaussian { order };
            kind.validate().map_err(|_| unsupported())?;
            return Ok(kind);
        }
        if let Some(params) = name.strip_prefix("cmor") {
            let (b, c) = params.split_once('-').ok_or_else(unsupported)?;
            let bandwidth: f64 = b.parse().map_err(|_| unsupported())?;
            let center: f64 = c.parse().map_err(|_| unsupported())?;
            let kind = WaveletKind::ComplexMorlet { bandwidth, center };
            kind.validate()?;
            return Ok(kind);
        }
        Err(unsupported())
    }
}

/// Normalised `order`-th derivative of `exp(-x^2)`.
fn gaussian_derivative(order: u8, x: f64) -> f64 {
    // physicists' Hermite polynomial H_n via H_{k+1} = 2x H_k - 2k H_{k-1}
    let n = order as usize;
    let (mut h_prev, mut h) = (1.0, 2.0 * x);
    for k in 1..n {
        let next = 2.0 * x * h - 2.0 * k as f64 * h_prev;
        h_prev = h;
        h = next;
    }
    let double_factorial: f64 = (1..=n).map(|k| (2 * k - 1) as f64).product();
    let sign = if n.div_ceil(2) % 2 == 1 { -1.0 } else { 1.0 };
    sign * h * (-x * x).exp() / (double_factorial * (PI / 2.0).sqrt()).sqrt()
}

/// Unit-energy `order`-th derivative of `exp(-x^2) exp(-ix)`.
fn complex_gaussian_derivative(order: u8, x: f64) -> Complex64 {
    // d/dx [P(x) f(x)] = (P'(x) + P(x) (-2x - i)) f(x), P as ascending coefficients
    let shift = Complex64::new(0.0, -1.0);
    let mut poly = vec![Complex64::new(1.0, 0.0)];
    for _ in 0..order {
        let mut next = vec![ZERO; poly.len() + 1];
        for (j, &c) in poly.iter().enumerate() {
            if j > 0 {
                next[j - 1] += c * j as f64;
            }
            next[j] += c * shift;
            next[j + 1] += c * -2.0;
        }
        poly = next;
    }
    let value = poly.iter().rev().fold(ZERO, |acc, &c| acc * x + c);

    // squared L2 norm: sqrt(2 pi) / 2 * E[(Z - 1)^(2n)] for standard normal Z
    let n = 2 * order as usize;
    let mut moments = 0.0;
    let mut binomial = 1.0;
    let mut odd_factorial = 1.0;
    for k in 0..=n {
        if k > 0 {
            binomial *= (n - k + 1) as f64 / k as f64;
        }
        if k % 2 == 0 {
            if k > 0 {
                odd_factorial *= (k - 1) as f64;
            }
            moments += binomial * odd_factorial;
        }
    }
    let norm = ((2.0 * PI).sqrt() / 2.0 * moments).sqrt();
    value * Complex64::from_polar((-x * x).exp(), -x) / norm
}

/// Centre frequency of the mother wavelet in cycles per unit of `x`.
///
/// Taken from the dominant bin of the sampled wavelet's spectrum.
pub fn center_frequency(wavelet: WaveletKind) -> f64 {
    let (x, mut psi) = wavelet.sample(PRECISION);
    let n = psi.len();
    let domain = x[n - 1] - x[0];
    FftPlanner::<f64>::new()
        .plan_fft_forward(n)
        .process(&mut psi);
    let mut best = 1;
    let mut best_mag = f64::NEG_INFINITY;
    for (k, c) in psi.iter().enumerate().skip(1) {
        let mag = c.norm();
        if mag > best_mag {
            best_mag = mag;
            best = k;
        }
    }
    let mut index = best + 1;
    if index > n / 2 {
        index = n - index + 2;
    }
    (index - 1) as f64 / domain
}

/// Frequency in Hz represented by each scale at `sample_rate`.
///
/// Strictly decreasing in the scale for every wavelet.
pub fn scale_to_frequency(wavelet: WaveletKind, scales: &[f64], sample_rate: u32) -> Vec<f64> {
    let cf = center_frequency(wavelet);
    let sr = sample_rate as f64;
    scales.iter().map(|&s| cf * sr / s).collect()
}

/// Scales at which the CWT is evaluated.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScaleSpec {
    pub scale_min: f64,
    pub scale_max: f64,
    pub scale_count: usize,
    /// Explicit scales; overrides the generated range when set.
    pub scales: Option<Vec<f64>>,
}

impl Default for ScaleSpec {
    fn default() -> Self {
        Self::new(1.0, 128.0, 256)
    }
}

impl ScaleSpec {
    /// `scale_count` evenly spaced scales starting at `scale_min`, stopping short of `scale_max`.
    pub fn new(scale_min: f64, scale_max: f64, scale_count: usize) -> Self {
        Self {
            scale_min,
            scale_max,
            scale_count,
            scales: None,
        }
    }

    pub fn explicit(scales: Vec<f64>) -> Self {
        Self {
            scales: Some(scales),
            ..Self::default()
        }
    }

    /// Validate and produce the scale list.
    pub fn resolve(&self) -> Result<Vec<f64>> {
        if let Some(scales) = &self.scales {
            if scales.is_empty() {
                return Err(Error::config("scales", "explicit scale list is empty"));
            }
            if let Some(bad) = scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
                return Err(Error::config(
                    "scales",
                    format!("scale {bad} is not strictly positive"),
                ));
            }
            return Ok(scales.clone());
        }
        if !(self.scale_min.is_finite() && self.scale_min > 0.0) {
            return Err(Error::config("scale_min", "must be strictly positive"));
        }
        if !(self.scale_max.is_finite() && self.scale_min < self.scale_max) {
            return Err(Error::config("scale_max", "must exceed scale_min"));
        }
        if self.scale_count == 0 {
            return Err(Error::config("scale_count", "must be at least 1"));
        }
        let step = (self.scale_max - self.scale_min) / self.scale_count as f64;
        Ok((0..self.scale_count)
            .map(|i| self.scale_min + i as f64 * step)
            .collect())
    }
}

/// Compute the CWT of `signal` over the given scales.
///
/// Rows follow the scales (frequency `center_frequency / (scale * dt)`),
/// columns follow the samples (time `i / sample_rate`). Real wavelets yield
/// coefficients with a zero imaginary part.
pub fn compute_cwt(
    signal: &Signal,
    scales: &ScaleSpec,
    wavelet: WaveletKind,
) -> Result<TransformResult> {
    compute_cwt_with(signal, scales, wavelet, &RunControl::default())
}

/// [`compute_cwt`] with progress reporting and cancellation.
pub fn compute_cwt_with(
    signal: &Signal,
    scales: &ScaleSpec,
    wavelet: WaveletKind,
    control: &RunControl,
) -> Result<TransformResult> {
    wavelet.validate()?;
    let scales = scales.resolve()?;
    let (x, psi) = wavelet.sample(PRECISION);
    let step = x[1] - x[0];
    let domain = x[x.len() - 1] - x[0];
    let int_psi = integrate(&psi, step, wavelet.is_complex());

    let kernels = scales
        .iter()
        .map(|&s| scale_kernel(&int_psi, s, step, domain))
        .collect::<Result<Vec<_>>>()?;
    log::debug!(
        "cwt: wavelet {}, {} scales ({:.3}..{:.3}), {} samples",
        wavelet,
        scales.len(),
        scales[0],
        scales[scales.len() - 1],
        signal.len()
    );

    let plans = ConvPlans::new(signal.samples(), &kernels);
    let rows = scale_rows(signal.len(), &scales, &kernels, &plans, wavelet, control)?;
    let coefficients = Matrix::from_rows(rows)?;
    let sr = signal.sample_rate() as f64;
    TransformResult::new(
        coefficients,
        scale_to_frequency(wavelet, &scales, signal.sample_rate()),
        (0..signal.len()).map(|i| i as f64 / sr).collect(),
    )
}

fn integrate(psi: &[Complex64], step: f64, conjugate: bool) -> Vec<Complex64> {
    let mut acc = ZERO;
    psi.iter()
        .map(|&p| {
            acc += p * step;
            if conjugate {
                acc.conj()
            } else {
                acc
            }
        })
        .collect()
}

/// Integrated wavelet resampled for `scale`, reversed for convolution.
fn scale_kernel(int_psi: &[Complex64], scale: f64, step: f64, domain: f64) -> Result<Vec<Complex64>> {
    let count = (scale * domain + 1.0).ceil() as usize;
    let mut kernel: Vec<Complex64> = (0..count)
        .map(|i| (i as f64 / (scale * step)).floor() as usize)
        .take_while(|&j| j < int_psi.len())
        .map(|j| int_psi[j])
        .collect();
    if kernel.len() < 2 {
        return Err(Error::config(
            "scales",
            format!("scale {scale} is too small for the wavelet support"),
        ));
    }
    kernel.reverse();
    Ok(kernel)
}

struct ConvPlan {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    spectrum: Vec<Complex64>,
}

/// Signal spectra and FFT plans keyed by convolution size.
struct ConvPlans(BTreeMap<usize, ConvPlan>);

impl ConvPlans {
    fn new(samples: &[f64], kernels: &[Vec<Complex64>]) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let mut plans = BTreeMap::new();
        for kernel in kernels {
            let size = conv_size(samples.len(), kernel.len());
            plans.entry(size).or_insert_with(|| {
                let forward = planner.plan_fft_forward(size);
                let inverse = planner.plan_fft_inverse(size);
                let mut spectrum = vec![ZERO; size];
                for (slot, &s) in spectrum.iter_mut().zip(samples) {
                    *slot = Complex64::new(s, 0.0);
                }
                forward.process(&mut spectrum);
                ConvPlan {
                    forward,
                    inverse,
                    spectrum,
                }
            });
        }
        Self(plans)
    }
}

fn conv_size(n: usize, kernel: usize) -> usize {
    (n + kernel - 1).next_power_of_two()
}

fn scale_row(
    n: usize,
    scale: f64,
    kernel: &[Complex64],
    plans: &ConvPlans,
    wavelet: WaveletKind,
) -> Vec<Complex64> {
    let size = conv_size(n, kernel.len());
    let plan = &plans.0[&size];
    let mut buf = vec![ZERO; size];
    buf[..kernel.len()].copy_from_slice(kernel);
    plan.forward.process(&mut buf);
    for (b, s) in buf.iter_mut().zip(&plan.spectrum) {
        *b *= *s;
    }
    plan.inverse.process(&mut buf);

    let full = n + kernel.len() - 1;
    let norm = 1.0 / size as f64;
    let weight = -scale.sqrt() * norm;
    // diff of the full convolution has n + len - 2 samples; keep the centred n
    let trim = (kernel.len() - 2) / 2;
    let keep_real = !wavelet.is_complex();
    (trim..trim + n)
        .map(|i| {
            debug_assert!(i + 1 < full);
            let c = (buf[i + 1] - buf[i]) * weight;
            if keep_real {
                Complex64::new(c.re, 0.0)
            } else {
                c
            }
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn scale_rows(
    n: usize,
    scales: &[f64],
    kernels: &[Vec<Complex64>],
    plans: &ConvPlans,
    wavelet: WaveletKind,
    control: &RunControl,
) -> Result<Vec<Vec<Complex64>>> {
    let total = scales.len();
    let mut rows = Vec::with_capacity(total);
    for (i, (&scale, kernel)) in scales.iter().zip(kernels).enumerate() {
        control.checkpoint()?;
        rows.push(scale_row(n, scale, kernel, plans, wavelet));
        control.report(Stage::Cwt, i + 1, total);
    }
    Ok(rows)
}

#[cfg(feature = "parallel")]
fn scale_rows(
    n: usize,
    scales: &[f64],
    kernels: &[Vec<Complex64>],
    plans: &ConvPlans,
    wavelet: WaveletKind,
    control: &RunControl,
) -> Result<Vec<Vec<Complex64>>> {
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let total = scales.len();
    let done = AtomicUsize::new(0);
    scales
        .par_iter()
        .zip(kernels.par_iter())
        .map(|(&scale, kernel)| {
            control.checkpoint()?;
            let row = scale_row(n, scale, kernel, plans, wavelet);
            control.report(Stage::Cwt, done.fetch_add(1, Ordering::Relaxed) + 1, total);
            Ok(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_center_frequencies() {
        assert!((center_frequency(WaveletKind::Morlet) - 0.8125).abs() < 1e-12);
        assert!((center_frequency(WaveletKind::MexicanHat) - 0.25).abs() < 1e-12);
        let cmor = WaveletKind::ComplexMorlet {
            bandwidth: 1.5,
            center: 1.0,
        };
        assert!((center_frequency(cmor) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn gaussian_matches_closed_forms() {
        let norm1 = (PI / 2.0).sqrt().sqrt();
        let norm2 = (3.0 * (PI / 2.0).sqrt()).sqrt();
        for &x in &[-1.3f64, 0.0, 0.4, 2.0] {
            let g1 = -2.0 * x * (-x * x).exp() / norm1;
            let g2 = -2.0 * (2.0 * x * x - 1.0) * (-x * x).exp() / norm2;
            assert!((gaussian_derivative(1, x) - g1).abs() < 1e-12);
            assert!((gaussian_derivative(2, x) - g2).abs() < 1e-12);
        }
    }

    /// The first-order kernel matches its closed form `(-2x - i) exp(-ix - x^2) / (2 pi)^(1/4)`.
    #[test]
    fn complex_gaussian_first_order_closed_form() {
        let norm = (2.0 * PI).sqrt().sqrt();
        for &x in &[-1.1, 0.0, 0.3, 1.7] {
            let expected = Complex64::new(-2.0 * x, -1.0)
                * Complex64::from_polar((-x * x).exp(), -x)
                / norm;
            let got = complex_gaussian_derivative(1, x);
            assert!((got - expected).norm() < 1e-12, "{x}: {got} vs {expected}");
        }
    }

    /// Every order is normalised to unit energy over its support.
    #[test]
    fn complex_gaussian_has_unit_energy() {
        for order in 1..=8 {
            let wavelet = WaveletKind::ComplexGaussian { order };
            let (x, psi) = wavelet.sample(14);
            let dx = x[1] - x[0];
            let energy: f64 = psi.iter().map(|c| c.norm_sqr()).sum::<f64>() * dx;
            assert!((energy - 1.0).abs() < 1e-3, "cgau{order}: {energy}");
        }
        let cf = center_frequency(WaveletKind::ComplexGaussian { order: 4 });
        assert!((0.4..=0.6).contains(&cf), "cgau4 centre {cf}");
    }

    #[test]
    fn names_parse() {
        assert_eq!("morl".parse::<WaveletKind>().unwrap(), WaveletKind::Morlet);
        assert_eq!(
            "gaus3".parse::<WaveletKind>().unwrap(),
            WaveletKind::Gaussian { order: 3 }
        );
        assert_eq!(
            "cmor1.5-1.0".parse::<WaveletKind>().unwrap(),
            WaveletKind::ComplexMorlet {
                bandwidth: 1.5,
                center: 1.0
            }
        );
        assert_eq!(
            "CGAU8".parse::<WaveletKind>().unwrap(),
            WaveletKind::ComplexGaussian { order: 8 }
        );
        assert_eq!(WaveletKind::ComplexGaussian { order: 2 }.to_string(), "cgau2");
        for bad in ["gaus9", "haar", "cmor1.5", "cgau0", "cgau9", "cgau"] {
            assert!(matches!(
                bad.parse::<WaveletKind>(),
                Err(Error::UnsupportedVariant { kind: "wavelet", .. })
            ));
        }
    }

    #[test]
    fn generated_scales_are_half_open() {
        let scales = ScaleSpec::new(1.0, 128.0, 254).resolve().unwrap();
        assert_eq!(scales.len(), 254);
        assert_eq!(scales[0], 1.0);
        assert!((scales[1] - 1.5).abs() < 1e-12);
        assert!(*scales.last().unwrap() < 128.0);
    }

    #[test]
    fn invalid_scales_are_rejected() {
        assert!(ScaleSpec::new(4.0, 2.0, 8).resolve().is_err());
        assert!(ScaleSpec::new(1.0, 2.0, 0).resolve().is_err());
        assert!(ScaleSpec::explicit(vec![]).resolve().is_err());
        assert!(ScaleSpec::explicit(vec![1.0, -2.0]).resolve().is_err());
    }

    #[test]
    fn tiny_scale_is_reported() {
        let signal = Signal::new(vec![0.0, 1.0, 0.0, -1.0], 4).unwrap();
        let err = compute_cwt(&signal, &ScaleSpec::explicit(vec![0.01]), WaveletKind::Morlet)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { field: "scales", .. }));
    }
}
