//! Zero-phase IIR lowpass filtering.
//!
//! Filters are designed from an analog prototype (Butterworth or Chebyshev
//! type I), pre-warped, mapped through the bilinear transform and stored as a
//! cascade of second-order sections. [`Sos::filtfilt`] runs the cascade
//! forward and backward with odd-extension padding and steady-state initial
//! conditions, so the output has no phase shift and the same length as the
//! input.

use core::f64::consts::PI;
use core::fmt;
use core::str::FromStr;

use num_complex::Complex64;

use crate::error::{Advisory, Error, Outcome, Result};
use crate::signal::Signal;

/// Filter order used when none is configured.
pub const DEFAULT_FILTER_ORDER: usize = 4;

/// Passband ripple of the Chebyshev type I design when none is given.
pub const DEFAULT_RIPPLE_DB: f64 = 0.5;

/// Orders above this still run but are flagged with [`Advisory::HighFilterOrder`].
pub const MAX_STABLE_ORDER: usize = 10;

/// Analog prototype family.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilterKind {
    /// Maximally flat passband.
    #[default]
    Butterworth,
    /// Equiripple passband with a steeper transition.
    ChebyshevI { ripple_db: f64 },
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Butterworth => f.write_str("butter"),
            FilterKind::ChebyshevI { ripple_db } => write!(f, "cheby1:{ripple_db}"),
        }
    }
}

impl FromStr for FilterKind {
    type Err = Error;

    /// Accepts `butter`, `cheby1` and `cheby1:<ripple_db>`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, param) = match lower.split_once(':') {
            Some((n, p)) => (n, Some(p)),
            None => (lower.as_str(), None),
        };
        let unsupported = || Error::UnsupportedVariant {
            kind: "filter",
            name: s.to_string(),
        };
        match (name, param) {
            ("butter" | "butterworth", None) => Ok(FilterKind::Butterworth),
            ("cheby1" | "chebyshev1", None) => Ok(FilterKind::ChebyshevI {
                ripple_db: DEFAULT_RIPPLE_DB,
            }),
            ("cheby1" | "chebyshev1", Some(p)) => {
                let ripple_db = p.trim().parse::<f64>().map_err(|_| unsupported())?;
                Ok(FilterKind::ChebyshevI { ripple_db })
            }
            _ => Err(unsupported()),
        }
    }
}

/// What to do when the cutoff is not below Nyquist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CutoffPolicy {
    /// Pass the signal through unchanged and attach an advisory.
    #[default]
    Bypass,
    /// Fail with [`Error::InvalidConfiguration`].
    Reject,
}

/// Lowpass filter configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterSpec {
    /// Cutoff in Hz. `None`, zero or negative disables filtering.
    pub cutoff_hz: Option<f64>,
    pub order: usize,
    pub kind: FilterKind,
    pub cutoff_policy: CutoffPolicy,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            cutoff_hz: None,
            order: DEFAULT_FILTER_ORDER,
            kind: FilterKind::Butterworth,
            cutoff_policy: CutoffPolicy::Bypass,
        }
    }
}

impl FilterSpec {
    /// Butterworth lowpass at `cutoff_hz` of the given order.
    pub fn lowpass(cutoff_hz: f64, order: usize) -> Self {
        Self {
            cutoff_hz: Some(cutoff_hz),
            order,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: FilterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_policy(mut self, policy: CutoffPolicy) -> Self {
        self.cutoff_policy = policy;
        self
    }

    /// `true` when a positive cutoff is set.
    pub fn is_active(&self) -> bool {
        self.cutoff_hz.is_some_and(|c| c > 0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.order == 0 {
            return Err(Error::config("order", "must be at least 1"));
        }
        if self.cutoff_hz.is_some_and(f64::is_nan) {
            return Err(Error::config("cutoff_hz", "must be a number"));
        }
        if let FilterKind::ChebyshevI { ripple_db } = self.kind {
            if !(ripple_db.is_finite() && ripple_db > 0.0) {
                return Err(Error::config("ripple_db", "must be a positive number of dB"));
            }
        }
        Ok(())
    }
}

/// Cascade of second-order sections `[b0, b1, b2, 1, a1, a2]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Sos {
    sections: Vec<[f64; 6]>,
}

impl Sos {
    /// Design a digital lowpass of `order` with cutoff `normalized` (fraction of Nyquist, in `(0, 1)`).
    pub fn lowpass(kind: FilterKind, order: usize, normalized: f64) -> Result<Self> {
        if order == 0 {
            return Err(Error::config("order", "must be at least 1"));
        }
        if !(normalized > 0.0 && normalized < 1.0) {
            return Err(Error::config(
                "cutoff_hz",
                format!("normalized cutoff {normalized} must lie in (0, 1)"),
            ));
        }

        let n = order as f64;
        let (mu, dc_gain) = match kind {
            FilterKind::Butterworth => (0.0, 1.0),
            FilterKind::ChebyshevI { ripple_db } => {
                let eps = (10f64.powf(0.1 * ripple_db) - 1.0).sqrt();
                let mu = (1.0 / eps).asinh() / n;
                let dc = if order % 2 == 0 {
                    1.0 / (1.0 + eps * eps).sqrt()
                } else {
                    1.0
                };
                (mu, dc)
            }
        };
        let analog_pole = |theta: f64| -> Complex64 {
            match kind {
                FilterKind::Butterworth => -Complex64::new(theta.cos(), theta.sin()),
                FilterKind::ChebyshevI { .. } => -Complex64::new(mu, theta).sinh(),
            }
        };

        // bilinear transform at fs = 2 after pre-warping the cutoff
        let warped = 4.0 * (PI * normalized / 2.0).tan();
        let to_digital = |p: Complex64| -> Complex64 {
            let p = p * warped;
            (Complex64::new(4.0, 0.0) + p) / (Complex64::new(4.0, 0.0) - p)
        };

        let mut sections = Vec::with_capacity(order.div_ceil(2));
        if order % 2 == 1 {
            let p = to_digital(analog_pole(0.0)).re;
            let g = (1.0 - p) / 2.0;
            sections.push([g, g, 0.0, 1.0, -p, 0.0]);
        }
        // poles nearest the unit circle go last
        for k in (0..order / 2).rev() {
            let m = (order - 1 - 2 * k) as f64;
            let p = to_digital(analog_pole(PI * m / (2.0 * n)));
            let a1 = -2.0 * p.re;
            let a2 = p.norm_sqr();
            let g = (1.0 + a1 + a2) / 4.0;
            sections.push([g, 2.0 * g, g, 1.0, a1, a2]);
        }
        if let Some(first) = sections.first_mut() {
            for b in first.iter_mut().take(3) {
                *b *= dc_gain;
            }
        }
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[[f64; 6]] {
        &self.sections
    }

    /// Magnitude response at `freq_hz` for a filter running at `sample_rate`.
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate;
        let z1 = Complex64::new(0.0, -w).exp();
        let z2 = z1 * z1;
        self.sections
            .iter()
            .map(|s| {
                let num = s[0] + z1 * s[1] + z2 * s[2];
                let den = s[3] + z1 * s[4] + z2 * s[5];
                (num / den).norm()
            })
            .product()
    }

    /// Single forward pass from rest.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut state = vec![[0.0; 2]; self.sections.len()];
        self.run(input.iter().copied(), &mut state)
    }

    /// Zero-phase forward-backward filtering.
    pub fn filtfilt(&self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        if n == 0 {
            return Vec::new();
        }
        let first_order = self.sections.iter().filter(|s| s[2] == 0.0).count();
        let ntaps = 2 * self.sections.len() + 1 - first_order;
        let edge = (3 * ntaps).min(n - 1);
        let ext = odd_extension(input, edge);
        let zi = self.steady_state();

        let mut state: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * ext[0], z[1] * ext[0]]).collect();
        let forward = self.run(ext.iter().copied(), &mut state);

        let last = forward[forward.len() - 1];
        let mut state: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * last, z[1] * last]).collect();
        let mut backward = self.run(forward.iter().rev().copied(), &mut state);
        backward.reverse();

        backward.drain(..edge);
        backward.truncate(n);
        backward
    }

    fn run(&self, input: impl Iterator<Item = f64>, state: &mut [[f64; 2]]) -> Vec<f64> {
        input
            .map(|mut x| {
                for (s, z) in self.sections.iter().zip(state.iter_mut()) {
                    // transposed direct form II
                    let y = s[0] * x + z[0];
                    z[0] = s[1] * x - s[4] * y + z[1];
                    z[1] = s[2] * x - s[5] * y;
                    x = y;
                }
                x
            })
            .collect()
    }

    /// Per-section state that holds the cascade at rest under a unit step.
    fn steady_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|s| {
                let gain = (s[0] + s[1] + s[2]) / (s[3] + s[4] + s[5]);
                let z1 = s[2] - s[5] * gain;
                let z0 = s[1] - s[4] * gain + z1;
                let zi = [z0 * scale, z1 * scale];
                scale *= gain;
                zi
            })
            .collect()
    }
}

fn odd_extension(x: &[f64], edge: usize) -> Vec<f64> {
    let n = x.len();
    let mut ext = Vec::with_capacity(n + 2 * edge);
    let head = x[0];
    let tail = x[n - 1];
    ext.extend((1..=edge).rev().map(|i| 2.0 * head - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=edge).map(|i| 2.0 * tail - x[n - 1 - i]));
    ext
}

/// Apply the configured zero-phase lowpass to `signal`.
///
/// An inactive spec returns the input unchanged (same buffer). A cutoff at or
/// above Nyquist bypasses the filter with [`Advisory::CutoffAboveNyquist`]
/// unless the policy is [`CutoffPolicy::Reject`]. Orders above
/// [`MAX_STABLE_ORDER`] are applied but flagged.
pub fn apply_lowpass(signal: &Signal, spec: &FilterSpec) -> Result<Outcome<Signal>> {
    spec.validate()?;
    let cutoff = match spec.cutoff_hz {
        Some(c) if c > 0.0 => c,
        _ => {
            log::debug!("no lowpass filter applied (cutoff not set)");
            return Ok(Outcome::Ok(signal.clone()));
        }
    };

    let nyquist = signal.nyquist();
    if cutoff >= nyquist {
        return match spec.cutoff_policy {
            CutoffPolicy::Bypass => Ok(Outcome::warn(
                signal.clone(),
                Advisory::CutoffAboveNyquist {
                    cutoff_hz: cutoff,
                    nyquist_hz: nyquist,
                },
            )),
            CutoffPolicy::Reject => Err(Error::config(
                "cutoff_hz",
                format!("{cutoff} Hz is not below the Nyquist frequency {nyquist} Hz"),
            )),
        };
    }

    let sos = Sos::lowpass(spec.kind, spec.order, cutoff / nyquist)?;
    let filtered = sos.filtfilt(signal.samples());
    if filtered.iter().any(|v| !v.is_finite()) {
        return Err(Error::NumericDegeneracy(format!(
            "{} lowpass of order {} produced non-finite samples",
            spec.kind, spec.order
        )));
    }
    log::debug!(
        "applied {} lowpass: cutoff={} Hz, order={}",
        spec.kind,
        cutoff,
        spec.order
    );

    let out = signal.derive(filtered)?;
    if spec.order > MAX_STABLE_ORDER {
        Ok(Outcome::warn(out, Advisory::HighFilterOrder { order: spec.order }))
    } else {
        Ok(Outcome::Ok(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn butterworth_is_half_power_at_cutoff() {
        for order in 1..=8 {
            let sos = Sos::lowpass(FilterKind::Butterworth, order, 0.25).unwrap();
            let at_cutoff = sos.magnitude_at(1000.0, 8000.0);
            assert!(
                (at_cutoff - core::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9,
                "order {order}: {at_cutoff}"
            );
            assert!((sos.magnitude_at(0.0, 8000.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn chebyshev_ripple_sets_even_order_dc_gain() {
        let sos = Sos::lowpass(FilterKind::ChebyshevI { ripple_db: 0.5 }, 4, 0.2).unwrap();
        let dc_db = 20.0 * sos.magnitude_at(0.0, 2.0).log10();
        assert!((dc_db + 0.5).abs() < 1e-9, "{dc_db}");
        let sos = Sos::lowpass(FilterKind::ChebyshevI { ripple_db: 0.5 }, 5, 0.2).unwrap();
        assert!((sos.magnitude_at(0.0, 2.0) - 1.0).abs() < 1e-12);
        // response at the cutoff sits at the bottom of the ripple band
        let edge_db = 20.0 * sos.magnitude_at(0.2, 2.0).log10();
        assert!((edge_db + 0.5).abs() < 1e-6, "{edge_db}");
    }

    #[test]
    fn filtfilt_preserves_constants_and_length() {
        let sos = Sos::lowpass(FilterKind::Butterworth, 4, 0.1).unwrap();
        let x = vec![3.0; 200];
        let y = sos.filtfilt(&x);
        assert_eq!(y.len(), x.len());
        assert!(y.iter().all(|v| (v - 3.0).abs() < 1e-9));
        assert_eq!(sos.filtfilt(&[1.5]).len(), 1);
    }

    #[test]
    fn kind_names_parse() {
        assert_eq!("butter".parse::<FilterKind>().unwrap(), FilterKind::Butterworth);
        assert_eq!(
            "cheby1".parse::<FilterKind>().unwrap(),
            FilterKind::ChebyshevI { ripple_db: 0.5 }
        );
        assert_eq!(
            "cheby1:1.5".parse::<FilterKind>().unwrap(),
            FilterKind::ChebyshevI { ripple_db: 1.5 }
        );
        assert!(matches!(
            "bessel".parse::<FilterKind>(),
            Err(Error::UnsupportedVariant { kind: "filter", .. })
        ));
    }

    #[test]
    fn odd_extension_mirrors_about_endpoints() {
        let ext = odd_extension(&[1.0, 2.0, 4.0], 2);
        assert_eq!(ext, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 6.0, 7.0]);
    }
}

#[cfg(all(feature = "internal-tests", test))]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn constant_input_passes_unchanged(
            level in -100.0f64..100.0,
            len in 1usize..300,
            order in 1usize..9,
        ) {
            let sos = Sos::lowpass(FilterKind::Butterworth, order, 0.2).unwrap();
            let out = sos.filtfilt(&vec![level; len]);
            prop_assert_eq!(out.len(), len);
            for v in out {
                prop_assert!((v - level).abs() < 1e-6 * level.abs().max(1.0));
            }
        }
    }
}
