//! Common window functions for STFT framing.
//!
//! All generators return *periodic* windows (denominator `len` rather than
//! `len - 1`), which tile cleanly under overlap and match the usual spectral
//! analysis convention. A length-one window is always `[1.0]`.

use core::f64::consts::PI;
use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// Default Kaiser shape parameter when none is given by name.
pub const DEFAULT_KAISER_BETA: f64 = 8.6;

/// Default Tukey taper fraction when none is given by name.
pub const DEFAULT_TUKEY_ALPHA: f64 = 0.5;

/// Window applied to each STFT frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WindowKind {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
    Bartlett,
    Kaiser { beta: f64 },
    Tukey { alpha: f64 },
}

impl WindowKind {
    /// Generate the window coefficients for a frame of `len` samples.
    pub fn generate(&self, len: usize) -> Vec<f64> {
        match *self {
            WindowKind::Rectangular => rectangular(len),
            WindowKind::Hann => hann(len),
            WindowKind::Hamming => hamming(len),
            WindowKind::Blackman => blackman(len),
            WindowKind::Bartlett => bartlett(len),
            WindowKind::Kaiser { beta } => kaiser(len, beta),
            WindowKind::Tukey { alpha } => tukey(len, alpha),
        }
    }

    /// Short name accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            WindowKind::Rectangular => "rectangular",
            WindowKind::Hann => "hann",
            WindowKind::Hamming => "hamming",
            WindowKind::Blackman => "blackman",
            WindowKind::Bartlett => "bartlett",
            WindowKind::Kaiser { .. } => "kaiser",
            WindowKind::Tukey { .. } => "tukey",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Kaiser { beta } => write!(f, "kaiser:{beta}"),
            WindowKind::Tukey { alpha } => write!(f, "tukey:{alpha}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for WindowKind {
    type Err = Error;

    /// Parse `hann`, `hamming`, `blackman`, `bartlett`, `rectangular`
    /// (or `boxcar`), `kaiser[:beta]` and `tukey[:alpha]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, param) = match lower.split_once(':') {
            Some((n, p)) => (n, Some(p)),
            None => (lower.as_str(), None),
        };
        let unsupported = || Error::UnsupportedVariant {
            kind: "window",
            name: s.to_string(),
        };
        let parse_param = |default: f64| -> Result<f64, Error> {
            match param {
                None => Ok(default),
                Some(p) => p.trim().parse::<f64>().map_err(|_| unsupported()),
            }
        };
        match name {
            "hann" | "hanning" => Ok(WindowKind::Hann),
            "hamming" => Ok(WindowKind::Hamming),
            "blackman" => Ok(WindowKind::Blackman),
            "bartlett" | "triangle" => Ok(WindowKind::Bartlett),
            "rectangular" | "rect" | "boxcar" => Ok(WindowKind::Rectangular),
            "kaiser" => Ok(WindowKind::Kaiser {
                beta: parse_param(DEFAULT_KAISER_BETA)?,
            }),
            "tukey" => {
                let alpha = parse_param(DEFAULT_TUKEY_ALPHA)?;
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(Error::config("window", "tukey alpha must lie in [0, 1]"));
                }
                Ok(WindowKind::Tukey { alpha })
            }
            _ => Err(unsupported()),
        }
    }
}

fn cosine_sum(len: usize, coeffs: &[f64]) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let n = len as f64;
    (0..len)
        .map(|i| {
            let x = 2.0 * PI * i as f64 / n;
            coeffs
                .iter()
                .enumerate()
                .map(|(k, &a)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * a * (k as f64 * x).cos()
                })
                .sum()
        })
        .collect()
}

/// All-ones window.
pub fn rectangular(len: usize) -> Vec<f64> {
    vec![1.0; len]
}

/// Generate a Hann window of length `len`.
pub fn hann(len: usize) -> Vec<f64> {
    cosine_sum(len, &[0.5, 0.5])
}

/// Generate a Hamming window of length `len`.
pub fn hamming(len: usize) -> Vec<f64> {
    cosine_sum(len, &[0.54, 0.46])
}

/// Generate a Blackman window of length `len`.
pub fn blackman(len: usize) -> Vec<f64> {
    cosine_sum(len, &[0.42, 0.5, 0.08])
}

/// Generate a triangular window that reaches zero at the frame start.
pub fn bartlett(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let half = len as f64 / 2.0;
    (0..len)
        .map(|i| 1.0 - ((i as f64 - half) / half).abs())
        .collect()
}

fn bessel0(x: f64) -> f64 {
    // Power series of I0; terms fall off fast enough for beta up to ~50.
    let y = x * x / 4.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..64 {
        term *= y / (k as f64 * k as f64);
        sum += term;
        if term < sum * 1e-17 {
            break;
        }
    }
    sum
}

/// Generate a Kaiser window of length `len` and shape parameter `beta`.
pub fn kaiser(len: usize, beta: f64) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let denom = bessel0(beta);
    let m = len as f64 / 2.0;
    (0..len)
        .map(|i| {
            let r = (i as f64 - m) / m;
            bessel0(beta * (1.0 - r * r).max(0.0).sqrt()) / denom
        })
        .collect()
}

/// Generate a Tukey (tapered cosine) window; `alpha = 0` is rectangular, `alpha = 1` is Hann.
pub fn tukey(len: usize, alpha: f64) -> Vec<f64> {
    if alpha <= 0.0 {
        return rectangular(len);
    }
    if alpha >= 1.0 {
        return hann(len);
    }
    if len == 1 {
        return vec![1.0];
    }
    let n = len as f64;
    let taper = alpha * n / 2.0;
    (0..len)
        .map(|i| {
            let x = i as f64;
            if x < taper {
                0.5 * (1.0 - (PI * x / taper).cos())
            } else if x > n - taper {
                0.5 * (1.0 - (PI * (n - x) / taper).cos())
            } else {
                1.0
            }
        })
        .collect()
}
