//! Colour palettes for heatmap rendering.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// Maximum value for an 8-bit colour channel.
const U8_MAX: f64 = 255.0;

/// Supported colour palettes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Colormap {
    /// Blue through cyan and yellow to dark red.
    #[default]
    Jet,
    /// Viridis perceptually uniform map.
    Viridis,
    /// Plasma perceptually uniform map.
    Plasma,
    /// Inferno perceptually uniform map.
    Inferno,
    /// Magma perceptually uniform map.
    Magma,
    /// Greyscale gradient.
    Gray,
    /// Black→purple→orange→yellow→white gradient.
    Fire,
}

impl Colormap {
    pub const ALL: [Colormap; 7] = [
        Colormap::Jet,
        Colormap::Viridis,
        Colormap::Plasma,
        Colormap::Inferno,
        Colormap::Magma,
        Colormap::Gray,
        Colormap::Fire,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Jet => "jet",
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::Inferno => "inferno",
            Colormap::Magma => "magma",
            Colormap::Gray => "gray",
            Colormap::Fire => "fire",
        }
    }

    /// Map a value in `[0, 1]` onto an RGB8 colour. Values outside are clamped.
    pub fn map(&self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Jet => jet(t),
            Colormap::Viridis => from_gradient(colorous::VIRIDIS, t),
            Colormap::Plasma => from_gradient(colorous::PLASMA, t),
            Colormap::Inferno => from_gradient(colorous::INFERNO, t),
            Colormap::Magma => from_gradient(colorous::MAGMA, t),
            Colormap::Gray => {
                let g = (t * U8_MAX).round() as u8;
                [g, g, g]
            }
            Colormap::Fire => fire(t),
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let lower = if lower == "grey" { "gray".to_string() } else { lower };
        Colormap::ALL
            .into_iter()
            .find(|c| c.name() == lower)
            .ok_or_else(|| Error::UnsupportedVariant {
                kind: "colormap",
                name: s.to_string(),
            })
    }
}

fn from_gradient(gradient: colorous::Gradient, t: f64) -> [u8; 3] {
    let c = gradient.eval_continuous(t);
    [c.r, c.g, c.b]
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

fn fire(t: f64) -> [u8; 3] {
    const STOPS: [(f64, [u8; 3]); 5] = [
        (0.0, [0, 0, 0]),
        (0.25, [128, 0, 128]),
        (0.5, [255, 165, 0]),
        (0.75, [255, 255, 0]),
        (1.0, [255, 255, 255]),
    ];
    let (start, end) = STOPS
        .windows(2)
        .find(|w| t >= w[0].0 && t <= w[1].0)
        .map(|w| (w[0], w[1]))
        .unwrap_or((STOPS[3], STOPS[4]));
    let local = (t - start.0) / (end.0 - start.0);
    [
        lerp_u8(start.1[0], end.1[0], local),
        lerp_u8(start.1[1], end.1[1], local),
        lerp_u8(start.1[2], end.1[2], local),
    ]
}

/// Piecewise-linear channel defined by `(position, value)` anchors.
fn channel(anchors: &[(f64, f64)], t: f64) -> f64 {
    for w in anchors.windows(2) {
        let ((x0, y0), (x1, y1)) = (w[0], w[1]);
        if t <= x1 {
            let local = if x1 > x0 { (t - x0) / (x1 - x0) } else { 0.0 };
            return y0 + (y1 - y0) * local.clamp(0.0, 1.0);
        }
    }
    anchors.last().map_or(0.0, |a| a.1)
}

fn jet(t: f64) -> [u8; 3] {
    const RED: [(f64, f64); 5] = [(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
    const GREEN: [(f64, f64); 6] = [
        (0.0, 0.0),
        (0.125, 0.0),
        (0.375, 1.0),
        (0.64, 1.0),
        (0.91, 0.0),
        (1.0, 0.0),
    ];
    const BLUE: [(f64, f64); 5] = [(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];
    [
        (channel(&RED, t) * U8_MAX).round() as u8,
        (channel(&GREEN, t) * U8_MAX).round() as u8,
        (channel(&BLUE, t) * U8_MAX).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jet_endpoints() {
        assert_eq!(Colormap::Jet.map(0.0), [0, 0, 128]);
        assert_eq!(Colormap::Jet.map(1.0), [128, 0, 0]);
        // green plateau in the middle
        assert_eq!(Colormap::Jet.map(0.5)[1], 255);
    }

    /// Ensure colour mapping saturates at the expected extremes.
    #[test]
    fn color_extremes_are_correct() {
        assert_eq!(Colormap::Fire.map(-1.0), [0, 0, 0]);
        assert_eq!(Colormap::Fire.map(2.0), [255, 255, 255]);
        assert_eq!(Colormap::Gray.map(f64::NAN), [0, 0, 0]);
    }

    #[test]
    fn names_parse() {
        for c in Colormap::ALL {
            assert_eq!(c.name().parse::<Colormap>().unwrap(), c);
        }
        assert_eq!("Grey".parse::<Colormap>().unwrap(), Colormap::Gray);
        assert!("rainbow".parse::<Colormap>().is_err());
    }
}
