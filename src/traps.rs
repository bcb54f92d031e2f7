//! Escape predicates and the colors that go with them.
//!
//! The classic test stops iterating once an orbit is plainly heading for
//! infinity.  The orbit traps instead stop when the orbit wanders close
//! to some shape (a circle about the origin, the two axes, the two
//! diagonals) and color the pixel by how close it came.

use std::str::FromStr;

use image::{Pixel, Rgb};

use crate::complex::Complex;

/// A pixel color.
pub type Color = Rgb<u8>;

/// Builds a color from its three channels.
pub fn rgb(r: u8, g: u8, b: u8) -> Color {
    Rgb::from_channels(r, g, b, 0)
}

/// The squared modulus at which an orbit is taken to have escaped.
pub const ESCAPE_RADIUS_SQR: f64 = 4.0;

/// How an orbit is stopped, and how the point is then colored.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EscapePolicy {
    /// Stop when the squared modulus reaches 4; shade by iteration count.
    Default,
    /// Stop when the orbit comes within `radius` of the origin; shade by
    /// distance, scaled by `gradient`.
    Circle {
        /// How close counts as trapped.
        radius: f64,
        /// How quickly the shade falls off with distance.
        gradient: f64,
    },
    /// Stop when the orbit comes within `thickness` of either axis.
    AxisCross {
        /// Half the width of each arm.
        thickness: f64,
    },
    /// Stop when the orbit comes within `thickness` of either diagonal.
    DiagonalCross {
        /// Half the width of each arm.
        thickness: f64,
    },
}

impl Default for EscapePolicy {
    fn default() -> Self {
        EscapePolicy::Default
    }
}

impl EscapePolicy {
    /// The circle trap with radius 0.25 and gradient 4.
    pub fn circle() -> Self {
        EscapePolicy::Circle {
            radius: 0.25,
            gradient: 4.0,
        }
    }

    /// The axis cross with arms 0.05 wide on each side.
    pub fn axis_cross() -> Self {
        EscapePolicy::AxisCross { thickness: 0.05 }
    }

    /// The diagonal cross with arms 0.05 wide on each side.
    pub fn diagonal_cross() -> Self {
        EscapePolicy::DiagonalCross { thickness: 0.05 }
    }

    /// True once the orbit at `z` should stop.
    #[inline]
    pub fn escaped(&self, z: Complex) -> bool {
        match *self {
            EscapePolicy::Default => z.norm_sqr() >= ESCAPE_RADIUS_SQR,
            EscapePolicy::Circle { radius, .. } => z.norm() <= radius,
            EscapePolicy::AxisCross { thickness } => z.re.abs() <= thickness || z.im.abs() <= thickness,
            EscapePolicy::DiagonalCross { thickness } => diagonal_distance(z) <= thickness,
        }
    }

    /// The color of a point whose orbit ended at `z` after `iterations`
    /// steps.  `iterations > max_iterations` means the orbit never stopped.
    pub fn color(&self, z: Complex, iterations: usize, max_iterations: usize) -> Color {
        let trapped = iterations <= max_iterations;
        match *self {
            EscapePolicy::Default => {
                let max = max_iterations as f64;
                let count = iterations as f64;
                if !trapped {
                    rgb(0, 0, 0)
                } else if iterations == 0 {
                    rgb(255, 255, 255)
                } else if count < max / 3.0 {
                    rgb(192, 192, 192)
                } else if count < max * 2.0 / 3.0 {
                    rgb(128, 128, 128)
                } else {
                    rgb(64, 64, 64)
                }
            }
            EscapePolicy::Circle { gradient, .. } => {
                if !trapped {
                    return rgb(0, 0, 0);
                }
                let shade = scale(1.0 - (gradient * z.norm()).min(1.0));
                rgb(shade, 255, shade)
            }
            EscapePolicy::AxisCross { thickness } => {
                if !trapped {
                    return rgb(255, 255, 255);
                }
                let distance = z.re.abs().min(z.im.abs());
                let fade = scale(distance / thickness);
                rgb(255, fade, fade)
            }
            EscapePolicy::DiagonalCross { thickness } => {
                if !trapped {
                    return rgb(0, 0, 255);
                }
                let fade = scale(1.0 - diagonal_distance(z) / thickness);
                rgb(fade, fade, 255)
            }
        }
    }
}

#[inline]
fn diagonal_distance(z: Complex) -> f64 {
    (z.re.abs() - z.im.abs()).abs()
}

// Maps [0, 1] onto a channel value, clamping anything outside.
fn scale(fraction: f64) -> u8 {
    (fraction.max(0.0).min(1.0) * 255.0).round() as u8
}

impl FromStr for EscapePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(EscapePolicy::Default),
            "circle" => Ok(EscapePolicy::circle()),
            "axis" | "axis-cross" => Ok(EscapePolicy::axis_cross()),
            "diagonal" | "diagonal-cross" => Ok(EscapePolicy::diagonal_cross()),
            _ => Err(format!("Unknown orbit trap '{}'", s)),
        }
    }
}
