//! The escape-time loop: run the first term once, then the next-term
//! rule over and over until the escape policy says stop or the
//! iteration cap is reached.

use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbImage;
use itertools::iproduct;
use tracing::{info, warn};

use crate::complex::Complex;
use crate::engine::{IterationContext, Machine};
use crate::formula::CompiledFormula;
use crate::planes::{Pixel, PlaneMapper};
use crate::traps::{Color, EscapePolicy};

/// What a render needs besides the formula and the plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// How many times the next-term rule may run before a point is
    /// taken to be inside the set.
    pub max_iterations: usize,
    /// The point bound to `u`, if the user has picked one.
    pub user_point: Option<Complex>,
    /// When to stop, and how to color.
    pub policy: EscapePolicy,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            max_iterations: 100,
            user_point: None,
            policy: EscapePolicy::Default,
        }
    }
}

/// Where one point's orbit stopped.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Orbit {
    /// How many times the next-term rule ran.  One more than the
    /// iteration cap means the orbit never stopped.
    pub iterations: usize,
    /// The last term computed.
    pub last: Complex,
}

/// Iterates points of one formula under one set of settings.  Keeps its
/// own machine, so each thread of work wants its own `EscapeTime`.
pub struct EscapeTime<'a> {
    formula: &'a CompiledFormula,
    settings: &'a RenderSettings,
    machine: Machine,
}

impl<'a> EscapeTime<'a> {
    /// Ready to iterate.
    pub fn new(formula: &'a CompiledFormula, settings: &'a RenderSettings) -> Self {
        EscapeTime {
            formula,
            settings,
            machine: Machine::new(),
        }
    }

    /// Follows the orbit of `point`.  `None` when the formula reads `u`
    /// and no point has been selected; such a pixel is left undrawn.
    pub fn orbit(&mut self, point: Complex) -> Option<Orbit> {
        let formula = self.formula;
        let user_point = self.settings.user_point;
        let policy = self.settings.policy;

        // Evaluation can only fail on an unavailable value; compiled
        // formulas are never malformed.
        let first = match formula.constant_first_iterate() {
            Some(first) => first,
            None => {
                let context = IterationContext::for_first_term(point, user_point);
                self.machine
                    .evaluate(formula.first_term(), formula.constants(), &context)
                    .ok()?
            }
        };

        let max_iterations = self.settings.max_iterations;
        let mut previous = first;
        let mut iterations = 0;
        while !policy.escaped(previous) && iterations <= max_iterations {
            let context = IterationContext::for_next_term(point, user_point, first, previous);
            previous = self
                .machine
                .evaluate(formula.next_term(), formula.constants(), &context)
                .ok()?;
            iterations += 1;
        }
        Some(Orbit {
            iterations,
            last: previous,
        })
    }

    /// The color of `point`, or `None` if it cannot be drawn yet.
    pub fn color(&mut self, point: Complex) -> Option<Color> {
        let max_iterations = self.settings.max_iterations;
        let policy = self.settings.policy;
        self.orbit(point)
            .map(|orbit| policy.color(orbit.last, orbit.iterations, max_iterations))
    }
}

/// How a render ended.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RenderOutcome {
    /// Every scanline was drawn.
    Complete,
    /// The cancel flag was raised; the rows above `rows_done` are drawn.
    Cancelled {
        /// Scanlines finished before the flag was seen.
        rows_done: usize,
    },
}

/// Draws the formula into `image`, one scanline at a time, checking
/// `cancel` before each.  The image must be the plane's size.  Pixels
/// that cannot be drawn (no user point yet) keep whatever they held.
pub fn render(
    formula: &CompiledFormula,
    settings: &RenderSettings,
    plane: &PlaneMapper,
    image: &mut RgbImage,
    cancel: &AtomicBool,
) -> RenderOutcome {
    let width = plane.integral_plane.0.min(image.width() as usize);
    let height = plane.integral_plane.1.min(image.height() as usize);
    info!(
        width,
        height,
        max_iterations = settings.max_iterations,
        "rendering {}",
        formula.next_term().source()
    );

    let mut escape = EscapeTime::new(formula, settings);
    for row in 0..height {
        if cancel.load(Ordering::Relaxed) {
            warn!(rows_done = row, "render cancelled");
            return RenderOutcome::Cancelled { rows_done: row };
        }
        for column in 0..width {
            let point = plane.pixel_to_point(&Pixel(column, row));
            if let Some(color) = escape.color(point) {
                image.put_pixel(column as u32, row as u32, color);
            }
        }
    }
    info!("render complete");
    RenderOutcome::Complete
}

/// The orbit of every pixel, row by row, for callers that color things
/// their own way.
pub fn orbits(formula: &CompiledFormula, settings: &RenderSettings, plane: &PlaneMapper) -> Vec<Option<Orbit>> {
    let mut escape = EscapeTime::new(formula, settings);
    iproduct!(0..plane.integral_plane.1, 0..plane.integral_plane.0)
        .map(|(row, column)| escape.orbit(plane.pixel_to_point(&Pixel(column, row))))
        .collect()
}

/// Draws a small cross over the pixel showing `point`, clipped to the
/// image.  False when the point is off the canvas.
pub fn mark_point(plane: &PlaneMapper, image: &mut RgbImage, point: Complex, color: Color) -> bool {
    let Pixel(x, y) = match plane.point_to_pixel(&point) {
        Some(pixel) => pixel,
        None => return false,
    };
    let (width, height) = (image.width() as usize, image.height() as usize);
    for offset in 0..=MARK_ARM {
        let spots = [
            (x + offset, y),
            (x.wrapping_sub(offset), y),
            (x, y + offset),
            (x, y.wrapping_sub(offset)),
        ];
        for &(column, row) in spots.iter() {
            if column < width && row < height {
                image.put_pixel(column as u32, row as u32, color);
            }
        }
    }
    true
}

const MARK_ARM: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::planes::DisplayBounds;
    use crate::traps::rgb;

    #[test]
    fn origin_never_leaves_the_mandelbrot_set() {
        let formula = compile("c;p*p+c").unwrap();
        let settings = RenderSettings {
            max_iterations: 20,
            ..RenderSettings::default()
        };
        let orbit = EscapeTime::new(&formula, &settings).orbit(Complex::new(0.0, 0.0));
        assert_eq!(
            orbit,
            Some(Orbit {
                iterations: 21,
                last: Complex::new(0.0, 0.0)
            })
        );
    }

    #[test]
    fn far_points_escape_before_iterating() {
        let formula = compile("c;p*p+c").unwrap();
        let settings = RenderSettings::default();
        let mut escape = EscapeTime::new(&formula, &settings);
        let orbit = escape.orbit(Complex::new(3.0, 0.0)).unwrap();
        assert_eq!(orbit.iterations, 0);
        assert_eq!(escape.color(Complex::new(3.0, 0.0)), Some(rgb(255, 255, 255)));
        // 1 -> 2, and |2|^2 is already on the escape radius.
        assert_eq!(escape.orbit(Complex::new(1.0, 0.0)).unwrap().iterations, 1);
    }

    #[test]
    fn huge_iteration_caps_do_not_overflow() {
        let formula = compile("c;p*p+c").unwrap();
        let settings = RenderSettings {
            max_iterations: usize::MAX,
            ..RenderSettings::default()
        };
        let orbit = EscapeTime::new(&formula, &settings).orbit(Complex::new(3.0, 0.0));
        assert_eq!(orbit.map(|o| o.iterations), Some(0));
    }

    #[test]
    fn julia_without_a_user_point_draws_nothing() {
        let formula = compile("c;p*p+u").unwrap();
        let settings = RenderSettings::default();
        assert_eq!(EscapeTime::new(&formula, &settings).orbit(Complex::new(0.1, 0.1)), None);

        let settings = RenderSettings {
            user_point: Some(Complex::new(0.0, 0.0)),
            ..RenderSettings::default()
        };
        assert!(EscapeTime::new(&formula, &settings).orbit(Complex::new(0.1, 0.1)).is_some());
    }

    #[test]
    fn render_leaves_undrawable_pixels_alone() {
        let formula = compile("u;p*p+c").unwrap();
        let settings = RenderSettings::default();
        let plane = PlaneMapper::new(4, 3, DisplayBounds::default()).unwrap();
        let mut image = RgbImage::from_pixel(4, 3, rgb(1, 2, 3));
        let outcome = render(&formula, &settings, &plane, &mut image, &AtomicBool::new(false));
        assert_eq!(outcome, RenderOutcome::Complete);
        assert!(image.pixels().all(|p| *p == rgb(1, 2, 3)));
    }

    #[test]
    fn render_stops_when_cancelled() {
        let formula = compile("c;p*p+c").unwrap();
        let settings = RenderSettings::default();
        let plane = PlaneMapper::new(8, 8, DisplayBounds::default()).unwrap();
        let mut image = RgbImage::new(8, 8);
        let outcome = render(&formula, &settings, &plane, &mut image, &AtomicBool::new(true));
        assert_eq!(outcome, RenderOutcome::Cancelled { rows_done: 0 });
    }

    #[test]
    fn selected_point_is_marked_with_a_clipped_cross() {
        let plane = PlaneMapper::new(4, 4, DisplayBounds::new(-2.0, 2.0, -2.0, 2.0)).unwrap();
        let mut image = RgbImage::new(4, 4);
        let red = rgb(255, 0, 0);
        assert!(mark_point(&plane, &mut image, Complex::new(-2.0, 2.0), red));
        assert_eq!(*image.get_pixel(0, 0), red);
        assert_eq!(*image.get_pixel(2, 0), red);
        assert_eq!(*image.get_pixel(0, 2), red);
        assert_eq!(*image.get_pixel(1, 1), rgb(0, 0, 0));
        assert_eq!(*image.get_pixel(3, 3), rgb(0, 0, 0));

        let mut untouched = RgbImage::new(4, 4);
        assert!(!mark_point(&plane, &mut untouched, Complex::new(5.0, 0.0), red));
        assert!(untouched.pixels().all(|p| *p == rgb(0, 0, 0)));
    }

    #[test]
    fn orbits_cover_the_whole_plane() {
        let formula = compile("c;p*p+c").unwrap();
        let settings = RenderSettings::default();
        let plane = PlaneMapper::new(5, 4, DisplayBounds::default()).unwrap();
        let found = orbits(&formula, &settings, &plane);
        assert_eq!(found.len(), 5 * 4);
        assert!(found.iter().all(Option::is_some));
        // Top-left corner (-2.5 + 1.6i) is outside the escape radius already.
        assert_eq!(found[0].map(|o| o.iterations), Some(0));
    }
}
