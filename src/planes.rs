//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0 in
//! the top-left corner, and a rectangle on the complex plane given by
//! the real values at its left and right edges and the imaginary values
//! at its bottom and top edges.
use crate::complex::Complex;
use crate::errors::RenderError;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.  For that reason,
/// the top-left corner is not included.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the x, y of a point in a region.  Row 0 is the top edge.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// The part of the complex plane on display.  An axis is inverted simply
/// by swapping its two values, so the left edge may hold the larger real
/// and the bottom edge the larger imaginary.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DisplayBounds {
    /// Real value at the left edge.
    pub left_real: f64,
    /// Real value at the right edge.
    pub right_real: f64,
    /// Imaginary value at the bottom edge.
    pub down_imag: f64,
    /// Imaginary value at the top edge.
    pub up_imag: f64,
}

impl Default for DisplayBounds {
    fn default() -> Self {
        DisplayBounds::new(-2.5, 1.5, -1.6, 1.6)
    }
}

impl DisplayBounds {
    /// Bounds from the four edge values.
    pub fn new(left_real: f64, right_real: f64, down_imag: f64, up_imag: f64) -> Self {
        DisplayBounds {
            left_real,
            right_real,
            down_imag,
            up_imag,
        }
    }

    /// Bounds from a pair of corners: the point drawn at the bottom left
    /// and the point drawn at the top right.
    pub fn from_corners(leftlower: Complex, rightupper: Complex) -> Self {
        DisplayBounds::new(leftlower.re, rightupper.re, leftlower.im, rightupper.im)
    }

    /// Mirrors the picture left to right.
    pub fn invert_real(&mut self) {
        std::mem::swap(&mut self.left_real, &mut self.right_real);
    }

    /// Mirrors the picture top to bottom.
    pub fn invert_imag(&mut self) {
        std::mem::swap(&mut self.down_imag, &mut self.up_imag);
    }

    /// True when reals grow to the left.
    pub fn is_real_inverted(&self) -> bool {
        self.left_real > self.right_real
    }

    /// True when imaginaries grow downwards.
    pub fn is_imag_inverted(&self) -> bool {
        self.down_imag > self.up_imag
    }

    /// The bounds must be finite and enclose some area.
    pub fn validate(&self) -> Result<(), RenderError> {
        let edges = [self.left_real, self.right_real, self.down_imag, self.up_imag];
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(RenderError::DegenerateBounds(
                "every edge must be a finite number".to_string(),
            ));
        }
        if self.left_real == self.right_real {
            return Err(RenderError::DegenerateBounds(
                "the left and right edges are the same".to_string(),
            ));
        }
        if self.down_imag == self.up_imag {
            return Err(RenderError::DegenerateBounds(
                "the top and bottom edges are the same".to_string(),
            ));
        }
        Ok(())
    }
}

/// Contains the definitions of two planes: an integral cartesian plane,
/// and the complex plane on display.  Maps points from one to the
/// other.
#[derive(Debug)]
pub struct PlaneMapper {
    /// The width and height of the integral cartesian plane.
    pub integral_plane: IntegralPlane,
    /// The region of the complex plane being drawn.
    pub bounds: DisplayBounds,
    // How far one pixel moves along each complex axis.  Negative when
    // the axis runs against the pixel direction.
    grid_factors: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the integral plane, and the
    /// bounds of the complex plane.  Has function to map points inside
    /// one to points inside the other.
    pub fn new(width: usize, height: usize, bounds: DisplayBounds) -> Result<PlaneMapper, RenderError> {
        bounds.validate()?;
        if width == 0 || height == 0 {
            return Err(RenderError::DegenerateBounds(format!(
                "cannot draw on a {}x{} image",
                width, height
            )));
        }

        let grid_factors = (
            (bounds.right_real - bounds.left_real) / (width as f64),
            (bounds.down_imag - bounds.up_imag) / (height as f64),
        );

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            bounds,
            grid_factors,
        })
    }

    /// Given a pixel on the integral cartesian plane, map that to the
    /// complex number drawn there.
    #[inline]
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex {
        Complex::new(
            self.bounds.left_real + (pixel.0 as f64) * self.grid_factors.0,
            self.bounds.up_imag + (pixel.1 as f64) * self.grid_factors.1,
        )
    }

    /// Given a complex number, find the pixel it is drawn in, if it is on
    /// the canvas at all.  Used to mark a selected point.
    pub fn point_to_pixel(&self, point: &Complex) -> Option<Pixel> {
        let left = (point.re - self.bounds.left_real) / self.grid_factors.0;
        let top = (point.im - self.bounds.up_imag) / self.grid_factors.1;
        if left < 0.0
            || left >= (self.integral_plane.0 as f64)
            || top < 0.0
            || top >= (self.integral_plane.1 as f64)
        {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planemapper_fails_on_flat_shape() {
        let pm = PlaneMapper::new(4, 4, DisplayBounds::new(-1.0, -1.0, -1.0, 1.0));
        assert!(pm.is_err());
        let pm = PlaneMapper::new(4, 4, DisplayBounds::new(-1.0, 1.0, 1.0, 1.0));
        assert!(pm.is_err());
        let pm = PlaneMapper::new(0, 4, DisplayBounds::default());
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_passes_on_inverted_shape() {
        let mut bounds = DisplayBounds::new(-1.0, 1.0, -1.0, 1.0);
        bounds.invert_real();
        assert!(bounds.is_real_inverted());
        assert!(!bounds.is_imag_inverted());
        assert!(PlaneMapper::new(4, 4, bounds).is_ok());
    }

    #[test]
    fn pixel_to_point_puts_top_left_first() {
        let pm = PlaneMapper::new(4, 4, DisplayBounds::new(-2.0, 2.0, -2.0, 2.0)).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, 2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(2.0, -2.0));
    }

    #[test]
    fn pixel_to_point_on_inverted_planes() {
        let mut bounds = DisplayBounds::new(-2.0, 2.0, -2.0, 2.0);
        bounds.invert_real();
        bounds.invert_imag();
        let pm = PlaneMapper::new(4, 4, bounds).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(2.0, -2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(1, 3)), Complex::new(1.0, 1.0));
    }

    #[test]
    fn point_to_pixel_maps_on_large_mixed_planes() {
        let pm = PlaneMapper::new(512, 512, DisplayBounds::new(-2.0, 2.0, -2.0, 2.0)).unwrap();
        assert_eq!(pm.point_to_pixel(&Complex::new(0.0, 0.0)), Some(Pixel(256, 256)));
        assert_eq!(pm.point_to_pixel(&Complex::new(-2.0, 2.0)), Some(Pixel(0, 0)));
        assert_eq!(pm.point_to_pixel(&Complex::new(1.0, 1.0)), Some(Pixel(384, 128)));
        assert_eq!(pm.point_to_pixel(&Complex::new(2.0, 2.0)), None);
        assert_eq!(pm.point_to_pixel(&Complex::new(0.0, 3.0)), None);
    }

    #[test]
    fn default_bounds_match_the_reset_view() {
        let bounds = DisplayBounds::default();
        assert_eq!(bounds, DisplayBounds::new(-2.5, 1.5, -1.6, 1.6));
        assert_eq!(
            DisplayBounds::from_corners(Complex::new(-2.5, -1.6), Complex::new(1.5, 1.6)),
            bounds
        );
    }
}
