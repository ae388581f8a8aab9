use crate::error::Error;
use ordered_float::NotNan;
use std::ops::{Add, Div, Sub};

/// A 2D position in detector space.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub(crate) struct Point {
    x: f32,
    y: f32,
}

impl Point {
    pub(crate) fn new(x: f32, y: f32) -> Result<Self, Error> {
        Ok(Self {
            x: NotNan::new(x)
                .map_err(|e| Error::ConstructNotNan(e, x))?
                .into_inner(),
            y: NotNan::new(y)
                .map_err(|e| Error::ConstructNotNan(e, y))?
                .into_inner(),
        })
    }

    /// Midpoint of a left/right pair, anchored at the right-hand point.
    pub(crate) fn midpoint(left: Self, right: Self) -> Self {
        right + (left - right) / 2.0
    }

    pub(crate) fn shifted_x(self, dx: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y,
        }
    }

    /// Direction of the vector from the origin to this point, in radians.
    #[inline]
    pub(crate) fn heading(self) -> f64 {
        f64::from(self.y).atan2(f64::from(self.x))
    }

    #[inline]
    pub(crate) fn x(self) -> f32 {
        self.x
    }

    #[inline]
    pub(crate) fn y(self) -> f32 {
        self.y
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Div<f32> for Point {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self::Output {
            x: self.x / rhs,
            y: self.y / rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Point;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn nan_is_rejected() {
        assert!(Point::new(f32::NAN, 1.0).is_err());
        assert!(Point::new(1.0, f32::NAN).is_err());
    }

    #[test]
    fn midpoint_of_pair() {
        let left = Point::new(100.0, 50.0).unwrap();
        let right = Point::new(120.0, 50.0).unwrap();
        let mid = Point::midpoint(left, right);
        assert_eq!(mid, Point::new(110.0, 50.0).unwrap());
    }

    #[test]
    fn heading_of_axes() {
        assert_approx_eq!(Point::new(1.0, 0.0).unwrap().heading(), 0.0);
        assert_approx_eq!(
            Point::new(0.0, 1.0).unwrap().heading(),
            std::f64::consts::FRAC_PI_2
        );
        assert_approx_eq!(
            Point::new(-1.0, 0.0).unwrap().heading(),
            std::f64::consts::PI
        );
    }
}
