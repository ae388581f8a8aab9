use crate::point::Point;

/// Length of the synthetic horizontal arm used as the neck angle reference.
const HORIZONTAL_REFERENCE: f32 = 100.0;

/// Unsigned angle at `mid` formed by `first` and `last`, in degrees.
///
/// The result is always in `[0, 180]` and does not depend on which endpoint
/// is passed first.
pub(crate) fn angle_between(first: Point, mid: Point, last: Point) -> f64 {
    let degrees = ((last - mid).heading() - (first - mid).heading())
        .abs()
        .to_degrees();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// Inclination of the `ear - shoulder` vector relative to the horizontal.
pub(crate) fn neck_angle(ear: Point, shoulder: Point) -> f64 {
    angle_between(ear, shoulder, shoulder.shifted_x(HORIZONTAL_REFERENCE))
}
