use crate::{
    error::Error,
    point::Point,
    pose::{constants, LandmarkKind, LandmarkSnapshot},
};
use serde::{Deserialize, Serialize};

/// Affine map from detector space to overlay canvas space.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct CanvasTransform {
    pub(crate) scale_x: f32,
    pub(crate) scale_y: f32,
    pub(crate) offset_x: f32,
    pub(crate) offset_y: f32,
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self {
            scale_x: 3.3,
            scale_y: 3.3,
            offset_x: -250.0,
            offset_y: 0.0,
        }
    }
}

impl CanvasTransform {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            Err(Error::DegenerateTransform(self.scale_x, self.scale_y))
        } else {
            Ok(())
        }
    }

    #[inline]
    pub(crate) fn to_canvas(&self, point: Point) -> (f32, f32) {
        (
            point.x() * self.scale_x + self.offset_x,
            point.y() * self.scale_y + self.offset_y,
        )
    }

    #[cfg(test)]
    pub(crate) fn from_canvas(&self, x: f32, y: f32) -> Result<Point, Error> {
        self.validate()?;
        Point::new(
            (x - self.offset_x) / self.scale_x,
            (y - self.offset_y) / self.scale_y,
        )
    }
}

/// What a segment depicts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Edge {
    /// Eye midpoint to shoulder midpoint.
    Neck,
    /// Left eye to right eye.
    Eyes,
    /// A straight connection between two landmarks.
    Bone(LandmarkKind, LandmarkKind),
}

#[cfg(test)]
impl Edge {
    /// Whether the segment is only drawn when `kind` is present.
    pub(crate) fn touches(self, kind: LandmarkKind) -> bool {
        use LandmarkKind::*;

        match self {
            // both share the eyes-and-shoulders gate
            Self::Neck | Self::Eyes => {
                matches!(kind, LeftEye | RightEye | LeftShoulder | RightShoulder)
            }
            Self::Bone(a, b) => a == kind || b == kind,
        }
    }
}

/// A line in canvas coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Segment {
    pub(crate) edge: Edge,
    pub(crate) start_x: f32,
    pub(crate) start_y: f32,
    pub(crate) end_x: f32,
    pub(crate) end_y: f32,
}

impl Segment {
    fn between(edge: Edge, start: Point, end: Point, transform: &CanvasTransform) -> Self {
        let (start_x, start_y) = transform.to_canvas(start);
        let (end_x, end_y) = transform.to_canvas(end);
        Self {
            edge,
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }
}

/// The complete skeleton for one frame.
///
/// An overlay is always rebuilt from scratch; surfaces are cleared before
/// one is drawn, so nothing from an earlier frame survives.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Overlay {
    segments: Vec<Segment>,
}

impl Overlay {
    pub(crate) fn build(
        snapshot: &LandmarkSnapshot,
        transform: &CanvasTransform,
    ) -> Result<Self, Error> {
        use LandmarkKind::*;

        let mut segments = Vec::with_capacity(
            2 + constants::EAR_SHOULDER_EDGES.len() + constants::SKELETON_EDGES.len(),
        );

        if let (Some(left_eye), Some(right_eye), Some(left_shoulder), Some(right_shoulder)) = (
            snapshot.get(LeftEye)?,
            snapshot.get(RightEye)?,
            snapshot.get(LeftShoulder)?,
            snapshot.get(RightShoulder)?,
        ) {
            segments.push(Segment::between(
                Edge::Neck,
                Point::midpoint(left_eye, right_eye),
                Point::midpoint(left_shoulder, right_shoulder),
                transform,
            ));
            segments.push(Segment::between(Edge::Eyes, left_eye, right_eye, transform));
        }

        for &(a, b) in constants::EAR_SHOULDER_EDGES
            .iter()
            .chain(constants::SKELETON_EDGES.iter())
        {
            if let (Some(start), Some(end)) = (snapshot.get(a)?, snapshot.get(b)?) {
                segments.push(Segment::between(Edge::Bone(a, b), start, end, transform));
            }
        }

        Ok(Self { segments })
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn len(&self) -> usize {
        self.segments.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{testing::standing_figure, NUM_LANDMARKS};
    use assert_approx_eq::assert_approx_eq;

    const FULL_SEGMENT_COUNT: usize =
        2 + constants::EAR_SHOULDER_EDGES.len() + constants::SKELETON_EDGES.len();

    mod transform_tests {
        use super::*;

        #[test]
        fn default_calibration() {
            let point = Point::new(100.0, 20.0).unwrap();
            let (x, y) = CanvasTransform::default().to_canvas(point);
            assert_approx_eq!(x, 80.0, 1e-3);
            assert_approx_eq!(y, 66.0, 1e-3);
        }

        #[test]
        fn round_trip() {
            let transform = CanvasTransform::default();
            for &(x, y) in &[(0.0, 0.0), (75.75, 12.5), (-40.0, 480.0), (1920.0, 1080.0)] {
                let point = Point::new(x, y).unwrap();
                let (cx, cy) = transform.to_canvas(point);
                let back = transform.from_canvas(cx, cy).unwrap();
                assert_approx_eq!(back.x(), x, 1e-3);
                assert_approx_eq!(back.y(), y, 1e-3);
            }
        }

        #[test]
        fn zero_scale_is_rejected() {
            let transform = CanvasTransform {
                scale_y: 0.0,
                ..Default::default()
            };
            assert!(transform.validate().is_err());
            assert!(transform.from_canvas(1.0, 1.0).is_err());
        }
    }

    mod build_tests {
        use super::*;
        use LandmarkKind::*;

        #[test]
        fn empty_snapshot_has_no_segments() {
            let overlay =
                Overlay::build(&LandmarkSnapshot::default(), &CanvasTransform::default()).unwrap();
            assert!(overlay.is_empty());
        }

        #[test]
        fn full_figure_draws_every_edge() {
            let overlay = Overlay::build(&standing_figure(), &CanvasTransform::default()).unwrap();
            assert_eq!(overlay.len(), FULL_SEGMENT_COUNT);
            assert_eq!(overlay.segments()[0].edge, Edge::Neck);
            assert_eq!(overlay.segments()[1].edge, Edge::Eyes);
            assert_eq!(
                overlay.segments()[2].edge,
                Edge::Bone(LeftEar, LeftShoulder)
            );
            assert_eq!(
                overlay.segments()[3].edge,
                Edge::Bone(RightEar, RightShoulder)
            );
        }

        #[test]
        fn single_arm() {
            let snapshot = LandmarkSnapshot::default()
                .with(LeftShoulder, 120.0, 60.0)
                .unwrap()
                .with(LeftElbow, 130.0, 90.0)
                .unwrap()
                .with(LeftWrist, 135.0, 120.0)
                .unwrap();
            let overlay = Overlay::build(&snapshot, &CanvasTransform::default()).unwrap();
            let edges = overlay
                .segments()
                .iter()
                .map(|segment| segment.edge)
                .collect::<Vec<_>>();
            assert_eq!(
                edges,
                vec![
                    Edge::Bone(LeftShoulder, LeftElbow),
                    Edge::Bone(LeftElbow, LeftWrist)
                ]
            );
        }

        #[test]
        fn neck_joins_midpoints() {
            let snapshot = LandmarkSnapshot::default()
                .with(LeftEye, 100.0, 50.0)
                .unwrap()
                .with(RightEye, 120.0, 50.0)
                .unwrap()
                .with(LeftShoulder, 90.0, 150.0)
                .unwrap()
                .with(RightShoulder, 130.0, 150.0)
                .unwrap();
            let overlay = Overlay::build(&snapshot, &CanvasTransform::default()).unwrap();
            // neck, eyes and the shoulder line
            assert_eq!(overlay.len(), 3);

            let neck = overlay.segments()[0];
            assert_eq!(neck.edge, Edge::Neck);
            assert_approx_eq!(neck.start_x, 110.0 * 3.3 - 250.0, 1e-3);
            assert_approx_eq!(neck.start_y, 50.0 * 3.3, 1e-3);
            assert_approx_eq!(neck.end_x, 110.0 * 3.3 - 250.0, 1e-3);
            assert_approx_eq!(neck.end_y, 150.0 * 3.3, 1e-3);

            let eyes = overlay.segments()[1];
            assert_eq!(eyes.edge, Edge::Eyes);
            assert_approx_eq!(eyes.start_x, 100.0 * 3.3 - 250.0, 1e-3);
            assert_approx_eq!(eyes.end_x, 120.0 * 3.3 - 250.0, 1e-3);

            assert_eq!(
                overlay.segments()[2].edge,
                Edge::Bone(LeftShoulder, RightShoulder)
            );
        }

        #[test]
        fn eyes_need_both_shoulders() {
            let snapshot = LandmarkSnapshot::default()
                .with(LeftEye, 100.0, 50.0)
                .unwrap()
                .with(RightEye, 120.0, 50.0)
                .unwrap()
                .with(LeftShoulder, 90.0, 150.0)
                .unwrap();
            let overlay = Overlay::build(&snapshot, &CanvasTransform::default()).unwrap();
            assert!(overlay.is_empty(), "{:?}", overlay);
            assert!(Edge::Eyes.touches(RightShoulder));
        }

        #[test]
        fn absent_landmark_removes_its_edges() {
            let figure = standing_figure();
            for i in 0..NUM_LANDMARKS {
                let missing = LandmarkKind::from_idx(i).unwrap();
                let mut snapshot = LandmarkSnapshot::default();
                for landmark in figure.landmarks().unwrap() {
                    if landmark.kind != missing {
                        snapshot.insert(landmark.kind, landmark.point).unwrap();
                    }
                }

                let overlay = Overlay::build(&snapshot, &CanvasTransform::default()).unwrap();
                assert!(
                    overlay.segments().iter().all(|s| !s.edge.touches(missing)),
                    "{:?} is absent but still drawn",
                    missing
                );

                let full = Overlay::build(&figure, &CanvasTransform::default()).unwrap();
                let expected = full
                    .segments()
                    .iter()
                    .filter(|s| !s.edge.touches(missing))
                    .count();
                assert_eq!(overlay.len(), expected, "{:?}", missing);
            }
        }

        #[test]
        fn every_edge_needs_both_endpoints() {
            for &(a, b) in constants::EAR_SHOULDER_EDGES
                .iter()
                .chain(constants::SKELETON_EDGES.iter())
            {
                let both = LandmarkSnapshot::default()
                    .with(a, 1.0, 2.0)
                    .unwrap()
                    .with(b, 3.0, 4.0)
                    .unwrap();
                let overlay = Overlay::build(&both, &CanvasTransform::default()).unwrap();
                assert!(overlay
                    .segments()
                    .iter()
                    .any(|s| s.edge == Edge::Bone(a, b)));

                for &present in &[a, b] {
                    let one = LandmarkSnapshot::default().with(present, 1.0, 2.0).unwrap();
                    let overlay = Overlay::build(&one, &CanvasTransform::default()).unwrap();
                    assert!(overlay.is_empty(), "{:?} alone drew {:?}", present, overlay);
                }
            }
        }
    }
}
