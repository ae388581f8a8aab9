use crate::{error::Error, point::Point};
use num_traits::{FromPrimitive, ToPrimitive};

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LandmarkKind {
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

pub(crate) const NUM_LANDMARKS: usize = 26;

impl LandmarkKind {
    pub(crate) fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::LandmarkVariantToUSize(self))
    }

    pub(crate) fn from_idx(index: usize) -> Result<Self, Error> {
        Self::from_usize(index).ok_or(Error::ConvertUSizeToLandmarkKind(index))
    }
}

/// A single detected landmark.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Landmark {
    pub(crate) kind: LandmarkKind,
    pub(crate) point: Point,
}

/// Every landmark the detector reported confidently for one frame.
///
/// Absent landmarks are `None`; nothing is carried over between frames.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct LandmarkSnapshot {
    points: [Option<Point>; NUM_LANDMARKS],
}

impl LandmarkSnapshot {
    pub(crate) fn insert(&mut self, kind: LandmarkKind, point: Point) -> Result<(), Error> {
        self.points[kind.idx()?] = Some(point);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn with(mut self, kind: LandmarkKind, x: f32, y: f32) -> Result<Self, Error> {
        self.insert(kind, Point::new(x, y)?)?;
        Ok(self)
    }

    pub(crate) fn get(&self, kind: LandmarkKind) -> Result<Option<Point>, Error> {
        Ok(self.points[kind.idx()?])
    }

    /// Number of landmarks present in the snapshot.
    pub(crate) fn present(&self) -> usize {
        self.points.iter().flatten().count()
    }

    pub(crate) fn landmarks(&self) -> Result<Vec<Landmark>, Error> {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(i, point)| point.map(|point| (i, point)))
            .map(|(i, point)| {
                Ok(Landmark {
                    kind: LandmarkKind::from_idx(i)?,
                    point,
                })
            })
            .collect()
    }
}

pub(crate) mod constants {
    use crate::pose::LandmarkKind::{self, *};

    /// Ear to shoulder segments, drawn alongside the neck angle they measure.
    pub(crate) const EAR_SHOULDER_EDGES: [(LandmarkKind, LandmarkKind); 2] =
        [(LeftEar, LeftShoulder), (RightEar, RightShoulder)];

    pub(crate) const SKELETON_EDGES: [(LandmarkKind, LandmarkKind); 24] = [
        (LeftShoulder, RightShoulder),
        (LeftHip, RightHip),
        // left side
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (LeftShoulder, LeftHip),
        (LeftHip, LeftKnee),
        (LeftKnee, LeftAnkle),
        (LeftWrist, LeftThumb),
        (LeftWrist, LeftPinky),
        (LeftWrist, LeftIndex),
        (LeftIndex, LeftPinky),
        (LeftAnkle, LeftHeel),
        (LeftHeel, LeftFootIndex),
        // right side
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (RightShoulder, RightHip),
        (RightHip, RightKnee),
        (RightKnee, RightAnkle),
        (RightWrist, RightThumb),
        (RightWrist, RightPinky),
        (RightWrist, RightIndex),
        (RightIndex, RightPinky),
        (RightAnkle, RightHeel),
        (RightHeel, RightFootIndex),
    ];
}
