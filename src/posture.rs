use crate::{
    angle::{angle_between, neck_angle},
    error::Error,
    pose::{LandmarkKind, LandmarkSnapshot},
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Joint {
    NeckLeft,
    NeckRight,
    ChestLeft,
    ChestRight,
    LegLeft,
    LegRight,
    ShoulderLeft,
    ShoulderRight,
    ArmLeft,
    ArmRight,
}

/// Landmarks an angle is measured from.
#[derive(Debug, Copy, Clone)]
enum Anchors {
    /// Inclination of ear over shoulder against the horizontal.
    Neck {
        ear: LandmarkKind,
        shoulder: LandmarkKind,
    },
    /// Angle at `mid` between `first` and `last`.
    Vertex {
        first: LandmarkKind,
        mid: LandmarkKind,
        last: LandmarkKind,
    },
}

impl Joint {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::NeckLeft => "left neck",
            Self::NeckRight => "right neck",
            Self::ChestLeft => "left chest",
            Self::ChestRight => "right chest",
            Self::LegLeft => "left leg",
            Self::LegRight => "right leg",
            Self::ShoulderLeft => "left shoulder",
            Self::ShoulderRight => "right shoulder",
            Self::ArmLeft => "left arm",
            Self::ArmRight => "right arm",
        }
    }

    /// Whether the joint takes part in the posture verdict.
    pub(crate) fn is_ranged(self) -> bool {
        !matches!(self, Self::ShoulderLeft | Self::ShoulderRight)
    }

    fn anchors(self) -> Anchors {
        use LandmarkKind::*;

        let vertex = |first, mid, last| Anchors::Vertex { first, mid, last };
        match self {
            Self::NeckLeft => Anchors::Neck {
                ear: LeftEar,
                shoulder: LeftShoulder,
            },
            Self::NeckRight => Anchors::Neck {
                ear: RightEar,
                shoulder: RightShoulder,
            },
            Self::ChestLeft => vertex(LeftShoulder, LeftHip, LeftKnee),
            Self::ChestRight => vertex(RightShoulder, RightHip, RightKnee),
            Self::LegLeft => vertex(LeftHip, LeftKnee, LeftAnkle),
            Self::LegRight => vertex(RightHip, RightKnee, RightAnkle),
            Self::ShoulderLeft => vertex(LeftElbow, LeftShoulder, LeftHip),
            Self::ShoulderRight => vertex(RightElbow, RightShoulder, RightHip),
            Self::ArmLeft => vertex(LeftShoulder, LeftElbow, LeftWrist),
            Self::ArmRight => vertex(RightShoulder, RightElbow, RightWrist),
        }
    }

    /// Measure this joint, or `None` when one of its landmarks is absent.
    pub(crate) fn measure(self, snapshot: &LandmarkSnapshot) -> Result<Option<Measurement>, Error> {
        let degrees = match self.anchors() {
            Anchors::Neck { ear, shoulder } => {
                match (snapshot.get(ear)?, snapshot.get(shoulder)?) {
                    (Some(ear), Some(shoulder)) => neck_angle(ear, shoulder),
                    _ => return Ok(None),
                }
            }
            Anchors::Vertex { first, mid, last } => {
                match (snapshot.get(first)?, snapshot.get(mid)?, snapshot.get(last)?) {
                    (Some(first), Some(mid), Some(last)) => angle_between(first, mid, last),
                    _ => return Ok(None),
                }
            }
        };

        if !degrees.is_finite() {
            return Err(Error::NonFiniteAngle(self, degrees));
        }

        Ok(Some(Measurement {
            joint: self,
            degrees,
        }))
    }
}

pub(crate) mod constants {
    use crate::posture::Joint::{self, *};

    /// Joints compared against a posture range, in range table order.
    pub(crate) const RANGED_JOINTS: [Joint; 8] = [
        NeckLeft, NeckRight, ChestLeft, ChestRight, LegLeft, LegRight, ArmLeft, ArmRight,
    ];

    pub(crate) const REPORT_ORDER: [Joint; 8] = [
        NeckLeft, NeckRight, ChestRight, ChestLeft, LegRight, LegLeft, ArmLeft, ArmRight,
    ];

    pub(crate) const REPORT_ORDER_WITH_SHOULDERS: [Joint; 10] = [
        NeckLeft,
        NeckRight,
        ChestRight,
        ChestLeft,
        LegRight,
        LegLeft,
        ShoulderLeft,
        ShoulderRight,
        ArmLeft,
        ArmRight,
    ];

    /// Reference posture bounds in degrees: (joint, low, high).
    pub(crate) const DEFAULT_RANGES: [(Joint, f64, f64); 8] = [
        (NeckLeft, 103.0, 109.0),
        (NeckRight, 61.0, 67.0),
        (ChestLeft, 169.0, 175.0),
        (ChestRight, 155.0, 161.0),
        (LegLeft, 167.0, 173.0),
        (LegRight, 149.0, 155.0),
        (ArmLeft, 35.0, 41.0),
        (ArmRight, 90.0, 96.0),
    ];
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Measurement {
    pub(crate) joint: Joint,
    pub(crate) degrees: f64,
}

impl Measurement {
    /// Degrees with the fractional part dropped, as shown and compared.
    pub(crate) fn whole_degrees(&self) -> f64 {
        self.degrees.trunc()
    }
}

/// How a measured angle is compared to its range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum RangeCheck {
    /// `low <= angle <= high`.
    Within,
    /// `angle >= low || angle <= high`, which holds for every angle whenever
    /// `low <= high`.
    EitherBound,
}

impl Default for RangeCheck {
    fn default() -> Self {
        Self::Within
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct PostureRange {
    pub(crate) joint: Joint,
    pub(crate) low: f64,
    pub(crate) high: f64,
}

impl PostureRange {
    pub(crate) fn accepts(&self, degrees: f64, check: RangeCheck) -> bool {
        match check {
            RangeCheck::Within => self.low <= degrees && degrees <= self.high,
            RangeCheck::EitherBound => degrees >= self.low || degrees <= self.high,
        }
    }
}

pub(crate) fn default_ranges() -> Vec<PostureRange> {
    constants::DEFAULT_RANGES
        .iter()
        .map(|&(joint, low, high)| PostureRange { joint, low, high })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PostureReport {
    pub(crate) measurements: Vec<Measurement>,
    pub(crate) verdict: bool,
}

impl PostureReport {
    /// One `"<degrees> <label>"` line per measurement, in report order.
    pub(crate) fn text(&self) -> String {
        let mut text = String::new();
        for measurement in &self.measurements {
            // writing to a String cannot fail
            let _ = writeln!(
                text,
                "{} {}",
                measurement.whole_degrees(),
                measurement.joint.label()
            );
        }
        text
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PostureMatcher {
    ranges: Vec<PostureRange>,
    check: RangeCheck,
    report_shoulders: bool,
}

impl PostureMatcher {
    pub(crate) fn new(
        ranges: &[PostureRange],
        check: RangeCheck,
        report_shoulders: bool,
    ) -> Result<Self, Error> {
        for range in ranges {
            if !range.joint.is_ranged() {
                return Err(Error::UnrangedJoint(range.joint));
            }
            if !(range.low <= range.high) {
                return Err(Error::InvalidRange {
                    joint: range.joint,
                    low: range.low,
                    high: range.high,
                });
            }
        }

        let ranges = constants::RANGED_JOINTS
            .iter()
            .map(|&joint| {
                let mut matching = ranges.iter().filter(|range| range.joint == joint);
                let range = matching.next().ok_or(Error::MissingRange(joint))?;
                if matching.next().is_some() {
                    return Err(Error::DuplicateRange(joint));
                }
                Ok(*range)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ranges,
            check,
            report_shoulders,
        })
    }

    fn report_order(&self) -> &'static [Joint] {
        if self.report_shoulders {
            &constants::REPORT_ORDER_WITH_SHOULDERS
        } else {
            &constants::REPORT_ORDER
        }
    }

    pub(crate) fn evaluate(&self, snapshot: &LandmarkSnapshot) -> Result<PostureReport, Error> {
        let mut measurements = Vec::with_capacity(self.report_order().len());
        for joint in self.report_order() {
            if let Some(measurement) = joint.measure(snapshot)? {
                measurements.push(measurement);
            }
        }

        let verdict = self.ranges.iter().all(|range| {
            measurements
                .iter()
                .find(|measurement| measurement.joint == range.joint)
                .map_or(false, |measurement| {
                    range.accepts(measurement.whole_degrees(), self.check)
                })
        });

        Ok(PostureReport {
            measurements,
            verdict,
        })
    }
}

impl Default for PostureMatcher {
    fn default() -> Self {
        Self {
            ranges: default_ranges(),
            check: RangeCheck::default(),
            report_shoulders: false,
        }
    }
}
