use crate::{posture::Joint, pose::LandmarkKind};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("failed to convert usize value to landmark kind: {0}")]
    ConvertUSizeToLandmarkKind(usize),

    #[error("failed to convert landmark variant to usize: {0:?}")]
    LandmarkVariantToUSize(LandmarkKind),

    #[error("angle for joint {0:?} is not finite: {1}")]
    NonFiniteAngle(Joint, f64),

    #[error("no posture range configured for joint {0:?}")]
    MissingRange(Joint),

    #[error("more than one posture range configured for joint {0:?}")]
    DuplicateRange(Joint),

    #[error("joint {0:?} is not a ranged joint")]
    UnrangedJoint(Joint),

    #[error("invalid posture range for joint {joint:?}: low {low} is greater than high {high}")]
    InvalidRange { joint: Joint, low: f64, high: f64 },

    #[error("canvas transform scale must be non-zero, got ({0}, {1})")]
    DegenerateTransform(f32, f32),

    #[error("stroke width must be positive, got {0}")]
    InvalidStrokeWidth(f32),

    #[error("failed to read configuration file: {1:?}")]
    ReadConfig(#[source] std::io::Error, PathBuf),

    #[error("failed to parse configuration file: {1:?}")]
    ParseConfig(#[source] toml::de::Error, PathBuf),

    #[error("failed to serialize configuration")]
    SerializeConfig(#[source] toml::ser::Error),

    #[error("failed to write configuration file: {1:?}")]
    WriteConfig(#[source] std::io::Error, PathBuf),

    #[error("failed to open landmark replay file: {1:?}")]
    OpenReplay(#[source] std::io::Error, PathBuf),

    #[error("failed to read landmark replay line {1}")]
    ReadReplayLine(#[source] std::io::Error, usize),

    #[error("failed to send detector event: analysis worker is gone")]
    SendDetectorEvent,

    #[error("failed to publish frame analysis: ui thread is gone")]
    PublishAnalysis,

    #[error("failed to send notice: ui thread is gone")]
    SendNotice,

    #[error("failed to convert value to f64")]
    ConvertToF64,

    #[cfg(feature = "gui")]
    #[error("failed to convert canvas dimension {1} to i32")]
    ConvertDimension(#[source] std::num::TryFromIntError, u32),

    #[cfg(feature = "gui")]
    #[error("failed to allocate overlay canvas")]
    AllocateCanvas(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to draw line")]
    DrawLine(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to show image")]
    ImShow(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to wait for key press")]
    WaitKey(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to convert Point2f {0:?} to Point2i")]
    ConvertPoint2fToPoint2i(opencv::core::Point2f),
}
