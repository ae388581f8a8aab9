use crate::{
    error::Error,
    overlay::CanvasTransform,
    posture::{default_ranges, PostureMatcher, PostureRange, RangeCheck},
    surface::Stroke,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) range_check: RangeCheck,
    pub(crate) report_shoulders: bool,
    pub(crate) stroke_width: f32,
    pub(crate) canvas: CanvasTransform,
    pub(crate) ranges: Vec<PostureRange>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            range_check: RangeCheck::default(),
            report_shoulders: false,
            stroke_width: Stroke::default().width,
            canvas: CanvasTransform::default(),
            ranges: default_ranges(),
        }
    }
}

impl Config {
    pub(crate) fn load<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| Error::ReadConfig(e, path.to_path_buf()))?;
        toml::from_str(&content).map_err(|e| Error::ParseConfig(e, path.to_path_buf()))
    }

    pub(crate) fn save<P>(&self, path: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(Error::SerializeConfig)?;
        fs::write(path, content).map_err(|e| Error::WriteConfig(e, path.to_path_buf()))
    }

    pub(crate) fn matcher(&self) -> Result<PostureMatcher, Error> {
        PostureMatcher::new(&self.ranges, self.range_check, self.report_shoulders)
    }

    pub(crate) fn stroke(&self) -> Result<Stroke, Error> {
        Stroke::new(self.stroke_width)
    }

    pub(crate) fn transform(&self) -> Result<CanvasTransform, Error> {
        self.canvas.validate()?;
        Ok(self.canvas)
    }
}
