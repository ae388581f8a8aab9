use crate::{
    config::Config,
    error::Error,
    overlay::{CanvasTransform, Overlay},
    pose::LandmarkSnapshot,
    posture::{PostureMatcher, PostureReport},
};
use std::time::{Duration, Instant};
use tracing::{instrument, trace, Level};

pub(crate) struct Engine {
    matcher: PostureMatcher,
    transform: CanvasTransform,
    timing: Timing,
    frame_num: usize,
}

#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Timing {
    pub(crate) analysis: Duration,
}

/// Everything the UI needs to show one analyzed frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FrameAnalysis {
    pub(crate) frame_id: u64,
    pub(crate) report: PostureReport,
    pub(crate) text: String,
    pub(crate) overlay: Overlay,
}

impl FrameAnalysis {
    pub(crate) fn verdict(&self) -> bool {
        self.report.verdict
    }
}

impl Engine {
    pub(crate) fn new(matcher: PostureMatcher, transform: CanvasTransform) -> Self {
        Self {
            matcher,
            transform,
            timing: Default::default(),
            frame_num: 0,
        }
    }

    pub(crate) fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(config.matcher()?, config.transform()?))
    }

    /// Measure, match and build the overlay for one snapshot.
    ///
    /// Nothing is shared with earlier frames: a failure leaves no trace in
    /// the next analysis.
    #[instrument(name = "Engine::analyze", skip(self, snapshot), level = "debug")]
    pub(crate) fn analyze(
        &mut self,
        frame_id: u64,
        snapshot: &LandmarkSnapshot,
    ) -> Result<FrameAnalysis, Error> {
        let start = Instant::now();
        if tracing::enabled!(Level::TRACE) {
            let landmarks = snapshot
                .landmarks()?
                .into_iter()
                .map(|landmark| (landmark.kind, landmark.point.x(), landmark.point.y()))
                .collect::<Vec<_>>();
            trace!(?landmarks);
        }

        let report = self.matcher.evaluate(snapshot)?;
        let overlay = Overlay::build(snapshot, &self.transform)?;
        let text = report.text();

        self.timing.analysis += start.elapsed();
        self.frame_num += 1;

        Ok(FrameAnalysis {
            frame_id,
            report,
            text,
            overlay,
        })
    }

    pub(crate) fn timing(&self) -> Timing {
        self.timing
    }

    pub(crate) fn frame_num(&self) -> usize {
        self.frame_num
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(PostureMatcher::default(), CanvasTransform::default())
    }
}
