use crate::{
    engine::FrameAnalysis,
    error::Error,
    overlay::Overlay,
    pipeline::FrameSubscriber,
    surface::{OverlaySurface, Stroke},
};
use crossbeam::channel::{self, select, Receiver};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Short-lived message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notice {
    PostureMatched,
    DetectionFailed(String),
    PipelineFailed(String),
    SurfaceFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostureMatched => write!(f, "posture matched"),
            Self::DetectionFailed(reason) => write!(f, "detection failed: {}", reason),
            Self::PipelineFailed(reason) => write!(f, "error: {}", reason),
            Self::SurfaceFailed(reason) => write!(f, "overlay error: {}", reason),
        }
    }
}

/// State owned by the UI thread.
///
/// Only [`UiState::apply`] touches the overlay surface, and it always draws a
/// whole frame: clear, every segment, present.
pub(crate) struct UiState<S> {
    surface: S,
    stroke: Stroke,
    report: String,
    overlay: Overlay,
    frame_id: Option<u64>,
    notices: Vec<Notice>,
}

impl<S> UiState<S>
where
    S: OverlaySurface,
{
    pub(crate) fn new(surface: S, stroke: Stroke) -> Self {
        Self {
            surface,
            stroke,
            report: String::new(),
            overlay: Overlay::default(),
            frame_id: None,
            notices: Vec::new(),
        }
    }

    fn draw(&mut self, overlay: &Overlay) -> Result<(), Error> {
        self.surface.clear()?;
        for segment in overlay.segments() {
            self.surface.draw_segment(segment, &self.stroke)?;
        }
        self.surface.present()
    }

    pub(crate) fn apply(&mut self, analysis: FrameAnalysis) -> Result<(), Error> {
        if let Err(e) = self.draw(&analysis.overlay) {
            // never leave half a skeleton on screen
            self.overlay = Overlay::default();
            if let Err(error) = self.surface.clear() {
                error!(message = "failed to clear overlay after draw error", ?error);
            }
            return Err(e);
        }

        debug!(
            message = "applied frame",
            id = analysis.frame_id,
            segments = analysis.overlay.len()
        );
        self.report = analysis.text;
        self.overlay = analysis.overlay;
        self.frame_id = Some(analysis.frame_id);
        Ok(())
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        match notice {
            Notice::PostureMatched => info!(message = "notice", %notice),
            _ => warn!(message = "notice", %notice),
        }
        self.notices.push(notice);
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        self.overlay = Overlay::default();
        self.surface.resize(width, height)
    }

    pub(crate) fn report(&self) -> &str {
        &self.report
    }

    pub(crate) fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub(crate) fn frame_id(&self) -> Option<u64> {
        self.frame_id
    }

    pub(crate) fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub(crate) fn surface(&self) -> &S {
        &self.surface
    }
}

/// Apply frames and notices until both channels are closed.
///
/// `on_report` sees the report text of every frame that reached the screen.
pub(crate) fn run_ui<S, F>(
    state: &mut UiState<S>,
    frames: &FrameSubscriber,
    notices: &Receiver<Notice>,
    mut on_report: F,
) where
    S: OverlaySurface,
    F: FnMut(u64, &str),
{
    let mut frames_open = true;
    let mut notices_open = true;

    while frames_open || notices_open {
        let ready = if frames_open {
            frames.ready().clone()
        } else {
            channel::never()
        };
        let notices = if notices_open {
            notices.clone()
        } else {
            channel::never()
        };

        select! {
            recv(ready) -> signal => match signal {
                Ok(()) => {
                    // an earlier wake-up may already have taken this frame
                    if let Some(analysis) = frames.take() {
                        let id = analysis.frame_id;
                        match state.apply(analysis) {
                            Ok(()) => on_report(id, state.report()),
                            Err(e) => state.notify(Notice::SurfaceFailed(e.to_string())),
                        }
                    }
                }
                Err(_) => frames_open = false,
            },
            recv(notices) -> notice => match notice {
                Ok(notice) => state.notify(notice),
                Err(_) => notices_open = false,
            },
        }
    }
}
