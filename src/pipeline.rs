use crate::{
    detector::DetectorEvent,
    engine::{Engine, FrameAnalysis},
    error::Error,
    ui::Notice,
};
use crossbeam::{
    atomic::AtomicCell,
    channel::{self, Receiver, Sender, TrySendError},
};
use indicatif::ProgressBar;
use num_traits::ToPrimitive;
use std::sync::Arc;
use tracing::{error, trace, warn};

type Slot = Arc<AtomicCell<Option<FrameAnalysis>>>;

/// Single-slot hand-off of the latest analysis to the UI thread.
///
/// Publishing never blocks: an analysis the UI has not picked up yet is
/// replaced by the newer one.
pub(crate) struct FramePublisher {
    slot: Slot,
    ready: Sender<()>,
}

/// UI side of the frame slot.
pub(crate) struct FrameSubscriber {
    slot: Slot,
    ready: Receiver<()>,
}

pub(crate) fn frame_slot() -> (FramePublisher, FrameSubscriber) {
    let slot = Slot::default();
    let (tx, rx) = channel::bounded(1);
    (
        FramePublisher {
            slot: slot.clone(),
            ready: tx,
        },
        FrameSubscriber { slot, ready: rx },
    )
}

impl FramePublisher {
    pub(crate) fn publish(&self, analysis: FrameAnalysis) -> Result<(), Error> {
        if let Some(stale) = self.slot.swap(Some(analysis)) {
            trace!(message = "replacing unconsumed frame", id = stale.frame_id);
        }
        match self.ready.try_send(()) {
            // a wake-up is already pending for the slot
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Disconnected(())) => Err(Error::PublishAnalysis),
        }
    }
}

impl FrameSubscriber {
    /// Fires once per publish that found no pending wake-up; closes when the
    /// publisher is dropped.
    pub(crate) fn ready(&self) -> &Receiver<()> {
        &self.ready
    }

    /// The latest published analysis, if it has not been taken yet.
    pub(crate) fn take(&self) -> Option<FrameAnalysis> {
        self.slot.swap(None)
    }

    #[cfg(test)]
    pub(crate) fn recv(&self) -> Option<FrameAnalysis> {
        self.ready.recv().ok()?;
        self.take()
    }
}

/// What one detector event produced for the UI.
#[derive(Debug, Default)]
pub(crate) struct Handled {
    pub(crate) analysis: Option<FrameAnalysis>,
    pub(crate) notice: Option<Notice>,
}

/// Process a single detector event.
///
/// The frame resource is released on every path; errors become notices
/// rather than propagating.
pub(crate) fn handle_event(engine: &mut Engine, event: DetectorEvent) -> Handled {
    match event {
        DetectorEvent::Detected { frame, snapshot } => {
            let id = frame.id();
            frame.release();
            match engine.analyze(id, &snapshot) {
                Ok(analysis) => Handled {
                    notice: if analysis.verdict() {
                        Some(Notice::PostureMatched)
                    } else {
                        None
                    },
                    analysis: Some(analysis),
                },
                Err(e) => {
                    error!(message = "frame analysis failed", id, error = %e);
                    Handled {
                        analysis: None,
                        notice: Some(Notice::PipelineFailed(e.to_string())),
                    }
                }
            }
        }
        DetectorEvent::Failed { frame, reason } => {
            warn!(message = "skipping frame", id = frame.id(), %reason);
            drop(frame);
            Handled {
                analysis: None,
                notice: Some(Notice::DetectionFailed(reason)),
            }
        }
    }
}

fn progress_message(engine: &Engine) -> Result<String, Error> {
    let frames = engine.frame_num().to_f64().ok_or(Error::ConvertToF64)?;
    Ok(format!(
        "frames: {}, analysis fps: {:.1}",
        engine.frame_num(),
        frames / engine.timing().analysis.as_secs_f64()
    ))
}

/// Analyze detector events until the detector side hangs up.
pub(crate) fn run_worker(
    engine: &mut Engine,
    events: &Receiver<DetectorEvent>,
    publisher: &FramePublisher,
    notices: &Sender<Notice>,
    progress: Option<&ProgressBar>,
) -> Result<(), Error> {
    while let Ok(event) = events.recv() {
        let Handled { analysis, notice } = handle_event(engine, event);

        if let Some(notice) = notice {
            notices.send(notice).map_err(|_| Error::SendNotice)?;
        }

        if let Some(analysis) = analysis {
            publisher.publish(analysis)?;
            if let Some(progress) = progress {
                progress.set_message(progress_message(engine)?);
                progress.inc(1);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        detector::{run_source, FrameResource, ReplaySource},
        overlay::CanvasTransform,
        pose::{testing::standing_figure, LandmarkKind::*, LandmarkSnapshot},
        posture::{default_ranges, PostureMatcher, RangeCheck},
        surface::{RecordingSurface, Stroke},
        ui::{run_ui, UiState},
    };
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    fn tracked_frame(id: u64) -> (FrameResource, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let inner = released.clone();
        let frame = FrameResource::new(id, move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (frame, released)
    }

    fn single_arm() -> LandmarkSnapshot {
        LandmarkSnapshot::default()
            .with(LeftShoulder, 120.0, 60.0)
            .unwrap()
            .with(LeftElbow, 130.0, 90.0)
            .unwrap()
            .with(LeftWrist, 135.0, 120.0)
            .unwrap()
    }

    mod frame_slot_tests {
        use super::*;

        #[test]
        fn latest_frame_wins() {
            let mut engine = Engine::default();
            let (publisher, rx) = frame_slot();
            for id in 0..3 {
                publisher
                    .publish(engine.analyze(id, &single_arm()).unwrap())
                    .unwrap();
            }
            assert_eq!(rx.recv().unwrap().frame_id, 2);
            assert!(rx.take().is_none());
            assert!(rx.ready().is_empty());
        }

        #[test]
        fn frame_published_after_pickup_is_delivered() {
            let mut engine = Engine::default();
            let (publisher, rx) = frame_slot();
            publisher
                .publish(engine.analyze(0, &single_arm()).unwrap())
                .unwrap();
            assert_eq!(rx.recv().unwrap().frame_id, 0);
            publisher
                .publish(engine.analyze(1, &single_arm()).unwrap())
                .unwrap();
            assert_eq!(rx.recv().unwrap().frame_id, 1);
        }

        #[test]
        fn closed_ui_fails_publish() {
            let mut engine = Engine::default();
            let (publisher, rx) = frame_slot();
            drop(rx);
            assert!(matches!(
                publisher.publish(engine.analyze(0, &single_arm()).unwrap()),
                Err(Error::PublishAnalysis)
            ));
        }

        #[test]
        fn worker_stops_when_ui_is_gone() {
            let (events_tx, events_rx) = channel::bounded(1);
            let (publisher, frames_rx) = frame_slot();
            let (notices_tx, _notices_rx) = channel::unbounded();
            drop(frames_rx);

            let (frame, released) = tracked_frame(0);
            events_tx
                .send(DetectorEvent::Detected {
                    frame,
                    snapshot: single_arm(),
                })
                .unwrap();
            drop(events_tx);

            let mut engine = Engine::default();
            assert!(matches!(
                run_worker(&mut engine, &events_rx, &publisher, &notices_tx, None),
                Err(Error::PublishAnalysis)
            ));
            assert_eq!(released.load(Ordering::SeqCst), 1);
        }
    }

    mod handle_event_tests {
        use super::*;

        #[test]
        fn detected_frame_is_released_and_analyzed() {
            let mut engine = Engine::default();
            let (frame, released) = tracked_frame(5);
            let handled = handle_event(
                &mut engine,
                DetectorEvent::Detected {
                    frame,
                    snapshot: single_arm(),
                },
            );
            assert_eq!(released.load(Ordering::SeqCst), 1);
            let analysis = handled.analysis.unwrap();
            assert_eq!(analysis.frame_id, 5);
            assert_eq!(analysis.text.lines().count(), 1);
            assert_eq!(analysis.overlay.len(), 2);
            assert_eq!(handled.notice, None);
        }

        #[test]
        fn empty_frame_is_silent() {
            let mut engine = Engine::default();
            let (frame, released) = tracked_frame(0);
            let handled = handle_event(
                &mut engine,
                DetectorEvent::Detected {
                    frame,
                    snapshot: LandmarkSnapshot::default(),
                },
            );
            assert_eq!(released.load(Ordering::SeqCst), 1);
            let analysis = handled.analysis.unwrap();
            assert!(analysis.text.is_empty());
            assert!(analysis.overlay.is_empty());
            assert_eq!(handled.notice, None);
        }

        #[test]
        fn matching_posture_notifies() {
            let matcher =
                PostureMatcher::new(&default_ranges(), RangeCheck::EitherBound, false).unwrap();
            let mut engine = Engine::new(matcher, CanvasTransform::default());
            let (frame, _) = tracked_frame(0);
            let handled = handle_event(
                &mut engine,
                DetectorEvent::Detected {
                    frame,
                    snapshot: standing_figure(),
                },
            );
            assert_eq!(handled.notice, Some(Notice::PostureMatched));
        }

        #[test]
        fn analysis_error_becomes_notice() {
            let snapshot = LandmarkSnapshot::default()
                .with(LeftShoulder, f32::INFINITY, 0.0)
                .unwrap()
                .with(LeftElbow, f32::INFINITY, 0.0)
                .unwrap()
                .with(LeftWrist, 1.0, 1.0)
                .unwrap();
            let mut engine = Engine::default();
            let (frame, released) = tracked_frame(0);
            let handled = handle_event(&mut engine, DetectorEvent::Detected { frame, snapshot });
            assert_eq!(released.load(Ordering::SeqCst), 1);
            assert!(handled.analysis.is_none());
            assert!(matches!(handled.notice, Some(Notice::PipelineFailed(_))));
        }

        #[test]
        fn detector_failure_keeps_previous_frame() {
            let mut engine = Engine::default();
            let mut state = UiState::new(RecordingSurface::new(640, 480), Stroke::default());

            let (frame, _) = tracked_frame(0);
            let handled = handle_event(
                &mut engine,
                DetectorEvent::Detected {
                    frame,
                    snapshot: single_arm(),
                },
            );
            state.apply(handled.analysis.unwrap()).unwrap();
            let report = state.report().to_owned();
            let segments = state.surface().segments().to_vec();

            let (frame, released) = tracked_frame(1);
            let handled = handle_event(
                &mut engine,
                DetectorEvent::Failed {
                    frame,
                    reason: "camera unplugged".to_owned(),
                },
            );
            assert_eq!(released.load(Ordering::SeqCst), 1);
            assert!(handled.analysis.is_none());
            state.notify(handled.notice.unwrap());

            assert_eq!(state.report(), report);
            assert_eq!(state.surface().segments(), segments.as_slice());
            assert_eq!(
                state.notices(),
                &[Notice::DetectionFailed("camera unplugged".to_owned())]
            );
        }
    }

    #[test]
    fn replay_through_all_threads() {
        let replay = concat!(
            r#"{"frame": 1, "landmarks": {"left_eye": {"x": 100, "y": 50}, "right_eye": {"x": 120, "y": 50}, "left_shoulder": {"x": 90, "y": 150}, "right_shoulder": {"x": 130, "y": 150}}}"#,
            "\n",
            r#"{"frame": 2, "error": "blurry"}"#,
            "\n",
            r#"{"frame": 3, "landmarks": {"left_shoulder": {"x": 120, "y": 60}, "left_elbow": {"x": 130, "y": 90}, "left_wrist": {"x": 135, "y": 120}}}"#,
            "\n",
        );
        let running = AtomicBool::new(true);
        let (events_tx, events_rx) = channel::bounded(1);
        let (publisher, frames_rx) = frame_slot();
        let (notices_tx, notices_rx) = channel::unbounded();
        let mut state = UiState::new(RecordingSurface::new(640, 480), Stroke::default());
        let mut reports = Vec::new();

        crossbeam::thread::scope(|scope| {
            scope.spawn(|_| {
                run_source(ReplaySource::new(replay.as_bytes()), &events_tx, &running).unwrap();
                drop(events_tx);
            });
            scope.spawn(move |_| {
                let mut engine = Engine::default();
                run_worker(&mut engine, &events_rx, &publisher, &notices_tx, None).unwrap();
            });
            run_ui(&mut state, &frames_rx, &notices_rx, |id, report| {
                reports.push((id, report.to_owned()))
            });
        })
        .unwrap();

        // the slot may have replaced frame 1 before the ui picked it up
        assert_eq!(reports.last().map(|(id, _)| *id), Some(3));
        assert_eq!(state.frame_id(), Some(3));
        assert_eq!(state.report().lines().count(), 1);
        assert!(state.report().ends_with(" left arm\n"));
        assert_eq!(state.surface().segments().len(), 2);
        assert_eq!(
            state.notices(),
            &[Notice::DetectionFailed("blurry".to_owned())]
        );
    }
}
