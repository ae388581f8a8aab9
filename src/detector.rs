//! Boundary with the external pose detector.
//!
//! The detector delivers one [`DetectorEvent`] per camera frame. Every event
//! owns the [`FrameResource`] of its frame, which must be released before the
//! next frame is submitted.

use crate::{
    error::Error,
    point::Point,
    pose::{LandmarkKind, LandmarkSnapshot},
};
use crossbeam::channel::{self, Sender};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::{debug, trace, warn};

type ReleaseFn = Box<dyn FnOnce(u64) + Send>;

/// Handle to the camera buffer a frame was decoded from.
///
/// Released exactly once: explicitly through [`FrameResource::release`] or
/// implicitly on drop.
pub(crate) struct FrameResource {
    id: u64,
    on_release: Option<ReleaseFn>,
}

impl FrameResource {
    pub(crate) fn new<F>(id: u64, on_release: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        Self {
            id,
            on_release: Some(Box::new(on_release)),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(on_release) = self.on_release.take() {
            trace!(message = "releasing frame", id = self.id);
            on_release(self.id);
        }
    }
}

impl Drop for FrameResource {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for FrameResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameResource")
            .field("id", &self.id)
            .field("released", &self.on_release.is_none())
            .finish()
    }
}

/// Completion of the detector for one frame.
#[derive(Debug)]
pub(crate) enum DetectorEvent {
    Detected {
        frame: FrameResource,
        snapshot: LandmarkSnapshot,
    },
    Failed {
        frame: FrameResource,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    x: f32,
    y: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Record {
    Detected {
        #[serde(default)]
        frame: Option<u64>,
        landmarks: HashMap<LandmarkKind, RawPoint>,
    },
    Failed {
        #[serde(default)]
        frame: Option<u64>,
        error: String,
    },
}

/// Result of decoding one replay line: the frame id and either the landmarks
/// or the reason detection failed.
pub(crate) type ReplayFrame = (u64, Result<LandmarkSnapshot, String>);

fn decode_line(line: &str, line_number: usize) -> ReplayFrame {
    let fallback_id = line_number as u64;
    match serde_json::from_str::<Record>(line) {
        Ok(Record::Detected { frame, landmarks }) => {
            let id = frame.unwrap_or(fallback_id);
            let snapshot = landmarks.into_iter().try_fold(
                LandmarkSnapshot::default(),
                |mut snapshot, (kind, RawPoint { x, y })| {
                    snapshot.insert(kind, Point::new(x, y)?)?;
                    Ok::<_, Error>(snapshot)
                },
            );
            (id, snapshot.map_err(|e| e.to_string()))
        }
        Ok(Record::Failed { frame, error }) => (frame.unwrap_or(fallback_id), Err(error)),
        Err(error) => (fallback_id, Err(format!("malformed landmark record: {}", error))),
    }
}

/// Landmark frames replayed from JSON lines, one frame per line.
pub(crate) struct ReplaySource<R> {
    reader: R,
    line_number: usize,
}

impl<R> ReplaySource<R>
where
    R: BufRead,
{
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }

    /// Decode the next non-blank line, or `None` at end of input.
    pub(crate) fn next_frame(&mut self) -> Result<Option<ReplayFrame>, Error> {
        let mut line = String::new();
        loop {
            line.clear();
            self.line_number += 1;
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| Error::ReadReplayLine(e, self.line_number))?;
            if read == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                return Ok(Some(decode_line(line.trim(), self.line_number)));
            }
        }
    }
}

/// Open a replay file; `-` reads standard input.
pub(crate) fn open<P>(path: P) -> Result<ReplaySource<Box<dyn BufRead + Send>>, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(path).map_err(|e| Error::OpenReplay(e, path.to_path_buf()))?;
        Box::new(BufReader::new(file))
    };
    Ok(ReplaySource::new(reader))
}

/// Feed replayed frames to the analysis worker, one at a time.
///
/// A frame is only submitted once the previous frame's resource has been
/// released. Returns the number of frames submitted.
pub(crate) fn run_source<R>(
    mut source: ReplaySource<R>,
    events: &Sender<DetectorEvent>,
    running: &AtomicBool,
) -> Result<usize, Error>
where
    R: BufRead,
{
    let (released_tx, released_rx) = channel::bounded(1);
    let mut submitted = 0;

    while running.load(Ordering::SeqCst) {
        let (id, outcome) = match source.next_frame()? {
            Some(frame) => frame,
            None => break,
        };

        let released_tx = released_tx.clone();
        let frame = FrameResource::new(id, move |id| {
            // the source only waits for the frame it just submitted
            let _ = released_tx.send(id);
        });

        let event = match outcome {
            Ok(snapshot) => {
                debug!(message = "detected", id, landmarks = snapshot.present());
                DetectorEvent::Detected { frame, snapshot }
            }
            Err(reason) => {
                warn!(message = "detection failed", id, %reason);
                DetectorEvent::Failed { frame, reason }
            }
        };

        events.send(event).map_err(|_| Error::SendDetectorEvent)?;
        submitted += 1;

        if released_rx.recv().is_err() {
            break;
        }
    }

    Ok(submitted)
}
