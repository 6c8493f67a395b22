use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{EventRecorder, EventRow, InattentionEvent};
use crate::frame::Frame;
use crate::scorer;
use crate::segment::{self, Summary};
use crate::tracker::StateTracker;
use crate::Monitoring;

const PROGRESS_EVERY: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub frame_index: u64,
    pub processed: u64,
    pub recorded: usize,
}

/// Everything a run produced. Valid whether the stream ended or was cancelled.
#[derive(Debug, Clone)]
pub struct Report {
    pub events: Vec<InattentionEvent>,
    pub summary: Summary,
    pub processed_frames: u64,
    pub cancelled: bool,
}

impl Report {
    pub fn rows(&self) -> Vec<EventRow> {
        self.events.iter().map(InattentionEvent::row).collect()
    }
}

/// Single-threaded, frame-sequential pipeline: tracker update and scoring per
/// observation, then conditional recording.
pub struct AttentionMonitor {
    config: Config,
    fps: f64,
    tracker: StateTracker,
    recorder: EventRecorder,
    last_frame: Option<u64>,
    processed: u64,
}

impl AttentionMonitor {
    pub fn new(config: Config, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(Error::InvalidFrameRate(fps));
        }

        config.validate()?;

        Ok(Self {
            tracker: StateTracker::with_config(&config),
            recorder: EventRecorder::new(config.attention_score_threshold),
            config,
            fps,
            last_frame: None,
            processed: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    #[inline]
    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    #[inline]
    pub fn processed_frames(&self) -> u64 {
        self.processed
    }

    fn progress(&self, frame_index: u64) -> Progress {
        Progress {
            frame_index,
            processed: self.processed,
            recorded: self.recorder.len(),
        }
    }

    /// Consumes frames until the stream ends or `stop` is raised. The flag is
    /// checked between frames, so recorded events are never left half-written.
    ///
    /// Returns `true` when the run was cancelled.
    pub fn run<I, F>(&mut self, frames: I, stop: &AtomicBool, mut on_progress: F) -> bool
    where
        I: IntoIterator<Item = Frame>,
        F: FnMut(Progress),
    {
        info!(
            "processing stream at {:.2} fps, stride {}",
            self.fps,
            self.config.frame_stride()
        );

        let mut cancelled = false;
        let mut last_index = 0;

        for frame in frames {
            if stop.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            let before = self.processed;
            if let Err(err) = self.update(&frame) {
                warn!("skipping frame: {}", err);
                continue;
            }

            last_index = frame.index;
            if self.processed != before && self.processed % PROGRESS_EVERY == 0 {
                on_progress(self.progress(frame.index));
            }
        }

        on_progress(self.progress(last_index));

        info!(
            "{} after {} processed frames, {} events recorded",
            if cancelled { "cancelled" } else { "finished" },
            self.processed,
            self.recorder.len()
        );

        cancelled
    }

    pub fn into_report(self, cancelled: bool) -> Report {
        let summary = segment::summarize(self.recorder.events());

        Report {
            events: self.recorder.into_events(),
            summary,
            processed_frames: self.processed,
            cancelled,
        }
    }
}

impl Monitoring for AttentionMonitor {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        if let Some(last) = self.last_frame {
            if frame.index <= last {
                return Err(Error::FrameOutOfOrder {
                    last,
                    got: frame.index,
                });
            }
        }

        self.last_frame = Some(frame.index);

        if frame.index % self.config.frame_stride() != 0 {
            return Ok(());
        }

        self.tracker.advance(frame.time_secs(self.fps));

        // timers step by 1/fps per processed frame, skipped frames are not counted
        for obs in frame.iter() {
            let assessment = scorer::score(
                &obs.keypoints,
                obs.bbox.height() as f32,
                &self.config,
                &mut self.tracker,
                obs.track_id,
                self.fps,
            );

            self.recorder
                .record(obs.track_id, frame.index, self.fps, &assessment, obs.bbox);
        }

        self.processed += 1;

        Ok(())
    }

    #[inline]
    fn events(&self) -> &[InattentionEvent] {
        self.recorder.events()
    }

    #[inline]
    fn summary(&self) -> Summary {
        segment::summarize(self.recorder.events())
    }
}

/// A monitor running on its own thread. Progress arrives on a channel; the
/// run stops cooperatively once [`Worker::stop`] is called.
pub struct Worker {
    handle: JoinHandle<Report>,
    stop: Arc<AtomicBool>,
    progress: Receiver<Progress>,
}

impl Worker {
    pub fn spawn<I>(mut monitor: AttentionMonitor, frames: I) -> Self
    where
        I: IntoIterator<Item = Frame> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, progress) = mpsc::channel();

        let flag = stop.clone();
        let handle = thread::spawn(move || {
            let cancelled = monitor.run(frames, &flag, |p| {
                // receiver may be gone; progress is best-effort
                let _ = tx.send(p);
            });

            monitor.into_report(cancelled)
        });

        Self {
            handle,
            stop,
            progress,
        }
    }

    #[inline]
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    #[inline]
    pub fn progress(&self) -> &Receiver<Progress> {
        &self.progress
    }

    pub fn join(self) -> Result<Report> {
        self.handle.join().map_err(|_| Error::WorkerPanicked)
    }
}
