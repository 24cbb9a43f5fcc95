// Live try-on session: capture lifecycle, inactivity timer, and per-frame painting.
// The host asks for the next frame only when the outcome says so; a stopped
// session lets the in-flight frame finish and then stops rescheduling.

use log::{debug, info};
use serde::Serialize;

use crate::error::EngineError;
use crate::host::Preview;
use crate::landmarks::PoseOutput;
use crate::render::{paint_overlay, Canvas};
use crate::timer::SessionTimer;
use crate::transform::OverlayTransform;
use crate::types::*;

/// Why a frame was shown without the garment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    NoOverlay,
    LandmarksUnavailable,
    LowConfidence,
    RenderFailed,
}

/// Result of processing one estimator result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum FrameOutcome {
    Painted { draw: DrawInstruction },
    Skipped { reason: SkipReason },
    /// The session is over; nothing was drawn.
    Stopped,
}

impl FrameOutcome {
    /// Whether the host should capture and estimate another frame.
    pub fn reschedule(&self) -> bool {
        !matches!(self, FrameOutcome::Stopped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Created,
    Running,
    Stopped,
}

/// Frame counters, logged when the session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub painted: u64,
    pub skipped: u64,
}

pub struct TryOnSession {
    id: SessionId,
    capture: CaptureSettings,
    timeout_ms: u64,
    policy: PreviewTimeout,
    transform: OverlayTransform,
    overlay: Option<OverlayItem>,
    timer: SessionTimer,
    state: SessionState,
    stats: FrameStats,
}

impl TryOnSession {
    pub fn new(id: SessionId, config: &EngineConfig) -> Self {
        TryOnSession {
            id,
            capture: config.capture.clone(),
            timeout_ms: config.timers.preview_timeout_ms,
            policy: config.timers.preview_policy,
            transform: OverlayTransform::new(config.overlay.clone()),
            overlay: None,
            timer: SessionTimer::new(),
            state: SessionState::Created,
            stats: FrameStats::default(),
        }
    }

    /// Start capture with the first overlay and arm the timeout.
    /// A session starts at most once.
    pub fn start<P: Preview + ?Sized>(&mut self, item: OverlayItem, now: Timestamp, preview: &mut P) {
        if self.state != SessionState::Created {
            return;
        }
        self.state = SessionState::Running;
        preview.start_capture(self.id, &self.capture);
        preview.load_overlay(Some(&item));
        info!("Live try-on started with {}", item.source_url);
        self.overlay = Some(item);
        self.timer.arm(now, self.timeout_ms, ());
    }

    /// Swap the garment. A new garment counts as activity unless the
    /// timeout is fixed; clearing it does not.
    pub fn set_overlay<P: Preview + ?Sized>(
        &mut self,
        item: Option<OverlayItem>,
        now: Timestamp,
        preview: &mut P,
    ) {
        if self.state != SessionState::Running {
            return;
        }
        preview.load_overlay(item.as_ref());
        match item {
            Some(item) => {
                debug!("Overlay set to {}", item.source_url);
                self.overlay = Some(item);
                if self.policy == PreviewTimeout::Inactivity {
                    self.timer.arm(now, self.timeout_ms, ());
                }
            }
            None => {
                debug!("Overlay cleared");
                self.overlay = None;
            }
        }
    }

    /// Record the decoded bitmap size of the current overlay. Reports for a
    /// bitmap that has since been swapped out are ignored.
    pub fn overlay_loaded(&mut self, source_url: &str, natural_width: f64, natural_height: f64) {
        match self.overlay.as_mut() {
            Some(item) if item.source_url == source_url => {
                item.natural_width = Some(natural_width);
                item.natural_height = Some(natural_height);
            }
            _ => debug!("Ignoring size of replaced overlay {}", source_url),
        }
    }

    /// Clear, draw the camera frame, and composite the garment if the torso is
    /// confidently located. Everything happens inside one save/restore.
    /// `frame` is the estimator input size, `size` the destination canvas.
    pub fn process_frame<C: Canvas + ?Sized>(
        &mut self,
        pose: &PoseOutput,
        frame: CanvasSize,
        size: CanvasSize,
        canvas: &mut C,
    ) -> Result<FrameOutcome, EngineError> {
        if self.state != SessionState::Running {
            return Ok(FrameOutcome::Stopped);
        }

        canvas.save();
        canvas.clear(size);
        let outcome = self.paint(pose, frame, size, canvas);
        canvas.restore();

        match &outcome {
            Ok(FrameOutcome::Painted { .. }) => self.stats.painted += 1,
            _ => self.stats.skipped += 1,
        }
        outcome
    }

    fn paint<C: Canvas + ?Sized>(
        &self,
        pose: &PoseOutput,
        frame: CanvasSize,
        size: CanvasSize,
        canvas: &mut C,
    ) -> Result<FrameOutcome, EngineError> {
        canvas.draw_camera_frame(size)?;

        let Some(item) = &self.overlay else {
            return Ok(FrameOutcome::Skipped {
                reason: SkipReason::NoOverlay,
            });
        };

        let torso = match pose.torso(frame) {
            Ok(torso) => torso,
            Err(_) => {
                debug!("Frame skipped: torso landmarks unavailable");
                return Ok(FrameOutcome::Skipped {
                    reason: SkipReason::LandmarksUnavailable,
                });
            }
        };

        match self.transform.compute(&torso, item, size) {
            Some(draw) => {
                paint_overlay(canvas, &draw)?;
                Ok(FrameOutcome::Painted { draw })
            }
            None => {
                debug!(
                    "Frame skipped: torso confidence {:.2} below threshold",
                    torso.min_confidence()
                );
                Ok(FrameOutcome::Skipped {
                    reason: SkipReason::LowConfidence,
                })
            }
        }
    }

    /// True once when the timeout expires.
    pub fn poll_timer(&mut self, now: Timestamp) -> bool {
        self.state == SessionState::Running && self.timer.poll(now).is_some()
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.timer.deadline()
    }

    /// Release capture and cancel the timer. Idempotent: returns false if the
    /// session was not running.
    pub fn stop<P: Preview + ?Sized>(&mut self, preview: &mut P) -> bool {
        if self.state != SessionState::Running {
            self.state = SessionState::Stopped;
            return false;
        }
        self.state = SessionState::Stopped;
        self.timer.disarm();
        self.overlay = None;
        preview.stop_capture();
        info!(
            "Live try-on stopped ({} frames painted, {} skipped)",
            self.stats.painted, self.stats.skipped
        );
        true
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn overlay(&self) -> Option<&OverlayItem> {
        self.overlay.as_ref()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
