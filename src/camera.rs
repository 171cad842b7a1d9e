// Camera motion for marker clicks: zoom to street level, pan, then tilt.
// Completion is the first move/zoom-end notification or the fallback timer, whichever wins.
// Each run takes a generation; a run that is no longer current finishes without touching the camera.

use std::cell::Cell;

use futures_util::future::{join, select, Either, LocalBoxFuture};
use tracing::debug;

use crate::geo::LngLat;
use crate::sdk::{MapSurface, MotionEvent, Timer};
use crate::types::MotionSettings;

/// Identifies one `move_to` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MotionToken(u64);

/// How the wait for a motion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Event(MotionEvent),
    TimedOut,
}

/// Result of a `move_to` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// The map reported the end of the motion; tilt was applied.
    Arrived(MotionEvent),
    /// No notification arrived before the fallback timer.
    TimedOut,
    /// A newer run started (or the sequence was cancelled) before this one finished.
    Superseded,
}

impl MotionOutcome {
    pub fn is_current(&self) -> bool {
        !matches!(self, MotionOutcome::Superseded)
    }
}

/// Race a motion-end notification against a timer. Whichever loses is dropped,
/// which releases its subscription or timer.
pub async fn first_of(
    event: LocalBoxFuture<'static, MotionEvent>,
    timer: LocalBoxFuture<'static, ()>,
) -> Completion {
    match select(event, timer).await {
        Either::Left((ev, _)) => Completion::Event(ev),
        Either::Right(((), _)) => Completion::TimedOut,
    }
}

/// Camera sequencer: orchestrates zoom/pan/tilt and guards against stale completions.
pub struct CameraSequencer {
    settings: MotionSettings,
    generation: Cell<u64>,
}

impl CameraSequencer {
    pub fn new(settings: MotionSettings) -> Self {
        CameraSequencer {
            settings,
            generation: Cell::new(0),
        }
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    /// Start a new generation; every earlier token becomes stale.
    pub fn begin(&self) -> MotionToken {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        MotionToken(next)
    }

    /// Token of the most recent run.
    pub fn current(&self) -> MotionToken {
        MotionToken(self.generation.get())
    }

    pub fn is_current(&self, token: MotionToken) -> bool {
        self.generation.get() == token.0
    }

    /// Make any in-flight run finish as `Superseded`.
    pub fn cancel(&self) {
        self.begin();
    }

    /// Move the camera to `target` and wait for the motion to settle.
    ///
    /// Always completes: the fallback timer bounds the wait even if the map never
    /// reports the end of the motion.
    pub async fn move_to<M, T>(&self, map: &M, timer: &T, target: LngLat) -> MotionOutcome
    where
        M: MapSurface + ?Sized,
        T: Timer + ?Sized,
    {
        let token = self.begin();
        let s = &self.settings;

        map.enable_interaction();

        // Subscribe and arm the fallback before issuing any motion.
        let completion = first_of(map.motion_end(), timer.sleep(s.fallback_timeout_ms));

        let zoom_first = s.target_zoom_on_marker_click > map.zoom();
        let motion = async {
            if zoom_first {
                map.set_zoom(s.target_zoom_on_marker_click, Some(s.zoom_duration_ms));
                timer.sleep(s.settle_delay_ms).await;
                if !self.is_current(token) {
                    return;
                }
            }
            map.pan_to(target, s.pan_duration_ms);
        };

        let ((), completion) = join(motion, completion).await;

        if !self.is_current(token) {
            debug!(?token, "camera motion superseded");
            return MotionOutcome::Superseded;
        }

        match completion {
            Completion::Event(event) => {
                map.set_pitch(s.arrival_pitch, Some(s.arrival_pitch_duration_ms));
                MotionOutcome::Arrived(event)
            }
            Completion::TimedOut => {
                debug!(
                    timeout_ms = s.fallback_timeout_ms,
                    "no motion-end notification, continuing on fallback timer"
                );
                MotionOutcome::TimedOut
            }
        }
    }
}
