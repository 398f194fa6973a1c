//! Fixed-rate playback driver.
//!
//! The driver owns no clock. The host passes `Instant`s in, which keeps the
//! timeline single-threaded and makes playback deterministic under test.

use crate::scene::SceneAdapter;
use crate::timeline::Timeline;
use crate::types::FrameNumber;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Playback {
    interval: Duration,
    running: bool,
    last_tick: Option<Instant>,
}

impl Playback {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            running: false,
            last_tick: None,
        }
    }

    /// Ticks at the timeline's configured frame rate.
    pub fn for_timeline<S: SceneAdapter>(timeline: &Timeline<S>) -> Self {
        Self::new(timeline.config().frame_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starting an already running driver keeps its phase.
    pub fn start(&mut self, now: Instant) {
        if self.running {
            return;
        }
        debug!(interval_ms = self.interval.as_millis() as u64, "playback started");
        self.running = true;
        self.last_tick = Some(now);
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        debug!("playback stopped");
        self.running = false;
        self.last_tick = None;
    }

    /// Steps to the next frame, wrapping from the last frame back to 1.
    pub fn tick<S: SceneAdapter>(&mut self, timeline: &mut Timeline<S>) -> FrameNumber {
        let next = if timeline.current_frame() >= timeline.total_frames() {
            1
        } else {
            timeline.current_frame() + 1
        };
        timeline.set_current_frame(next)
    }

    /// Advances at most one frame if an interval has elapsed since the last
    /// tick. A host that fell behind by several intervals resynchronises to
    /// `now` instead of replaying the backlog.
    pub fn poll<S: SceneAdapter>(&mut self, now: Instant, timeline: &mut Timeline<S>) -> bool {
        if !self.running {
            return false;
        }
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return false;
        };
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            return false;
        }
        self.last_tick = Some(if elapsed >= self.interval * 2 {
            now
        } else {
            last + self.interval
        });
        self.tick(timeline);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;

    fn timeline(total: u32) -> Timeline {
        Timeline::new(TimelineConfig {
            total_frames: total,
            fps: 10,
            ..TimelineConfig::default()
        })
    }

    #[test]
    fn tick_wraps_to_first_frame() {
        let mut tl = timeline(3);
        let mut playback = Playback::for_timeline(&tl);
        assert_eq!(playback.tick(&mut tl), 2);
        assert_eq!(playback.tick(&mut tl), 3);
        assert_eq!(playback.tick(&mut tl), 1);
    }

    #[test]
    fn poll_ticks_once_per_interval() {
        let mut tl = timeline(10);
        let mut playback = Playback::for_timeline(&tl);
        let t0 = Instant::now();

        assert!(!playback.poll(t0, &mut tl), "stopped driver never ticks");
        playback.start(t0);
        assert!(!playback.poll(t0 + Duration::from_millis(50), &mut tl));
        assert!(playback.poll(t0 + Duration::from_millis(100), &mut tl));
        assert_eq!(tl.current_frame(), 2);
        // Two intervals late: one tick, not two.
        assert!(playback.poll(t0 + Duration::from_millis(450), &mut tl));
        assert_eq!(tl.current_frame(), 3);
        assert!(!playback.poll(t0 + Duration::from_millis(500), &mut tl));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut tl = timeline(10);
        let mut playback = Playback::for_timeline(&tl);
        let t0 = Instant::now();
        playback.start(t0);
        playback.start(t0 + Duration::from_millis(90));
        assert!(playback.poll(t0 + Duration::from_millis(100), &mut tl));

        playback.stop();
        playback.stop();
        assert!(!playback.is_running());
        assert!(!playback.poll(t0 + Duration::from_secs(5), &mut tl));
        assert_eq!(tl.current_frame(), 2);
    }
}
