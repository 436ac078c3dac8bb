use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SAMPLE_WINDOW;

/// Snapshot of frame pacing and render cost.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameReport {
    /// FPS implied by the most recent frame interval.
    pub fps: f64,
    /// FPS implied by the mean frame interval over the window.
    pub avg_fps: f64,
    pub avg_render_ms: f64,
    pub min_render_ms: f64,
    pub max_render_ms: f64,
    pub total_frames: u64,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FPS: {:.1} (Avg: {:.1}) | Render: {:.2}ms (Min: {:.2}ms, Max: {:.2}ms) | Frames: {}",
            self.fps,
            self.avg_fps,
            self.avg_render_ms,
            self.min_render_ms,
            self.max_render_ms,
            self.total_frames
        )
    }
}

/// Fixed-capacity window of durations; the oldest sample falls out first.
#[derive(Debug, Clone)]
struct SampleWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    fn mean_secs(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(Duration::as_secs_f64).sum();
        Some(total / self.samples.len() as f64)
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Measures frame cadence and render time over a sliding window.
///
/// Call [`begin_frame`](Self::begin_frame) once per paint, and bracket the
/// actual drawing with [`begin_render`](Self::begin_render) /
/// [`end_render`](Self::end_render). Derived metrics are refreshed on
/// `end_render`.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    frame_intervals: SampleWindow,
    render_times: SampleWindow,
    last_frame_start: Option<Instant>,
    render_start: Option<Instant>,
    total_frames: u64,
    min_render: Option<Duration>,
    max_render: Option<Duration>,
    current_fps: f64,
    average_fps: f64,
    average_render_ms: f64,
    good_fps: f64,
    acceptable_fps: f64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

impl FrameTimer {
    pub fn new(sample_window: usize) -> Self {
        let sample_window = if sample_window == 0 {
            warn!("Frame sample window of 0 requested; using 1");
            1
        } else {
            sample_window
        };
        Self {
            frame_intervals: SampleWindow::new(sample_window),
            render_times: SampleWindow::new(sample_window),
            last_frame_start: None,
            render_start: None,
            total_frames: 0,
            min_render: None,
            max_render: None,
            current_fps: 0.0,
            average_fps: 0.0,
            average_render_ms: 0.0,
            good_fps: 55.0,
            acceptable_fps: 25.0,
        }
    }

    /// Override the FPS levels behind [`is_good`](Self::is_good) and
    /// [`is_acceptable`](Self::is_acceptable).
    pub fn with_thresholds(mut self, good_fps: f64, acceptable_fps: f64) -> Self {
        self.good_fps = good_fps;
        self.acceptable_fps = acceptable_fps;
        self
    }

    pub fn begin_frame(&mut self) {
        self.begin_frame_at(Instant::now());
    }

    pub fn begin_frame_at(&mut self, now: Instant) {
        if let Some(last) = self.last_frame_start {
            self.frame_intervals.push(now.saturating_duration_since(last));
        }
        self.last_frame_start = Some(now);
        self.total_frames += 1;
    }

    pub fn begin_render(&mut self) {
        self.begin_render_at(Instant::now());
    }

    pub fn begin_render_at(&mut self, now: Instant) {
        self.render_start = Some(now);
    }

    pub fn end_render(&mut self) {
        self.end_render_at(Instant::now());
    }

    /// Close the current render pass. Ignored without a matching begin.
    pub fn end_render_at(&mut self, now: Instant) {
        let Some(start) = self.render_start.take() else {
            return;
        };
        let elapsed = now.saturating_duration_since(start);
        self.render_times.push(elapsed);

        self.min_render = Some(self.min_render.map_or(elapsed, |m| m.min(elapsed)));
        self.max_render = Some(self.max_render.map_or(elapsed, |m| m.max(elapsed)));

        self.update_metrics();
    }

    fn update_metrics(&mut self) {
        if let Some(mean) = self.frame_intervals.mean_secs() {
            if mean > 0.0 {
                self.average_fps = 1.0 / mean;
            }
        }
        if let Some(last) = self.frame_intervals.last() {
            if !last.is_zero() {
                self.current_fps = 1.0 / last.as_secs_f64();
            }
        }
        if let Some(mean) = self.render_times.mean() {
            self.average_render_ms = as_millis_f64(mean);
        }
    }

    pub fn reset(&mut self) {
        self.frame_intervals.clear();
        self.render_times.clear();
        self.last_frame_start = None;
        self.render_start = None;
        self.total_frames = 0;
        self.min_render = None;
        self.max_render = None;
        self.current_fps = 0.0;
        self.average_fps = 0.0;
        self.average_render_ms = 0.0;
    }

    pub fn current_fps(&self) -> f64 {
        self.current_fps
    }

    pub fn average_fps(&self) -> f64 {
        self.average_fps
    }

    pub fn average_render_ms(&self) -> f64 {
        self.average_render_ms
    }

    pub fn min_render_ms(&self) -> f64 {
        self.min_render.map_or(0.0, as_millis_f64)
    }

    pub fn max_render_ms(&self) -> f64 {
        self.max_render.map_or(0.0, as_millis_f64)
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frame intervals currently held in the window.
    pub fn sample_count(&self) -> usize {
        self.frame_intervals.len()
    }

    pub fn is_good(&self) -> bool {
        self.average_fps >= self.good_fps
    }

    pub fn is_acceptable(&self) -> bool {
        self.average_fps >= self.acceptable_fps
    }

    pub fn report(&self) -> FrameReport {
        FrameReport {
            fps: self.current_fps,
            avg_fps: self.average_fps,
            avg_render_ms: self.average_render_ms,
            min_render_ms: self.min_render_ms(),
            max_render_ms: self.max_render_ms(),
            total_frames: self.total_frames,
        }
    }
}
