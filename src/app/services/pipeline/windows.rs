//! Keyed event-time tumbling windows
//!
//! Every PUID carries one open window per duration class. Windows are
//! aligned to epoch multiples of their duration, accumulate the numeric
//! summary and null count the window checks need, and close when an
//! observation's event time reaches past the window end. A late observation
//! that belongs before the open window is dropped from window evaluation
//! only; it still flows through the point checks.

use std::collections::HashMap;

use tracing::debug;

use crate::app::models::{Puid, SemanticObservation};
use crate::app::services::checks::{WelfordAccumulator, WindowSnapshot};
use crate::app::services::thresholds::WindowClass;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    puid: Puid,
    class: WindowClass,
}

#[derive(Debug)]
struct OpenWindow {
    window_start: i64,
    window_end: i64,
    stats: WelfordAccumulator,
    numeric_instants: Vec<i64>,
    null_count: usize,
}

impl OpenWindow {
    fn new(window_start: i64, duration_ms: i64) -> Self {
        let window_end = window_start + duration_ms;
        assert!(window_end > window_start, "window must have positive span");
        Self {
            window_start,
            window_end,
            stats: WelfordAccumulator::new(),
            numeric_instants: Vec::new(),
            null_count: 0,
        }
    }

    fn add(&mut self, observation: &SemanticObservation) {
        if observation.is_null() {
            self.null_count += 1;
        } else if let Some(value) = observation.numeric_value {
            self.stats.push(value);
            self.numeric_instants
                .push(observation.phenomenon_time_start);
        }
    }

    fn snapshot(self, puid: Puid) -> WindowSnapshot {
        WindowSnapshot::new(
            puid,
            self.window_start,
            self.window_end,
            self.stats,
            self.numeric_instants,
            self.null_count,
        )
    }
}

/// Tracks the open tumbling windows of one stream partition
#[derive(Debug, Default)]
pub struct WindowManager {
    open: HashMap<WindowKey, OpenWindow>,
    late_dropped: usize,
}

impl WindowManager {
    /// Create an empty window manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the open windows of its PUID.
    ///
    /// Returns the snapshots of every window the observation's event time
    /// closed; the watermark within a partition is the event time itself.
    pub fn observe(&mut self, observation: &SemanticObservation) -> Vec<WindowSnapshot> {
        let mut closed = Vec::new();
        let event_time = observation.phenomenon_time_start;

        for class in WindowClass::ALL {
            let duration = class.duration_ms();
            let aligned_start = event_time.div_euclid(duration) * duration;
            let key = WindowKey {
                puid: observation.puid.clone(),
                class,
            };

            let bounds = self
                .open
                .get(&key)
                .map(|window| (window.window_start, window.window_end));

            match bounds {
                Some((_, window_end)) if event_time >= window_end => {
                    let finished = self
                        .open
                        .insert(key.clone(), OpenWindow::new(aligned_start, duration))
                        .expect("window present");
                    closed.push(finished.snapshot(key.puid.clone()));
                    self.open
                        .get_mut(&key)
                        .expect("window just inserted")
                        .add(observation);
                }
                Some((window_start, _)) if event_time < window_start => {
                    self.late_dropped += 1;
                    debug!(
                        "window: {} arrived before open {} window of {}, dropped",
                        event_time, class, observation.puid
                    );
                }
                Some(_) => {
                    self.open
                        .get_mut(&key)
                        .expect("window present")
                        .add(observation);
                }
                None => {
                    let mut window = OpenWindow::new(aligned_start, duration);
                    window.add(observation);
                    self.open.insert(key, window);
                }
            }
        }

        closed
    }

    /// Close every open window at end of stream
    pub fn flush(&mut self) -> Vec<WindowSnapshot> {
        let mut closed: Vec<WindowSnapshot> = self
            .open
            .drain()
            .map(|(key, window)| window.snapshot(key.puid))
            .collect();
        // Stable output order for deterministic replay
        closed.sort_by(|a, b| {
            (a.window_start, a.window_end, a.puid.key_prefix())
                .cmp(&(b.window_start, b.window_end, b.puid.key_prefix()))
        });
        closed
    }

    /// Observations dropped for arriving before their open window
    pub fn late_dropped(&self) -> usize {
        self.late_dropped
    }

    /// Number of currently open windows
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
