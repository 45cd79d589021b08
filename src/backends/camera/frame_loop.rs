// SPDX-License-Identifier: GPL-3.0-only
//! Paced frame production threads
//!
//! Software camera backends produce frames on a dedicated thread at a fixed
//! rate. [`FrameLoop`] owns that thread: it paces each tick against a deadline
//! (not a fixed sleep, so slow ticks do not accumulate drift) and stops and
//! joins the thread when dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the tick callback to control the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep producing frames
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// A running frame production thread
pub struct FrameLoop {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl FrameLoop {
    /// Spawn a loop calling `tick` once per `interval`
    ///
    /// `tick` receives the zero-based tick index.
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut(u64) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting frame loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut next_deadline = Instant::now();
                let mut index = 0u64;

                while !thread_stop.load(Ordering::SeqCst) {
                    if tick(index) == LoopAction::Stop {
                        debug!(name = %thread_name, index, "Frame loop requested stop");
                        break;
                    }
                    index += 1;

                    next_deadline += interval;
                    let now = Instant::now();
                    if next_deadline > now {
                        thread::sleep(next_deadline - now);
                    } else {
                        // Fell behind; restart pacing from now instead of bursting
                        next_deadline = now;
                    }
                }

                info!(name = %thread_name, ticks = index, "Frame loop exiting");
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Ask the loop to stop without waiting for the thread
    ///
    /// No tick starts after this returns, though one already running
    /// completes.
    pub fn signal_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Signal the loop to stop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for frame loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frame_loop = FrameLoop::spawn("test-loop", Duration::from_millis(1), move |i| {
            counter_clone.store(i, Ordering::SeqCst);
            if i >= 5 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        })
        .unwrap();

        frame_loop.stop();
        // Either it stopped itself at 5 or we stopped it earlier
        assert!(counter.load(Ordering::SeqCst) <= 5);
        assert!(!frame_loop.is_running());
    }

    #[test]
    fn test_stop_joins_thread() {
        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frame_loop = FrameLoop::spawn("test-stop", Duration::from_millis(5), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        frame_loop.stop();
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_drop_stops_loop() {
        let frame_loop = FrameLoop::spawn("test-drop", Duration::from_millis(50), |_| {
            LoopAction::Continue
        })
        .unwrap();
        assert!(frame_loop.is_running());
        drop(frame_loop);
    }
}
