//! Mouse auto-repeat timer.
//!
//! While the left button is held the timer thread calls its tick callback
//! after `delay`, then every `interval`, until stopped. The callback runs on
//! the timer thread; the event manager's callback only posts a message to the
//! UI thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{trace, warn};

use crate::error::{UsageError, fatal};

struct Running {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

pub struct AutoRepeat {
    delay: Duration,
    interval: Duration,
    running: Option<Running>,
}

impl AutoRepeat {
    pub fn new(delay: Duration, interval: Duration) -> Self {
        Self {
            delay,
            interval,
            running: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start ticking. `tick` receives a 0-based tick count. Fatal if already running.
    pub fn start<F>(&mut self, tick: F)
    where
        F: Fn(u64) + Send + 'static,
    {
        if self.running.is_some() {
            fatal(UsageError::AutoRepeatRunning);
        }
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let (delay, interval) = (self.delay, self.interval);
        let thread = thread::spawn(move || {
            if !sleep_unless_stopped(&flag, delay) {
                return;
            }
            let mut n = 0;
            loop {
                tick(n);
                n += 1;
                if !sleep_unless_stopped(&flag, interval) {
                    return;
                }
            }
        });
        trace!("auto-repeat started");
        self.running = Some(Running { stop, thread });
    }

    /// Stop ticking and join the timer thread. Fatal if not running.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            fatal(UsageError::AutoRepeatIdle);
        };
        halt(running);
        trace!("auto-repeat stopped");
    }
}

impl Drop for AutoRepeat {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            halt(running);
        }
    }
}

fn halt(running: Running) {
    running.stop.store(true, Ordering::Release);
    running.thread.thread().unpark();
    if running.thread.join().is_err() {
        warn!("auto-repeat tick callback panicked");
    }
}

/// Park until `duration` has passed. Returns false if stopped first.
fn sleep_unless_stopped(stop: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}
