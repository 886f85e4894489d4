//! Background thread that reads terminal input and posts it to the UI thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event;
use log::{debug, error, warn};

use super::dispatcher::DispatcherHandle;
use super::host::Ui;
use crate::events::CrosstermTranslator;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct InputReader {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl InputReader {
    /// Start reading. Each translated record is posted as a `handle_input` call.
    pub fn spawn(handle: DispatcherHandle<Ui>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::spawn(move || {
            let mut translator = CrosstermTranslator::new();
            while flag.load(Ordering::Acquire) {
                match event::poll(POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(err) => {
                        report(&handle, err.to_string());
                        break;
                    }
                }
                match event::read() {
                    Ok(ev) => {
                        if let Some(record) = translator.translate(ev) {
                            if !handle.post(move |ui| ui.handle_input(record)) {
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        report(&handle, err.to_string());
                        break;
                    }
                }
            }
            debug!("input reader stopped");
        });
        Self {
            running,
            thread: Some(thread),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ask the thread to stop and wait for it (at most one poll interval).
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("input reader panicked");
            }
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn report(handle: &DispatcherHandle<Ui>, message: String) {
    error!("input reader failed: {message}");
    handle.post(move |ui| ui.input_failed(message));
}
