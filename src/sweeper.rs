//! Periodic hourly-stats sweeper.
//!
//! One dedicated thread drives every topic's rolling hourly window, which
//! makes the window's single-writer contract structural instead of a
//! calling convention: nothing else in the process calls
//! `update_hourly_size` (see `hourly`).

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::error::Result;
use crate::registry::TopicRegistry;

/// Handle to the background sweep thread.
pub struct HourlySweeper {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl HourlySweeper {
    /// Spawn the sweep thread, ticking every `interval`.
    pub fn start(registry: Arc<TopicRegistry>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("hourly-sweeper".to_string())
            .spawn(move || {
                info!("hourly sweeper started, interval {:?}", interval);
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            debug!("hourly sweep tick");
                            registry.update_topic_history_stats();
                        }
                        // Stop requested, or the handle was dropped.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("hourly sweeper exiting");
            })?;
        Ok(Self { stop_tx, handle })
    }

    /// Signal the thread to stop and wait for it to exit.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            warn!("hourly sweeper thread panicked");
        }
    }
}
