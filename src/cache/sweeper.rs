//! Background sweep of idle cache entries

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use tracing::debug;

use super::Sweep;

/// Handle to a thread calling `sweep_expired` on a fixed interval
///
/// Stops when [`CacheSweeper::stop`] is called or the handle is dropped.
pub struct CacheSweeper {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    pub fn spawn<S>(target: Arc<S>, interval: Duration) -> Self
    where
        S: Sweep + ?Sized + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = thread::spawn(move || {
            let ticker = tick(interval);
            loop {
                let stopped = select! {
                    recv(ticker) -> _ => {
                        let removed = target.sweep_expired();
                        if removed > 0 {
                            debug!(removed, "swept idle cache entries");
                        }
                        false
                    }
                    recv(stop_rx) -> _ => true,
                };
                if stopped {
                    break;
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // disconnecting the channel wakes the select
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
