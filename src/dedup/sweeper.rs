use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{RecvTimeoutError, Sender};
use tracing::{debug, trace};

use crate::error::Error;

/// Background thread running a purge closure every `interval`.
///
/// Stopped by [`SweeperHandle::stop`] or on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub(crate) fn spawn<F>(interval: Duration, mut sweep: F) -> Result<Self, Error>
    where
        F: FnMut() -> usize + Send + 'static,
    {
        let (stop_tx, stop_rx) = flume::bounded::<()>(1);
        let join = thread::Builder::new()
            .name("levelguard-sweeper".into())
            .spawn(move || {
                debug!(?interval, "request cache sweeper started");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let purged = sweep();
                            if purged > 0 {
                                debug!(purged, "purged expired requests");
                            } else {
                                trace!("sweep found nothing to purge");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("request cache sweeper stopped");
            })
            .map_err(|e| Error::Spawn(e.to_string()))?;
        Ok(Self {
            stop: Some(stop_tx),
            join: Some(join),
        })
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
