//! Mailbox watcher and bridge lifecycle.
//!
//! The bridge owns the two mailbox files and a single background watcher
//! task. The watcher only touches the filesystem and the delivery channel; it
//! never calls into host-owned state. Change detection polls the command
//! file's modification time, so rapid writes inside one poll interval
//! coalesce into a single delivery; there is no delivery-per-write
//! guarantee.

use crate::error::BridgeError;
use crate::mailbox::Mailbox;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// One command payload handed from the watcher to the execution context.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Correlation id for tracing a payload through the pipeline.
    pub id: Uuid,
    pub payload: String,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub command_path: PathBuf,
    pub response_path: PathBuf,
    pub poll_interval: Duration,
    pub join_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(command_path: impl Into<PathBuf>, response_path: impl Into<PathBuf>) -> Self {
        Self {
            command_path: command_path.into(),
            response_path: response_path.into(),
            poll_interval: Duration::from_millis(500),
            join_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the mailbox files and the watcher task lifecycle.
///
/// `start` and `stop` are both idempotent; a failed `start` leaves the bridge
/// stopped with nothing spawned.
pub struct Bridge {
    config: BridgeConfig,
    watcher: Option<WatcherHandle>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            watcher: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Clears both mailbox files and spawns the watcher. Payloads are sent to
    /// `deliveries`; pass a bounded channel (capacity 1 in the reference
    /// wiring) so the watcher blocks while a command is in flight.
    pub async fn start(&mut self, deliveries: mpsc::Sender<Delivery>) -> Result<(), BridgeError> {
        if self.watcher.is_some() {
            tracing::debug!("bridge already running, start is a no-op");
            return Ok(());
        }

        let command = Mailbox::new(&self.config.command_path);
        let response = Mailbox::new(&self.config.response_path);
        for mailbox in [&command, &response] {
            mailbox
                .clear()
                .await
                .map_err(|source| BridgeError::MailboxSetup {
                    path: mailbox.path().to_path_buf(),
                    source,
                })?;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let poll_interval = self.config.poll_interval;
        let task = tokio::spawn(watch_mailbox(command, poll_interval, shutdown_rx, deliveries));
        self.watcher = Some(WatcherHandle { shutdown, task });
        tracing::info!(
            command = %self.config.command_path.display(),
            response = %self.config.response_path.display(),
            "bridge started"
        );
        Ok(())
    }

    /// Signals the watcher to exit and joins it with a bounded timeout. A
    /// watcher that fails to exit in time is abandoned; its next poll becomes
    /// a no-op once the delivery channel is gone. Mailbox files are left
    /// untouched.
    pub async fn stop(&mut self) {
        let Some(handle) = self.watcher.take() else {
            tracing::debug!("bridge already stopped, stop is a no-op");
            return;
        };
        let _ = handle.shutdown.send(true);
        match tokio::time::timeout(self.config.join_timeout, handle.task).await {
            Ok(_) => tracing::info!("bridge stopped"),
            Err(_) => tracing::warn!(
                timeout = ?self.config.join_timeout,
                "watcher did not exit in time, abandoning it"
            ),
        }
    }
}

async fn watch_mailbox(
    mailbox: Mailbox,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    deliveries: mpsc::Sender<Delivery>,
) {
    let mut last_modified: Option<SystemTime> = None;
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {}
        }

        match poll_once(&mailbox, &mut last_modified).await {
            Ok(Some(payload)) => {
                let delivery = Delivery {
                    id: Uuid::new_v4(),
                    payload,
                };
                tracing::debug!(id = %delivery.id, "delivering command payload");
                // Blocks while the bounded channel is full.
                if deliveries.send(delivery).await.is_err() {
                    tracing::debug!("delivery channel closed, watcher exiting");
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "command mailbox poll failed"),
        }
    }
}

/// One poll cycle: at most one delivered payload. The stored modification
/// time advances even for empty writes so stale timestamps never re-trigger.
async fn poll_once(
    mailbox: &Mailbox,
    last_modified: &mut Option<SystemTime>,
) -> io::Result<Option<String>> {
    let Some(modified) = mailbox.modified().await else {
        // File is gone; an abandoned watcher ends up here and stays quiet.
        return Ok(None);
    };
    if last_modified.is_some_and(|last| modified <= last) {
        return Ok(None);
    }
    *last_modified = Some(modified);
    match mailbox.take().await {
        Ok(payload) => Ok(payload),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
