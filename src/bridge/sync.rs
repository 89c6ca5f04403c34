//! Outbound sync queue
//!
//! User actions that must persist are queued here and pushed to the
//! server session in batches: a timer drains the queue on a fixed
//! interval, and checkpoints (pause, track change, explicit seek) drain
//! it immediately. Last-write-wins commands coalesce in place, so a
//! volume slider drag or a seek scrub costs one remote call per flush,
//! not one per input event.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{RemoteCommand, RemoteSession};

/// Bounded coalescing queue in front of the remote session
pub struct SyncBridge {
    remote: Arc<dyn RemoteSession>,

    /// Commands awaiting the next flush, oldest first
    queue: Mutex<VecDeque<RemoteCommand>>,

    /// Maximum queued commands; overflow drops the oldest
    capacity: usize,

    /// Commands lost to overflow since startup
    dropped_total: AtomicU64,

    /// Remote calls that failed and were discarded since startup
    failed_total: AtomicU64,
}

impl SyncBridge {
    pub fn new(remote: Arc<dyn RemoteSession>, capacity: usize) -> Self {
        Self {
            remote,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            dropped_total: AtomicU64::new(0),
            failed_total: AtomicU64::new(0),
        }
    }

    /// Queue a command for the next flush.
    ///
    /// A command with a coalesce class replaces an already queued command
    /// of the same class in place, keeping its slot in the order. Overflow
    /// drops the oldest queued command.
    pub async fn enqueue(&self, command: RemoteCommand) {
        let mut queue = self.queue.lock().await;

        if let Some(class) = command.coalesce_class() {
            if let Some(slot) = queue
                .iter_mut()
                .find(|queued| queued.coalesce_class() == Some(class))
            {
                debug!("coalescing queued {}", command.command_name());
                *slot = command;
                return;
            }
        }

        if queue.len() >= self.capacity {
            if let Some(dropped) = queue.pop_front() {
                warn!(
                    "sync queue full, dropping oldest {}",
                    dropped.command_name()
                );
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
            }
        }
        queue.push_back(command);
    }

    /// Drain the queue, pushing each command to the remote in order.
    ///
    /// A failed call is logged and discarded; the remaining commands still
    /// go out. Persistence errors are the collaborator's to surface, the
    /// controller never retries.
    pub async fn flush_now(&self) {
        let drained: Vec<RemoteCommand> = {
            let mut queue = self.queue.lock().await;
            queue.drain(..).collect()
        };

        for command in drained {
            if let Err(e) = self.remote.call(command.clone()).await {
                warn!(
                    "remote {} failed, dropping: {}",
                    command.command_name(),
                    e
                );
                self.failed_total.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Commands currently awaiting a flush
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Commands lost to queue overflow since startup
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    /// Remote calls that failed since startup
    pub fn failed_total(&self) -> u64 {
        self.failed_total.load(Ordering::Relaxed)
    }
}
