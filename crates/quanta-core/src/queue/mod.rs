//! Queue module: durable delivery queue, processing loop, backoff policy.

mod processor;
mod record;
mod retry;
mod state;

pub use record::{DecodedSlot, PersistedEntry, decode_slot, encode_slot};
pub use retry::{BackoffPolicy, RemovalReason, Verdict};
pub use state::LoopState;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::domain::{DeliveryContext, Task};
use crate::ports::{Clock, KeyValueStore};
use state::QueueState;

pub const DEFAULT_STORAGE_KEY: &str = "tools.quanta.queue.tasks";

/// Store reads tried at hydration before giving up on the slot.
const HYDRATE_READ_ATTEMPTS: u32 = 3;

/// What hydration found in the slot.
enum SlotLoad {
    Loaded(Vec<Task>),
    /// The store kept failing; the slot's contents are unknown.
    Unavailable,
}

/// Runtime knobs of a [`DeliveryQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueueOptions {
    /// Store key of the persisted slot.
    pub storage_key: String,
    pub policy: BackoffPolicy,
    /// Fixed pause after every attempt, whatever its outcome.
    pub pause: Duration,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            policy: BackoffPolicy::default(),
            pause: Duration::from_millis(100),
        }
    }
}

pub(crate) struct Shared {
    state: Mutex<QueueState>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    context: DeliveryContext,
    options: QueueOptions,
    loop_tx: watch::Sender<LoopState>,
}

impl Shared {
    /// Write the whole queue into the slot. Caller holds the state lock,
    /// so writes land in mutation order. Best effort: failures are logged.
    async fn persist_locked(&self, state: &QueueState) {
        if !state.hydrated || state.persistence_disabled {
            return;
        }
        let bytes = match encode_slot(&state.tasks) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to encode delivery queue");
                return;
            }
        };
        if let Err(e) = self.store.write(&self.options.storage_key, &bytes).await {
            warn!(error = %e, pending = state.tasks.len(), "failed to persist delivery queue");
        }
    }

    /// Read the slot, retrying store errors. A missing key or an unparseable
    /// slot is an empty queue; only a store that keeps failing is not.
    async fn load_slot(&self) -> SlotLoad {
        let key = self.options.storage_key.as_str();
        let mut attempt = 1;
        let bytes = loop {
            match self.store.read(key).await {
                Ok(Some(bytes)) => break bytes,
                Ok(None) => return SlotLoad::Loaded(Vec::new()),
                Err(e) if attempt < HYDRATE_READ_ATTEMPTS => {
                    warn!(key, attempt, error = %e, "failed to read delivery queue; retrying");
                    self.clock.sleep(self.options.policy.base_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        key,
                        error = %e,
                        "failed to read delivery queue; persistence disabled for this process"
                    );
                    return SlotLoad::Unavailable;
                }
            }
        };
        match decode_slot(&bytes) {
            Ok(slot) => {
                for e in &slot.discarded {
                    warn!(error = %e, "discarding persisted task");
                }
                SlotLoad::Loaded(slot.tasks)
            }
            Err(e) => {
                warn!(key, error = %e, "delivery queue slot is unreadable; starting empty");
                SlotLoad::Loaded(Vec::new())
            }
        }
    }
}

/// Durable, strictly ordered delivery queue with a single processing loop.
///
/// # 設計原則
/// - タスクリストと draining フラグは 1 つの Mutex の下にある
/// - 構造変更（追加・先頭削除）のたびにスロット全体を書き直す
/// - 処理ループは同時に 1 つだけ。hydrate 完了前は起動しない
///
/// Cloning is cheap; clones share the same queue.
#[derive(Clone)]
pub struct DeliveryQueue {
    shared: Arc<Shared>,
}

impl DeliveryQueue {
    /// Build a queue without touching the store. Call [`hydrate`](Self::hydrate)
    /// before relying on delivery; enqueues before that are held in memory only.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        context: DeliveryContext,
        options: QueueOptions,
    ) -> Self {
        let (loop_tx, _) = watch::channel(LoopState::Idle);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                store,
                clock,
                context,
                options,
                loop_tx,
            }),
        }
    }

    /// `new` + `hydrate`.
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        context: DeliveryContext,
        options: QueueOptions,
    ) -> Self {
        let queue = Self::new(store, clock, context, options);
        queue.hydrate().await;
        queue
    }

    pub fn options(&self) -> &QueueOptions {
        &self.shared.options
    }

    /// Load the previous process's unfinished queue. Runs once; later calls
    /// are no-ops.
    ///
    /// Restored tasks go ahead of anything enqueued before hydration, since
    /// they are older. Undecodable entries are dropped and logged.
    ///
    /// If the store cannot be read even after retries, the slot is never
    /// written by this process; tasks are still delivered from memory.
    pub async fn hydrate(&self) {
        if self.shared.state.lock().await.hydrated {
            return;
        }

        // Read without the lock so producers are not held up by store retries.
        let loaded = self.shared.load_slot().await;

        let mut state = self.shared.state.lock().await;
        if state.hydrated {
            return;
        }
        let restored = match loaded {
            SlotLoad::Loaded(tasks) => tasks,
            SlotLoad::Unavailable => {
                state.persistence_disabled = true;
                Vec::new()
            }
        };
        let early = std::mem::take(&mut state.tasks);
        let had_early = !early.is_empty();
        info!(
            restored = restored.len(),
            enqueued_before_hydration = early.len(),
            persistence = !state.persistence_disabled,
            "hydrated delivery queue"
        );

        state.tasks = restored.into();
        state.tasks.extend(early);
        state.hydrated = true;

        if had_early {
            self.shared.persist_locked(&state).await;
        }
        self.start_if_idle(&mut state);
    }

    /// Append `task` to the tail, persist, and wake the loop if idle.
    ///
    /// Fire-and-forget: the delivery outcome is never reported back.
    pub async fn enqueue(&self, task: impl Into<Task>) {
        let task = task.into();
        let mut state = self.shared.state.lock().await;
        state.tasks.push_back(task);
        self.shared.persist_locked(&state).await;
        self.start_if_idle(&mut state);
    }

    /// Rewrite the slot from the current in-memory queue.
    pub async fn persist(&self) {
        let state = self.shared.state.lock().await;
        self.shared.persist_locked(&state).await;
    }

    pub async fn pending(&self) -> usize {
        self.shared.state.lock().await.tasks.len()
    }

    /// Copy of the queue, head first.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.shared.state.lock().await.tasks.iter().cloned().collect()
    }

    pub async fn is_hydrated(&self) -> bool {
        self.shared.state.lock().await.hydrated
    }

    pub fn is_draining(&self) -> bool {
        *self.shared.loop_tx.borrow() == LoopState::Draining
    }

    /// Resolve once the processing loop is idle (immediately if it is).
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.loop_tx.subscribe();
        // The sender lives as long as `self`, so this can't fail.
        let _ = rx.wait_for(|s| *s == LoopState::Idle).await;
    }

    fn start_if_idle(&self, state: &mut QueueState) {
        if state.try_begin_drain() {
            self.shared.loop_tx.send_replace(LoopState::Draining);
            tokio::spawn(processor::drain(Arc::clone(&self.shared)));
        }
    }
}
