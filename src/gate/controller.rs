//! The admission gate: bounded concurrency with priority queuing and
//! load shedding.
//!
//! Sits between the HTTP layer and handler execution. The HTTP layer
//! calls [`AdmissionGate::acquire`] before running a handler and
//! [`AdmissionGate::release`] unconditionally afterward, success or
//! failure. One instance is shared per process in production wiring and
//! injected into request handling; tests construct isolated copies.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::{ConfigError, GateConfig};
use crate::policy::{PathClass, PathPolicy};

use super::decision::{AdmissionDecision, DenyReason};
use super::stats::{Counters, GateStats};
use super::waiter::{WaitQueues, Waiter};

/// Mutable gate state. Only ever touched under the lock, and the lock is
/// never held across an await, so every counter/queue read-modify-write
/// is atomic relative to the others.
#[derive(Debug, Default)]
struct GateState {
    active: u32,
    active_heavy: u32,
    queues: WaitQueues,
    counters: Counters,
    next_waiter_id: u64,
}

impl GateState {
    /// Charge one slot to a granted request and update grant-side stats.
    /// Used by both the immediate-grant path and promotion.
    fn charge_slot(&mut self, class: PathClass) {
        self.active += 1;
        if class.is_heavy {
            self.active_heavy += 1;
        }
        if class.is_priority {
            self.counters.priority_processed += 1;
        }
        self.counters.peak_concurrent = self.counters.peak_concurrent.max(self.active);
    }
}

/// What the synchronous part of `acquire` decided, computed under the
/// lock before any suspension.
enum Admit {
    Granted,
    Denied(DenyReason),
    Queued { rx: oneshot::Receiver<()>, id: u64 },
}

/// Bounds concurrent handler execution with a general slot pool, a
/// smaller heavy sub-pool, and two FIFO wait queues serviced in strict
/// precedence order.
pub struct AdmissionGate {
    config: GateConfig,
    policy: PathPolicy,
    state: Mutex<GateState>,
}

impl AdmissionGate {
    /// Build a gate whose classification policy comes from the config's
    /// prefix lists.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        let policy = PathPolicy::new(
            config.priority_path_prefixes.clone(),
            config.heavy_path_prefixes.clone(),
        );
        Self::with_policy(config, policy)
    }

    /// Build a gate with an explicitly supplied classification policy,
    /// overriding the config's prefix lists.
    pub fn with_policy(config: GateConfig, policy: PathPolicy) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            policy,
            state: Mutex::new(GateState::default()),
        })
    }

    /// Decide whether a request for `path` may start executing.
    ///
    /// Grants immediately while the pools have room. When the general
    /// pool is full the request parks in a wait queue (priority or
    /// normal, by classification) until a release promotes it or the
    /// queue timeout fires. Denials are values, never errors; the
    /// suspended wait is the only suspension point in the gate.
    pub async fn acquire(&self, path: &str) -> AdmissionDecision {
        let class = self.policy.classify(path);

        let admit = {
            let mut state = self.lock_state();
            state.counters.total_requests += 1;

            // The heavy sub-pool is checked first and independently:
            // heavy exhaustion denies even when general capacity is free.
            if class.is_heavy && state.active_heavy >= self.config.max_heavy_concurrent {
                state.counters.rejected += 1;
                state.counters.heavy_rejected += 1;
                Admit::Denied(DenyReason::HeavyApiBusy)
            } else if state.active < self.config.max_concurrent_requests {
                state.charge_slot(class);
                Admit::Granted
            } else if state.queues.len() >= self.config.max_queue_size {
                state.counters.rejected += 1;
                Admit::Denied(DenyReason::ServerBusy)
            } else {
                let (grant_tx, rx) = oneshot::channel();
                let id = state.next_waiter_id;
                state.next_waiter_id += 1;
                state.queues.push(Waiter {
                    id,
                    grant_tx,
                    enqueued_at: Instant::now(),
                    is_priority: class.is_priority,
                    is_heavy: class.is_heavy,
                    path: path.to_string(),
                });
                state.counters.queued += 1;
                Admit::Queued { rx, id }
            }
        };

        match admit {
            Admit::Granted => AdmissionDecision::allowed(),
            Admit::Denied(reason) => {
                debug!(path, ?reason, "admission denied");
                AdmissionDecision::denied(reason)
            }
            Admit::Queued { rx, id } => self.wait_for_slot(rx, id, class, path).await,
        }
    }

    /// Return a slot after handler execution, then promote at most one
    /// waiter in precedence order.
    ///
    /// Over-release (more releases than grants) is clamped rather than
    /// propagated so a misbehaving caller cannot corrupt global
    /// accounting; the clamp is counted and logged.
    pub fn release(&self, is_heavy: bool) {
        let mut state = self.lock_state();

        let mut mismatched = false;
        if state.active == 0 {
            mismatched = true;
        } else {
            state.active -= 1;
        }
        if is_heavy {
            if state.active_heavy == 0 {
                mismatched = true;
            } else {
                state.active_heavy -= 1;
            }
        }
        if mismatched {
            state.counters.over_releases += 1;
            warn!(is_heavy, "release without matching acquire");
        }

        while state.active < self.config.max_concurrent_requests {
            let Some(waiter) = state.queues.pop_next() else {
                break;
            };
            let class = PathClass {
                is_priority: waiter.is_priority,
                is_heavy: waiter.is_heavy,
            };
            let waited_ms = waiter.enqueued_at.elapsed().as_millis() as u64;
            if waiter.grant_tx.send(()).is_err() {
                // The waiter's acquire future is gone; a grant must not
                // be charged to it. Try the next in precedence order.
                debug!(path = %waiter.path, "skipping abandoned waiter");
                continue;
            }
            state.charge_slot(class);
            debug!(path = %waiter.path, waited_ms, "promoted waiter");
            break;
        }
    }

    /// Consistent snapshot of counters and live gauges.
    pub fn stats(&self) -> GateStats {
        let state = self.lock_state();
        GateStats {
            active_requests: state.active,
            active_heavy_requests: state.active_heavy,
            max_concurrent_requests: self.config.max_concurrent_requests,
            max_heavy_concurrent: self.config.max_heavy_concurrent,
            available_slots: self
                .config
                .max_concurrent_requests
                .saturating_sub(state.active),
            queued_priority: state.queues.priority_len(),
            queued_normal: state.queues.normal_len(),
            queue_length: state.queues.len(),
            max_queue_size: self.config.max_queue_size,
            total_requests: state.counters.total_requests,
            rejected_requests: state.counters.rejected,
            queued_requests: state.counters.queued,
            timed_out_requests: state.counters.timed_out,
            heavy_rejected_requests: state.counters.heavy_rejected,
            priority_processed: state.counters.priority_processed,
            peak_concurrent: state.counters.peak_concurrent,
            over_releases: state.counters.over_releases,
        }
    }

    /// True once the pool is exhausted and the wait queues are at 80% of
    /// their ceiling.
    pub fn is_overloaded(&self) -> bool {
        let state = self.lock_state();
        state.active >= self.config.max_concurrent_requests
            && state.queues.len() as f64 >= 0.8 * self.config.max_queue_size as f64
    }

    /// Load as an integer 0..=100: the worse of pool utilization and
    /// queue utilization.
    pub fn load_level(&self) -> u8 {
        let state = self.lock_state();
        let pool = state.active as f64 / self.config.max_concurrent_requests as f64;
        let queue = if self.config.max_queue_size == 0 {
            0.0
        } else {
            state.queues.len() as f64 / self.config.max_queue_size as f64
        };
        (pool.max(queue) * 100.0).min(100.0) as u8
    }

    /// Park until promoted or timed out. Exactly one resolution path:
    /// whichever of promotion and timer reaches the queue entry first
    /// (under the lock) wins, and the loser observes that and defers.
    async fn wait_for_slot(
        &self,
        mut rx: oneshot::Receiver<()>,
        id: u64,
        class: PathClass,
        path: &str,
    ) -> AdmissionDecision {
        tokio::select! {
            granted = &mut rx => {
                if granted.is_ok() {
                    debug!(path, "promoted from queue");
                    return AdmissionDecision::allowed();
                }
                // The sender can only vanish without firing if the queue
                // entry was dropped without a grant, which the gate never
                // does while the waiter is parked. Absorb it as a timeout
                // rather than panic.
                warn!(path, "wait queue entry dropped without grant");
                AdmissionDecision::denied(DenyReason::QueueTimeout)
            }
            _ = tokio::time::sleep(self.config.queue_timeout()) => {
                self.resolve_timeout(rx, id, class, path)
            }
        }
    }

    /// The timer fired. If the entry is still queued this waiter timed
    /// out; if it is gone a promotion won the race and its grant is
    /// already charged, so take it.
    fn resolve_timeout(
        &self,
        mut rx: oneshot::Receiver<()>,
        id: u64,
        class: PathClass,
        path: &str,
    ) -> AdmissionDecision {
        let mut state = self.lock_state();
        if let Some(waiter) = state.queues.remove(id, class.is_priority) {
            state.counters.timed_out += 1;
            state.counters.rejected += 1;
            drop(state);
            let waited_ms = waiter.enqueued_at.elapsed().as_millis() as u64;
            debug!(path, waited_ms, "timed out waiting for a slot");
            return AdmissionDecision::denied(DenyReason::QueueTimeout);
        }
        drop(state);
        match rx.try_recv() {
            Ok(()) => AdmissionDecision::allowed(),
            Err(_) => {
                warn!(path, "waiter resolved with neither grant nor queue entry");
                AdmissionDecision::denied(DenyReason::QueueTimeout)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        // A panic while holding the lock cannot leave the state logically
        // inconsistent: every critical section restores the invariants
        // before returning. Recover the data instead of poisoning the gate.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
