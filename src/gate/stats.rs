//! Admission counters and the snapshot exposed to monitoring.

use serde::Serialize;

/// Monotonic counters, only ever updated under the gate lock.
#[derive(Debug, Default, Clone)]
pub(crate) struct Counters {
    pub total_requests: u64,
    pub rejected: u64,
    pub queued: u64,
    pub timed_out: u64,
    pub heavy_rejected: u64,
    pub priority_processed: u64,
    pub peak_concurrent: u32,
    /// Releases that found a counter already at zero. Signals an
    /// acquire/release mismatch in the caller.
    pub over_releases: u64,
}

/// Point-in-time view of gate state for monitoring.
///
/// Read-only; never feeds back into admission decisions.
#[derive(Debug, Clone, Serialize)]
pub struct GateStats {
    pub active_requests: u32,
    pub active_heavy_requests: u32,
    pub max_concurrent_requests: u32,
    pub max_heavy_concurrent: u32,
    pub available_slots: u32,

    pub queued_priority: usize,
    pub queued_normal: usize,
    pub queue_length: usize,
    pub max_queue_size: usize,

    pub total_requests: u64,
    pub rejected_requests: u64,
    pub queued_requests: u64,
    pub timed_out_requests: u64,
    pub heavy_rejected_requests: u64,
    pub priority_processed: u64,
    pub peak_concurrent: u32,
    pub over_releases: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_to_flat_object() {
        let stats = GateStats {
            active_requests: 3,
            active_heavy_requests: 1,
            max_concurrent_requests: 10,
            max_heavy_concurrent: 2,
            available_slots: 7,
            queued_priority: 0,
            queued_normal: 2,
            queue_length: 2,
            max_queue_size: 50,
            total_requests: 40,
            rejected_requests: 5,
            queued_requests: 6,
            timed_out_requests: 1,
            heavy_rejected_requests: 2,
            priority_processed: 4,
            peak_concurrent: 8,
            over_releases: 0,
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["active_requests"], 3);
        assert_eq!(value["available_slots"], 7);
        assert_eq!(value["queue_length"], 2);
        assert_eq!(value["peak_concurrent"], 8);
    }
}
