use std::collections::HashMap;
use std::sync::{
    Arc,
    RwLock,
};

use clockabilly::{
    Clockable,
    UtcClock,
};
use kubemirror_core::k8s::GVK;
use tokio::sync::mpsc;
use tracing::*;

#[derive(Clone, Copy, Debug)]
pub enum StatsOp {
    Added,
    Updated,
    Deleted,
    Synced,
}

#[derive(Clone, Debug)]
pub struct StatsDelta {
    pub gvk: GVK,
    pub op: StatsOp,
    pub approx_bytes: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ResourceStats {
    pub adds: u64,
    pub updates: u64,
    pub deletes: u64,
    pub last_update_ts: i64,
    pub approx_count: i64,
    pub approx_bytes: i64,
    pub synced: bool,
}

/// One object is approximated as 1KiB for the byte-size estimate; good enough for a dashboard
/// sidebar, not meant to be exact.
const APPROX_BYTES_PER_OBJECT: i64 = 1024;

pub type StatsSnapshot = Arc<RwLock<HashMap<GVK, ResourceStats>>>;

/// The sending half handed out to every event handler. `record` never blocks: it uses
/// `try_send` and silently drops the delta if the channel is full, matching the pipeline's
/// "stats are best-effort" contract.
#[derive(Clone)]
pub struct StatsHandle {
    tx: mpsc::Sender<StatsDelta>,
}

impl StatsHandle {
    pub fn record(&self, gvk: GVK, op: StatsOp, approx_bytes: usize) {
        if let Err(err) = self.tx.try_send(StatsDelta { gvk, op, approx_bytes }) {
            debug!("dropping stats delta, channel full or closed: {err}");
        }
    }

    /// Marks a kind `synced` without touching its add/update/delete counters.
    pub fn mark_synced(&self, gvk: GVK) {
        if self.tx.try_send(StatsDelta { gvk: gvk.clone(), op: StatsOp::Synced, approx_bytes: 0 }).is_err() {
            warn!("could not record sync completion for {gvk}");
        }
    }
}

pub struct StatsConsumer {
    rx: mpsc::Receiver<StatsDelta>,
}

impl StatsConsumer {
    pub fn new(capacity: usize) -> (StatsHandle, StatsConsumer) {
        let (tx, rx) = mpsc::channel(capacity);
        (StatsHandle { tx }, StatsConsumer { rx })
    }

    /// Runs until every `StatsHandle` clone (and the sender used by `mark_synced`) is dropped,
    /// publishing each update into `snapshot` as it's processed. Queries read `snapshot`
    /// directly rather than waiting for this task to finish, since it only finishes at context
    /// teardown.
    pub async fn run(mut self, snapshot: StatsSnapshot) {
        while let Some(delta) = self.rx.recv().await {
            let mut map = snapshot.write().expect("stats lock poisoned");
            let entry = map.entry(delta.gvk).or_default();
            match delta.op {
                StatsOp::Added => {
                    entry.adds += 1;
                    entry.approx_count += 1;
                    entry.approx_bytes += APPROX_BYTES_PER_OBJECT;
                },
                StatsOp::Updated => entry.updates += 1,
                StatsOp::Deleted => {
                    entry.deletes += 1;
                    entry.approx_count = (entry.approx_count - 1).max(0);
                    entry.approx_bytes = (entry.approx_bytes - APPROX_BYTES_PER_OBJECT).max(0);
                },
                StatsOp::Synced => entry.synced = true,
            }
            entry.last_update_ts = UtcClock.now_ts();
        }
    }
}

pub fn new_snapshot() -> StatsSnapshot {
    Arc::new(RwLock::new(HashMap::new()))
}

pub fn snapshot_to_vec(snapshot: &StatsSnapshot) -> Vec<(GVK, ResourceStats)> {
    snapshot.read().expect("stats lock poisoned").iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_add_then_delete_tracks_approx_count() {
        let (handle, consumer) = StatsConsumer::new(8);
        let snapshot = new_snapshot();
        let gvk = GVK::new("", "v1", "Pod");

        handle.record(gvk.clone(), StatsOp::Added, 512);
        handle.record(gvk.clone(), StatsOp::Added, 512);
        handle.record(gvk.clone(), StatsOp::Deleted, 512);
        drop(handle);

        consumer.run(snapshot.clone()).await;

        let stats = snapshot_to_vec(&snapshot);
        let (_, s) = stats.iter().find(|(k, _)| *k == gvk).unwrap();
        assert_eq!(s.adds, 2);
        assert_eq!(s.deletes, 1);
        assert_eq!(s.approx_count, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_mark_synced_does_not_touch_counters() {
        let (handle, consumer) = StatsConsumer::new(8);
        let snapshot = new_snapshot();
        let gvk = GVK::new("", "v1", "Pod");

        handle.record(gvk.clone(), StatsOp::Added, 0);
        handle.mark_synced(gvk.clone());
        drop(handle);

        consumer.run(snapshot.clone()).await;

        let stats = snapshot_to_vec(&snapshot);
        let (_, s) = stats.iter().find(|(k, _)| *k == gvk).unwrap();
        assert_eq!(s.adds, 1);
        assert!(s.synced);
    }

    #[rstest]
    fn test_try_send_never_blocks_when_full() {
        let (handle, _consumer) = StatsConsumer::new(1);
        let gvk = GVK::new("", "v1", "Pod");
        // fill the channel, then push a delta that must be dropped rather than block
        handle.record(gvk.clone(), StatsOp::Added, 0);
        handle.record(gvk, StatsOp::Added, 0);
    }
}
