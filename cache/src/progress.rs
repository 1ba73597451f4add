use tokio::sync::mpsc;
use tracing::*;

/// Where a context load currently stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressPhase {
    Connecting,
    SyncingCore,
    SyncingDynamic,
    Complete,
}

#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    pub context_name: String,
    pub message: String,
    pub phase: ProgressPhase,
}

/// Handed to `ContextPool::load`/`switch` by the caller (the UI). `try_send` only: a caller
/// that isn't reading progress updates must never stall context load, same rule as the stats
/// pipeline.
#[derive(Clone)]
pub struct ProgressSender(Option<mpsc::Sender<ProgressUpdate>>);

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        ProgressSender(Some(tx))
    }

    pub fn none() -> Self {
        ProgressSender(None)
    }

    pub fn send(&self, context_name: &str, message: impl Into<String>, phase: ProgressPhase) {
        let Some(tx) = &self.0 else { return };
        let update = ProgressUpdate { context_name: context_name.into(), message: message.into(), phase };
        if tx.try_send(update).is_err() {
            debug!("dropping progress update for {context_name}, no reader or channel full");
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_none_sender_never_panics() {
        let sender = ProgressSender::none();
        sender.send("ctx", "connecting", ProgressPhase::Connecting);
    }

    #[rstest]
    #[tokio::test]
    async fn test_send_delivers_when_reader_present() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = ProgressSender::new(tx);
        sender.send("ctx", "connecting", ProgressPhase::Connecting);

        let update = rx.recv().await.unwrap();
        assert_eq!(update.context_name, "ctx");
        assert_eq!(update.phase, ProgressPhase::Connecting);
    }

    #[rstest]
    #[tokio::test]
    async fn test_send_drops_silently_when_channel_full() {
        let (tx, _rx) = mpsc::channel(1);
        let sender = ProgressSender::new(tx);
        sender.send("ctx", "one", ProgressPhase::Connecting);
        // channel now full; this must not block or panic
        sender.send("ctx", "two", ProgressPhase::SyncingCore);
    }
}
