use crate::Eth1Observer;
use futures::sync::mpsc;
use futures::{Future, Sink};
use parking_lot::Mutex;
use slog::{info, Logger};
use std::sync::Arc;
use std::time::Duration;

/// A single-assignment event carrying the genesis time.
///
/// Subscribers each get their own bounded channel; whoever subscribes after
/// the latch has fired receives the value immediately and the stream closes.
pub struct ChainStartLatch {
    inner: Mutex<Inner>,
}

struct Inner {
    genesis_time: Option<u64>,
    subscribers: Vec<mpsc::Sender<u64>>,
}

impl ChainStartLatch {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                genesis_time: None,
                subscribers: vec![],
            }),
        }
    }

    /// `Some(genesis_time)` if chain start has fired.
    pub fn has_fired(&self) -> Option<u64> {
        self.inner.lock().genesis_time
    }

    /// Fires the latch, waking every subscriber. Only the first call has
    /// any effect.
    pub fn fire(&self, genesis_time: u64) {
        let mut inner = self.inner.lock();
        if inner.genesis_time.is_some() {
            return;
        }
        inner.genesis_time = Some(genesis_time);

        // Dropping the senders afterwards closes each subscriber's stream
        // behind its single value.
        for subscriber in inner.subscribers.drain(..) {
            let _ = subscriber.send(genesis_time).wait();
        }
    }

    /// Returns a stream that yields the genesis time exactly once, then
    /// closes.
    pub fn subscribe(&self) -> mpsc::Receiver<u64> {
        let (tx, rx) = mpsc::channel(1);
        let mut inner = self.inner.lock();

        match inner.genesis_time {
            Some(genesis_time) => {
                let _ = tx.send(genesis_time).wait();
            }
            None => inner.subscribers.push(tx),
        }

        rx
    }
}

impl Default for ChainStartLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls the ETH1 observer until the deposit threshold crosses, then fires
/// the latch.
pub struct ChainStartWatcher;

impl ChainStartWatcher {
    pub fn spawn<E: Eth1Observer + 'static>(
        observer: Arc<E>,
        latch: Arc<ChainStartLatch>,
        poll_interval: Duration,
        log: Logger,
    ) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || loop {
            if let Some(genesis_time) = observer.chain_start_log() {
                info!(log, "ChainStart threshold crossed"; "genesis_time" => genesis_time);
                latch.fire(genesis_time);
                return;
            }
            std::thread::sleep(poll_interval);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::Stream;

    #[test]
    fn subscriber_after_fire_gets_replay_and_close() {
        let latch = ChainStartLatch::new();
        latch.fire(42);

        let values: Vec<u64> = latch.subscribe().wait().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![42]);
    }

    #[test]
    fn subscriber_before_fire_is_woken() {
        let latch = Arc::new(ChainStartLatch::new());
        let rx = latch.subscribe();

        let firer = {
            let latch = latch.clone();
            std::thread::spawn(move || latch.fire(7))
        };
        let values: Vec<u64> = rx.wait().map(|r| r.unwrap()).collect();
        firer.join().unwrap();

        assert_eq!(values, vec![7]);
    }

    #[test]
    fn second_fire_is_ignored() {
        let latch = ChainStartLatch::new();
        latch.fire(1);
        latch.fire(2);
        assert_eq!(latch.has_fired(), Some(1));

        let values: Vec<u64> = latch.subscribe().wait().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn watcher_fires_once_the_log_appears() {
        let observer = Arc::new(crate::MockEth1Observer::new());
        let latch = Arc::new(ChainStartLatch::new());
        let log = slog::Logger::root(slog::Discard, slog::o!());

        let handle = ChainStartWatcher::spawn(
            observer.clone(),
            latch.clone(),
            Duration::from_millis(5),
            log,
        );

        assert_eq!(latch.has_fired(), None);
        observer.set_chain_start(99);
        handle.join().unwrap();
        assert_eq!(latch.has_fired(), Some(99));
    }
}
