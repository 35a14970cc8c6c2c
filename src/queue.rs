use crate::record::LogRecord;
use crate::sink::CommitSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, warn};

/// Batching and flush timing.
///
/// **Fields**
/// - `debounce`: quiet period after the most recent arc before the buffer
///   is committed. Every new arc restarts it.
/// - `max_batch_size`: when set, commit immediately once this many arcs
///   are buffered.
/// - `max_batch_age`: when set, commit once the oldest buffered arc has
///   waited this long, however busy the stream is.
///
/// With both caps unset a steady stream of arcs defers the commit for as
/// long as it keeps arriving faster than `debounce`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    pub debounce: Duration,
    pub max_batch_size: Option<usize>,
    pub max_batch_age: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2000),
            max_batch_size: None,
            max_batch_age: None,
        }
    }
}

/// Counters shared between queue handles and the scheduler task.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Arcs accepted by [`ArcQueue::enqueue`].
    pub enqueued: AtomicU64,
    /// Batches the sink accepted.
    pub committed_batches: AtomicU64,
    /// Arcs inside accepted batches.
    pub committed_records: AtomicU64,
    /// Batches the sink rejected; those arcs are gone.
    pub failed_commits: AtomicU64,
}

/// Plain copy of [`QueueStats`] at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub committed_batches: u64,
    pub committed_records: u64,
    pub failed_commits: u64,
}

impl QueueStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            committed_batches: self.committed_batches.load(Ordering::Relaxed),
            committed_records: self.committed_records.load(Ordering::Relaxed),
            failed_commits: self.failed_commits.load(Ordering::Relaxed),
        }
    }
}

enum Command {
    Record(LogRecord),
    Flush(oneshot::Sender<()>),
}

/// Handle to the in-memory arc buffer.
///
/// The buffer and the single flush deadline live inside a background
/// task; handles only push commands onto an unbounded channel, so
/// [`enqueue`](ArcQueue::enqueue) never blocks and arcs reach the buffer
/// in call order. When every handle is dropped the task commits what is
/// left and exits.
#[derive(Clone)]
pub struct ArcQueue {
    sender: mpsc::UnboundedSender<Command>,
    stats: Arc<QueueStats>,
}

impl ArcQueue {
    /// Create the queue and spawn its scheduler on the current Tokio
    /// runtime.
    ///
    /// A debounce shorter than 10ms and a batch size cap of zero are
    /// raised to those minimums.
    pub fn spawn(sink: Arc<dyn CommitSink>, config: QueueConfig) -> (Self, JoinHandle<()>) {
        let config = QueueConfig {
            debounce: config.debounce.max(Duration::from_millis(10)),
            max_batch_size: config.max_batch_size.map(|n| n.max(1)),
            max_batch_age: config.max_batch_age,
        };

        let (tx, rx) = mpsc::unbounded_channel::<Command>();
        let stats = Arc::new(QueueStats::default());
        let handle = tokio::spawn(run_scheduler(rx, sink, config, Arc::clone(&stats)));

        (Self { sender: tx, stats }, handle)
    }

    /// Append an arc and restart the debounce timer.
    pub fn enqueue(&self, record: LogRecord) {
        if self.sender.send(Command::Record(record)).is_err() {
            warn!("arc scheduler has stopped, dropping arc");
            return;
        }
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Commit whatever is buffered right now, without waiting for the
    /// timer. Resolves once the sink call has returned.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.sender.send(Command::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

async fn run_scheduler(
    mut rx: mpsc::UnboundedReceiver<Command>,
    sink: Arc<dyn CommitSink>,
    config: QueueConfig,
    stats: Arc<QueueStats>,
) {
    let mut batch: Vec<LogRecord> = Vec::new();
    let mut debounce_at: Option<Instant> = None;
    let mut oldest_at: Option<Instant> = None;

    loop {
        let age_at = match (oldest_at, config.max_batch_age) {
            (Some(oldest), Some(max_age)) => Some(oldest + max_age),
            _ => None,
        };
        let deadline = match (debounce_at, age_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Record(record)) => {
                    let now = Instant::now();
                    batch.push(record);
                    oldest_at.get_or_insert(now);
                    debounce_at = Some(now + config.debounce);

                    if config.max_batch_size.map_or(false, |max| batch.len() >= max) {
                        debounce_at = None;
                        oldest_at = None;
                        dispatch(&sink, std::mem::take(&mut batch), &stats);
                    }
                }
                Some(Command::Flush(done)) => {
                    debounce_at = None;
                    oldest_at = None;
                    let arcs = std::mem::take(&mut batch);
                    if !arcs.is_empty() {
                        commit(&*sink, arcs, &stats).await;
                    }
                    let _ = done.send(());
                }
                None => {
                    if !batch.is_empty() {
                        commit(&*sink, std::mem::take(&mut batch), &stats).await;
                    }
                    debug!("arc queue closed, scheduler exiting");
                    break;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                debounce_at = None;
                oldest_at = None;
                dispatch(&sink, std::mem::take(&mut batch), &stats);
            }
        }
    }
}

/// Hand a batch to the sink without holding up the scheduler.
fn dispatch(sink: &Arc<dyn CommitSink>, arcs: Vec<LogRecord>, stats: &Arc<QueueStats>) {
    if arcs.is_empty() {
        return;
    }
    let sink = Arc::clone(sink);
    let stats = Arc::clone(stats);
    tokio::spawn(async move {
        commit(&*sink, arcs, &stats).await;
    });
}

async fn commit(sink: &dyn CommitSink, arcs: Vec<LogRecord>, stats: &QueueStats) {
    let count = arcs.len();
    match sink.commit_arcs(arcs).await {
        Ok(()) => {
            stats.committed_batches.fetch_add(1, Ordering::Relaxed);
            stats.committed_records.fetch_add(count as u64, Ordering::Relaxed);
            debug!(count, "committed arc batch");
        }
        Err(e) => {
            stats.failed_commits.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, count, "arc batch commit failed, batch dropped");
        }
    }
}
