use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::db::BucketDb;
use super::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub enum StoreOp {
    Read,
    Write { payload: Vec<u8>, overwrite: bool },
    Delete,
    ListBuckets,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreReply {
    Data(Vec<u8>),
    Buckets(Vec<String>),
    Done,
}

/// One message across the actor boundary. The reply travels back on the
/// request's own channel.
#[derive(Debug)]
pub struct StoreRequest {
    pub key: String,
    pub op: StoreOp,
    pub reply: oneshot::Sender<Result<StoreReply>>,
}

enum Envelope {
    Request(StoreRequest),
    Close,
}

/// Requests sent but not yet answered.
#[derive(Default)]
struct Outstanding {
    count: AtomicUsize,
    drained: Notify,
    closed: AtomicBool,
}

impl Outstanding {
    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Cloneable client side of the store actor.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<Envelope>,
    outstanding: Arc<Outstanding>,
}

impl StoreHandle {
    /// Send one request and wait for its reply.
    pub async fn send(&self, key: impl Into<String>, op: StoreOp) -> Result<StoreReply> {
        if self.outstanding.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let (reply, rx) = oneshot::channel();
        let request = StoreRequest {
            key: key.into(),
            op,
            reply,
        };
        self.outstanding.count.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(Envelope::Request(request)).is_err() {
            self.outstanding.done();
            return Err(StoreError::Closed);
        }
        rx.await.map_err(|_| StoreError::Closed)?
    }

    pub async fn get(&self, key: impl Into<String>) -> Result<Vec<u8>> {
        match self.send(key, StoreOp::Read).await? {
            StoreReply::Data(bytes) => Ok(bytes),
            other => Err(StoreError::Db(format!("unexpected reply {other:?}"))),
        }
    }

    pub async fn write(
        &self,
        key: impl Into<String>,
        payload: Vec<u8>,
        overwrite: bool,
    ) -> Result<()> {
        self.send(key, StoreOp::Write { payload, overwrite })
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, key: impl Into<String>) -> Result<()> {
        self.send(key, StoreOp::Delete).await.map(|_| ())
    }

    pub async fn list_buckets(&self, key: impl Into<String>) -> Result<Vec<String>> {
        match self.send(key, StoreOp::ListBuckets).await? {
            StoreReply::Buckets(names) => Ok(names),
            other => Err(StoreError::Db(format!("unexpected reply {other:?}"))),
        }
    }
}

/// Owner of the store actor. Dropping it without [`Store::shutdown`] leaves
/// the actor running until the last handle is gone.
pub struct Store {
    handle: StoreHandle,
    actor: JoinHandle<()>,
}

impl Store {
    /// Open the database at `path` and start the actor. Must be called from
    /// inside a tokio runtime.
    pub fn open(path: &Path) -> Result<Self> {
        let db = BucketDb::open(path)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let outstanding = Arc::new(Outstanding::default());
        let actor = tokio::task::spawn_blocking({
            let outstanding = Arc::clone(&outstanding);
            move || run_actor(db, rx, outstanding)
        });
        debug!(path = %path.display(), "version store opened");
        Ok(Self {
            handle: StoreHandle { tx, outstanding },
            actor,
        })
    }

    pub fn handle(&self) -> StoreHandle {
        self.handle.clone()
    }

    /// Wait for in-flight requests to drain, stop accepting new ones, close
    /// the channel and join the actor (which drops the database handle).
    pub async fn shutdown(self) {
        let Store { handle, actor } = self;
        handle.outstanding.wait_drained().await;
        handle.outstanding.closed.store(true, Ordering::Release);
        let _ = handle.tx.send(Envelope::Close);
        drop(handle);
        if let Err(e) = actor.await {
            warn!(error = %e, "version store actor panicked");
        }
    }
}

fn run_actor(
    db: BucketDb,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    outstanding: Arc<Outstanding>,
) {
    while let Some(envelope) = rx.blocking_recv() {
        let request = match envelope {
            Envelope::Request(r) => r,
            Envelope::Close => break,
        };
        let result = match request.op {
            StoreOp::Read => db.get(&request.key).map(StoreReply::Data),
            StoreOp::Write { payload, overwrite } => db
                .write(&request.key, &payload, overwrite)
                .map(|()| StoreReply::Done),
            StoreOp::Delete => db.delete(&request.key).map(|()| StoreReply::Done),
            StoreOp::ListBuckets => db.list_buckets(&request.key).map(StoreReply::Buckets),
        };
        if let Err(e) = &result {
            debug!(key = %request.key, error = %e, "store request failed");
        }
        let _ = request.reply.send(result);
        outstanding.done();
    }
    debug!("version store actor exiting");
    drop(db);
}
