//! Fixed-size download worker pool.
//!
//! Workers share one receiver of a capacity-1 channel. A requester blocks only
//! on its own request's `done` signal, so once every worker is busy further
//! requests wait at the channel until one frees up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{RelsyncError, Result};

pub const DEFAULT_WORKERS: usize = 4;

pub struct DownloadRequest {
    pub url: String,
    pub dest: PathBuf,
    pub cancel: CancellationToken,
    pub done: oneshot::Sender<Result<u64>>,
}

/// Client side of the pool. Cheap to clone; workers exit once every clone is
/// dropped.
#[derive(Clone)]
pub struct Downloader {
    tx: mpsc::Sender<DownloadRequest>,
    workers: usize,
}

impl Downloader {
    /// Start `workers` worker tasks. Must be called from inside a tokio runtime.
    pub fn start(workers: usize, client: reqwest::Client) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(1);
        let rx = Arc::new(Mutex::new(rx));
        for id in 0..workers {
            let rx = Arc::clone(&rx);
            let client = client.clone();
            tokio::spawn(async move { worker(id, rx, client).await });
        }
        debug!(workers, "download pool started");
        Self { tx, workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Transfer `url` to `dest`, returning the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if cancel.is_cancelled() {
            return Err(RelsyncError::Cancelled);
        }
        let (done, rx) = oneshot::channel();
        let request = DownloadRequest {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            cancel: cancel.clone(),
            done,
        };
        tokio::select! {
            sent = self.tx.send(request) => sent.map_err(|_| RelsyncError::PoolClosed)?,
            _ = cancel.cancelled() => return Err(RelsyncError::Cancelled),
        }
        rx.await.map_err(|_| RelsyncError::PoolClosed)?
    }
}

async fn worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<DownloadRequest>>>,
    client: reqwest::Client,
) {
    loop {
        // The lock is released before the transfer starts.
        let next = rx.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };
        let result = if request.cancel.is_cancelled() {
            Err(RelsyncError::Cancelled)
        } else {
            transfer(&client, &request.url, &request.dest).await
        };
        let _ = request.done.send(result);
    }
    debug!(worker = id, "download worker exiting");
}

async fn transfer(client: &reqwest::Client, url: &str, dest: &Path) -> Result<u64> {
    info!(url, dest = %dest.display(), "downloading");
    let mut response = client
        .get(url)
        .header("User-Agent", "relsync")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RelsyncError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    debug!(url, bytes = written, "download complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[tokio::test]
    async fn download_streams_body_to_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/asset")
            .with_status(200)
            .with_body("artifact-bytes")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("asset");
        let pool = Downloader::start(2, reqwest::Client::new());
        let n = pool
            .download(
                &format!("{}/asset", server.url()),
                &dest,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(n, 14);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "artifact-bytes");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone")
            .with_status(410)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let pool = Downloader::start(1, reqwest::Client::new());
        let err = pool
            .download(
                &format!("{}/gone", server.url()),
                &dir.path().join("gone"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, RelsyncError::HttpStatus { status: 410, .. }),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn cancelled_token_skips_transfer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/never")
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let pool = Downloader::start(1, reqwest::Client::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pool
            .download(&format!("{}/never", server.url()), &dir.path().join("x"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RelsyncError::Cancelled));
        mock.assert_async().await;
    }

    /// With one worker, two concurrent transfers cannot overlap: the total
    /// wall time is at least the sum of both bodies' delays.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_worker_serializes_transfers() {
        const DELAY: Duration = Duration::from_millis(300);
        let mut server = mockito::Server::new_async().await;
        for path in ["/slow-a", "/slow-b"] {
            server
                .mock("GET", path)
                .with_status(200)
                .with_chunked_body(|w| {
                    std::thread::sleep(DELAY);
                    w.write_all(b"done")
                })
                .create_async()
                .await;
        }

        let dir = TempDir::new().unwrap();
        let pool = Downloader::start(1, reqwest::Client::new());
        let cancel = CancellationToken::new();
        let a_url = format!("{}/slow-a", server.url());
        let b_url = format!("{}/slow-b", server.url());
        let a_dest = dir.path().join("a");
        let b_dest = dir.path().join("b");

        let start = Instant::now();
        let (a, b) = tokio::join!(
            pool.download(&a_url, &a_dest, &cancel),
            pool.download(&b_url, &b_dest, &cancel),
        );
        let elapsed = start.elapsed();

        a.unwrap();
        b.unwrap();
        assert!(
            elapsed >= DELAY * 2,
            "transfers overlapped: finished in {elapsed:?}"
        );
    }
}
