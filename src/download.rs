use std::fs::{self, File};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use crate::error::BookgrabError;

/// External fetch capability: copy the resource at `source` to
/// `destination`, creating parent directories on the way.
pub trait FileFetcher: Send + Sync {
    fn fetch(&self, source: &Url, destination: &Path) -> Result<(), BookgrabError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, BookgrabError> {
        // No request timeout: a full book transfer can legitimately take
        // longer than any sane fixed budget.
        let client = Client::builder()
            .timeout(None)
            .user_agent(format!("bookgrab/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| BookgrabError::MirrorHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl FileFetcher for HttpFetcher {
    fn fetch(&self, source: &Url, destination: &Path) -> Result<(), BookgrabError> {
        debug!(%source, destination = %destination.display(), "download.fetch");
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|err| BookgrabError::Filesystem(err.to_string()))?;
        }

        let mut response = self
            .client
            .get(source.clone())
            .send()
            .map_err(|err| BookgrabError::MirrorHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "download request failed".to_string());
            return Err(BookgrabError::MirrorStatus { status, message });
        }

        let mut file =
            File::create(destination).map_err(|err| BookgrabError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| BookgrabError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// One in-flight background transfer. At most one exists per session; the
/// owning phase holds it, so abandoning the phase abandons the job.
pub struct DownloadJob {
    rx: Receiver<Result<(), BookgrabError>>,
}

impl DownloadJob {
    /// Launches `work` on a background thread and returns immediately. The
    /// result arrives exactly once through [`DownloadJob::try_finish`].
    pub fn start<W>(work: W) -> Self
    where
        W: FnOnce() -> Result<(), BookgrabError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // A dropped receiver means the session moved on; the result is
            // intentionally unobserved then.
            let _ = tx.send(work());
        });
        Self { rx }
    }

    /// Non-blocking poll for the completion signal.
    pub fn try_finish(&self) -> Option<Result<(), BookgrabError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(BookgrabError::DownloadAborted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn wait_for(job: &DownloadJob) -> Result<(), BookgrabError> {
        for _ in 0..200 {
            if let Some(result) = job.try_finish() {
                return result;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("job never completed");
    }

    #[test]
    fn job_reports_success_once() {
        let job = DownloadJob::start(|| Ok(()));
        assert!(wait_for(&job).is_ok());
    }

    #[test]
    fn job_reports_error() {
        let job = DownloadJob::start(|| Err(BookgrabError::MirrorHttp("boom".to_string())));
        let err = wait_for(&job).unwrap_err();
        assert!(matches!(err, BookgrabError::MirrorHttp(_)));
    }

    #[test]
    fn pending_job_returns_none() {
        let job = DownloadJob::start(|| {
            thread::sleep(Duration::from_millis(100));
            Ok(())
        });
        assert!(job.try_finish().is_none());
    }
}
