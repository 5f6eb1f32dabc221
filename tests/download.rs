use assert_matches::assert_matches;
use url::Url;

use bookgrab::download::{DownloadJob, FileFetcher, HttpFetcher};
use bookgrab::error::BookgrabError;

#[test]
fn fetcher_creates_parent_directories_before_requesting() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("Frank Herbert - Dune").join("Dune.epub");
    let fetcher = HttpFetcher::new().unwrap();

    // Port 1 refuses connections, so the transfer itself fails, but the
    // destination folder must exist by then.
    let source = Url::parse("http://127.0.0.1:1/file.epub").unwrap();
    let err = fetcher.fetch(&source, &destination).unwrap_err();

    assert_matches!(err, BookgrabError::MirrorHttp(_));
    assert!(destination.parent().unwrap().is_dir());
    assert!(!destination.exists());
}

#[test]
fn job_completion_is_single_shot() {
    let job = DownloadJob::start(|| Ok(()));

    let mut outcomes = Vec::new();
    for _ in 0..400 {
        if let Some(result) = job.try_finish() {
            outcomes.push(result);
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_ok());

    // The channel is drained; later polls report the worker as gone rather
    // than inventing a second completion value.
    assert_matches!(
        job.try_finish(),
        Some(Err(BookgrabError::DownloadAborted))
    );
}
