//! End-to-end tests for the upload orchestrator against in-memory doubles.

use std::io::{Cursor, SeekFrom};
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use pan123_upload::data::wire::paths;
use pan123_upload::{
    ApiClient, ApiError, Method, ProgressEvent, SliceError, SliceTransport, UploadError,
    UploadOptions, UploadOutcome, UploadRequest, Uploader,
};
use pan123_verify::Md5Hasher;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tokio_util::sync::CancellationToken;

const MIB: u64 = 1024 * 1024;

/// Scripted API: every endpoint answers from a fixed response.
struct MockApi {
    create:   Value,
    parts:    Value,
    complete: Value,
    fail_on:  Option<&'static str>,
    calls:    Mutex<Vec<(String, Value)>>,
}

impl MockApi {
    fn new(create: Value) -> Self {
        Self {
            create,
            parts: json!({ "parts": [] }),
            complete: json!({ "completed": true, "async": false, "fileID": 777 }),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn sliced(slice_size: u64) -> Self {
        Self::new(json!({ "reuse": false, "preuploadID": "pre-1", "sliceSize": slice_size }))
    }

    fn parts(mut self, parts: Value) -> Self {
        self.parts = parts;
        self
    }

    fn complete(mut self, complete: Value) -> Self {
        self.complete = complete;
        self
    }

    fn fail_on(mut self, path: &'static str) -> Self {
        self.fail_on = Some(path);
        self
    }

    fn calls_to(&self, path: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn call_count(&self) -> usize { self.calls.lock().unwrap().len() }
}

impl ApiClient for MockApi {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        _query: &[(&str, String)],
        with_auth: bool,
    ) -> Result<Value, ApiError> {
        assert_eq!(method, Method::Post);
        assert!(with_auth);
        let body = body.unwrap_or_default();
        self.calls.lock().unwrap().push((path.to_string(), body.clone()));

        if self.fail_on == Some(path) {
            return Err(ApiError::Api {
                code:     5000,
                message:  "scripted failure".into(),
                trace_id: "trace-1".into(),
            });
        }
        match path {
            paths::CREATE_FILE => Ok(self.create.clone()),
            paths::GET_UPLOAD_URL => Ok(json!({
                "presignedURL": format!("https://slices.test/{}", body["sliceNo"])
            })),
            paths::LIST_UPLOAD_PARTS => Ok(self.parts.clone()),
            paths::UPLOAD_COMPLETE => Ok(self.complete.clone()),
            other => panic!("unexpected path {other}"),
        }
    }
}

/// Fails the first `fail_first` attempts (or every attempt), recording each PUT.
#[derive(Default)]
struct MockTransport {
    fail_first:  AtomicU32,
    always_fail: bool,
    puts:        Mutex<Vec<(String, usize)>>,
}

impl MockTransport {
    fn failing_first(n: u32) -> Self {
        Self { fail_first: AtomicU32::new(n), ..Default::default() }
    }

    fn always_failing() -> Self { Self { always_fail: true, ..Default::default() } }

    fn puts(&self) -> Vec<(String, usize)> { self.puts.lock().unwrap().clone() }
}

impl SliceTransport for MockTransport {
    async fn put_slice(&self, url: &str, payload: Bytes) -> Result<(), SliceError> {
        self.puts.lock().unwrap().push((url.to_string(), payload.len()));
        if self.always_fail {
            return Err(SliceError::Status(500));
        }
        let failed = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed { Err(SliceError::Transport("connection reset".into())) } else { Ok(()) }
    }
}

/// In-memory source that counts how often it is dropped.
struct TrackedSource<R> {
    inner: R,
    drops: Arc<AtomicUsize>,
}

impl<R> Drop for TrackedSource<R> {
    fn drop(&mut self) { self.drops.fetch_add(1, Ordering::SeqCst); }
}

impl<R: AsyncRead + Unpin> AsyncRead for TrackedSource<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<R: AsyncSeek + Unpin> AsyncSeek for TrackedSource<R> {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> std::io::Result<()> {
        Pin::new(&mut self.inner).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
        Pin::new(&mut self.inner).poll_complete(cx)
    }
}

fn tracked(data: Vec<u8>) -> (TrackedSource<Cursor<Vec<u8>>>, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    (TrackedSource { inner: Cursor::new(data), drops: drops.clone() }, drops)
}

/// Zero-filled source of arbitrary length that never holds its content.
struct Zeros {
    len: u64,
    pos: u64,
}

impl AsyncRead for Zeros {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let n = (self.len.saturating_sub(self.pos)).min(buf.remaining() as u64) as usize;
        buf.initialize_unfilled_to(n).fill(0);
        buf.advance(n);
        self.pos += n as u64;
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for Zeros {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> std::io::Result<()> {
        self.pos = match position {
            SeekFrom::Start(n) => n,
            SeekFrom::End(n) => self.len.saturating_add_signed(n),
            SeekFrom::Current(n) => self.pos.saturating_add_signed(n),
        };
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
        Poll::Ready(Ok(self.pos))
    }
}

fn recorder() -> (Arc<Mutex<Vec<ProgressEvent>>>, UploadOptions) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let options = UploadOptions::default()
        .retry_backoff(Duration::ZERO)
        .on_progress(Arc::new(move |event: &ProgressEvent| sink.lock().unwrap().push(*event)));
    (events, options)
}

fn data(len: usize) -> Vec<u8> { (0..len).map(|i| (i % 251) as u8).collect() }

#[tokio::test]
async fn test_empty_source_fails_before_any_call() {
    let api = Arc::new(MockApi::sliced(4));
    let transport = Arc::new(MockTransport::default());
    let uploader = Uploader::new(api.clone(), transport.clone());
    let (source, drops) = tracked(Vec::new());

    let err = uploader.upload(UploadRequest::new(0, "empty.bin", source)).await.unwrap_err();

    assert!(matches!(err, UploadError::InvalidInput(_)));
    assert_eq!(api.call_count(), 0);
    assert!(transport.puts().is_empty());
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reserved_filename_fails_before_any_call() {
    let api = Arc::new(MockApi::sliced(4));
    let uploader = Uploader::new(api.clone(), MockTransport::default());
    let (source, drops) = tracked(data(10));

    let err = uploader.upload(UploadRequest::new(0, "a/b.txt", source)).await.unwrap_err();

    assert!(matches!(err, UploadError::InvalidInput(_)));
    assert_eq!(api.call_count(), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reuse_short_circuits() {
    let api = Arc::new(MockApi::new(json!({ "reuse": true, "fileID": 4321 })));
    let transport = Arc::new(MockTransport::default());
    let (events, options) = recorder();
    let uploader = Uploader::new(api.clone(), transport.clone()).with_options(options);
    let content = data(1000);
    let (source, drops) = tracked(content.clone());

    let outcome = uploader.upload(UploadRequest::new(12, "dup.bin", source)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::Reused { file_id: 4321 });
    assert_eq!(api.call_count(), 1);
    assert_eq!(api.calls_to(paths::CREATE_FILE), vec![json!({
        "parentFileID": 12,
        "filename": "dup.bin",
        "etag": Md5Hasher::digest(&content).to_hex(),
        "size": 1000
    })]);
    assert!(transport.puts().is_empty());
    assert_eq!(*events.lock().unwrap(), vec![ProgressEvent::CreatingFile]);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slices_numbered_in_order() {
    let api = Arc::new(MockApi::sliced(100).parts(json!({ "parts": [
        { "partNumber": 1, "size": 100 },
        { "partNumber": 2, "size": 100 },
        { "partNumber": 3, "size": 100 },
        { "partNumber": 4, "size": 30 }
    ]})));
    let transport = Arc::new(MockTransport::default());
    let (events, options) = recorder();
    let uploader = Uploader::new(api.clone(), transport.clone()).with_options(options);
    let (source, drops) = tracked(data(330));

    let outcome = uploader.upload(UploadRequest::new(0, "four.bin", source)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::Completed { file_id: 777 });

    let slice_nos: Vec<Value> = api
        .calls_to(paths::GET_UPLOAD_URL)
        .iter()
        .map(|body| {
            assert_eq!(body["preuploadID"], "pre-1");
            body["sliceNo"].clone()
        })
        .collect();
    assert_eq!(slice_nos, vec![json!(1), json!(2), json!(3), json!(4)]);

    assert_eq!(transport.puts(), vec![
        ("https://slices.test/1".to_string(), 100),
        ("https://slices.test/2".to_string(), 100),
        ("https://slices.test/3".to_string(), 100),
        ("https://slices.test/4".to_string(), 30),
    ]);
    assert_eq!(api.calls_to(paths::LIST_UPLOAD_PARTS), vec![json!({ "preuploadID": "pre-1" })]);
    assert_eq!(api.calls_to(paths::UPLOAD_COMPLETE), vec![json!({ "preuploadID": "pre-1" })]);

    assert_eq!(*events.lock().unwrap(), vec![
        ProgressEvent::CreatingFile,
        ProgressEvent::UploadingSlice { seq: 1, total: 4 },
        ProgressEvent::UploadingSlice { seq: 2, total: 4 },
        ProgressEvent::UploadingSlice { seq: 3, total: 4 },
        ProgressEvent::UploadingSlice { seq: 4, total: 4 },
        ProgressEvent::VerifyingSlices { total: 4 },
        ProgressEvent::ReportingCompletion,
    ]);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_single_slice_skips_verification() {
    let api = Arc::new(MockApi::sliced(1024));
    let transport = Arc::new(MockTransport::default());
    let (events, options) = recorder();
    let uploader = Uploader::new(api.clone(), transport.clone()).with_options(options);
    let (source, _) = tracked(data(1000));

    let outcome = uploader.upload(UploadRequest::new(0, "small.bin", source)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::Completed { file_id: 777 });
    assert_eq!(transport.puts().len(), 1);
    assert!(api.calls_to(paths::LIST_UPLOAD_PARTS).is_empty());
    assert!(!events.lock().unwrap().iter().any(|e| matches!(e, ProgressEvent::VerifyingSlices { .. })));
}

#[tokio::test]
async fn test_slice_size_equal_to_file_skips_verification() {
    let api = Arc::new(MockApi::sliced(1000));
    let transport = Arc::new(MockTransport::default());
    let uploader = Uploader::new(api.clone(), transport.clone());
    let (source, _) = tracked(data(1000));

    uploader.upload(UploadRequest::new(0, "exact.bin", source)).await.unwrap();

    assert_eq!(transport.puts(), vec![("https://slices.test/1".to_string(), 1000)]);
    assert!(api.calls_to(paths::LIST_UPLOAD_PARTS).is_empty());
}

#[tokio::test]
async fn test_part_size_mismatch_stops_before_completion() {
    let api = Arc::new(MockApi::sliced(100).parts(json!({ "parts": [
        { "partNumber": 1, "size": 100 },
        { "partNumber": 2, "size": 40 }
    ]})));
    let uploader = Uploader::new(api.clone(), MockTransport::default());
    let (source, drops) = tracked(data(150));

    let err = uploader.upload(UploadRequest::new(0, "two.bin", source)).await.unwrap_err();

    match err {
        UploadError::PartSizeMismatch { preupload_id, slice_no, local, remote } => {
            assert_eq!(preupload_id, "pre-1");
            assert_eq!(slice_no, 2);
            assert_eq!(local, 50);
            assert_eq!(remote, 40);
        }
        other => panic!("expected PartSizeMismatch, got {other:?}"),
    }
    assert!(api.calls_to(paths::UPLOAD_COMPLETE).is_empty());
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retries_then_succeeds() {
    const RETRIES: u32 = 3;
    let api = Arc::new(MockApi::sliced(100));
    let transport = Arc::new(MockTransport::failing_first(RETRIES));
    let (events, options) = recorder();
    let uploader = Uploader::new(api.clone(), transport.clone()).with_options(options.max_retries(RETRIES));
    let (source, _) = tracked(data(80));

    let outcome = uploader.upload(UploadRequest::new(0, "flaky.bin", source)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::Completed { file_id: 777 });
    assert_eq!(transport.puts().len(), RETRIES as usize + 1);
    // Retries reuse the slice's URL and number.
    assert_eq!(api.calls_to(paths::GET_UPLOAD_URL).len(), 1);
    assert!(transport.puts().iter().all(|(url, len)| url == "https://slices.test/1" && *len == 80));

    let events = events.lock().unwrap();
    let retrying = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::RetryingSlice { seq: 1, total: 1 }))
        .count();
    assert_eq!(retrying, RETRIES as usize);
    assert_eq!(events[1], ProgressEvent::UploadingSlice { seq: 1, total: 1 });
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    const RETRIES: u32 = 2;
    let api = Arc::new(MockApi::sliced(100));
    let transport = Arc::new(MockTransport::always_failing());
    let uploader = Uploader::new(api.clone(), transport.clone())
        .with_options(UploadOptions::default().retry_backoff(Duration::ZERO));
    let (source, drops) = tracked(data(250));

    let err = uploader
        .upload(UploadRequest::new(0, "doomed.bin", source).max_retries(RETRIES))
        .await
        .unwrap_err();

    match err {
        UploadError::SliceUploadExhausted { slice_no, attempts, source } => {
            assert_eq!(slice_no, 1);
            assert_eq!(attempts, RETRIES + 1);
            assert!(matches!(source, SliceError::Status(500)));
        }
        other => panic!("expected SliceUploadExhausted, got {other:?}"),
    }
    assert_eq!(transport.puts().len(), RETRIES as usize + 1);
    assert_eq!(api.calls_to(paths::GET_UPLOAD_URL).len(), 1);
    assert!(api.calls_to(paths::UPLOAD_COMPLETE).is_empty());
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_retry_budget_means_single_attempt() {
    let transport = Arc::new(MockTransport::failing_first(1));
    let uploader = Uploader::new(MockApi::sliced(100), transport.clone())
        .with_options(UploadOptions::default().max_retries(0));
    let (source, _) = tracked(data(10));

    let err = uploader.upload(UploadRequest::new(0, "once.bin", source)).await.unwrap_err();

    assert!(matches!(err, UploadError::SliceUploadExhausted { attempts: 1, .. }));
    assert_eq!(transport.puts().len(), 1);
}

#[tokio::test]
async fn test_async_completion_is_pending() {
    let api = MockApi::sliced(100).complete(json!({ "completed": false, "async": true, "fileID": 0 }));
    let uploader = Uploader::new(api, MockTransport::default());
    let (source, drops) = tracked(data(10));

    let outcome = uploader.upload(UploadRequest::new(0, "merge.bin", source)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::Pending { preupload_id: "pre-1".into() });
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_inconsistent_completion_fails() {
    let api = MockApi::sliced(100).complete(json!({ "completed": false, "async": false }));
    let uploader = Uploader::new(api, MockTransport::default());
    let (source, drops) = tracked(data(10));

    let err = uploader.upload(UploadRequest::new(0, "odd.bin", source)).await.unwrap_err();

    assert!(matches!(err, UploadError::UploadFailed { ref preupload_id } if preupload_id == "pre-1"));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_api_error_propagates() {
    let api = Arc::new(MockApi::sliced(100).fail_on(paths::GET_UPLOAD_URL));
    let transport = Arc::new(MockTransport::default());
    let uploader = Uploader::new(api.clone(), transport.clone());
    let (source, drops) = tracked(data(10));

    let err = uploader.upload(UploadRequest::new(0, "x.bin", source)).await.unwrap_err();

    assert!(matches!(err, UploadError::Api(ApiError::Api { code: 5000, .. })));
    assert!(transport.puts().is_empty());
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_between_slices() {
    let api = Arc::new(MockApi::sliced(100));
    let transport = Arc::new(MockTransport::default());
    let token = CancellationToken::new();
    let trigger = token.clone();
    let options = UploadOptions::default().cancel(token).on_progress(Arc::new(move |event: &ProgressEvent| {
        if let ProgressEvent::UploadingSlice { seq: 1, .. } = event {
            trigger.cancel();
        }
    }));
    let uploader = Uploader::new(api.clone(), transport.clone()).with_options(options);
    let (source, drops) = tracked(data(300));

    let err = uploader.upload(UploadRequest::new(0, "stop.bin", source)).await.unwrap_err();

    assert!(matches!(err, UploadError::Cancelled));
    // The in-flight slice finishes; the next one is never requested.
    assert_eq!(transport.puts().len(), 1);
    assert_eq!(api.calls_to(paths::GET_UPLOAD_URL).len(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_before_retry() {
    let transport = Arc::new(MockTransport::always_failing());
    let token = CancellationToken::new();
    let trigger = token.clone();
    let options = UploadOptions::default()
        .max_retries(5)
        .retry_backoff(Duration::ZERO)
        .cancel(token)
        .on_progress(Arc::new(move |event: &ProgressEvent| {
            if let ProgressEvent::RetryingSlice { .. } = event {
                trigger.cancel();
            }
        }));
    let uploader = Uploader::new(MockApi::sliced(100), transport.clone()).with_options(options);
    let (source, _) = tracked(data(10));

    let err = uploader.upload(UploadRequest::new(0, "stop.bin", source)).await.unwrap_err();

    assert!(matches!(err, UploadError::Cancelled));
    assert_eq!(transport.puts().len(), 1, "no put may follow the cancellation");
}

#[tokio::test]
async fn test_worked_example_part_two_short() {
    let api = Arc::new(MockApi::sliced(100 * MIB).parts(json!({ "parts": [
        { "partNumber": 1, "size": 100 * MIB },
        { "partNumber": 2, "size": 99 * MIB },
        { "partNumber": 3, "size": 50 * MIB }
    ]})));
    let transport = Arc::new(MockTransport::default());
    let uploader = Uploader::new(api.clone(), transport.clone());
    let source = Zeros { len: 250 * MIB, pos: 0 };

    let err = uploader.upload(UploadRequest::new(0, "big.bin", source)).await.unwrap_err();

    let sizes: Vec<usize> = transport.puts().iter().map(|(_, len)| *len).collect();
    assert_eq!(sizes, vec![100 * MIB as usize, 100 * MIB as usize, 50 * MIB as usize]);
    match err {
        UploadError::PartSizeMismatch { slice_no, local, remote, .. } => {
            assert_eq!(slice_no, 2);
            assert_eq!(local, 100 * MIB);
            assert_eq!(remote, 99 * MIB);
        }
        other => panic!("expected PartSizeMismatch, got {other:?}"),
    }
    assert!(api.calls_to(paths::UPLOAD_COMPLETE).is_empty());
}

#[tokio::test]
async fn test_upload_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    let content = data(5000);
    std::fs::write(&path, &content).unwrap();

    let api = Arc::new(MockApi::sliced(2048).parts(json!({ "parts": [
        { "partNumber": "1", "size": 2048 },
        { "partNumber": "2", "size": 2048 },
        { "partNumber": "3", "size": 904 }
    ]})));
    let transport = Arc::new(MockTransport::default());
    let uploader = Uploader::new(api.clone(), transport.clone());
    let file = tokio::fs::File::open(&path).await.unwrap();

    let outcome = uploader.upload(UploadRequest::new(3, "payload.bin", file)).await.unwrap();

    assert_eq!(outcome.file_id(), Some(777));
    assert_eq!(
        api.calls_to(paths::CREATE_FILE)[0]["etag"],
        json!(Md5Hasher::digest(&content).to_hex())
    );
    assert_eq!(transport.puts().iter().map(|(_, len)| len).sum::<usize>(), 5000);
}
