//! File queue: the ingestion state machine.
//!
//! Every submitted file becomes a [`FileEntry`] with a stable [`EntryId`].
//! [`FileQueue::advance`] moves one entry through its lifecycle:
//!
//! ```text
//! NeedsDownload --fetch ok--> Loading --decode ok--> Ready
//! NeedsDownload --fetch fail--> Error
//! Loading --decode fail--> Error
//! Loading (raw without info) --> NeedsInfo
//! NeedsInfo --info supplied--> Loading
//! ```
//!
//! The queue is a cheap-to-clone handle. State lives behind a
//! `parking_lot::Mutex` that is never held across an `.await`: each step
//! snapshots what it needs, releases the lock for I/O and re-acquires it to
//! commit the transition. Changes are published on a broadcast channel.
//!
//! Only one `advance` runs per entry at a time. A second caller waits for
//! the first to finish and then re-examines the entry, and a decode whose raw
//! info was replaced while it ran is discarded and repeated.

mod entry;
mod events;
mod state;

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};

use crate::archive::ArchiveExpander;
use crate::blob::Blob;
use crate::config::PipelineConfig;
use crate::error::IngestError;
use crate::fetch::{ProgressCallback, RemoteFetcher};
use crate::progress::{Progress, TotalProgress};
use crate::reader::{
    Decoded, DecodeJob, RawVolumeInfo, ReaderRegistry, DICOM_EXTENSION, GZIP_EXTENSION,
};

pub use entry::{
    EntryId, EntryState, EntryStateKind, FileEntry, RemoteDescriptor, RemoteFile, RequestOptions,
    SceneKeys, Submission, DATA_TYPE_KEYS,
};
pub use events::QueueEvent;

use state::{Begin, QueueState};

/// What `advance` should do next for an entry.
enum Step {
    Fetch { name: String, remote: RemoteDescriptor },
    Decode(DecodeJob),
    Idle,
}

struct QueueInner {
    state: Mutex<QueueState>,
    config: PipelineConfig,
    readers: ReaderRegistry,
    archives: ArchiveExpander,
    fetcher: Arc<dyn RemoteFetcher>,
    events: broadcast::Sender<QueueEvent>,
    /// Woken whenever an entry's `advance` finishes.
    settled: Notify,
}

impl QueueInner {
    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Apply a transition and publish the new state if it took effect.
    fn transition<F>(&self, id: EntryId, apply: F) -> bool
    where
        F: FnOnce(&mut QueueState) -> bool,
    {
        let new_state = {
            let mut state = self.state.lock();
            if !apply(&mut state) {
                return false;
            }
            state.get(id).map(|e| e.state.kind())
        };

        if let Some(kind) = new_state {
            debug!(entry = %id, state = %kind, "Entry state changed");
            self.emit(QueueEvent::StateChanged { id, state: kind });
        }
        true
    }

    /// Commit a decode outcome made with raw info `info`.
    ///
    /// Returns false, leaving the entry alone, if its raw info changed while
    /// the decode ran.
    fn settle<F>(&self, id: EntryId, info: Option<RawVolumeInfo>, apply: F) -> bool
    where
        F: FnOnce(&mut QueueState) -> bool,
    {
        let mut stale = false;
        let applied = self.transition(id, |s| {
            if s.raw_info_changed(id, info) {
                stale = true;
                return false;
            }
            apply(s)
        });

        if stale {
            debug!(entry = %id, "Raw info changed during decode, decoding again");
        } else if !applied {
            debug!(entry = %id, "Dropping decode result for removed or settled entry");
        }
        !stale
    }

    fn fail(&self, id: EntryId, error: &IngestError) {
        let message = error.to_string();
        if !self.transition(id, |s| s.set_error(id, message)) {
            debug!(entry = %id, "Dropping failure for removed or settled entry");
        }
    }
}

/// Clears an entry's busy mark when its `advance` finishes.
struct BusyGuard<'a> {
    inner: &'a QueueInner,
    id: EntryId,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.inner.state.lock().finish(self.id);
        self.inner.settled.notify_waiters();
    }
}

/// Keeps the loading flag set for the lifetime of a commit pass.
pub struct LoadingGuard {
    inner: Arc<QueueInner>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.inner.state.lock().loading = false;
        self.inner.emit(QueueEvent::LoadingChanged(false));
    }
}

/// Handle to the ingestion queue.
#[derive(Clone)]
pub struct FileQueue {
    inner: Arc<QueueInner>,
}

impl FileQueue {
    /// Create an empty queue.
    pub fn new(
        config: PipelineConfig,
        readers: ReaderRegistry,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let archives = ArchiveExpander::new(readers.supported_extensions())
            .with_gzip_passthrough(readers.has_reader(GZIP_EXTENSION));

        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::new()),
                config,
                readers,
                archives,
                fetcher,
                events,
                settled: Notify::new(),
            }),
        }
    }

    /// Pipeline configuration of this queue.
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Append a submission without advancing it.
    pub fn submit(&self, submission: Submission) -> EntryId {
        let id = EntryId::next();
        let entry = FileEntry::from_submission(id, submission);
        let name = entry.name.clone();

        self.inner.state.lock().push(entry);
        debug!(entry = %id, name = %name, "Entry added");
        self.inner.emit(QueueEvent::Added { id, name });
        id
    }

    /// Open local files.
    ///
    /// Archives are expanded first and unsupported files are skipped. All
    /// `.dcm` files of the batch become one series entry, named after the
    /// first slice and queued ahead of the regular files. A gzip file whose
    /// contents cannot be decompressed is queued last, already in `Error`.
    /// Every entry in the queue is then advanced.
    pub async fn open_files(&self, files: Vec<Blob>) -> Vec<EntryId> {
        let expansion = self.inner.archives.expand(files).await;

        let mut dicom = Vec::new();
        let mut regular = Vec::new();
        for blob in expansion.files {
            let ext = blob.extension();
            if !self.inner.archives.is_supported(&ext) {
                debug!(name = blob.name(), extension = %ext, "Skipping unsupported file");
                continue;
            }
            if ext == DICOM_EXTENSION {
                dicom.push(blob);
            } else {
                regular.push(blob);
            }
        }

        let mut ids = Vec::new();
        if let Some(first) = dicom.first() {
            let name = first.name().to_string();
            ids.push(self.submit(Submission::Dicom { name, blobs: dicom }));
        }
        for blob in regular {
            ids.push(self.submit(Submission::regular(blob)));
        }
        for (blob, error) in expansion.unreadable {
            let id = self.submit(Submission::regular(blob));
            self.inner.fail(id, &error);
            ids.push(id);
        }

        self.advance_all().await;
        ids
    }

    /// Open remote files, then advance every entry.
    pub async fn open_remote_files(&self, remotes: Vec<RemoteFile>) -> Vec<EntryId> {
        let ids = remotes
            .into_iter()
            .map(|remote| self.submit(Submission::Remote(remote)))
            .collect();

        self.advance_all().await;
        ids
    }

    /// Advance every entry concurrently and wait until all have settled.
    pub async fn advance_all(&self) {
        let ids = self.inner.state.lock().ids();
        join_all(ids.into_iter().map(|id| self.advance(id))).await;
    }

    /// Move one entry as far through its lifecycle as it can go.
    ///
    /// A no-op for terminal, removed and info-waiting entries. If another
    /// advance of the entry is in flight, this waits for it to finish and
    /// then picks up whatever is left to do.
    pub async fn advance(&self, id: EntryId) {
        loop {
            let settled = self.inner.settled.notified();
            let begin = self.inner.state.lock().try_begin(id);
            match begin {
                Begin::Started => break,
                Begin::Missing => return,
                Begin::Busy => {
                    debug!(entry = %id, "Waiting for in-flight advance");
                    settled.await;
                }
            }
        }
        let _busy = BusyGuard {
            inner: &self.inner,
            id,
        };

        loop {
            match self.next_step(id) {
                Step::Idle => return,
                Step::Fetch { name, remote } => {
                    let blob = match self.fetch(id, &name, &remote).await {
                        Ok(blob) => blob,
                        Err(e) => {
                            self.inner.fail(id, &e);
                            return;
                        }
                    };

                    if !self.inner.transition(id, |s| s.set_remote_file(id, blob)) {
                        debug!(entry = %id, "Dropping download for removed entry");
                        return;
                    }
                    // Fetched: go round again to decode.
                }
                Step::Decode(job) => {
                    if self.decode(id, job).await {
                        return;
                    }
                }
            }
        }
    }

    fn next_step(&self, id: EntryId) -> Step {
        let state = self.inner.state.lock();
        let Some(entry) = state.get(id) else {
            return Step::Idle;
        };

        match &entry.state {
            EntryState::NeedsDownload => match &entry.remote {
                Some(remote) => Step::Fetch {
                    name: entry.name.clone(),
                    remote: remote.clone(),
                },
                None => Step::Idle,
            },
            EntryState::Loading => Step::Decode(DecodeJob {
                name: entry.name.clone(),
                extension: entry.extension.clone(),
                files: entry.source_files.clone(),
                extra_info: entry.extra_info,
                preceded_by_state_bundle: state
                    .preceded_by_extension(id, self.inner.readers.state_bundle_extension()),
            }),
            EntryState::NeedsInfo | EntryState::Ready(_) | EntryState::Error(_) => Step::Idle,
        }
    }

    async fn fetch(
        &self,
        id: EntryId,
        name: &str,
        remote: &RemoteDescriptor,
    ) -> crate::IngestResult<Blob> {
        let inner = Arc::clone(&self.inner);
        let on_progress: ProgressCallback = Box::new(move |progress: Progress| {
            let total = {
                let mut state = inner.state.lock();
                if state.get(id).is_none() {
                    return;
                }
                state.progress.set(id, progress);
                state.progress.total()
            };
            inner.emit(QueueEvent::Progress(total));
        });

        debug!(entry = %id, url = %remote.url, "Downloading");
        self.inner.fetcher.fetch(name, remote, on_progress).await
    }

    /// Decode an entry and commit the outcome.
    ///
    /// Returns false if the outcome was discarded because the entry's raw
    /// info changed in the meantime.
    async fn decode(&self, id: EntryId, job: DecodeJob) -> bool {
        let name = job.name.clone();
        let extension = job.extension.clone();
        let info = job.extra_info;

        match self.inner.readers.decode(job).await {
            Ok(Decoded::Ready(result)) => self.inner.settle(id, info, |s| s.set_ready(id, result)),
            Ok(Decoded::NeedsInfo) => self.inner.settle(id, info, |s| s.set_needs_info(id)),
            Ok(Decoded::Nothing) => {
                let stale = self.inner.state.lock().raw_info_changed(id, info);
                if !stale {
                    debug!(entry = %id, name = %name, "Nothing decoded, entry left loading");
                }
                !stale
            }
            Err(e) => {
                warn!(entry = %id, name = %name, extension = %extension, error = %e, "Decode failed");
                let message = e.to_string();
                self.inner.settle(id, info, |s| s.set_error(id, message))
            }
        }
    }

    /// Supply or clear raw volume geometry for an entry.
    ///
    /// With `Some` the entry moves to `Loading` and is advanced. With `None`
    /// it returns to `NeedsInfo`.
    pub async fn set_raw_info(&self, id: EntryId, info: Option<RawVolumeInfo>) {
        let resume = info.is_some();
        if !self.inner.transition(id, |s| s.set_raw_info(id, info)) {
            debug!(entry = %id, "Raw info ignored");
            return;
        }
        if resume {
            self.advance(id).await;
        }
    }

    /// Remove one entry. In-flight work for it is not cancelled; its result
    /// is dropped on arrival.
    pub fn delete(&self, id: EntryId) -> bool {
        let removed = self.inner.state.lock().remove(id);
        if removed {
            debug!(entry = %id, "Entry removed");
            self.inner.emit(QueueEvent::Removed { id });
        }
        removed
    }

    /// Remove every entry.
    pub fn reset(&self) {
        self.inner.state.lock().reset();
        info!("File queue reset");
        self.inner.emit(QueueEvent::Reset);
    }

    /// Snapshot of all entries in queue order.
    pub fn entries(&self) -> Vec<FileEntry> {
        self.inner.state.lock().snapshot()
    }

    /// Snapshot of one entry.
    pub fn entry(&self, id: EntryId) -> Option<FileEntry> {
        self.inner.state.lock().get(id).cloned()
    }

    /// `Ready` entries in queue order.
    pub fn ready_entries(&self) -> Vec<FileEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.decoded().is_some())
            .collect()
    }

    /// Whether any entry ended in `Error`.
    pub fn any_errors(&self) -> bool {
        self.inner.state.lock().any_errors()
    }

    /// Aggregate download progress.
    pub fn total_progress(&self) -> TotalProgress {
        self.inner.state.lock().progress.total()
    }

    /// Whether a commit pass is running.
    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    /// Start a commit pass: set the loading flag and clear progress.
    ///
    /// The flag is cleared when the returned guard drops.
    pub fn begin_loading(&self) -> LoadingGuard {
        {
            let mut state = self.inner.state.lock();
            state.loading = true;
            state.progress.clear();
        }
        self.inner.emit(QueueEvent::LoadingChanged(true));
        LoadingGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DecodedResult, ElementType};
    use crate::error::IngestResult;
    use crate::reader::DatasetReader;
    use crate::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Serves fixed bodies by URL; unknown URLs fail.
    struct StaticFetcher {
        calls: AtomicUsize,
    }

    impl RemoteFetcher for StaticFetcher {
        fn fetch<'a>(
            &'a self,
            name: &'a str,
            remote: &'a RemoteDescriptor,
            on_progress: ProgressCallback,
        ) -> BoxFuture<'a, IngestResult<Blob>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                on_progress(Progress::Fraction(1.0));
                if remote.url.ends_with("missing") {
                    Err(IngestError::FetchFailure)
                } else {
                    Ok(Blob::new(name, remote.url.clone().into_bytes()))
                }
            })
        }
    }

    struct VtiReader;

    impl DatasetReader for VtiReader {
        fn extensions(&self) -> Vec<String> {
            vec!["vti".to_string()]
        }

        fn read(&self, files: Vec<Blob>) -> BoxFuture<'_, IngestResult<Vec<DecodedResult>>> {
            Box::pin(async move {
                let results: Vec<DecodedResult> = files
                    .iter()
                    .map(|f| DecodedResult::dataset(f.name(), Dataset::Measurements(vec![])))
                    .collect();
                Ok(results)
            })
        }
    }

    /// `.vtk` reader that holds every read until a permit is added.
    struct GatedReader {
        gate: Semaphore,
        reads: AtomicUsize,
    }

    impl DatasetReader for GatedReader {
        fn extensions(&self) -> Vec<String> {
            vec!["vtk".to_string()]
        }

        fn read(&self, files: Vec<Blob>) -> BoxFuture<'_, IngestResult<Vec<DecodedResult>>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| IngestError::decode(e.to_string()))?;
                permit.forget();
                let results: Vec<DecodedResult> = files
                    .iter()
                    .map(|f| DecodedResult::dataset(f.name(), Dataset::Measurements(vec![])))
                    .collect();
                Ok(results)
            })
        }
    }

    fn gated_queue() -> (FileQueue, Arc<GatedReader>) {
        let reader = Arc::new(GatedReader {
            gate: Semaphore::new(0),
            reads: AtomicUsize::new(0),
        });
        let config = PipelineConfig::default();
        let readers = ReaderRegistry::with_builtins(&config).with_reader(reader.clone());
        let fetcher = Arc::new(StaticFetcher {
            calls: AtomicUsize::new(0),
        });
        (FileQueue::new(config, readers, fetcher), reader)
    }

    async fn wait_for_reads(reader: &GatedReader, count: usize) {
        while reader.reads.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    fn queue_with(fetcher: Arc<StaticFetcher>) -> FileQueue {
        let config = PipelineConfig::default();
        let readers = ReaderRegistry::with_builtins(&config).with_reader(Arc::new(VtiReader));
        FileQueue::new(config, readers, fetcher)
    }

    fn queue() -> FileQueue {
        queue_with(Arc::new(StaticFetcher {
            calls: AtomicUsize::new(0),
        }))
    }

    fn state_of(queue: &FileQueue, id: EntryId) -> EntryStateKind {
        queue.entry(id).unwrap().state.kind()
    }

    #[tokio::test]
    async fn test_open_files_decodes_regular_file() {
        let queue = queue();
        let ids = queue
            .open_files(vec![Blob::new("brain.vti", vec![1u8])])
            .await;

        assert_eq!(ids.len(), 1);
        assert_eq!(state_of(&queue, ids[0]), EntryStateKind::Ready);
        assert!(!queue.any_errors());
    }

    #[tokio::test]
    async fn test_open_files_skips_unsupported() {
        let queue = queue();
        let ids = queue
            .open_files(vec![
                Blob::new("notes.txt", vec![1u8]),
                Blob::new("brain.vti", vec![1u8]),
            ])
            .await;

        assert_eq!(ids.len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_open_files_gzip() {
        let queue = queue();
        let ids = queue
            .open_files(vec![
                Blob::new("brain.vti.gz", vec![1u8, 2, 3]),
                Blob::new("mesh.obj.gz", vec![1u8]),
            ])
            .await;

        // Unsupported contents never enter the queue; a corrupt stream does,
        // as an error.
        assert_eq!(ids.len(), 1);
        let entry = queue.entry(ids[0]).unwrap();
        assert_eq!(entry.name, "brain.vti");
        assert_eq!(entry.state.kind(), EntryStateKind::Error);
        assert!(queue.any_errors());
    }

    #[tokio::test]
    async fn test_open_files_groups_dicom_first() {
        let queue = queue();
        queue
            .open_files(vec![
                Blob::new("brain.vti", vec![1u8]),
                Blob::new("s1.dcm", vec![1u8]),
                Blob::new("s2.dcm", vec![2u8]),
            ])
            .await;

        let entries = queue.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "s1.dcm");
        assert_eq!(entries[0].source_files.len(), 2);
        // No series assembler registered.
        assert_eq!(entries[0].state.kind(), EntryStateKind::Error);
        assert_eq!(entries[1].name, "brain.vti");
    }

    #[tokio::test]
    async fn test_raw_waits_for_info() {
        let queue = queue();
        let ids = queue
            .open_files(vec![Blob::new("volume.raw", vec![0u8; 8])])
            .await;
        let id = ids[0];
        assert_eq!(state_of(&queue, id), EntryStateKind::NeedsInfo);

        queue.advance(id).await;
        assert_eq!(state_of(&queue, id), EntryStateKind::NeedsInfo);

        let info = RawVolumeInfo::new([2, 2, 2], [1.0; 3], ElementType::Uint8);
        queue.set_raw_info(id, Some(info)).await;
        assert_eq!(state_of(&queue, id), EntryStateKind::Ready);
    }

    #[tokio::test]
    async fn test_raw_info_supplied_during_decode_is_not_lost() {
        let (queue, reader) = gated_queue();
        let id = queue.submit(Submission::regular(Blob::new("mesh.vtk", vec![1u8])));

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.advance(id).await })
        };
        wait_for_reads(&reader, 1).await;

        let info = RawVolumeInfo::new([2, 1, 1], [1.0; 3], ElementType::Float32);
        let second = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.set_raw_info(id, Some(info)).await })
        };
        while queue.entry(id).unwrap().extra_info.is_none() {
            tokio::task::yield_now().await;
        }

        reader.gate.add_permits(2);
        first.await.unwrap();
        second.await.unwrap();

        // The first decode ran with outdated info and was repeated.
        assert_eq!(reader.reads.load(Ordering::SeqCst), 2);
        let entry = queue.entry(id).unwrap();
        assert_eq!(entry.state.kind(), EntryStateKind::Ready);
        assert_eq!(entry.extra_info, Some(info));
    }

    #[tokio::test]
    async fn test_advance_all_waits_for_in_flight_entry() {
        let (queue, reader) = gated_queue();
        let id = queue.submit(Submission::regular(Blob::new("mesh.vtk", vec![1u8])));

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.advance_all().await })
        };
        wait_for_reads(&reader, 1).await;

        let second = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.advance_all().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!second.is_finished());

        reader.gate.add_permits(1);
        second.await.unwrap();
        assert_eq!(state_of(&queue, id), EntryStateKind::Ready);

        first.await.unwrap();
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_advance_removed_entry_is_noop() {
        let queue = queue();
        let id = queue.submit(Submission::regular(Blob::new("a.vti", vec![1u8])));
        queue.delete(id);

        queue.advance(id).await;
        assert!(queue.entry(id).is_none());
    }

    #[tokio::test]
    async fn test_clear_raw_info_returns_to_needs_info() {
        let queue = queue();
        let id = queue.submit(Submission::regular(Blob::new("volume.raw", vec![0u8; 8])));
        queue.set_raw_info(id, None).await;

        let entry = queue.entry(id).unwrap();
        assert_eq!(entry.state.kind(), EntryStateKind::NeedsInfo);
        assert!(entry.extra_info.is_none());
    }

    #[tokio::test]
    async fn test_remote_fetch_then_decode() {
        let fetcher = Arc::new(StaticFetcher {
            calls: AtomicUsize::new(0),
        });
        let queue = queue_with(Arc::clone(&fetcher));
        let ids = queue
            .open_remote_files(vec![RemoteFile::new("ct.vti", "https://host/ct.vti")])
            .await;

        let entry = queue.entry(ids[0]).unwrap();
        assert_eq!(entry.state.kind(), EntryStateKind::Ready);
        assert_eq!(entry.source_files[0].name(), "ct.vti");
        assert_eq!(queue.total_progress(), TotalProgress::Determinate(1.0));

        // Terminal entries are not fetched again.
        queue.advance_all().await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_fetch_failure() {
        let queue = queue();
        let ids = queue
            .open_remote_files(vec![RemoteFile::new("ct.vti", "https://host/missing")])
            .await;

        let entry = queue.entry(ids[0]).unwrap();
        assert_eq!(entry.error(), Some("Failed to download file"));
        assert!(queue.any_errors());
    }

    #[tokio::test]
    async fn test_second_state_bundle_rejected() {
        let queue = queue();
        let ids = queue
            .open_files(vec![
                Blob::new("one.glance", vec![1u8]),
                Blob::new("two.glance", vec![2u8]),
            ])
            .await;

        assert_eq!(state_of(&queue, ids[0]), EntryStateKind::Ready);
        let second = queue.entry(ids[1]).unwrap();
        assert_eq!(second.error(), Some("Cannot load multiple state files"));
    }

    #[tokio::test]
    async fn test_delete_and_reset_emit_events() {
        let queue = queue();
        let mut events = queue.subscribe();

        let a = queue.submit(Submission::regular(Blob::new("a.vti", vec![1u8])));
        let _b = queue.submit(Submission::regular(Blob::new("b.vti", vec![1u8])));
        assert!(queue.delete(a));
        assert!(!queue.delete(a));
        queue.reset();

        assert!(matches!(events.recv().await.unwrap(), QueueEvent::Added { .. }));
        assert!(matches!(events.recv().await.unwrap(), QueueEvent::Added { .. }));
        assert_eq!(events.recv().await.unwrap(), QueueEvent::Removed { id: a });
        assert_eq!(events.recv().await.unwrap(), QueueEvent::Reset);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_loading_guard_clears_flag() {
        let queue = queue();
        {
            let _guard = queue.begin_loading();
            assert!(queue.is_loading());
        }
        assert!(!queue.is_loading());
    }
}
