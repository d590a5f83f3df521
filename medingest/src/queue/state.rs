//! Lock-protected queue state and its guarded transitions.
//!
//! Every transition checks the entry's current state first and reports
//! whether it was applied. Callers hold the lock only for the duration of a
//! single call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::blob::Blob;
use crate::dataset::DecodedResult;
use crate::progress::ProgressMap;
use crate::reader::RawVolumeInfo;

use super::entry::{EntryId, EntryState, FileEntry};

/// Outcome of trying to claim an entry for `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Begin {
    Started,
    Busy,
    Missing,
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    order: Vec<EntryId>,
    entries: HashMap<EntryId, FileEntry>,
    /// Entries with an `advance` in flight.
    busy: HashSet<EntryId>,
    pub(crate) progress: ProgressMap,
    pub(crate) loading: bool,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn get(&self, id: EntryId) -> Option<&FileEntry> {
        self.entries.get(&id)
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.order.clone()
    }

    /// Snapshot of all entries in queue order.
    pub fn snapshot(&self) -> Vec<FileEntry> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .cloned()
            .collect()
    }

    pub fn any_errors(&self) -> bool {
        self.entries
            .values()
            .any(|e| matches!(e.state, EntryState::Error(_)))
    }

    pub fn push(&mut self, entry: FileEntry) -> EntryId {
        let id = entry.id;
        self.order.push(id);
        self.entries.insert(id, entry);
        id
    }

    /// Whether an entry earlier in queue order has the given extension.
    pub fn preceded_by_extension(&self, id: EntryId, extension: &str) -> bool {
        self.order
            .iter()
            .take_while(|other| **other != id)
            .filter_map(|other| self.entries.get(other))
            .any(|e| e.extension == extension)
    }

    /// Mark an entry busy.
    pub fn try_begin(&mut self, id: EntryId) -> Begin {
        if !self.entries.contains_key(&id) {
            Begin::Missing
        } else if self.busy.insert(id) {
            Begin::Started
        } else {
            Begin::Busy
        }
    }

    pub fn finish(&mut self, id: EntryId) {
        self.busy.remove(&id);
    }

    /// Whether the entry's raw info is no longer `info`.
    pub fn raw_info_changed(&self, id: EntryId, info: Option<RawVolumeInfo>) -> bool {
        self.entries.get(&id).is_some_and(|e| e.extra_info != info)
    }

    /// `NeedsDownload -> Loading` with the downloaded blob as sole source.
    pub fn set_remote_file(&mut self, id: EntryId, blob: Blob) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if matches!(entry.state, EntryState::NeedsDownload) => {
                entry.source_files = vec![blob];
                entry.state = EntryState::Loading;
                true
            }
            _ => false,
        }
    }

    /// `Loading -> NeedsInfo`.
    pub fn set_needs_info(&mut self, id: EntryId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if matches!(entry.state, EntryState::Loading) => {
                entry.state = EntryState::NeedsInfo;
                true
            }
            _ => false,
        }
    }

    /// `Loading -> Ready`.
    pub fn set_ready(&mut self, id: EntryId, decoded: DecodedResult) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if matches!(entry.state, EntryState::Loading) => {
                entry.state = EntryState::Ready(Arc::new(decoded));
                true
            }
            _ => false,
        }
    }

    /// Any non-terminal state `-> Error`.
    pub fn set_error(&mut self, id: EntryId, message: String) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if !entry.state.is_terminal() => {
                entry.state = EntryState::Error(message);
                true
            }
            _ => false,
        }
    }

    /// Store or clear raw geometry.
    ///
    /// `Some` moves the entry to `Loading`, `None` back to `NeedsInfo`.
    /// Terminal entries and entries still waiting for their download are
    /// left alone.
    pub fn set_raw_info(&mut self, id: EntryId, info: Option<RawVolumeInfo>) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry)
                if !entry.state.is_terminal()
                    && !matches!(entry.state, EntryState::NeedsDownload) =>
            {
                entry.state = if info.is_some() {
                    EntryState::Loading
                } else {
                    EntryState::NeedsInfo
                };
                entry.extra_info = info;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: EntryId) -> bool {
        if self.entries.remove(&id).is_none() {
            return false;
        }
        self.order.retain(|other| *other != id);
        self.progress.remove(id);
        true
    }

    /// Drop all entries. In-flight operations find no target afterwards.
    pub fn reset(&mut self) {
        self.order.clear();
        self.entries.clear();
        self.progress.clear();
    }
}
