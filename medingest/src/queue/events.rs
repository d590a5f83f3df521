//! Change notifications published by the queue.

use crate::progress::TotalProgress;

use super::entry::{EntryId, EntryStateKind};

/// Event broadcast whenever the queue changes.
///
/// Subscribers that fall behind the channel capacity lose the oldest events
/// and should re-read [`FileQueue::entries`](super::FileQueue::entries).
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// An entry was appended.
    Added { id: EntryId, name: String },
    /// An entry changed state.
    StateChanged { id: EntryId, state: EntryStateKind },
    /// An entry was deleted.
    Removed { id: EntryId },
    /// All entries were removed.
    Reset,
    /// Aggregate download progress changed.
    Progress(TotalProgress),
    /// The commit pass started or finished.
    LoadingChanged(bool),
}
