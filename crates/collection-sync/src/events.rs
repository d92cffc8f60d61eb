use crate::EntryId;

/// Side-channel notifications for listeners outside the engine, such as
/// reward counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    /// A completed entry reached the remote store.
    EntryPushed {
        entry_id: EntryId,
        species: Option<String>,
    },
}

pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;
