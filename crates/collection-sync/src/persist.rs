//! Writing the collection to the local store.

use crate::CollectionEntry;
use image_preview::Preview;
use plant_local_storage::{LocalStore, PreviewMap};
use std::collections::HashSet;
use tracing::{debug, warn};

/// How far `persist_local` had to degrade to get the list written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// List with embedded previews and the full preview map.
    Complete,
    /// List without previews and a preview map cut to the newest entry.
    PreviewMapShrunk,
    /// Nothing could be written.
    Failed,
}

/// Write `entries` and the auxiliary preview map.
///
/// Ephemeral previews are never written. The map keeps durable previews for
/// ids still in the list, so an entry saved later without its preview keeps
/// it. Failures are logged and reported through the outcome only.
pub(crate) fn persist_local(local: &LocalStore, entries: &[CollectionEntry]) -> PersistOutcome {
    let map = merged_preview_map(local, entries);
    let map_written = match local.set_preview_map(&map) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, previews = map.len(), "Failed to write preview map");
            false
        }
    };

    let full: Vec<_> = entries
        .iter()
        .map(|entry| entry.to_record(entry.preview().and_then(Preview::durable)))
        .collect();
    match local.set_entry_list(&full) {
        Ok(()) if map_written => {
            debug!(entries = entries.len(), "Persisted collection locally");
            return PersistOutcome::Complete;
        }
        Ok(()) => {
            shrink_preview_map(local, entries, &map);
            return PersistOutcome::PreviewMapShrunk;
        }
        Err(e) if e.is_quota_exceeded() => {
            warn!(error = %e, "Local collection over quota, retrying without previews");
        }
        Err(e) => {
            warn!(error = %e, "Failed to persist collection locally");
            return PersistOutcome::Failed;
        }
    }

    let stripped: Vec<_> = entries.iter().map(|entry| entry.to_record(None)).collect();
    // A list over quota leaves at most the newest preview in the map.
    match local.set_entry_list(&stripped) {
        Ok(()) => {
            shrink_preview_map(local, entries, &map);
            return PersistOutcome::PreviewMapShrunk;
        }
        Err(e) => {
            warn!(error = %e, "Stripped collection still rejected, shrinking preview map");
        }
    }

    shrink_preview_map(local, entries, &map);
    match local.set_entry_list(&stripped) {
        Ok(()) => PersistOutcome::PreviewMapShrunk,
        Err(e) => {
            warn!(error = %e, entries = entries.len(), "Giving up on local persistence");
            PersistOutcome::Failed
        }
    }
}

fn merged_preview_map(local: &LocalStore, entries: &[CollectionEntry]) -> PreviewMap {
    let stored = local.preview_map().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read preview map");
        PreviewMap::new()
    });

    let ids: HashSet<&str> = entries.iter().map(|entry| entry.id().as_str()).collect();
    let mut map: PreviewMap = stored
        .into_iter()
        .filter(|(id, _)| ids.contains(id.as_str()))
        .collect();

    for entry in entries {
        if let Some(durable) = entry.preview().and_then(Preview::durable) {
            map.insert(entry.id().to_string(), durable.as_str().to_string());
        }
    }
    map
}

/// Keep only the preview of the most recently created entry that has one.
fn shrink_preview_map(local: &LocalStore, entries: &[CollectionEntry], map: &PreviewMap) {
    // Ties go to list order, which is newest first.
    let newest = entries
        .iter()
        .filter(|entry| map.contains_key(entry.id().as_str()))
        .reduce(|best, entry| {
            if entry.created_at() > best.created_at() {
                entry
            } else {
                best
            }
        });

    let mut shrunk = PreviewMap::new();
    if let Some(entry) = newest {
        if let Some(preview) = map.get(entry.id().as_str()) {
            shrunk.insert(entry.id().to_string(), preview.clone());
        }
    }

    if let Err(e) = local.set_preview_map(&shrunk) {
        warn!(error = %e, "Shrunk preview map rejected, dropping it");
        if let Err(e) = local.set_preview_map(&PreviewMap::new()) {
            warn!(error = %e, "Failed to reset preview map");
        }
    }
}
