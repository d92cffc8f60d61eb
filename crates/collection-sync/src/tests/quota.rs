//! Local persistence under capacity limits.

use super::harness::EngineHarness;
use crate::PersistOutcome;
use auth_bridge::AuthSession;
use image_preview::{CapturedImage, Preview};
use plant_local_storage::MemoryStorage;

fn photo(seed: u8) -> CapturedImage {
    CapturedImage::new(vec![seed; 600], "image/jpeg").with_file_name(format!("leaf-{}.jpg", seed))
}

async fn fill(h: &EngineHarness, count: u8) -> Vec<crate::EntryId> {
    let mut ids = Vec::new();
    for seed in 1..=count {
        h.clock.advance_secs(1);
        ids.push(h.engine.append(photo(seed), "Central Texas").await);
    }
    ids
}

#[tokio::test]
async fn oversized_collection_keeps_list_and_newest_preview() {
    // One preview fits in a single write, two do not.
    let h = EngineHarness::new(
        AuthSession::unauthenticated(),
        MemoryStorage::with_write_limit(1500),
        50,
    );
    let ids = fill(&h, 3).await;

    assert_eq!(
        h.engine.persist_local(&h.engine.entries()),
        PersistOutcome::PreviewMapShrunk
    );

    let stored = h.stored_records();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|record| record.preview.is_none()));

    let map = h.local.preview_map().unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(ids[2].as_str()));

    let reloaded = h.reload();
    reloaded.load().await.unwrap();
    assert!(reloaded.entry(&ids[2]).unwrap().preview().is_some());
    assert!(reloaded.entry(&ids[0]).unwrap().preview().is_none());
}

#[tokio::test]
async fn list_over_limit_shrinks_map_even_when_map_fits() {
    // The map of three previews fits; the list with them embedded does not.
    let h = EngineHarness::new(
        AuthSession::unauthenticated(),
        MemoryStorage::with_write_limit(2700),
        50,
    );
    let ids = fill(&h, 3).await;

    assert_eq!(
        h.engine.persist_local(&h.engine.entries()),
        PersistOutcome::PreviewMapShrunk
    );
    assert!(h.stored_records().iter().all(|record| record.preview.is_none()));

    let map = h.local.preview_map().unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(ids[2].as_str()));

    let reloaded = h.reload();
    reloaded.load().await.unwrap();
    assert!(matches!(
        reloaded.entry(&ids[2]).unwrap().preview(),
        Some(Preview::Durable(_))
    ));
    assert!(reloaded.entry(&ids[1]).unwrap().preview().is_none());
    assert!(reloaded.entry(&ids[0]).unwrap().preview().is_none());
}

#[tokio::test]
async fn total_quota_never_loses_the_list() {
    let h = EngineHarness::new(
        AuthSession::unauthenticated(),
        MemoryStorage::with_quota(2000),
        50,
    );
    let ids = fill(&h, 4).await;

    let stored = h.stored_records();
    let stored_ids: Vec<&str> = stored.iter().map(|record| record.id.as_str()).collect();
    let expected: Vec<&str> = ids.iter().rev().map(|id| id.as_str()).collect();
    assert_eq!(stored_ids, expected);
    assert!(h.local.preview_map().unwrap().len() <= 2);
}

#[tokio::test]
async fn nothing_fits_reports_failure() {
    let h = EngineHarness::new(
        AuthSession::unauthenticated(),
        MemoryStorage::with_write_limit(10),
        50,
    );
    fill(&h, 1).await;

    assert_eq!(
        h.engine.persist_local(&h.engine.entries()),
        PersistOutcome::Failed
    );
    assert_eq!(h.engine.entries().len(), 1);
}
