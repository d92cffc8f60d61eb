//! Engine tests over a fake remote store and in-memory local storage.
//!
//! - `harness.rs`    - Fake remote store, manual clock, engine wiring
//! - `local.rs`      - Signed out: local list, preview map, reload
//! - `quota.rs`      - Local persistence degrading under capacity limits
//! - `remote.rs`     - Signed in: load, background writes, push events, deletes
//! - `completion.rs` - Finalizing entries by id and by earliest analyzing
//! - `scan.rs`       - Precheck, analysis deadline, end-to-end scans

pub(crate) mod harness;
mod quota;
