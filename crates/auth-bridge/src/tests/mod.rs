//! Integration tests for the auth session bridge.
//!
//! - `harness.rs`      - Fake identity provider, fake backend, bridge wiring
//! - `auth_modes.rs`   - Deployment-mode fallback on exchange failure
//! - `sign_in.rs`      - Flow choice by device class, popup fallback
//! - `notifications.rs` - Identity notifications and redirect ordering
//! - `lifecycle.rs`    - Restore, revalidation, sign-out
