//! Storage key constants.

/// Keys used in the durable local store.
pub struct StorageKeys;

impl StorageKeys {
    /// Serialized collection list (JSON array of records)
    pub const ENTRY_LIST: &'static str = "imageCollection";

    /// Auxiliary id -> durable preview map (JSON object)
    pub const PREVIEW_MAP: &'static str = "imagePreviews";

    /// Last region the user selected
    pub const SELECTED_REGION: &'static str = "selectedRegion";

    /// Backend bearer token
    pub const BEARER_TOKEN: &'static str = "access_token";
}
