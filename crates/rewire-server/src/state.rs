use rewire_store::SqliteStore;

/// Shared application state injected into every handler, per the
/// "Store is the only shared mutable resource" design note (SPEC_FULL.md §9).
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub admin_token: String,
    pub base_url: String,
}

impl AppState {
    #[must_use]
    pub const fn new(store: SqliteStore, admin_token: String, base_url: String) -> Self {
        Self {
            store,
            admin_token,
            base_url,
        }
    }
}
