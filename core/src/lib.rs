pub mod catalog;
pub mod db;
pub mod models;
pub mod quantity;
pub mod reconcile;
pub mod service;
pub mod store;

/// Format version written by `export_data` and required by `import_data`.
pub const EXPORT_VERSION: u32 = 1;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
