// Settings Module
//
// Typed configuration document, versioned migration, and on-disk storage

pub mod schema;
pub mod store;

pub use schema::{MinerDefinition, MinerKind, Settings, UiSettings, XmrigSettings, SETTINGS_VERSION};
pub use store::{app_dir, load_settings, portable_dir, save_settings, settings_path};
