pub mod server;
pub mod settings;

pub use server::PropMetaBackend;
pub use settings::{Settings, SettingsError};
