pub mod database_url;
pub mod loader;
pub mod types;

pub use database_url::*;
pub use loader::*;
pub use types::*;
