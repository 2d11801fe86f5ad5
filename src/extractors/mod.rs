pub mod sources;

pub use sources::RequestSources;
