//! Media-server notification adapters

mod media_server;

pub use media_server::{MediaServerNotifier, NoopNotifier};
