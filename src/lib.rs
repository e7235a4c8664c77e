//! Quran reader core: chapter/verse content from api.quran.com with a
//! session response cache, per-verse recitation playback with auto-advance,
//! and chapter navigation with a persisted last-recited marker.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod playback;
pub mod player;
pub mod session;
pub mod store;
pub mod view;

pub use api::ContentClient;
pub use cache::ResponseCache;
pub use config::Config;
pub use error::{Error, Result};
pub use navigation::{ChapterSnapshot, Navigator};
pub use session::{ChapterSession, SessionEvent};
