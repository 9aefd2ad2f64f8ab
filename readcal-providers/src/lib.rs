//! Metadata source adapters.
//!
//! Each adapter wraps one external source behind the [`MetadataProvider`]
//! trait (and optionally [`CountProvider`] for chapter-count races). The
//! [`ProviderRegistry`] is built once at startup in priority order.

pub mod anilist;
pub mod client;
pub mod error;
pub mod jikan;
pub mod mangadex;
pub mod provider;
pub mod registry;
pub mod retry;

pub use anilist::AniListProvider;
pub use client::HttpClient;
pub use jikan::JikanProvider;
pub use mangadex::MangaDexProvider;
pub use provider::{CountProvider, MetadataProvider};
pub use readcal_core::ProviderError;
pub use registry::{ProviderInfo, ProviderRegistry};
pub use retry::with_retries;
