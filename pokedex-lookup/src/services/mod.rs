//! Lookup tiers and the pipeline that sequences them

pub mod cache;
pub mod pipeline;
pub mod pokeapi_client;
pub mod record_store;
pub mod singleflight;

pub use cache::{cache_key, Cache, CacheError, InMemoryCache};
pub use pipeline::{normalize_key, Lookup, LookupError, RecordPipeline, Tier};
pub use pokeapi_client::{ExternalSource, PokeApiClient, SourceError, SourcePayload};
pub use record_store::{RecordStore, SqliteRecordStore, StoreError};
pub use singleflight::InFlight;
