//! Test Helper Utilities
//!
//! Shared fakes and database setup for pokedex-lookup integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;

pub use db_utils::create_test_store;
pub use fakes::{FakeCache, FakeSource, FakeStore};

use pokedex_lookup::services::RecordPipeline;
use std::sync::Arc;

/// Fakes wired into a pipeline, kept for assertions on call counts
pub struct Harness {
    pub cache: Arc<FakeCache>,
    pub store: Arc<FakeStore>,
    pub source: Arc<FakeSource>,
}

impl Harness {
    pub fn new(source: FakeSource) -> Self {
        Self {
            cache: Arc::new(FakeCache::new()),
            store: Arc::new(FakeStore::new()),
            source: Arc::new(source),
        }
    }

    pub fn pipeline(&self) -> RecordPipeline {
        RecordPipeline::new(
            self.cache.clone(),
            self.store.clone(),
            self.source.clone(),
        )
    }
}
