//! Test harness for running the same test against every store.

use std::sync::Arc;

use async_trait::async_trait;
use locus_discovery::backends::InMemoryStore;
#[cfg(feature = "sqlite")]
use locus_discovery::backends::SqliteStore;
use locus_discovery::core::{BackendKind, ProjectionStore};
use locus_discovery::error::DiscoveryResult;
use locus_discovery::types::SearchableProviderRecord;
use locus_discovery::{DiscoveryConfig, ProjectionMaintainer, SearchEngine};

/// Stores that can be created empty for a test.
#[async_trait]
pub trait TestableStore: ProjectionStore + std::fmt::Debug + Sized + 'static {
    /// Returns a new, empty store.
    fn fresh() -> Self;

    /// The kind of store under test.
    fn store_kind(&self) -> BackendKind {
        self.kind()
    }

    /// Inserts records that must not exist yet.
    async fn seed(&self, records: Vec<SearchableProviderRecord>) -> DiscoveryResult<()> {
        for record in records {
            self.save(record, None).await?;
        }
        Ok(())
    }
}

impl TestableStore for InMemoryStore {
    fn fresh() -> Self {
        InMemoryStore::from_config(&DiscoveryConfig::for_testing())
    }
}

#[cfg(feature = "sqlite")]
impl TestableStore for SqliteStore {
    fn fresh() -> Self {
        SqliteStore::in_memory().expect("Failed to create SQLite store")
    }
}

/// A store shared by a maintainer and an engine.
pub struct TestContext<S: TestableStore> {
    /// The store under test.
    pub store: Arc<S>,
    /// Writer.
    pub maintainer: ProjectionMaintainer<S>,
    /// Reader.
    pub engine: SearchEngine<S>,
}

impl<S: TestableStore> TestContext<S> {
    /// Creates a context over a fresh store.
    pub fn new() -> Self {
        Self::with_config(DiscoveryConfig::for_testing())
    }

    /// Creates a context with a custom configuration.
    pub fn with_config(config: DiscoveryConfig) -> Self {
        let store = Arc::new(S::fresh());
        Self {
            maintainer: ProjectionMaintainer::with_config(Arc::clone(&store), &config),
            engine: SearchEngine::with_config(Arc::clone(&store), config),
            store,
        }
    }
}

/// Generates one `#[tokio::test]` per store for each named test function.
///
/// Each function must be `async fn name<S: TestableStore>(ctx: TestContext<S>)`.
macro_rules! store_test {
    ($name:ident) => {
        paste::paste! {
            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn [<memory_ $name>]() {
                $name(common::TestContext::<locus_discovery::backends::InMemoryStore>::new()).await;
            }

            #[cfg(feature = "sqlite")]
            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn [<sqlite_ $name>]() {
                $name(common::TestContext::<locus_discovery::backends::SqliteStore>::new()).await;
            }
        }
    };
    ($($name:ident),+ $(,)?) => {
        $(store_test!($name);)+
    };
}
