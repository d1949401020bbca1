//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use atelier_core::Locale;
use moka::future::Cache;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::content::ContentStore;
use crate::models::HomeResponse;
use crate::services::{PaymentClient, PaymentError};

/// How long a rendered homepage payload is served from memory.
const HOME_CACHE_TTL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    payment: PaymentClient,
    content: ContentStore,
    home_cache: Cache<Locale, Arc<HomeResponse>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment client cannot be built from the
    /// configured secret key.
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        content: ContentStore,
    ) -> Result<Self, PaymentError> {
        let payment = PaymentClient::new(&config.payment)?;

        let home_cache = Cache::builder()
            .max_capacity(Locale::ALL.len() as u64)
            .time_to_live(HOME_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payment,
                content,
                home_cache,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment processor client.
    #[must_use]
    pub fn payment(&self) -> &PaymentClient {
        &self.inner.payment
    }

    /// Get a reference to the markdown pages.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }

    /// Get a reference to the per-locale homepage cache.
    #[must_use]
    pub fn home_cache(&self) -> &Cache<Locale, Arc<HomeResponse>> {
        &self.inner.home_cache
    }
}
