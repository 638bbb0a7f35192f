//! Admin console state: active category, key filter and the moderation cache,
//! owned by whoever drives the console and mutated only through `&mut self`.

use super::{reduce, Category, ModerationAction, ModerationCache, ModerationItem};
use crate::{
    api::ApiClient,
    auth::{Session, Storage},
    error::Error,
};
use std::mem;
use tracing::{debug, info, instrument, warn};

/// Where the list shown after a select/refresh came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    Cache,
    Server,
}

#[derive(Debug)]
pub struct ModerationConsole<S: Storage> {
    api: ApiClient,
    session: Session<S>,
    cache: ModerationCache,
    current: Category,
    filter: String,
    forbidden: bool,
}

impl<S: Storage> ModerationConsole<S> {
    pub fn new(api: ApiClient, session: Session<S>) -> Self {
        Self {
            api,
            session,
            cache: ModerationCache::new(),
            current: Category::Pending,
            filter: String::new(),
            forbidden: false,
        }
    }

    pub fn current(&self) -> Category {
        self.current
    }

    pub fn cache(&self) -> &ModerationCache {
        &self.cache
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Set after a 403 and cleared by the next successful listing.
    pub fn is_forbidden(&self) -> bool {
        self.forbidden
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Sets the key filter. Only the view changes; cached lists are untouched.
    pub fn set_filter(&mut self, query: &str) {
        self.filter = query.trim().to_lowercase();
    }

    /// Items of the active category that match the filter.
    pub fn visible(&self) -> Vec<&ModerationItem> {
        self.cache.filter(self.current, &self.filter)
    }

    /// Switches category, serving from cache when the list was already fetched.
    /// The key filter is cleared, so the full cached list shows again.
    ///
    /// # Errors
    /// See [`ModerationConsole::refresh`].
    pub async fn select(&mut self, category: Category) -> Result<ListingSource, Error> {
        self.current = category;
        self.filter.clear();
        self.refresh(category, false).await
    }

    /// Refreshes the active category.
    ///
    /// # Errors
    /// See [`ModerationConsole::refresh`].
    pub async fn refresh_current(&mut self, force: bool) -> Result<ListingSource, Error> {
        self.refresh(self.current, force).await
    }

    /// Fetches `category` when forced or never fetched. On failure the cached
    /// list is left exactly as it was.
    ///
    /// # Errors
    /// `Error::AuthRequired` without a valid session, `Error::Forbidden` on 403,
    /// any other API error otherwise.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self, category: Category, force: bool) -> Result<ListingSource, Error> {
        let token = self.session.bearer()?;

        if !force && self.cache.is_fetched(category) {
            debug!("serving {} from cache", category);
            return Ok(ListingSource::Cache);
        }

        let ticket = self.cache.begin_fetch(category);

        match self.api.list(category, &token).await {
            Ok(items) => {
                self.forbidden = false;
                if !self.cache.complete_fetch(ticket, items) {
                    debug!("dropping superseded {} listing", category);
                }
                Ok(ListingSource::Server)
            }
            Err(Error::Forbidden) => {
                warn!("not authorized to list {}", category);
                self.forbidden = true;
                Err(Error::Forbidden)
            }
            Err(e) => Err(e),
        }
    }

    /// Approves or rejects `key`; on success the cache moves it out of
    /// `pending`. Returns the key it now has.
    ///
    /// # Errors
    /// `Error::AuthRequired`, `Error::Forbidden`, `Error::Rejected` or any API
    /// error; the cache is not modified on error.
    #[instrument(skip(self))]
    pub async fn apply_moderation(
        &mut self,
        action: ModerationAction,
        key: &str,
    ) -> Result<String, Error> {
        let token = self.session.bearer()?;

        let outcome = match self.api.moderate(action, key, &token).await {
            Ok(outcome) => outcome,
            Err(Error::Forbidden) => {
                self.forbidden = true;
                return Err(Error::Forbidden);
            }
            Err(e) => return Err(e),
        };

        self.cache = reduce(mem::take(&mut self.cache), action, key, &outcome);

        let new_key = self
            .cache
            .items(action.destination())
            .first()
            .map(|item| item.key.clone())
            .unwrap_or_default();

        info!("{} {} -> {}", action, key, new_key);

        Ok(new_key)
    }
}
