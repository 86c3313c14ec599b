use crate::error::AppResult;
use crate::hostname::resolve_hostname;
use crate::models::{BlockedSites, SiteCategories, SiteCategory};
use crate::store::Store;
use crate::validation::{validate_hostname, validate_site_input};
use log::{debug, info};

/// Hostname -> productivity category, backed by the `siteCategories` key.
#[derive(Clone)]
pub struct Categorizer {
    store: Store,
}

impl Categorizer {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Seed `hostname` as unclassified if it has never been seen.
    /// Returns true if this call inserted it.
    pub async fn ensure_classified(&self, hostname: &str) -> AppResult<bool> {
        let host = hostname.to_string();
        let inserted = self
            .store
            .update::<SiteCategories, _, _>(move |cats| Ok(cats.ensure(&host)))
            .await?;
        if inserted {
            debug!("First sight of {hostname}, classified as unclassified");
        }
        Ok(inserted)
    }

    /// Resolve `url` and seed its hostname. Unparsable and internal URLs
    /// are ignored.
    pub async fn observe_url(&self, url: &str) -> AppResult<Option<String>> {
        let Some(hostname) = resolve_hostname(url) else {
            return Ok(None);
        };
        self.ensure_classified(&hostname).await?;
        Ok(Some(hostname))
    }

    /// Add a site typed by the user, keeping any existing classification.
    pub async fn add_site(&self, input: &str) -> AppResult<String> {
        let hostname = validate_site_input(input)?;
        self.ensure_classified(&hostname).await?;
        Ok(hostname)
    }

    pub async fn category_of(&self, hostname: &str) -> AppResult<SiteCategory> {
        let cats: SiteCategories = self.store.read().await?;
        Ok(cats.get(hostname).unwrap_or_default())
    }

    pub async fn categories(&self) -> AppResult<SiteCategories> {
        self.store.read().await
    }

    /// Classify `hostname` and keep the blocked list in step with it:
    /// unproductive sites are blocked, productive ones unblocked.
    pub async fn set_category(&self, hostname: &str, category: SiteCategory) -> AppResult<()> {
        let host = validate_hostname(hostname)?;
        self.store
            .update_pair::<SiteCategories, BlockedSites, _, _>(move |cats, blocked| {
                cats.set(&host, category);
                match category {
                    SiteCategory::Unproductive => {
                        blocked.insert(&host);
                    }
                    SiteCategory::Productive => {
                        blocked.remove(&host);
                    }
                    SiteCategory::Unclassified => {}
                }
                Ok(())
            })
            .await?;
        info!("Classified {hostname} as {}", category.as_str());
        Ok(())
    }
}
