use crate::error::{AppError, AppResult};
use crate::models::{BlockedSites, SiteCategories, SiteCategory};
use crate::store::Store;
use crate::validation::validate_hostname;
use log::info;
use serde::Serialize;

/// One row of the block list shown by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockListEntry {
    pub hostname: String,
    pub blocked: bool,
}

/// Manual edits to the `blockedSites` list.
#[derive(Clone)]
pub struct BlockList {
    store: Store,
}

impl BlockList {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn block_site(&self, hostname: &str) -> AppResult<()> {
        let host = validate_hostname(hostname)?;
        self.store
            .update::<BlockedSites, _, _>(move |blocked| {
                if blocked.insert(&host) {
                    Ok(())
                } else {
                    Err(AppError::AlreadyExists { name: host })
                }
            })
            .await?;
        info!("Blocked {hostname}");
        Ok(())
    }

    /// Returns false if the site was not blocked.
    pub async fn unblock_site(&self, hostname: &str) -> AppResult<bool> {
        let host = validate_hostname(hostname)?;
        let removed = self
            .store
            .update::<BlockedSites, _, _>(move |blocked| Ok(blocked.remove(&host)))
            .await?;
        if removed {
            info!("Unblocked {hostname}");
        }
        Ok(removed)
    }

    /// Flip whether `hostname` is blocked. Returns the new state.
    pub async fn toggle_block(&self, hostname: &str) -> AppResult<bool> {
        let host = validate_hostname(hostname)?;
        self.store
            .update::<BlockedSites, _, _>(move |blocked| {
                if blocked.remove(&host) {
                    Ok(false)
                } else {
                    blocked.insert(&host);
                    Ok(true)
                }
            })
            .await
    }

    /// Every unproductive site, then any other blocked site.
    pub async fn entries(&self) -> AppResult<Vec<BlockListEntry>> {
        let cats: SiteCategories = self.store.read().await?;
        let blocked: BlockedSites = self.store.read().await?;

        let mut entries: Vec<BlockListEntry> = cats
            .with_category(SiteCategory::Unproductive)
            .map(|host| BlockListEntry {
                hostname: host.to_string(),
                blocked: blocked.contains(host),
            })
            .collect();
        for host in blocked.iter() {
            if !entries.iter().any(|e| e.hostname == host) {
                entries.push(BlockListEntry {
                    hostname: host.to_string(),
                    blocked: true,
                });
            }
        }
        Ok(entries)
    }

    /// "Unblock" from the blocked page. Returns the URL to go back to.
    pub async fn unblock_from_blocked_page(&self, site: &str) -> AppResult<String> {
        let host = validate_hostname(site)?;
        self.unblock_site(&host).await?;
        Ok(format!("https://{host}"))
    }
}
