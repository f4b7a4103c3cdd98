//! Dashboard pages: one fetch orchestrator per page over a shared cache

pub mod orchestrator;
pub mod page;
pub mod view;

pub use orchestrator::{
    LoadState, Notice, NoticeLevel, OrchestratorError, PageData, PageOrchestrator, PageSnapshot,
};
pub use page::Page;
pub use view::{Comparison, PageView};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheManager, CacheResult};
use crate::sources::SourceRegistry;

pub struct Dashboard {
    pages: HashMap<Page, Arc<PageOrchestrator>>,
    cache: Arc<CacheManager>,
}

impl Dashboard {
    pub fn new(registry: &SourceRegistry, cache: Arc<CacheManager>) -> Self {
        let pages = Page::ALL
            .into_iter()
            .map(|page| {
                let orchestrator = PageOrchestrator::new(page, registry, Arc::clone(&cache));
                (page, Arc::new(orchestrator))
            })
            .collect();

        Self { pages, cache }
    }

    pub fn page(&self, page: Page) -> Option<Arc<PageOrchestrator>> {
        self.pages.get(&page).cloned()
    }

    /// Drop the cached payload of each page, forcing the next load to fetch
    pub async fn purge(&self, pages: &[Page]) -> CacheResult<usize> {
        let keys: Vec<&str> = pages.iter().map(|p| p.cache_key()).collect();
        let removed = self.cache.purge(&keys).await?;
        info!("Purged {} cached page(s)", removed);
        Ok(removed)
    }
}
