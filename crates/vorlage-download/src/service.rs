use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::cache::{CacheKey, PersonalizedCache};
use crate::download::{personalize_download, Company, Download, DownloadError, Template};
use crate::settings::Settings;
use crate::storage::TemplateStorage;

/// Serves downloads from one storage backend with one set of organization settings, reusing
/// finished downloads while `settings.cache_capacity` is non-zero.
pub struct DownloadService<S> {
    storage: S,
    settings: Settings,
    cache: Option<PersonalizedCache>,
}

impl<S: TemplateStorage> DownloadService<S> {
    pub fn new(storage: S, settings: Settings) -> Self {
        let cache = NonZeroUsize::new(settings.cache_capacity).map(PersonalizedCache::new);
        Self {
            storage,
            settings,
            cache,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&PersonalizedCache> {
        self.cache.as_ref()
    }

    pub fn download(
        &self,
        template: &Template,
        company: &Company,
    ) -> Result<Arc<Download>, DownloadError> {
        let Some(cache) = &self.cache else {
            return personalize_download(&self.storage, &self.settings, template, company)
                .map(Arc::new);
        };

        let key = CacheKey::new(template, company);
        if let Some(hit) = cache.get(&key) {
            log::debug!(
                "serving cached {} for company {}",
                hit.filename,
                company.id
            );
            return Ok(hit);
        }
        let download = Arc::new(personalize_download(
            &self.storage,
            &self.settings,
            template,
            company,
        )?);
        cache.insert(key, Arc::clone(&download));
        Ok(download)
    }

    /// Forget cached downloads of `template_id`, e.g. after its file was replaced in place.
    pub fn invalidate_template(&self, template_id: &str) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |cache| cache.invalidate_template(template_id))
    }
}
