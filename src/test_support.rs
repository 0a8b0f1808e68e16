use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::bail;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::{
    revision::{Revision, RevisionQuery},
    site::{Site, WikiSource},
};

/// In-memory wiki with canned page text and histories.
#[derive(Default, Clone)]
pub struct MockSource {
    texts: HashMap<String, String>,
    histories: HashMap<String, Vec<Revision>>,
    broken: Vec<String>,
    text_fetches: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, title: &str, text: &str) -> Self {
        self.texts.insert(title.to_string(), text.to_string());
        self
    }

    /// Makes every request for `title` fail, as a network error would.
    pub fn with_broken(mut self, title: &str) -> Self {
        self.broken.push(title.to_string());
        self
    }

    /// Gives `title` `count` revisions, one day apart, growing by 100 bytes each.
    pub fn with_history(mut self, title: &str, first_id: u64, count: usize) -> Self {
        let start = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
        let history = (0..count)
            .map(|i| {
                Revision::new(
                    first_id + i as u64,
                    100 * (i as u64 + 1),
                    start + chrono::Duration::days(i as i64),
                )
            })
            .collect();
        self.histories.insert(title.to_string(), history);
        self
    }

    /// Shared counter of `page_text` calls, still readable after the source is moved into a site.
    pub fn text_fetches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.text_fetches)
    }

    pub fn site(self) -> Site {
        Site::from_source(self)
    }
}

#[async_trait]
impl WikiSource for MockSource {
    async fn page_text(&self, title: &str) -> anyhow::Result<Option<String>> {
        self.text_fetches.fetch_add(1, Ordering::SeqCst);
        if self.broken.iter().any(|t| t == title) {
            bail!("Connection reset while reading {title}");
        }
        Ok(self.texts.get(title).cloned())
    }

    async fn revisions(
        &self,
        title: &str,
        query: &RevisionQuery,
    ) -> anyhow::Result<Vec<Revision>> {
        let Some(history) = self.histories.get(title) else {
            bail!("Page {title} does not exist");
        };
        let in_range = history
            .iter()
            .filter(|rev| query.range.contains(&rev.timestamp))
            .cloned();
        Ok(match query.limit {
            Some(limit) => in_range.take(limit as usize).collect(),
            None => in_range.collect(),
        })
    }
}
