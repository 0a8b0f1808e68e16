use std::{fmt, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use mwbot::Bot;
use tracing::{debug, info};
use wikistories_config::Config;

use crate::{api_utils, revision::Revision, revision::RevisionQuery};

/// Where page text and revision histories come from.
#[async_trait]
pub trait WikiSource: Send + Sync {
    /// Raw wikitext of the current revision of `title`, or `None` when no such page can exist
    /// locally (red links, interwiki targets, files hosted elsewhere).
    async fn page_text(&self, title: &str) -> anyhow::Result<Option<String>>;

    /// Revision history of `title`, oldest first, honouring the query's cap and time bounds.
    async fn revisions(&self, title: &str, query: &RevisionQuery)
        -> anyhow::Result<Vec<Revision>>;
}

#[async_trait]
impl WikiSource for Bot {
    async fn page_text(&self, title: &str) -> anyhow::Result<Option<String>> {
        let page = match self.page(title) {
            Ok(page) => page,
            Err(mwbot::Error::InvalidPage { .. }) => {
                debug!("{title} is not a local page title");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match page.wikitext().await {
            Ok(text) => Ok(Some(text)),
            Err(mwbot::Error::PageDoesNotExist { .. }) => {
                debug!("{title} does not exist");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to get wikitext of {title}"))),
        }
    }

    async fn revisions(
        &self,
        title: &str,
        query: &RevisionQuery,
    ) -> anyhow::Result<Vec<Revision>> {
        api_utils::get_revisions(self, title, query).await
    }
}

/// A wiki every [`Article`](crate::Article) of a session is bound to.
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct Site {
    source: Arc<dyn WikiSource>,
    large_history_warning: Option<usize>,
}

impl Site {
    pub fn from_source(source: impl WikiSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            large_history_warning: None,
        }
    }

    /// Log a warning whenever a single fetch returns more than `threshold` revisions.
    pub fn with_large_history_warning(mut self, threshold: usize) -> Self {
        self.large_history_warning = Some(threshold);
        self
    }

    pub fn large_history_warning(&self) -> Option<usize> {
        self.large_history_warning
    }

    /// Build a bot session from configuration.
    /// # Errors
    /// - If the configured endpoints are not valid URLs
    /// - If the bot cannot be initialised (e.g. the wiki is unreachable)
    #[tracing::instrument(skip_all, fields(language = %config.language, project = %config.project))]
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let mut builder =
            Bot::builder(config.wiki_url()?.to_string()).set_user_agent(config.user_agent.clone());
        if let (Some(username), Some(token)) = (&config.username, &config.access_token) {
            builder = builder.set_oauth2_token(username.clone(), token.clone());
        }
        let bot = builder.build().await.context("Failed to build bot")?;
        info!("Connected to {}.{}", config.language, config.project);
        Ok(Self::from_source(bot).with_large_history_warning(config.fetch.large_history_warning))
    }

    pub(crate) fn source(&self) -> &dyn WikiSource {
        &*self.source
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("large_history_warning", &self.large_history_warning)
            .finish_non_exhaustive()
    }
}
