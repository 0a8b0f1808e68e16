use std::{collections::BTreeSet, fmt};

use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    collection::ArticleCollection,
    error::{Error, Result},
    links::{LinkOptions, Linked, extract_links},
    revision::{Revision, RevisionQuery, RevisionSpec, TimeRange, TimestampFormat, TimestampValue},
    site::Site,
    table::{Field, Table},
};

/// Neighbour pages fetched at once during a 2-hop link walk.
const NEIGHBOUR_FETCHES: usize = 8;

/// A single wiki page and, once fetched, its revision history.
#[derive(Clone, Debug)]
pub struct Article {
    title: String,
    site: Site,
    revisions: Option<Vec<Revision>>,
}

impl Article {
    /// Binds `title` to `site`. Nothing is fetched yet.
    pub fn new(site: &Site, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            site: site.clone(),
            revisions: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn is_fetched(&self) -> bool {
        self.revisions.is_some()
    }

    pub fn revision_count(&self) -> Option<usize> {
        self.revisions.as_ref().map(Vec::len)
    }

    /// Cached history, oldest first.
    pub fn revisions(&self) -> Result<&[Revision]> {
        self.revisions.as_deref().ok_or_else(|| Error::NotFetched {
            title: self.title.clone(),
        })
    }

    /// Retrieves the revision history, replacing whatever was cached before.
    ///
    /// Returns the number of revisions stored. On failure the previous cache is kept.
    #[tracing::instrument(skip(self), fields(title = %self.title))]
    pub async fn fetch_revisions(&mut self, spec: RevisionSpec, range: TimeRange) -> Result<usize> {
        let query = RevisionQuery::new(spec, range);
        let revisions = self.site.source().revisions(&self.title, &query).await?;
        let count = revisions.len();
        if let Some(threshold) = self.site.large_history_warning() {
            if count > threshold {
                warn!(
                    "{} has {count} revisions (more than {threshold}); the whole history is held in memory",
                    self.title
                );
            }
        }
        self.revisions = Some(revisions);
        info!("Successfully fetched data for {count} revisions.");
        Ok(count)
    }

    pub fn ids(&self) -> Result<Vec<u64>> {
        Ok(self.revisions()?.iter().map(|r| r.revision_id).collect())
    }

    pub fn sizes(&self) -> Result<Vec<u64>> {
        Ok(self.revisions()?.iter().map(|r| r.size).collect())
    }

    pub fn timestamps(&self, format: TimestampFormat) -> Result<Vec<TimestampValue>> {
        Ok(self
            .revisions()?
            .iter()
            .map(|r| r.formatted_timestamp(format))
            .collect())
    }

    /// One row per revision: `[line,] revisionId, timestamp, size`.
    pub fn to_table(&self, format: TimestampFormat, line: Option<usize>) -> Result<Table> {
        let revisions = self.revisions()?;
        let mut table = Table::new(revision_fields(format, line.is_some()));
        for rev in revisions {
            let mut row: Vec<Value> = Vec::with_capacity(4);
            if let Some(line) = line {
                row.push(line.into());
            }
            row.push(rev.revision_id.into());
            row.push(rev.formatted_timestamp(format).into());
            row.push(rev.size.into());
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Current wikitext of the page, empty if the page does not exist. Always goes to the wiki.
    pub async fn text(&self) -> Result<String> {
        Ok(self
            .site
            .source()
            .page_text(&self.title)
            .await?
            .unwrap_or_default())
    }

    /// Pages this article links to, or (at depth 2) the pages those link to.
    ///
    /// Page text is re-read on every call.
    #[tracing::instrument(skip(self), fields(title = %self.title))]
    pub async fn linked(&self, options: LinkOptions) -> Result<Linked> {
        options.validate()?;
        let direct = extract_links(&self.text().await?);
        let titles = if options.depth == 1 {
            direct
        } else {
            debug!("Following {} neighbours of {}", direct.len(), self.title);
            let source = self.site.source();
            let texts: Vec<Option<String>> = stream::iter(direct.iter())
                .map(|title| source.page_text(title))
                .buffer_unordered(NEIGHBOUR_FETCHES)
                .try_collect()
                .await?;
            texts
                .iter()
                .flatten()
                .flat_map(|text| extract_links(text))
                .collect::<BTreeSet<_>>()
        };
        let titles: Vec<String> = titles.into_iter().collect();

        Ok(if options.as_strings {
            Linked::Titles(titles)
        } else if options.as_collection {
            Linked::Collection(ArticleCollection::new(&self.site, titles)?)
        } else {
            Linked::Articles(
                titles
                    .into_iter()
                    .map(|title| Article::new(&self.site, title))
                    .collect(),
            )
        })
    }
}

/// Column layout of a revision table, with the leading `line` column when `tagged`.
pub(crate) fn revision_fields(format: TimestampFormat, tagged: bool) -> Vec<Field> {
    let timestamp = match format {
        TimestampFormat::Unix => Field::number("timestamp"),
        TimestampFormat::Wiki | TimestampFormat::IsoString => Field::string("timestamp"),
    };
    let mut fields = vec![];
    if tagged {
        fields.push(Field::number("line"));
    }
    fields.extend([Field::number("revisionId"), timestamp, Field::number("size")]);
    fields
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision_count() {
            None => write!(f, "Article('{}')", self.title),
            Some(n) => write!(f, "Article('{}', {n} revisions)", self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::test_support::MockSource;

    fn site() -> Site {
        MockSource::new()
            .with_text("Pets", "See [[Cat]] and [[Dog|the dog]] and [[Cat#Section]].")
            .with_text("Cat", "[[Mouse]] [[Dog]] [[Pets]]")
            .with_text("Dog", "[[Bone]], [[Cat|cats]] and [[Mouse#Chasing]]")
            .with_history("Cat", 100, 3)
            .with_history("Dog", 500, 12)
            .site()
    }

    #[tokio::test]
    async fn projections_require_a_fetch() {
        let article = Article::new(&site(), "Cat");
        assert!(!article.is_fetched());
        assert!(matches!(article.ids(), Err(Error::NotFetched { title }) if title == "Cat"));
        assert!(matches!(article.sizes(), Err(Error::NotFetched { .. })));
        assert!(matches!(
            article.timestamps(TimestampFormat::Unix),
            Err(Error::NotFetched { .. })
        ));
        assert!(matches!(
            article.to_table(TimestampFormat::IsoString, None),
            Err(Error::NotFetched { .. })
        ));
    }

    #[tokio::test]
    async fn count_larger_than_history_returns_everything() {
        let mut article = Article::new(&site(), "Cat");
        let n = article
            .fetch_revisions(RevisionSpec::Count(5), TimeRange::default())
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(article.ids().unwrap(), vec![100, 101, 102]);
        assert_eq!(article.revision_count(), Some(3));
    }

    #[tokio::test]
    async fn count_caps_and_projections_align() {
        let mut article = Article::new(&site(), "Dog");
        for n in [0u64, 1, 7, 12, 40] {
            let count = article
                .fetch_revisions(RevisionSpec::Count(n), TimeRange::default())
                .await
                .unwrap();
            assert!(count as u64 <= n);
            assert_eq!(article.ids().unwrap().len(), count);
            assert_eq!(article.sizes().unwrap().len(), count);
            assert_eq!(article.timestamps(TimestampFormat::Wiki).unwrap().len(), count);
        }
    }

    #[tokio::test]
    async fn unix_timestamps_are_non_decreasing() {
        let mut article = Article::new(&site(), "Dog");
        article
            .fetch_revisions(RevisionSpec::All, TimeRange::default())
            .await
            .unwrap();
        let secs: Vec<i64> = article
            .timestamps(TimestampFormat::Unix)
            .unwrap()
            .iter()
            .map(|t| t.as_unix().unwrap())
            .collect();
        assert_eq!(secs.len(), 12);
        assert!(secs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn refetch_replaces_previous_data() {
        let mut article = Article::new(&site(), "Dog");
        article
            .fetch_revisions(RevisionSpec::All, TimeRange::default())
            .await
            .unwrap();
        let start = Utc.with_ymd_and_hms(2010, 1, 5, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2010, 1, 7, 0, 0, 0).unwrap();
        article
            .fetch_revisions(RevisionSpec::All, TimeRange::new(Some(start), Some(end)))
            .await
            .unwrap();
        assert_eq!(article.ids().unwrap(), vec![504, 505, 506]);
        assert_eq!(article.to_string(), "Article('Dog', 3 revisions)");
    }

    #[tokio::test]
    async fn failed_fetch_keeps_cache() {
        let mut article = Article::new(&site(), "Pets");
        let err = article
            .fetch_revisions(RevisionSpec::All, TimeRange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(!article.is_fetched());
        assert_eq!(article.to_string(), "Article('Pets')");
    }

    #[tokio::test]
    async fn table_layout() {
        let mut article = Article::new(&site(), "Cat");
        article
            .fetch_revisions(RevisionSpec::Count(2), TimeRange::default())
            .await
            .unwrap();

        let plain = article.to_table(TimestampFormat::IsoString, None).unwrap();
        assert_eq!(plain.columns(), vec!["revisionId", "timestamp", "size"]);
        assert_eq!(
            plain.data,
            vec![
                vec![json!(100), json!("2010-01-01T00:00:00Z"), json!(100)],
                vec![json!(101), json!("2010-01-02T00:00:00Z"), json!(200)],
            ]
        );

        let tagged = article.to_table(TimestampFormat::Unix, Some(4)).unwrap();
        assert_eq!(tagged.columns(), vec!["line", "revisionId", "timestamp", "size"]);
        assert_eq!(tagged.data[0], vec![json!(4), json!(100), json!(1_262_304_000), json!(100)]);
    }

    #[tokio::test]
    async fn direct_links() {
        let article = Article::new(&site(), "Pets");
        let linked = article
            .linked(LinkOptions::default().as_strings())
            .await
            .unwrap();
        let Linked::Titles(titles) = linked else {
            panic!("expected titles");
        };
        assert_eq!(titles, vec!["Cat", "Dog"]);
    }

    #[tokio::test]
    async fn direct_links_as_articles_and_collection() {
        let site = site();
        let article = Article::new(&site, "Pets");

        let Linked::Articles(articles) = article.linked(LinkOptions::default()).await.unwrap() else {
            panic!("expected articles");
        };
        assert!(articles.iter().all(|a| !a.is_fetched()));
        assert_eq!(articles.iter().map(Article::title).collect::<Vec<_>>(), vec!["Cat", "Dog"]);

        let Linked::Collection(collection) = article
            .linked(LinkOptions::default().as_collection())
            .await
            .unwrap()
        else {
            panic!("expected collection");
        };
        assert_eq!(collection.titles().collect::<Vec<_>>(), vec!["Cat", "Dog"]);
    }

    #[tokio::test]
    async fn second_hop_is_deduplicated_and_stable() {
        let source = MockSource::new()
            .with_text("Pets", "See [[Cat]] and [[Dog|the dog]] and [[Cat#Section]].")
            .with_text("Cat", "[[Mouse]] [[Dog]] [[Pets]]")
            .with_text("Dog", "[[Bone]], [[Cat|cats]] and [[Mouse#Chasing]]");
        let fetches = source.text_fetches();
        let article = Article::new(&source.site(), "Pets");
        let options = LinkOptions::default().depth(2).as_strings();

        let first = article.linked(options).await.unwrap();
        assert_eq!(first.titles(), vec!["Bone", "Cat", "Dog", "Mouse", "Pets"]);
        // the start page plus each neighbour once
        assert_eq!(fetches.load(Ordering::SeqCst), 3);

        let second = article.linked(options).await.unwrap();
        assert_eq!(first.titles(), second.titles());
    }

    #[tokio::test]
    async fn red_links_add_nothing() {
        let site = MockSource::new()
            .with_text("Start", "[[Cat]] [[Redlink]] [[File:Commons.jpg]]")
            .with_text("Cat", "[[Mouse]]")
            .site();

        let second = Article::new(&site, "Start")
            .linked(LinkOptions::default().depth(2).as_strings())
            .await
            .unwrap();
        assert_eq!(second.titles(), vec!["Mouse"]);

        let missing = Article::new(&site, "Redlink")
            .linked(LinkOptions::default().as_strings())
            .await
            .unwrap();
        assert!(missing.is_empty());
        assert_eq!(Article::new(&site, "Redlink").text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn unreadable_neighbour_fails_second_hop() {
        let article = Article::new(
            &MockSource::new()
                .with_text("Start", "[[Flaky]] [[Cat]]")
                .with_text("Cat", "[[Mouse]]")
                .with_broken("Flaky")
                .site(),
            "Start",
        );
        let err = article
            .linked(LinkOptions::default().depth(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn invalid_link_options_fail_before_fetching() {
        let source = MockSource::new().with_text("Pets", "[[Cat]]");
        let fetches = source.text_fetches();
        let article = Article::new(&source.site(), "Pets");
        for depth in [1, 2, 3] {
            let res = article
                .linked(LinkOptions::default().depth(depth).as_strings().as_collection())
                .await;
            assert!(res.is_err());
        }
        assert!(matches!(
            article.linked(LinkOptions::default().depth(3)).await,
            Err(Error::UnsupportedDepth(3))
        ));
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }
}
