use std::{collections::HashSet, fmt};

use futures::future::try_join_all;

use crate::{
    article::{Article, revision_fields},
    error::{Error, Result},
    revision::{CollectionSpec, RevisionSpec, TimeRange, TimestampFormat},
    site::Site,
    table::Table,
};

/// Anything that can join a collection: a bare title or an existing article.
#[derive(Debug, Clone)]
pub enum Member {
    Title(String),
    Article(Article),
}

impl Member {
    pub fn title(&self) -> &str {
        match self {
            Member::Title(title) => title.as_str(),
            Member::Article(article) => article.title(),
        }
    }

    fn into_article(self, site: &Site) -> Article {
        match self {
            Member::Title(title) => Article::new(site, title),
            Member::Article(article) => article,
        }
    }
}

impl From<&str> for Member {
    fn from(title: &str) -> Self {
        Member::Title(title.to_string())
    }
}

impl From<String> for Member {
    fn from(title: String) -> Self {
        Member::Title(title)
    }
}

impl From<Article> for Member {
    fn from(article: Article) -> Self {
        Member::Article(article)
    }
}

/// Ordered articles with unique titles. Grows through [`add`](Self::add); never shrinks.
#[derive(Debug, Clone)]
pub struct ArticleCollection {
    site: Site,
    articles: Vec<Article>,
}

impl ArticleCollection {
    /// Titles become fresh articles bound to `site`; articles are kept as they are.
    /// # Errors
    /// - [`Error::DuplicateTitle`] if a title occurs twice in `members`
    pub fn new<M: Into<Member>>(site: &Site, members: impl IntoIterator<Item = M>) -> Result<Self> {
        let mut collection = Self {
            site: site.clone(),
            articles: vec![],
        };
        collection.add_all(members)?;
        Ok(collection)
    }

    pub fn empty(site: &Site) -> Self {
        Self {
            site: site.clone(),
            articles: vec![],
        }
    }

    pub fn add(&mut self, member: impl Into<Member>) -> Result<()> {
        self.add_all([member.into()])
    }

    /// Appends every member, or none of them if any title is already present.
    pub fn add_all<M: Into<Member>>(&mut self, members: impl IntoIterator<Item = M>) -> Result<()> {
        let members: Vec<Member> = members.into_iter().map(Into::into).collect();
        let mut seen: HashSet<&str> = self.titles().collect();
        for member in &members {
            if !seen.insert(member.title()) {
                return Err(Error::DuplicateTitle(member.title().to_string()));
            }
        }
        let site = &self.site;
        let new: Vec<Article> = members.into_iter().map(|m| m.into_article(site)).collect();
        self.articles.extend(new);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.articles.iter().map(Article::title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.titles().any(|t| t == title)
    }

    pub fn get(&self, index: usize) -> Option<&Article> {
        self.articles.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.articles.iter()
    }

    fn member_specs(&self, spec: CollectionSpec) -> Result<Vec<RevisionSpec>> {
        match spec {
            CollectionSpec::Uniform(spec) => Ok(vec![spec; self.len()]),
            CollectionSpec::PerMember(specs) => {
                if specs.len() != self.len() {
                    return Err(Error::SpecLengthMismatch {
                        expected: self.len(),
                        actual: specs.len(),
                    });
                }
                Ok(specs)
            }
        }
    }

    /// Fetches every member's history, one after another in collection order.
    ///
    /// Stops at the first failure; members before it keep their new data.
    #[tracing::instrument(skip(self), fields(members = self.len()))]
    pub async fn fetch_revisions(
        &mut self,
        spec: impl Into<CollectionSpec> + fmt::Debug,
        range: TimeRange,
    ) -> Result<()> {
        let specs = self.member_specs(spec.into())?;
        for (article, spec) in self.articles.iter_mut().zip(specs) {
            article.fetch_revisions(spec, range).await?;
        }
        Ok(())
    }

    /// Like [`fetch_revisions`](Self::fetch_revisions), with all members in flight at once.
    #[tracing::instrument(skip(self), fields(members = self.len()))]
    pub async fn fetch_revisions_concurrently(
        &mut self,
        spec: impl Into<CollectionSpec> + fmt::Debug,
        range: TimeRange,
    ) -> Result<()> {
        let specs = self.member_specs(spec.into())?;
        try_join_all(
            self.articles
                .iter_mut()
                .zip(specs)
                .map(|(article, spec)| article.fetch_revisions(spec, range)),
        )
        .await?;
        Ok(())
    }

    /// Every member's revision table stacked in collection order, each row tagged with its
    /// member's position in a leading `line` column.
    pub fn to_table(&self, format: TimestampFormat) -> Result<Table> {
        let tables = self
            .articles
            .iter()
            .enumerate()
            .map(|(i, article)| article.to_table(format, Some(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table::concat(tables)?.unwrap_or_else(|| Table::new(revision_fields(format, true))))
    }
}

impl<'a> IntoIterator for &'a ArticleCollection {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ArticleCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.len() {
            0 => f.write_str("ArticleCollection()"),
            1..=4 => {
                let titles: Vec<String> = self.titles().map(|t| format!("\t{t}")).collect();
                write!(f, "ArticleCollection([\n{}\n])", titles.join(",\n"))
            }
            n => write!(f, "ArticleCollection(<{n} Articles>)"),
        }
    }
}
