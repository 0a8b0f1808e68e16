use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    article::Article,
    collection::ArticleCollection,
    error::{Error, Result},
};

/// Captures the target of `[[Target]]`, `[[Target|label]]` and `[[Target#Section]]`.
static WIKILINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\]#|]+)[^\[]*\]\]").expect("wikilink pattern is valid")
});

pub const MAX_DEPTH: u8 = 2;

/// Distinct link targets in a piece of wikitext.
pub fn extract_links(text: &str) -> BTreeSet<String> {
    WIKILINK
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Controls how far [`Article::linked`] walks and what it hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    pub depth: u8,
    pub as_strings: bool,
    pub as_collection: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            as_strings: false,
            as_collection: false,
        }
    }
}

impl LinkOptions {
    pub fn depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn as_strings(mut self) -> Self {
        self.as_strings = true;
        self
    }

    pub fn as_collection(mut self) -> Self {
        self.as_collection = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.depth == 0 || self.depth > MAX_DEPTH {
            return Err(Error::UnsupportedDepth(self.depth));
        }
        if self.as_strings && self.as_collection {
            return Err(Error::ConflictingReturnModes);
        }
        Ok(())
    }
}

/// Result of a link lookup, shaped by [`LinkOptions`].
#[derive(Debug)]
pub enum Linked {
    Titles(Vec<String>),
    Collection(ArticleCollection),
    Articles(Vec<Article>),
}

impl Linked {
    pub fn titles(&self) -> Vec<&str> {
        match self {
            Linked::Titles(titles) => titles.iter().map(String::as_str).collect(),
            Linked::Collection(collection) => collection.titles().collect(),
            Linked::Articles(articles) => articles.iter().map(Article::title).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Linked::Titles(titles) => titles.len(),
            Linked::Collection(collection) => collection.len(),
            Linked::Articles(articles) => articles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
