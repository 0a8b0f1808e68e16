//! Revision histories and link neighbourhoods of wiki articles.
//!
//! An [`Article`] is bound to a [`Site`] when it is created and fetches nothing until asked.
//! Its history can then be read back as ids, sizes, timestamps or a [`Table`]; its outgoing
//! links can be followed one or two hops. An [`ArticleCollection`] does the same for an
//! ordered set of articles.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use wikistories::{Article, RevisionSpec, Site, TimeRange, TimestampFormat};
//!
//! let site = Site::connect(&wikistories_config::Config::default()).await?;
//! let mut article = Article::new(&site, "Rust (programming language)");
//! article.fetch_revisions(RevisionSpec::Count(50), TimeRange::default()).await?;
//! println!("{:?}", article.timestamps(TimestampFormat::IsoString)?);
//! # Ok(())
//! # }
//! ```

mod api_utils;
pub mod article;
pub mod collection;
pub mod error;
pub mod links;
pub mod revision;
pub mod site;
pub mod table;

#[cfg(test)]
mod test_support;

pub use article::Article;
pub use collection::{ArticleCollection, Member};
pub use error::{Error, Result};
pub use links::{LinkOptions, Linked, extract_links};
pub use revision::{
    CollectionSpec, Revision, RevisionQuery, RevisionSpec, TimeRange, TimestampFormat,
    TimestampValue,
};
pub use site::{Site, WikiSource};
pub use table::Table;
pub use wikistories_config::Config;
