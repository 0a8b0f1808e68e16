use anyhow::{Context, bail};
use mwbot::Bot;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::revision::{Revision, RevisionQuery};

/// Upper bound the Action API accepts for `rvlimit` on anonymous requests.
const MAX_BATCH: u64 = 500;
const API_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Deserialize)]
struct RevisionsResponse {
    #[serde(rename = "continue")]
    #[serde(default)]
    cont: Option<Continue>,
    #[serde(default)]
    query: Option<Query>,
}

#[derive(Debug, Deserialize)]
struct Continue {
    rvcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Query {
    #[serde(default)]
    pages: Vec<PageRevisions>,
}

#[derive(Debug, Deserialize)]
struct PageRevisions {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    revisions: Vec<Revision>,
}

/// One page of a `prop=revisions` answer: the revisions plus the token for the next batch.
pub(crate) fn parse_revision_batch(
    title: &str,
    value: Value,
) -> anyhow::Result<(Vec<Revision>, Option<String>)> {
    let resp: RevisionsResponse =
        serde_json::from_value(value).context("Unexpected revisions response")?;
    let Some(page) = resp.query.and_then(|q| q.pages.into_iter().next()) else {
        bail!("No page returned for {title}");
    };
    if page.invalid {
        bail!("Invalid page title {title}");
    }
    if page.missing {
        bail!("Page {} does not exist", page.title);
    }
    Ok((page.revisions, resp.cont.and_then(|c| c.rvcontinue)))
}

/// Request parameters of one `prop=revisions` call.
pub(crate) type Params = Vec<(&'static str, String)>;

/// Full or capped revision history of `title`, oldest first.
#[tracing::instrument(level = "debug", skip(bot))]
pub async fn get_revisions(
    bot: &Bot,
    title: &str,
    query: &RevisionQuery,
) -> anyhow::Result<Vec<Revision>> {
    collect_revisions(title, query, move |params| async move {
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        bot.api()
            .get_value(&params[..])
            .await
            .with_context(|| format!("Failed to query revisions of {title}"))
    })
    .await
}

/// Drives `fetch_batch` through the history of `title`.
///
/// Follows continuation until the cap or the end of history is reached; nothing
/// bounds memory for pages with very long histories.
pub(crate) async fn collect_revisions<F, Fut>(
    title: &str,
    query: &RevisionQuery,
    mut fetch_batch: F,
) -> anyhow::Result<Vec<Revision>>
where
    F: FnMut(Params) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    if query.limit == Some(0) {
        return Ok(vec![]);
    }
    let mut base: Params = vec![
        ("action", "query".to_string()),
        ("prop", "revisions".to_string()),
        ("titles", title.to_string()),
        ("rvprop", "ids|timestamp|size".to_string()),
        ("rvdir", "newer".to_string()),
        ("formatversion", "2".to_string()),
    ];
    if let Some(start) = query.range.start {
        base.push(("rvstart", start.format(API_TIMESTAMP).to_string()));
    }
    if let Some(end) = query.range.end {
        base.push(("rvend", end.format(API_TIMESTAMP).to_string()));
    }

    let mut revisions = Vec::new();
    let mut rvcontinue: Option<String> = None;
    loop {
        let rvlimit = match query.limit {
            Some(limit) => (limit - revisions.len() as u64).min(MAX_BATCH).to_string(),
            None => "max".to_string(),
        };
        let mut params = base.clone();
        params.push(("rvlimit", rvlimit));
        if let Some(token) = &rvcontinue {
            params.push(("rvcontinue", token.clone()));
        }

        let (batch, next) = parse_revision_batch(title, fetch_batch(params).await?)?;
        debug!("Received {} revisions of {title}", batch.len());
        revisions.extend(batch);

        if let Some(limit) = query.limit {
            if revisions.len() as u64 >= limit {
                revisions.truncate(limit as usize);
                break;
            }
        }
        match next {
            Some(token) => rvcontinue = Some(token),
            None => break,
        }
    }
    Ok(revisions)
}
