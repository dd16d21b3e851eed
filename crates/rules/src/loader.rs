use std::path::{Path, PathBuf};

use {
    tracing::{debug, info},
    url::Url,
};

use crate::{Error, Result, RuleSet, RulesDocument};

/// Where the rules document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesSource {
    /// Fetched with a plain GET.
    Url(Url),
    /// Read from the local filesystem.
    File(PathBuf),
    /// A wiki page, fetched raw from `host`.
    WikiPage { host: String, title: String },
}

impl RulesSource {
    /// Interpret a locator string.
    ///
    /// `http(s)://…` is a URL, an existing path is a file, anything else is
    /// taken as a page title on `wiki_host`.
    pub fn resolve(locator: &str, wiki_host: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::location(locator, "locator is empty"));
        }
        if locator.starts_with("http://") || locator.starts_with("https://") {
            let url = Url::parse(locator).map_err(|e| Error::location(locator, e))?;
            return Ok(Self::Url(url));
        }
        if Path::new(locator).is_file() {
            return Ok(Self::File(PathBuf::from(locator)));
        }
        if wiki_host.trim().is_empty() {
            return Err(Error::location(locator, "no wiki host configured"));
        }
        Ok(Self::WikiPage {
            host: wiki_host.trim().to_string(),
            title: locator.to_string(),
        })
    }

    /// The URL to fetch, if this source is remote.
    pub fn url(&self) -> Result<Option<Url>> {
        match self {
            Self::Url(url) => Ok(Some(url.clone())),
            Self::File(_) => Ok(None),
            Self::WikiPage { host, title } => {
                let base = format!("https://{host}/w/index.php");
                let url = Url::parse_with_params(&base, &[
                    ("title", title.as_str()),
                    ("action", "raw"),
                ])
                .map_err(|e| Error::location(self.to_string(), e))?;
                Ok(Some(url))
            },
        }
    }
}

impl std::fmt::Display for RulesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::WikiPage { host, title } => write!(f, "{host}:{title}"),
        }
    }
}

/// Fetch and parse the rules document.
pub async fn fetch_document(client: &reqwest::Client, source: &RulesSource) -> Result<RulesDocument> {
    let raw = match source {
        RulesSource::File(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| Error::Read {
                    path: path.clone(),
                    source,
                })?
        },
        _ => {
            let Some(url) = source.url()? else {
                return Err(Error::location(source.to_string(), "not a remote source"));
            };
            debug!(%url, "fetching rules document");
            let fetch_err = |source| Error::Fetch {
                location: url.to_string(),
                source,
            };
            client
                .get(url.clone())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(fetch_err)?
                .text()
                .await
                .map_err(fetch_err)?
        },
    };
    RulesDocument::from_json(&raw)
}

/// Fetch, parse and compile the rules. Any failure is fatal for startup.
pub async fn load_rules(client: &reqwest::Client, source: &RulesSource) -> Result<RuleSet> {
    let doc = fetch_document(client, source).await?;
    let rules = RuleSet::from_document(&doc)?;
    info!(
        %source,
        entries = doc.rule_count(),
        rules = %rules.summary(),
        "rules loaded"
    );
    Ok(rules)
}
