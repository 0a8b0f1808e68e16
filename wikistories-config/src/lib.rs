use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

const CONF_DIR: &str = "conf/";
const SECRET_FILE: &str = "secret.toml";
const MAIN_FILE: &str = "main.toml";

const DEFAULT_USER_AGENT: &str = concat!("wikistories/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize, Serialize, Debug, Default)]
struct Secret {
    pub access_token: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Fetch {
    /// Histories longer than this are fetched anyway, but logged as a warning.
    pub large_history_warning: usize,
}

impl Default for Fetch {
    fn default() -> Self {
        Fetch {
            large_history_warning: 10_000,
        }
    }
}

#[derive(Deserialize, Serialize, Debug)]
struct Main {
    pub language: String,
    pub project: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub wiki_url: Option<String>,
    #[serde(default)]
    pub fetch: Fetch,
}

impl Default for Main {
    fn default() -> Self {
        Main {
            language: "en".to_string(),
            project: "wikipedia".to_string(),
            username: None,
            user_agent: None,
            wiki_url: None,
            fetch: Fetch::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    pub language: String,
    pub project: String,
    pub username: Option<String>,
    pub user_agent: String,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    wiki_url: Option<String>,
    pub fetch: Fetch,
}

impl Config {
    fn from_parts(secret: Secret, main: Main) -> Self {
        Config {
            language: main.language,
            project: main.project,
            username: main.username,
            user_agent: main
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            access_token: secret.access_token,
            wiki_url: main.wiki_url,
            fetch: main.fetch,
        }
    }

    /// Configuration for a given language edition of a project, with no credentials.
    pub fn for_site(language: &str, project: &str) -> Self {
        let main = Main {
            language: language.to_string(),
            project: project.to_string(),
            ..Main::default()
        };
        Self::from_parts(Secret::default(), main)
    }

    /// Load configuration from conf/main.toml and, if present, conf/secret.toml
    /// Searches for conf/ directory in current directory or parent directories
    /// # Errors
    /// - If conf/ directory is not found
    /// - If main.toml cannot be read or parsed
    /// - If secret.toml exists but cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        let mut dir = std::env::current_dir().context("Failed to get current directory")?;
        loop {
            if dir.join(CONF_DIR).is_dir() {
                break;
            }
            if !dir.pop() {
                return Err(anyhow::anyhow!(
                    "Failed to find conf directory in current or parent directories"
                ));
            }
        }
        let conf_dir = dir.join(CONF_DIR);
        let secret_file = conf_dir.join(SECRET_FILE);
        let main_file = conf_dir.join(MAIN_FILE);

        let secret = if secret_file.is_file() {
            toml::from_str(
                &std::fs::read_to_string(secret_file).context("Failed to open secret config file")?,
            )
            .context("Failed to parse secret config file")?
        } else {
            Secret::default()
        };
        let main = toml::from_str(
            &std::fs::read_to_string(main_file).context("Failed to open main config file")?,
        )
        .context("Failed to parse main config file")?;
        Ok(Self::from_parts(secret, main))
    }

    /// Script path of the wiki, e.g. `https://en.wikipedia.org/w/`.
    ///
    /// The Action API (`api.php`) and REST endpoints are found relative to it.
    pub fn wiki_url(&self) -> anyhow::Result<Url> {
        let raw = match &self.wiki_url {
            Some(url) if url.ends_with('/') => url.clone(),
            Some(url) => format!("{url}/"),
            None => format!("https://{}.{}.org/w/", self.language, self.project),
        };
        Url::parse(&raw).with_context(|| format!("Invalid wiki URL '{raw}'"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_parts(Secret::default(), Main::default())
    }
}
