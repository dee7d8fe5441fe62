use std::collections::BTreeSet;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_API_BASE: &str = "https://api.example.com/api/v2";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Client tags the dashboard always reports on.
pub const CLIENT_TAGS: [&str; 11] = [
    "kamoa",
    "platreef",
    "kico",
    "oksut",
    "pmc",
    "metalkol",
    "swakop",
    "witnessing",
    "ivm",
    "gold vale",
    "demo site",
];

/// Built-in tags plus the reserved slots filled from `DASHBOARD_EXTRA_TAGS`.
pub const ALLOW_LIST_CAPACITY: usize = 14;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Case-insensitive set of client tags kept by the filter stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    tags: BTreeSet<String>,
}

impl AllowList {
    pub fn builtin() -> Self {
        Self {
            tags: CLIENT_TAGS.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    /// Fills the reserved slots with `extra`; tags past capacity are dropped.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in extra {
            let tag = tag.as_ref().trim().to_lowercase();
            if tag.is_empty() || self.tags.contains(&tag) {
                continue;
            }
            if self.tags.len() >= ALLOW_LIST_CAPACITY {
                warn!(
                    tag = %tag,
                    capacity = ALLOW_LIST_CAPACITY,
                    "allow-list full, ignoring extra tag"
                );
                continue;
            }
            self.tags.insert(tag);
        }
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Connection settings for the upstream time-tracking API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub team_id: String,
    pub assignees: Vec<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl UpstreamConfig {
    pub fn new(api_key: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            team_id: team_id.into(),
            assignees: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Parses a comma-separated id list, dropping blanks and repeats.
    pub fn with_assignees(mut self, csv: &str) -> Self {
        let mut assignees: Vec<String> = Vec::new();
        for id in csv.split(',').map(str::trim).filter(|id| !id.is_empty()) {
            if !assignees.iter().any(|seen| seen == id) {
                assignees.push(id.to_string());
            }
        }
        self.assignees = assignees;
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, duration: Duration) -> Self {
        self.retry_backoff = duration;
        self
    }

    pub fn assignee_csv(&self) -> String {
        self.assignees.join(",")
    }

    pub fn time_entries_url(&self) -> String {
        format!(
            "{}/team/{}/time_entries",
            self.base_url.trim_end_matches('/'),
            self.team_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub upstream: UpstreamConfig,
    pub allow_list: AllowList,
    pub port: u16,
    pub session_ttl: Duration,
    pub max_sessions: usize,
}

impl DashboardConfig {
    pub fn new(upstream: UpstreamConfig) -> Self {
        Self {
            upstream,
            allow_list: AllowList::builtin(),
            port: DEFAULT_PORT,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = read("TIME_API_KEY").ok_or(ConfigError::Missing("TIME_API_KEY"))?;
        let team_id = read("TIME_API_TEAM_ID").ok_or(ConfigError::Missing("TIME_API_TEAM_ID"))?;

        let mut upstream = UpstreamConfig::new(api_key.trim(), team_id.trim());
        if let Some(base_url) = read("TIME_API_BASE_URL") {
            upstream = upstream.with_base_url(base_url.trim());
        }
        if let Some(csv) = read("TIME_API_ASSIGNEES") {
            upstream = upstream.with_assignees(&csv);
        }
        if let Some(secs) = parse_number::<u64>(&read, "TIME_API_TIMEOUT_SECS")? {
            upstream = upstream.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = parse_number::<u32>(&read, "TIME_API_MAX_RETRIES")? {
            upstream = upstream.with_max_retries(retries);
        }

        let mut config = Self::new(upstream);
        if let Some(extra) = read("DASHBOARD_EXTRA_TAGS") {
            config.allow_list = AllowList::builtin().with_extra(extra.split(','));
        }
        if let Some(port) = parse_number::<u16>(&read, "PORT")? {
            config.port = port;
        }
        if let Some(secs) = parse_number::<u64>(&read, "DASHBOARD_SESSION_TTL_SECS")? {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(max) = parse_number::<usize>(&read, "DASHBOARD_MAX_SESSIONS")? {
            config.max_sessions = max.max(1);
        }

        if config.upstream.assignees.is_empty() {
            warn!("TIME_API_ASSIGNEES is empty, upstream will apply its default assignee");
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(
    read: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match read(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
