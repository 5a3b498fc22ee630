use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Geo-Harvest
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the defaults tuned for worldcitiesdb.com.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub http: HttpConfig,
    pub tiers: TiersConfig,
    pub output: OutputConfig,
}

/// The site being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// The country listing page the crawl starts from
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// The only host links may resolve to
    #[serde(rename = "allowed-host")]
    pub allowed_host: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_url: "http://www.worldcitiesdb.com/country/list".to_string(),
            allowed_host: "www.worldcitiesdb.com".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Full User-Agent header value
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) \
                    Chrome/41.0.2228.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Concurrency and pacing for one crawler tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    /// Maximum number of in-flight visits for this tier
    pub parallelism: usize,

    /// Fixed pause after each visit before its slot is released (milliseconds)
    pub delay_ms: u64,

    /// Upper bound of the random pause added to `delay_ms` (milliseconds)
    pub jitter_ms: u64,
}

impl TierConfig {
    pub fn new(parallelism: usize, delay_ms: u64, jitter_ms: u64) -> Self {
        Self {
            parallelism,
            delay_ms,
            jitter_ms,
        }
    }

    /// A tier with no pacing at all, handy for fixtures
    pub fn unpaced(parallelism: usize) -> Self {
        Self::new(parallelism, 0, 0)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// One `[tiers.*]` table as written; absent keys keep the tier's default
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct TierOverrides {
    parallelism: Option<usize>,
    delay_ms: Option<u64>,
    jitter_ms: Option<u64>,
}

impl TierOverrides {
    fn apply(self, base: TierConfig) -> TierConfig {
        TierConfig {
            parallelism: self.parallelism.unwrap_or(base.parallelism),
            delay_ms: self.delay_ms.unwrap_or(base.delay_ms),
            jitter_ms: self.jitter_ms.unwrap_or(base.jitter_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TiersOverrides {
    list: TierOverrides,
    detail: TierOverrides,
    region: TierOverrides,
}

/// Per-tier settings
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "TiersOverrides")]
pub struct TiersConfig {
    pub list: TierConfig,
    pub detail: TierConfig,
    pub region: TierConfig,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            list: TierConfig::new(1, 0, 30_000),
            detail: TierConfig::new(5, 333, 2_000),
            region: TierConfig::new(5, 500, 2_000),
        }
    }
}

impl From<TiersOverrides> for TiersConfig {
    fn from(overrides: TiersOverrides) -> Self {
        let defaults = Self::default();
        Self {
            list: overrides.list.apply(defaults.list),
            detail: overrides.detail.apply(defaults.detail),
            region: overrides.region.apply(defaults.region),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the exported .sql files are written to
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./out".to_string(),
        }
    }
}
