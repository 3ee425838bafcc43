use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const PORTAL_URL: &str = "http://www.cogentco.com/lookingglass.php";
pub const DEFAULT_NODE: &str = "US - Los Angeles";

#[derive(Clone, Debug)]
pub struct Config {
    pub portal_url: String,
    pub default_node: String,
    /// Whole-request timeout. `None` lets a traceroute run for as long as the portal streams.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    /// How long a fetched node catalog is trusted. `None` keeps it for the session's lifetime.
    pub catalog_ttl: Option<Duration>,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            portal_url: PORTAL_URL.to_owned(),
            default_node: DEFAULT_NODE.to_owned(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            catalog_ttl: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl Config {
    pub fn with_portal_url(portal_url: impl Into<String>) -> Self {
        Config { portal_url: portal_url.into(), ..Config::default() }
    }

    pub fn http_client(&self) -> reqwest::Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .build()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl Default for IpVersion {
    fn default() -> Self {
        IpVersion::V4
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("ipv4"),
            IpVersion::V6 => f.write_str("ipv6"),
        }
    }
}

impl FromStr for IpVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipv4" | "4" => Ok(IpVersion::V4),
            "ipv6" | "6" => Ok(IpVersion::V6),
            other => Err(format!("unknown ip version: {}", other)),
        }
    }
}
