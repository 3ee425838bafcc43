use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::asn::{AsnRewrite, NoRewrite};
use crate::catalog::{fetch_nodes, Catalog, CatalogCache};
use crate::config::{Config, IpVersion};
use crate::dispatch::{Command, Query};
use crate::error::{LookingGlassError, Result};
use crate::scrape::{extract_pre, Lines, TraceFilter};
use crate::sink::{Sink, TracingSink};

/// Node value that marks a session without a usable vantage point.
pub const UNAVAILABLE_NODE: &str = "NA";

/// Shortest host accepted before a query is sent.
const MIN_HOST_LEN: usize = 5;

/// A looking glass session against one target.
///
/// The session owns its node catalog. It is fetched on first use and reused
/// until the configured TTL, if any, runs out.
pub struct Session {
    config: Config,
    client: Client,
    host: String,
    ip_version: IpVersion,
    node: String,
    nodes: Vec<String>,
    cache: CatalogCache,
    rewrite: Arc<dyn AsnRewrite>,
    sink: Arc<dyn Sink>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        Session::with_collaborators(config, Arc::new(NoRewrite), Arc::new(TracingSink))
    }

    pub fn with_collaborators(
        config: Config,
        rewrite: Arc<dyn AsnRewrite>,
        sink: Arc<dyn Sink>,
    ) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Session {
            config,
            client,
            host: String::new(),
            ip_version: IpVersion::default(),
            node: String::new(),
            nodes: Vec::new(),
            cache: CatalogCache::new(),
            rewrite,
            sink,
        })
    }

    /// Sets the target; selects the default node when none is selected yet.
    pub fn set(&mut self, host: &str, ip_version: IpVersion) {
        self.host = host.to_owned();
        self.ip_version = ip_version;
        if self.node.is_empty() {
            self.node = self.config.default_node.clone();
        }
        debug!(host, ip_version = %ip_version, node = %self.node, "target set");
    }

    pub fn default_node(&self) -> &str {
        &self.config.default_node
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn catalog(&self) -> &Catalog {
        self.cache.catalog()
    }

    /// Ping and trace capable node names, sorted.
    pub fn nodes(&mut self) -> Vec<String> {
        self.load_catalog();
        self.nodes.clone()
    }

    /// Node names that accept BGP queries, sorted.
    pub fn bgp_nodes(&mut self) -> Vec<String> {
        self.load_catalog();
        self.catalog().bgp_names()
    }

    /// Selects `node` if it is one of the known nodes.
    pub fn change_node(&mut self, node: &str) -> bool {
        if self.nodes.iter().any(|n| n == node) {
            self.node = node.to_owned();
            true
        } else {
            false
        }
    }

    /// Selects `node` for BGP queries if the portal lists it as BGP capable.
    ///
    /// BGP nodes need not be ping/trace nodes, so this checks the BGP list
    /// rather than the one `change_node` uses.
    pub fn change_bgp_node(&mut self, node: &str) -> bool {
        self.load_catalog();
        if self.catalog().bgp_location(node).is_some() {
            self.node = node.to_owned();
            true
        } else {
            false
        }
    }

    pub fn ping(&mut self) -> Result<String> {
        if self.node == UNAVAILABLE_NODE || self.host.len() < MIN_HOST_LEN {
            self.sink.error("Invalid node or host/ip address");
            return Err(LookingGlassError::InvalidTarget);
        }
        let location = self.location()?;
        let query = Query::new(Command::Ping, self.ip_version, &self.host, &location);

        let response = query.send(&self.client, &self.config)?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!(node = %self.node, %status, "ping refused by looking glass");
            return Err(LookingGlassError::Unavailable(status));
        }
        let body = response.text()?;

        extract_pre(&body)
            .map(str::to_owned)
            .ok_or(LookingGlassError::NoResult)
    }

    /// Streams traceroute header and hop lines, ASNs rewritten.
    pub fn trace(&mut self) -> Lines {
        let location = match self.location() {
            Ok(location) => location,
            Err(e) => return self.failed(e),
        };
        let query = Query::new(Command::Trace, self.ip_version, &self.host, &location);
        let filter = TraceFilter::new(Arc::clone(&self.rewrite));
        self.stream(query, move |line| filter.apply(line))
    }

    /// Streams the BGP answer verbatim.
    ///
    /// When the selected node does not take BGP queries the stream is empty
    /// and the BGP capable nodes are reported to the sink instead.
    pub fn bgp(&mut self) -> Lines {
        let location = match self.validate_bgp_node() {
            Ok(location) => location,
            Err(LookingGlassError::UnsupportedBgpNode { available, .. }) => {
                self.sink
                    .info("current node doesn't support bgp, please select one of the below nodes:");
                for node in &available {
                    self.sink.info(node);
                }
                return Lines::empty();
            }
            Err(e) => return self.failed(e),
        };
        let query = Query::new(Command::Bgp, self.ip_version, &self.host, &location);
        self.stream(query, Some)
    }

    /// Location code of the selected node for BGP queries.
    pub fn validate_bgp_node(&mut self) -> Result<String> {
        self.load_catalog();
        match self.catalog().bgp_location(&self.node) {
            Some(location) => Ok(location.to_owned()),
            None => Err(LookingGlassError::UnsupportedBgpNode {
                node: self.node.clone(),
                available: self.catalog().bgp_names(),
            }),
        }
    }

    fn location(&mut self) -> Result<String> {
        self.load_catalog();
        self.catalog()
            .location(&self.node)
            .map(str::to_owned)
            .ok_or_else(|| LookingGlassError::UnknownNode(self.node.clone()))
    }

    fn load_catalog(&mut self) {
        if self.cache.is_fresh(self.config.catalog_ttl) {
            return;
        }
        let catalog = fetch_nodes(&self.client, &self.config, self.sink.as_ref());
        if catalog.is_empty() {
            warn!(url = %self.config.portal_url, "looking glass lists no nodes");
        }
        self.nodes = catalog.diagnostic_names();
        info!(
            nodes = self.nodes.len(),
            bgp_nodes = catalog.bgp.len(),
            "node catalog loaded"
        );
        self.cache.store(catalog);
    }

    fn stream<P>(&self, query: Query, filter: P) -> Lines
    where
        P: Fn(String) -> Option<String> + Send + 'static,
    {
        debug!(node = %self.node, cmd = query.cmd, "starting streamed query");
        let client = self.client.clone();
        let config = self.config.clone();
        Lines::spawn(move || query.send(&client, &config), filter, Arc::clone(&self.sink))
    }

    fn failed(&self, e: LookingGlassError) -> Lines {
        warn!(node = %self.node, error = %e, "query not sent");
        self.sink.error(&format!("error: {}", e));
        Lines::failed(e)
    }
}
