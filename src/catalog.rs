//! Node discovery for the looking glass.
//!
//! The portal page carries its node lists as embedded script calls of the form
//! `Option("US - Los Angeles","LAX")`. Everything after the first `default:`
//! marker lists the ping/trace nodes, everything before it the BGP nodes. The
//! page has no other machine-readable structure, so this positional split is
//! the contract with the upstream HTML and must be kept as is.
//!
//! Labels and codes are matched against ASCII word and space classes only.
//! An entry such as `BR - São Paulo` is skipped, as the portal's own tooling
//! has always skipped it.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{LookingGlassError, Result};
use crate::sink::Sink;

const MARKER: &str = "default:";

static OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)Option\("((?-u:[\w|,|\s|-])+)","((?-u:[\w|\d])+)""#).unwrap()
});

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Ping and traceroute capable nodes, label to location code.
    pub diagnostic: BTreeMap<String, String>,
    /// BGP capable nodes, label to location code.
    pub bgp: BTreeMap<String, String>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.diagnostic.is_empty() && self.bgp.is_empty()
    }

    pub fn diagnostic_names(&self) -> Vec<String> {
        self.diagnostic.keys().cloned().collect()
    }

    pub fn bgp_names(&self) -> Vec<String> {
        self.bgp.keys().cloned().collect()
    }

    pub fn location(&self, node: &str) -> Option<&str> {
        self.diagnostic.get(node).map(String::as_str)
    }

    pub fn bgp_location(&self, node: &str) -> Option<&str> {
        self.bgp.get(node).map(String::as_str)
    }
}

pub fn parse_catalog(body: &str) -> Result<Catalog> {
    let split = body.find(MARKER).ok_or(LookingGlassError::CatalogMarkerMissing)?;
    let collect = |region: &str| {
        OPTION
            .captures_iter(region)
            .map(|caps| (caps[1].to_owned(), caps[2].to_owned()))
            .collect::<BTreeMap<_, _>>()
    };

    Ok(Catalog {
        diagnostic: collect(&body[split..]),
        bgp: collect(&body[..split]),
    })
}

pub fn try_fetch_nodes(client: &Client, config: &Config) -> Result<Catalog> {
    debug!(url = %config.portal_url, "fetching node catalog");
    let body = client.get(config.portal_url.as_str()).send()?.text()?;
    let catalog = parse_catalog(&body)?;
    debug!(
        diagnostic = catalog.diagnostic.len(),
        bgp = catalog.bgp.len(),
        "parsed node catalog"
    );
    Ok(catalog)
}

/// Fetches the catalog, reporting failures to `sink` and answering with an empty catalog.
pub fn fetch_nodes(client: &Client, config: &Config, sink: &dyn Sink) -> Catalog {
    match try_fetch_nodes(client, config) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(url = %config.portal_url, error = %e, "node catalog unavailable");
            sink.error(&format!("error: cogent looking glass unreachable: {}", e));
            Catalog::default()
        }
    }
}

/// A catalog together with when it was fetched.
#[derive(Debug, Default)]
pub struct CatalogCache {
    catalog: Catalog,
    fetched_at: Option<Instant>,
}

impl CatalogCache {
    pub fn new() -> Self {
        CatalogCache::default()
    }

    pub fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        match (self.fetched_at, ttl) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(at), Some(ttl)) => at.elapsed() < ttl,
        }
    }

    pub fn store(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.fetched_at = Some(Instant::now());
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<script>
function bgpNodes(sel) {
    sel.options[0] = new Option("US - Ashburn","IAD02");
    sel.options[1] = new Option("DE - Frankfurt","FRA03");
}
switch (cmd) {
default:
    sel.options[0] = new Option("US - Los Angeles","LAX");
    sel.options[1] = new Option("JP - Tokyo, Otemachi","NRT01");
    sel.options[2] = new OPTION("CA - Toronto","YYZ");
}
</script>"#;

    #[test]
    fn regions_split_at_marker() {
        let catalog = parse_catalog(PAGE).unwrap();

        assert_eq!(catalog.diagnostic.len(), 3);
        assert_eq!(catalog.location("US - Los Angeles"), Some("LAX"));
        assert_eq!(catalog.location("JP - Tokyo, Otemachi"), Some("NRT01"));
        assert_eq!(catalog.location("CA - Toronto"), Some("YYZ"));

        assert_eq!(catalog.bgp.len(), 2);
        assert_eq!(catalog.bgp_location("US - Ashburn"), Some("IAD02"));
        assert_eq!(catalog.bgp_location("US - Los Angeles"), None);
    }

    #[test]
    fn names_are_sorted() {
        let catalog = parse_catalog(PAGE).unwrap();
        assert_eq!(
            catalog.diagnostic_names(),
            vec!["CA - Toronto", "JP - Tokyo, Otemachi", "US - Los Angeles"]
        );
        assert_eq!(catalog.bgp_names(), vec!["DE - Frankfurt", "US - Ashburn"]);
    }

    #[test]
    fn marker_without_options_is_empty() {
        let catalog = parse_catalog("<html>default:</html>").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn non_ascii_labels_are_skipped() {
        let page = r#"default: new Option("BR - São Paulo","GRU"); new Option("US - Los Angeles","LAX");"#;
        let catalog = parse_catalog(page).unwrap();
        assert_eq!(catalog.diagnostic_names(), vec!["US - Los Angeles"]);
    }

    #[test]
    fn missing_marker_is_an_error() {
        let err = parse_catalog(r#"Option("US - Los Angeles","LAX")"#).unwrap_err();
        assert!(matches!(err, LookingGlassError::CatalogMarkerMissing));
    }

    #[test]
    fn cache_freshness() {
        let mut cache = CatalogCache::new();
        assert!(!cache.is_fresh(None));
        assert!(!cache.is_fresh(Some(Duration::from_secs(3600))));

        cache.store(Catalog::default());
        assert!(cache.is_fresh(None));
        assert!(cache.is_fresh(Some(Duration::from_secs(3600))));
        assert!(!cache.is_fresh(Some(Duration::from_secs(0))));
    }
}
