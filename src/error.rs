use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookingGlassError {
    #[error("invalid node or host/ip address")]
    InvalidTarget,

    #[error("node is not in the looking glass catalog: {0}")]
    UnknownNode(String),

    #[error("node {node} doesn't support bgp, available nodes: {}", .available.join(", "))]
    UnsupportedBgpNode { node: String, available: Vec<String> },

    #[error("cogent looking glass is not available (status {0})")]
    Unavailable(StatusCode),

    #[error("no result in looking glass response")]
    NoResult,

    #[error("node listing marker not found in looking glass page")]
    CatalogMarkerMissing,

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reading looking glass response failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LookingGlassError>;
