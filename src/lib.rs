//! Client for the Cogent (AS174) looking glass.
//!
//! A [`Session`] discovers the carrier's vantage points from the portal page,
//! lets the caller pick one and runs ping, traceroute and BGP queries from it.

pub mod asn;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod scrape;
pub mod session;
pub mod sink;

pub use crate::asn::{AsnRewrite, AsnTable, NoRewrite};
pub use crate::catalog::Catalog;
pub use crate::config::{Config, IpVersion};
pub use crate::error::{LookingGlassError, Result};
pub use crate::scrape::Lines;
pub use crate::session::Session;
pub use crate::sink::{MemorySink, Sink, TracingSink};
