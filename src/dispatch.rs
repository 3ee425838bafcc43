use std::fmt;

use reqwest::blocking::{Client, Response};
use tracing::debug;

use crate::config::{Config, IpVersion};
use crate::error::Result;

/// Value the portal expects in the `FKT` field of every query.
const FKT: &str = "go!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Ping,
    Trace,
    Bgp,
}

impl Command {
    pub fn code(self, ip_version: IpVersion) -> &'static str {
        match (self, ip_version) {
            (Command::Ping, IpVersion::V4) => "P4",
            (Command::Ping, IpVersion::V6) => "P6",
            (Command::Trace, IpVersion::V4) => "T4",
            (Command::Trace, IpVersion::V6) => "T6",
            (Command::Bgp, _) => "BGP",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping => f.write_str("ping"),
            Command::Trace => f.write_str("trace"),
            Command::Bgp => f.write_str("bgp"),
        }
    }
}

/// One looking glass query as submitted through the portal's form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub cmd: &'static str,
    pub destination: String,
    pub location: String,
}

impl Query {
    pub fn new(command: Command, ip_version: IpVersion, destination: &str, location: &str) -> Self {
        Query {
            cmd: command.code(ip_version),
            destination: destination.to_owned(),
            location: location.to_owned(),
        }
    }

    pub fn form(&self) -> [(&str, &str); 4] {
        [
            ("FKT", FKT),
            ("CMD", self.cmd),
            ("DST", self.destination.as_str()),
            ("LOC", self.location.as_str()),
        ]
    }

    /// Posts the query. The status code is left for the caller to judge.
    pub fn send(&self, client: &Client, config: &Config) -> Result<Response> {
        debug!(
            url = %config.portal_url,
            cmd = self.cmd,
            dst = %self.destination,
            loc = %self.location,
            "submitting looking glass query"
        );
        let response = client.post(config.portal_url.as_str()).form(&self.form()).send()?;
        debug!(cmd = self.cmd, status = %response.status(), "looking glass answered");
        Ok(response)
    }
}
