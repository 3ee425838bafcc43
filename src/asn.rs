use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ASN_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bAS(\d+)\b").unwrap());

/// Rewrites ASN tokens in a traceroute line into something readable.
pub trait AsnRewrite: Send + Sync {
    fn rewrite(&self, line: &str) -> String;
}

impl<F> AsnRewrite for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn rewrite(&self, line: &str) -> String {
        self(line)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoRewrite;

impl AsnRewrite for NoRewrite {
    fn rewrite(&self, line: &str) -> String {
        line.to_owned()
    }
}

/// Replaces `AS<number>` tokens that have a known name, leaving unknown ones untouched.
#[derive(Clone, Debug)]
pub struct AsnTable {
    names: HashMap<u32, String>,
}

impl AsnTable {
    pub fn new() -> Self {
        AsnTable { names: HashMap::new() }
    }

    pub fn insert(&mut self, asn: u32, name: impl Into<String>) -> &mut Self {
        self.names.insert(asn, name.into());
        self
    }

    pub fn get(&self, asn: u32) -> Option<&str> {
        self.names.get(&asn).map(String::as_str)
    }
}

impl Default for AsnTable {
    fn default() -> Self {
        AsnTable::new()
    }
}

impl AsnRewrite for AsnTable {
    fn rewrite(&self, line: &str) -> String {
        if self.names.is_empty() {
            return line.to_owned();
        }
        ASN_TOKEN
            .replace_all(line, |caps: &Captures| {
                caps[1]
                    .parse::<u32>()
                    .ok()
                    .and_then(|asn| self.get(asn))
                    .map(str::to_owned)
                    .unwrap_or_else(|| caps[0].to_owned())
            })
            .into_owned()
    }
}
