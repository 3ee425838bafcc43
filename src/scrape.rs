use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, LazyLock};
use std::thread;

use regex::Regex;
use tracing::{debug, warn};

use crate::asn::AsnRewrite;
use crate::error::{LookingGlassError, Result};
use crate::sink::Sink;

static PRE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<pre>(.*?)</pre>").unwrap());
static TRACE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(traceroute|\s*\d{1,2})").unwrap());

/// Content of the first `<pre>` block in a ping answer.
pub fn extract_pre(body: &str) -> Option<&str> {
    PRE.captures(body).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Keeps traceroute headers and hop lines, rewriting their ASNs.
pub struct TraceFilter {
    rewrite: Arc<dyn AsnRewrite>,
}

impl TraceFilter {
    pub fn new(rewrite: Arc<dyn AsnRewrite>) -> Self {
        TraceFilter { rewrite }
    }

    pub fn apply(&self, line: String) -> Option<String> {
        if TRACE_LINE.is_match(&line) {
            Some(self.rewrite.rewrite(&line))
        } else {
            None
        }
    }
}

/// A streamed looking glass answer.
///
/// Lines are produced by a worker thread as the response arrives and handed
/// over one at a time. A failure ends the stream with a single `Err` item.
/// Dropping `Lines` early stops the worker at its next line.
pub struct Lines {
    rx: Receiver<Result<String>>,
}

impl Lines {
    /// A stream that is already closed.
    pub fn empty() -> Self {
        let (_, rx) = sync_channel(0);
        Lines { rx }
    }

    /// A stream holding only `e`.
    pub fn failed(e: LookingGlassError) -> Self {
        let (tx, rx) = sync_channel(1);
        let _ = tx.send(Err(e));
        Lines { rx }
    }

    /// Runs `request` on a worker thread and streams the lines of its body.
    ///
    /// `filter` decides which lines reach the consumer and in what form.
    pub fn spawn<R, F, P>(request: F, filter: P, sink: Arc<dyn Sink>) -> Self
    where
        R: Read + Send + 'static,
        F: FnOnce() -> Result<R> + Send + 'static,
        P: Fn(String) -> Option<String> + Send + 'static,
    {
        let (tx, rx) = sync_channel(0);
        thread::spawn(move || match request() {
            Ok(body) => pump(BufReader::new(body), &tx, filter),
            Err(e) => {
                warn!(error = %e, "looking glass request failed");
                sink.error(&format!("error: {}", e));
                let _ = tx.send(Err(e));
            }
        });
        Lines { rx }
    }
}

fn pump<B, P>(mut body: B, tx: &SyncSender<Result<String>>, filter: P)
where
    B: BufRead,
    P: Fn(String) -> Option<String>,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match body.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(&['\r', '\n'][..])
                    .to_owned();
                if let Some(line) = filter(line) {
                    if tx.send(Ok(line)).is_err() {
                        debug!("line consumer went away, dropping response");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "reading looking glass response failed");
                let _ = tx.send(Err(LookingGlassError::Io(e)));
                return;
            }
        }
    }
}

impl Iterator for Lines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}
