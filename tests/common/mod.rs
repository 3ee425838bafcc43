//! In-process stand-in for the looking glass portal.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

pub const CATALOG_PAGE: &str = r#"<html><head><script>
function setBgp(sel) {
    sel.options[0] = new Option("US - Ashburn","IAD02");
    sel.options[1] = new Option("DE - Frankfurt","FRA03");
}
function setNodes(sel, cmd) {
    switch (cmd) {
    default:
        sel.options[0] = new Option("US - Los Angeles","LAX");
        sel.options[1] = new Option("US - Ashburn","IAD01");
        sel.options[2] = new Option("JP - Tokyo, Otemachi","NRT01");
    }
}
</script></head><body><form method="post"></form></body></html>"#;

#[derive(Clone, Debug)]
pub struct Request {
    pub method: String,
    pub form: HashMap<String, String>,
}

pub enum Reply {
    Ok(String),
    Status(u16, String),
    /// Close the connection without answering.
    Hangup,
    /// Chunked 200 answer: `head`, then `tail` once `gate` opens.
    ///
    /// With `closed` set the body is left unterminated and the server waits
    /// for the client to drop the connection, then signals `closed`.
    Chunked {
        head: String,
        gate: Receiver<()>,
        tail: String,
        closed: Option<Sender<()>>,
    },
}

pub struct MockPortal {
    pub url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockPortal {
    /// Serves `CATALOG_PAGE` on GET and hands every POST to `post`.
    pub fn start<F>(post: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + 'static,
    {
        MockPortal::with_page(CATALOG_PAGE, post)
    }

    pub fn with_page<F>(page: &'static str, post: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => continue,
                };
                let (request, stream) = match read_request(stream) {
                    Some(parts) => parts,
                    None => continue,
                };
                recorded.lock().unwrap().push(request.clone());
                let reply = if request.method == "GET" {
                    Reply::Ok(page.to_owned())
                } else {
                    post(&request)
                };
                write_reply(stream, reply);
            }
        });

        MockPortal {
            url: format!("http://{}/lookingglass.php", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }
}

/// A URL nothing listens on.
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}/lookingglass.php", addr)
}

fn read_request(stream: TcpStream) -> Option<(Request, TcpStream)> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let method = request_line.split_whitespace().next()?.to_owned();

    let mut content_length = 0;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok()?;
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).ok()?;
    let form = url::form_urlencoded::parse(&body).into_owned().collect();

    Some((Request { method, form }, reader.into_inner()))
}

fn write_reply(mut stream: TcpStream, reply: Reply) {
    let (status, body) = match reply {
        Reply::Ok(body) => (200, body),
        Reply::Status(status, body) => (status, body),
        Reply::Hangup => return,
        Reply::Chunked {
            head,
            gate,
            tail,
            closed,
        } => return write_chunked(stream, head, gate, tail, closed),
    };
    let head = format!(
        "HTTP/1.1 {} X\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body.as_bytes());
    let _ = stream.flush();
}

fn write_chunked(
    mut stream: TcpStream,
    head: String,
    gate: Receiver<()>,
    tail: String,
    closed: Option<Sender<()>>,
) {
    let _ = stream.write_all(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
    );
    write_chunk(&mut stream, &head);
    let _ = gate.recv();
    write_chunk(&mut stream, &tail);

    match closed {
        None => {
            let _ = stream.write_all(b"0\r\n\r\n");
            let _ = stream.flush();
        }
        Some(closed) => {
            let mut buf = [0u8; 64];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
            let _ = closed.send(());
        }
    }
}

fn write_chunk(stream: &mut TcpStream, data: &str) {
    let _ = stream.write_all(format!("{:x}\r\n{}\r\n", data.len(), data).as_bytes());
    let _ = stream.flush();
}
