//! Scripted HTTP/1.1 server for exercising the YouTube clients in tests

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::config::Config;

type Handler = dyn Fn(&Url) -> (u16, String) + Send + Sync;

/// Answers every request with whatever the handler returns for its URL and
/// remembers the URLs it saw.
pub(crate) struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Url>>>,
}

impl TestServer {
    pub(crate) async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Url) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handler: Arc<Handler> = Arc::new(handler);
        let seen = Arc::clone(&requests);
        let origin = base_url.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = Arc::clone(&handler);
                let seen = Arc::clone(&seen);
                let origin = origin.clone();
                tokio::spawn(async move {
                    respond(stream, &origin, handler.as_ref(), &seen).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }

    /// Default config with every endpoint pointed at this server
    pub(crate) fn config(&self) -> Config {
        let mut config = Config::default();
        config.youtube.api_base_url = format!("{}/youtube/v3", self.base_url);
        config.youtube.watch_base_url = self.base_url.clone();
        config.youtube.api_key = "test-key".to_string();
        config
    }
}

async fn respond(
    mut stream: TcpStream,
    origin: &str,
    handler: &Handler,
    seen: &Mutex<Vec<Url>>,
) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    let target = head.split_whitespace().nth(1).unwrap_or("/");
    let url = Url::parse(&format!("{origin}{target}")).unwrap();
    seen.lock().unwrap().push(url.clone());

    let (status, body) = handler(&url);
    let response = format!(
        "HTTP/1.1 {status} Scripted\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Value of a query parameter
pub(crate) fn param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
