use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::provider::StatsFeed;
use crate::error::FetchError;

pub const DEFAULT_SCOREBOARD_URL: &str =
    "https://cdn.nba.com/static/json/liveData/scoreboard/todaysScoreboard_00.json";
pub const DEFAULT_STATS_URL: &str = "https://stats.nba.com/stats";

/// Upper bound on a single remote call, independent of retry backoff.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking client for the NBA live-data CDN and the stats API.
#[derive(Clone)]
pub struct NbaClient {
    http: Client,
    scoreboard_url: Url,
    stats_url: Url,
}

impl NbaClient {
    pub fn new(scoreboard_url: &str, stats_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) basketboule")
            .default_headers(stats_headers())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NbaClient {
            http,
            scoreboard_url: Url::parse(scoreboard_url)
                .with_context(|| format!("Invalid scoreboard URL '{}'", scoreboard_url))?,
            stats_url: Url::parse(stats_url)
                .with_context(|| format!("Invalid stats URL '{}'", stats_url))?,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        NbaClient::new(DEFAULT_SCOREBOARD_URL, DEFAULT_STATS_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// `<stats_url>/<endpoint>?<params>`
    pub fn endpoint_url(&self, endpoint: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.stats_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(endpoint);
        }
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        url
    }

    fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|e| {
                debug!("Could not read error body from {}: {}", status, e);
                format!("<unreadable body: {}>", e)
            });
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl StatsFeed for NbaClient {
    fn scoreboard(&self) -> Result<Value, FetchError> {
        self.get_json(self.scoreboard_url.clone())
    }

    fn stats(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, FetchError> {
        self.get_json(self.endpoint_url(endpoint, params))
    }

    fn name(&self) -> &str {
        "nba.com"
    }
}

/// stats.nba.com drops requests that don't look like they come from nba.com.
fn stats_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert("x-nba-stats-origin", HeaderValue::from_static("stats"));
    headers.insert("x-nba-stats-token", HeaderValue::from_static("true"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransientKind;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_endpoint_url() {
        let client = NbaClient::with_defaults().unwrap();
        let url = client.endpoint_url(
            "leaguegamefinder",
            &[("LeagueID", "00".into()), ("Season", "2024-25".into())],
        );
        assert_eq!(
            url.as_str(),
            "https://stats.nba.com/stats/leaguegamefinder?LeagueID=00&Season=2024-25"
        );
    }

    #[test]
    fn test_endpoint_url_with_trailing_slash() {
        let client = NbaClient::new(
            DEFAULT_SCOREBOARD_URL,
            "http://localhost:9000/stats/",
            DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap();
        let url = client.endpoint_url("teamdetails", &[("TeamID", "1610612738".into())]);
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/stats/teamdetails?TeamID=1610612738"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(NbaClient::new("not a url", DEFAULT_STATS_URL, DEFAULT_REQUEST_TIMEOUT).is_err());
    }

    #[test]
    fn test_refused_connection_is_transient() {
        // Port 1 on loopback is never listening.
        let client = NbaClient::new(
            "http://127.0.0.1:1/scoreboard.json",
            "http://127.0.0.1:1/stats",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.scoreboard().unwrap_err();
        assert_eq!(err.transient_kind(), Some(TransientKind::Connection));
    }

    #[test]
    fn test_silent_server_is_transient_timeout() {
        // Accepted by the kernel backlog, never answered.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let client = NbaClient::new(
            &format!("{}/scoreboard.json", base),
            &format!("{}/stats", base),
            Duration::from_millis(300),
        )
        .unwrap();
        let err = client.scoreboard().unwrap_err();
        assert_eq!(err.transient_kind(), Some(TransientKind::Timeout));
        drop(listener);
    }

    #[test]
    fn test_redirect_loop_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming().take(32) {
                let Ok(mut stream) = stream else { continue };
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let reply = format!(
                    "HTTP/1.1 302 Found\r\nLocation: http://{}/loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    addr
                );
                let _ = stream.write_all(reply.as_bytes());
            }
        });

        let base = format!("http://{}", addr);
        let client = NbaClient::new(
            &format!("{}/scoreboard.json", base),
            &format!("{}/stats", base),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.scoreboard().unwrap_err();
        assert_eq!(err.transient_kind(), Some(TransientKind::TooManyRedirects));
    }

    #[test]
    fn test_error_status_is_fatal_with_body() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let body = "rate limited";
                let reply = format!(
                    "HTTP/1.1 429 Too Many Requests\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes());
            }
        });

        let client = NbaClient::new(
            DEFAULT_SCOREBOARD_URL,
            &format!("http://{}/stats", addr),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.stats("teamdetails", &[]).unwrap_err();
        assert!(!err.is_transient());
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }
}
