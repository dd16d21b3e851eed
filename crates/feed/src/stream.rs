use std::{pin::Pin, time::Duration};

use {
    chrono::{DateTime, SecondsFormat, Utc},
    futures::{Stream, StreamExt},
    reqwest::header::ACCEPT,
    tracing::{debug, info, trace, warn},
    url::Url,
};

use crate::{Error, Event, Result, sse::SseParser};

/// Public Wikimedia EventStreams endpoint.
pub const DEFAULT_BASE_URL: &str = "https://stream.wikimedia.org/v2/stream";

/// Subscription parameters.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    pub streams: Vec<String>,
    /// Only yield changes from this server (e.g. `en.wikipedia.org`).
    pub server_name: Option<String>,
    /// Start of the subscription. Always "now" at process start.
    pub since: DateTime<Utc>,
    /// Consecutive failed connections tolerated before giving up.
    pub max_reconnects: u32,
    pub reconnect_delay: Duration,
}

impl FeedConfig {
    #[must_use]
    pub fn starting_at(since: DateTime<Utc>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            streams: vec!["recentchange".to_string()],
            server_name: Some("en.wikipedia.org".to_string()),
            since,
            max_reconnects: 5,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Boxed feed stream, as consumed by the relay.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

/// EventStreams subscriber.
pub struct EventStreamClient {
    client: reqwest::Client,
    config: FeedConfig,
}

impl EventStreamClient {
    #[must_use]
    pub fn new(client: reqwest::Client, config: FeedConfig) -> Self {
        Self { client, config }
    }

    /// `<base>/<stream,stream>?since=<rfc3339>`
    pub fn subscription_url(&self) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{}", self.config.streams.join(",")))?;
        url.query_pairs_mut().append_pair(
            "since",
            &self.config.since.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        Ok(url)
    }

    /// Open the subscription.
    ///
    /// The returned stream connects lazily on first poll. Per-record errors
    /// are yielded and the stream continues; after `max_reconnects`
    /// consecutive failed connections it yields [`Error::Exhausted`] and ends.
    /// Reconnects resume from the last SSE id seen.
    pub fn subscribe(self) -> EventStream {
        Box::pin(async_stream::stream! {
            let url = match self.subscription_url() {
                Ok(url) => url,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };

            let mut last_id: Option<String> = None;
            let mut failures: u32 = 0;

            loop {
                let mut request = self.client.get(url.clone()).header(ACCEPT, "text/event-stream");
                if let Some(ref id) = last_id {
                    request = request.header("Last-Event-ID", id.as_str());
                }

                let failure = match request.send().await.and_then(reqwest::Response::error_for_status) {
                    Err(e) => e.to_string(),
                    Ok(resp) => {
                        info!(%url, resumed = last_id.is_some(), "feed connected");
                        let mut body = resp.bytes_stream();
                        let mut parser = SseParser::new();
                        let mut reason = String::from("feed closed the stream");

                        while let Some(chunk) = body.next().await {
                            let chunk = match chunk {
                                Ok(chunk) => chunk,
                                Err(e) => {
                                    reason = e.to_string();
                                    break;
                                },
                            };
                            for msg in parser.push(&chunk) {
                                if msg.id.is_some() {
                                    last_id = msg.id.clone();
                                }
                                match Event::from_record(&msg.data) {
                                    Ok(Some(event)) => {
                                        failures = 0;
                                        let foreign = self
                                            .config
                                            .server_name
                                            .as_deref()
                                            .is_some_and(|wanted| wanted != event.server_name);
                                        if foreign {
                                            trace!(server = %event.server_name, "skipping change from other server");
                                            continue;
                                        }
                                        yield Ok(event);
                                    },
                                    Ok(None) => trace!("skipping canary record"),
                                    Err(e) => {
                                        debug!(error = %e, "unusable feed record");
                                        yield Err(e);
                                    },
                                }
                            }
                        }
                        if parser.pending() > 0 {
                            debug!(bytes = parser.pending(), "discarding unterminated SSE block");
                        }
                        reason
                    },
                };

                failures += 1;
                if failures > self.config.max_reconnects {
                    yield Err(Error::Exhausted {
                        attempts: failures,
                        last: failure,
                    });
                    return;
                }
                warn!(attempt = failures, error = %failure, "feed interrupted, reconnecting");
                tokio::time::sleep(self.config.reconnect_delay).await;
            }
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone, mockito::Matcher};

    fn record(title: &str, server: &str, rev: u64) -> String {
        format!(
            r#"{{"meta":{{"domain":"{server}"}},"type":"edit","title":"{title}","comment":"c","timestamp":1700000000,"user":"U","revision":{{"new":{rev}}},"server_name":"{server}"}}"#
        )
    }

    fn config(base_url: String, max_reconnects: u32) -> FeedConfig {
        FeedConfig {
            base_url,
            max_reconnects,
            reconnect_delay: Duration::ZERO,
            ..FeedConfig::starting_at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        }
    }

    #[test]
    fn subscription_url_lists_streams_and_since() {
        let mut cfg = config(DEFAULT_BASE_URL.to_string(), 5);
        cfg.streams = vec!["recentchange".into(), "revision-create".into()];
        let client = EventStreamClient::new(reqwest::Client::new(), cfg);
        assert_eq!(
            client.subscription_url().unwrap().as_str(),
            "https://stream.wikimedia.org/v2/stream/recentchange,revision-create?since=2024-05-01T12%3A00%3A00Z"
        );
    }

    #[tokio::test]
    async fn yields_events_filters_and_gives_up() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "event: message\nid: 1\ndata: {}\n\n:heartbeat\n\ndata: {}\n\ndata: {{\"nope\":1}}\n\ndata: {}\n\n",
            record("Wikipedia:Sandbox", "en.wikipedia.org", 42),
            record("Spielwiese", "de.wikipedia.org", 7),
            record("Canary", "canary", 1),
        );
        let _mock = server
            .mock("GET", Matcher::Regex("^/recentchange".into()))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = EventStreamClient::new(reqwest::Client::new(), config(server.url(), 0));
        let items: Vec<Result<Event>> = client.subscribe().collect().await;

        assert_eq!(items.len(), 3, "{items:?}");
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.title, "Wikipedia:Sandbox");
        assert_eq!(first.revision_new_id(), Some(42));
        assert!(matches!(items[1], Err(Error::Malformed(_))));
        assert!(matches!(items[2], Err(Error::Exhausted { attempts: 1, .. })));
        assert!(items[2].as_ref().unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn reconnect_resumes_from_last_event_id() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", Matcher::Regex("^/recentchange".into()))
            .match_header("last-event-id", Matcher::Missing)
            .with_status(200)
            .with_body(format!("id: cursor-1\ndata: {}\n\n", record("First", "en.wikipedia.org", 1)))
            .create_async()
            .await;
        let resumed = server
            .mock("GET", Matcher::Regex("^/recentchange".into()))
            .match_header("last-event-id", "cursor-1")
            .with_status(200)
            .with_body(format!("id: cursor-2\ndata: {}\n\n", record("Second", "en.wikipedia.org", 2)))
            .create_async()
            .await;

        let client = EventStreamClient::new(reqwest::Client::new(), config(server.url(), 3));
        let items: Vec<Result<Event>> = client.subscribe().take(2).collect().await;

        let titles: Vec<&str> = items
            .iter()
            .map(|i| i.as_ref().unwrap().title.as_str())
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
        resumed.assert_async().await;
    }

    #[tokio::test]
    async fn http_errors_count_against_the_budget() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex("^/recentchange".into()))
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = EventStreamClient::new(reqwest::Client::new(), config(server.url(), 2));
        let items: Vec<Result<Event>> = client.subscribe().collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Exhausted { attempts: 3, .. })));
        mock.assert_async().await;
    }
}
