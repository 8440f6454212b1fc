//! In-cluster Kubernetes log source.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use {
    async_trait::async_trait,
    chrono::{DateTime, SecondsFormat, Utc},
    bytes::Buf,
    futures::{Stream, StreamExt, TryStreamExt, future},
    serde::Deserialize,
    tokio::io::AsyncBufReadExt,
    tokio_stream::wrappers::SplitStream,
    tokio_util::io::StreamReader,
    tracing::debug,
};

use crate::{
    Error, Result,
    error::Context,
    source::{LineStream, LogSource},
};

pub const TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_API_BASE: &str = "https://kubernetes.default.svc";

/// Seconds of backlog requested the first time an instance is followed.
pub const INITIAL_BACKLOG_SECS: u32 = 10;

/// API base from the in-cluster service environment, with the cluster DNS
/// name as fallback.
pub fn api_base_from(host: Option<&str>, port: Option<&str>) -> String {
    match (host, port) {
        (Some(host), Some(port)) if !host.is_empty() && !port.is_empty() => {
            format!("https://{host}:{port}")
        },
        _ => DEFAULT_API_BASE.to_string(),
    }
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    metadata: PodMetadata,
}

#[derive(Deserialize)]
struct PodMetadata {
    name: String,
}

/// Remembers the newest delivered line per instance so a reconnect does not
/// replay output that was already handed out.
///
/// Only the replayed prefix of a resumed stream is deduplicated. Once a line
/// newer than the resume point arrives, every following line is delivered
/// regardless of its timestamp.
#[derive(Debug, Default)]
pub struct ResumeCursor {
    instance: Option<String>,
    last: Option<DateTime<Utc>>,
    replay_until: Option<DateTime<Utc>>,
}

impl ResumeCursor {
    /// Resume point for `instance`, if lines from it were delivered before.
    pub fn since(&self, instance: &str) -> Option<DateTime<Utc>> {
        match &self.instance {
            Some(current) if current == instance => self.last,
            _ => None,
        }
    }

    /// Start a new stream for `instance` and return where it resumes from.
    pub fn open(&mut self, instance: &str) -> Option<DateTime<Utc>> {
        self.switch_to(instance);
        self.replay_until = self.since(instance);
        self.replay_until
    }

    /// Strip the timestamp from a raw log line and decide whether to deliver
    /// it. While replaying, lines at or before the resume point are dropped.
    /// Lines without a parseable timestamp are delivered unchanged.
    pub fn accept(&mut self, instance: &str, raw: &str) -> Option<String> {
        self.switch_to(instance);

        let Some((stamp, rest)) = raw.split_once(' ') else {
            return Some(raw.to_string());
        };
        let Ok(stamp) = DateTime::parse_from_rfc3339(stamp) else {
            return Some(raw.to_string());
        };
        let stamp = stamp.with_timezone(&Utc);

        if let Some(resume) = self.replay_until {
            if stamp <= resume {
                return None;
            }
            self.replay_until = None;
        }
        self.last = Some(stamp);
        Some(rest.to_string())
    }

    fn switch_to(&mut self, instance: &str) {
        if self.instance.as_deref() != Some(instance) {
            self.instance = Some(instance.to_string());
            self.last = None;
            self.replay_until = None;
        }
    }
}

/// Split a raw log body on newlines and hand each line to the cursor.
///
/// Bytes that are not valid UTF-8 are replaced so one bad line cannot wedge
/// the stream.
fn log_lines<S, B>(body: S, cursor: Arc<Mutex<ResumeCursor>>, instance: String) -> LineStream
where
    S: Stream<Item = std::io::Result<B>> + Send + 'static,
    B: Buf + Send + 'static,
{
    let segments = SplitStream::new(StreamReader::new(Box::pin(body)).split(b'\n'));
    segments
        .filter_map(move |segment| {
            let item = match segment {
                Ok(bytes) => {
                    let raw = decode_line(&instance, bytes);
                    cursor
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .accept(&instance, &raw)
                        .map(Ok)
                },
                Err(source) => Some(Err(Error::Stream { source })),
            };
            future::ready(item)
        })
        .boxed()
}

fn decode_line(instance: &str, bytes: Vec<u8>) -> String {
    let mut line = match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => {
            debug!(pod = %instance, "replacing invalid UTF-8 in log line");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        },
    };
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Resolves pods by label selector and follows their logs through the
/// Kubernetes API using the pod's service account.
pub struct KubeLogSource {
    client: reqwest::Client,
    api_base: String,
    namespace: String,
    token_path: PathBuf,
    cursor: Arc<Mutex<ResumeCursor>>,
}

impl KubeLogSource {
    /// Build a source for the cluster this process runs in.
    pub fn in_cluster(namespace: impl Into<String>) -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").ok();
        let port = std::env::var("KUBERNETES_SERVICE_PORT").ok();
        Self::new(
            api_base_from(host.as_deref(), port.as_deref()),
            namespace,
            TOKEN_PATH,
        )
    }

    pub fn new(
        api_base: impl Into<String>,
        namespace: impl Into<String>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Error::external("build kubernetes client", e))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            token_path: token_path.into(),
            cursor: Arc::new(Mutex::new(ResumeCursor::default())),
        })
    }

    async fn token(&self) -> Result<String> {
        let token = tokio::fs::read_to_string(&self.token_path)
            .await
            .with_context(|| format!("read service account token {}", self.token_path.display()))?;
        Ok(token.trim().to_string())
    }

    async fn get(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let token = self.token().await?;
        let resp = self
            .client
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::external(operation, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl LogSource for KubeLogSource {
    async fn resolve(&self, selector: &str) -> Result<String> {
        let path = format!("/api/v1/namespaces/{}/pods", self.namespace);
        let query = [
            ("labelSelector", selector.to_string()),
            ("limit", "1".to_string()),
        ];
        let pods: PodList = self
            .get("list pods", &path, &query)
            .await?
            .json()
            .await
            .map_err(|e| Error::external("decode pod list", e))?;

        pods.items
            .into_iter()
            .next()
            .map(|pod| pod.metadata.name)
            .ok_or_else(|| Error::NotFound {
                selector: selector.to_string(),
            })
    }

    async fn stream_output(&self, instance: &str) -> Result<LineStream> {
        let since = self
            .cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .open(instance);

        let mut query = vec![
            ("follow", "true".to_string()),
            ("timestamps", "true".to_string()),
        ];
        match since {
            Some(since) => {
                debug!(pod = %instance, since = %since, "resuming log stream");
                query.push((
                    "sinceTime",
                    since.to_rfc3339_opts(SecondsFormat::Secs, true),
                ));
            },
            None => query.push(("sinceSeconds", INITIAL_BACKLOG_SECS.to_string())),
        }

        let path = format!("/api/v1/namespaces/{}/pods/{instance}/log", self.namespace);
        let resp = self.get("stream logs", &path, &query).await?;

        let body = resp.bytes_stream().map_err(std::io::Error::other);
        Ok(log_lines(body, Arc::clone(&self.cursor), instance.to_string()))
    }

    fn scope(&self) -> &str {
        &self.namespace
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case::from_env(Some("10.0.0.1"), Some("443"), "https://10.0.0.1:443")]
    #[case::missing_port(Some("10.0.0.1"), None, DEFAULT_API_BASE)]
    #[case::missing_host(None, Some("443"), DEFAULT_API_BASE)]
    #[case::empty_host(Some(""), Some("443"), DEFAULT_API_BASE)]
    fn api_base(#[case] host: Option<&str>, #[case] port: Option<&str>, #[case] expected: &str) {
        assert_eq!(api_base_from(host, port), expected);
    }

    #[test]
    fn strips_timestamps() {
        let mut cursor = ResumeCursor::default();
        let line = cursor.accept("pod-a", "2024-05-01T12:00:00.000000001Z [CHAT] Alice: hi");
        assert_eq!(line.as_deref(), Some("[CHAT] Alice: hi"));
    }

    #[test]
    fn drops_lines_replayed_after_reconnect() {
        let mut cursor = ResumeCursor::default();
        assert!(cursor.open("pod-a").is_none());
        assert!(cursor.accept("pod-a", "2024-05-01T12:00:00.1Z one").is_some());
        assert!(cursor.accept("pod-a", "2024-05-01T12:00:00.2Z two").is_some());

        // A reconnect with sinceTime truncated to the second replays both.
        assert!(cursor.open("pod-a").is_some());
        assert!(cursor.accept("pod-a", "2024-05-01T12:00:00.1Z one").is_none());
        assert!(cursor.accept("pod-a", "2024-05-01T12:00:00.2Z two").is_none());
        assert_eq!(
            cursor.accept("pod-a", "2024-05-01T12:00:00.3Z three").as_deref(),
            Some("three")
        );
    }

    #[test]
    fn live_lines_with_equal_or_older_timestamps_are_delivered() {
        let mut cursor = ResumeCursor::default();
        cursor.open("pod-a");
        let lines: Vec<_> = [
            "2024-05-01T12:00:05.5Z Alice joined the game",
            "2024-05-01T12:00:05.5Z Bob joined the game",
            "2024-05-01T12:00:04.9Z Carol joined the game",
        ]
        .into_iter()
        .map(|raw| cursor.accept("pod-a", raw))
        .collect();
        assert_eq!(lines, [
            Some("Alice joined the game".to_string()),
            Some("Bob joined the game".to_string()),
            Some("Carol joined the game".to_string()),
        ]);
    }

    #[test]
    fn replay_ends_at_first_newer_line() {
        let mut cursor = ResumeCursor::default();
        cursor.open("pod-a");
        cursor.accept("pod-a", "2024-05-01T12:00:05Z before");

        cursor.open("pod-a");
        assert!(cursor.accept("pod-a", "2024-05-01T12:00:05Z before").is_none());
        assert!(cursor.accept("pod-a", "2024-05-01T12:00:06Z after").is_some());
        // Clock stepped back after the replay finished.
        assert_eq!(
            cursor.accept("pod-a", "2024-05-01T12:00:01Z stepped").as_deref(),
            Some("stepped")
        );
    }

    #[test]
    fn resume_point_is_per_instance() {
        let mut cursor = ResumeCursor::default();
        assert!(cursor.since("pod-a").is_none());

        cursor.accept("pod-a", "2024-05-01T12:00:05Z hello");
        let since = cursor.since("pod-a").unwrap();
        assert_eq!(since.to_rfc3339_opts(SecondsFormat::Secs, true), "2024-05-01T12:00:05Z");
        assert!(cursor.since("pod-b").is_none());

        // A new instance starts from scratch.
        assert_eq!(
            cursor.accept("pod-b", "2024-05-01T11:00:00Z older").as_deref(),
            Some("older")
        );
        assert!(cursor.since("pod-a").is_none());
    }

    #[test]
    fn passes_through_lines_without_timestamp() {
        let mut cursor = ResumeCursor::default();
        assert_eq!(cursor.accept("pod-a", "no-stamp").as_deref(), Some("no-stamp"));
        assert_eq!(
            cursor.accept("pod-a", "not-a-time hello").as_deref(),
            Some("not-a-time hello")
        );
    }

    async fn collect_lines(
        chunks: Vec<&'static [u8]>,
        cursor: &Arc<Mutex<ResumeCursor>>,
    ) -> Vec<String> {
        cursor.lock().unwrap().open("pod-a");
        let body = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
        log_lines(body, Arc::clone(cursor), "pod-a".to_string())
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_stop_the_stream() {
        let cursor = Arc::new(Mutex::new(ResumeCursor::default()));
        let body: &'static [u8] = b"2024-05-01T12:00:00.1Z Alice joined the game\n\
            2024-05-01T12:00:00.2Z [CHAT] Bob: caf\xe9\n\
            2024-05-01T12:00:00.3Z [CHAT] Carol: after\n";

        let lines = collect_lines(vec![body], &cursor).await;
        assert_eq!(lines, [
            "Alice joined the game",
            "[CHAT] Bob: caf\u{FFFD}",
            "[CHAT] Carol: after",
        ]);

        // The same output replayed on reconnect yields only what is new.
        let replay: &'static [u8] = b"2024-05-01T12:00:00.3Z [CHAT] Carol: after\n\
            2024-05-01T12:00:00.4Z [CHAT] Dave: next\n";
        let lines = collect_lines(vec![body, replay], &cursor).await;
        assert_eq!(lines, ["[CHAT] Dave: next"]);
    }

    #[tokio::test]
    async fn lines_split_across_chunks_and_crlf() {
        let cursor = Arc::new(Mutex::new(ResumeCursor::default()));
        let lines = collect_lines(
            vec![
                &b"2024-05-01T12:00:00Z Alice jo"[..],
                &b"ined the game\r\n2024-05-01T12:00:01Z Rocket launched"[..],
            ],
            &cursor,
        )
        .await;
        assert_eq!(lines, ["Alice joined the game", "Rocket launched"]);
    }
}
