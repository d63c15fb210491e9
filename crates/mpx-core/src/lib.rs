use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

pub mod close_history;
pub mod format;
pub mod keyboard;
pub mod navigation;
pub mod poller;
pub mod selection;
pub mod source;

pub use close_history::CloseHistory;
pub use keyboard::Step;
pub use navigation::{HistoryBackend, NavigationBridge, SessionHistory};
pub use poller::{FetchCompletion, PollOutcome, PollState, PollerConfig, SnapshotPoller};
pub use selection::{SelectionChange, SelectionReconciler};
pub use source::{Endpoints, FetchError, HttpSnapshotSource, SnapshotSource};

/// One wholesale status reading. Replaced, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub servers: Vec<ServerEntry>,
    pub uptime: Duration,
    pub throughput: Throughput,
}

impl Snapshot {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Index of the first server carrying `tag`. Later duplicates are never reached.
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.servers.iter().position(|server| server.tag == tag)
    }

    pub fn find(&self, tag: &str) -> Option<&ServerEntry> {
        self.position(tag).and_then(|idx| self.servers.get(idx))
    }

    pub fn total_alive_connections(&self) -> u64 {
        self.servers
            .iter()
            .map(|server| u64::from(server.status.conn_alive))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub tx_bps: u64,
    pub rx_bps: u64,
}

impl Throughput {
    pub fn total(&self) -> u64 {
        self.tx_bps.saturating_add(self.rx_bps)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traffic {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
}

impl Traffic {
    pub fn total(&self) -> u64 {
        self.tx_bytes.saturating_add(self.rx_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyProto {
    #[serde(rename = "HTTP")]
    Http {
        #[serde(default)]
        connect_with_payload: bool,
    },
    #[serde(rename = "SOCKSv5")]
    Socks5 {
        #[serde(default)]
        fake_handshaking: bool,
    },
}

impl ProxyProto {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProto::Http { .. } => "HTTP",
            ProxyProto::Socks5 { .. } => "SOCKSv5",
        }
    }
}

impl fmt::Display for ProxyProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub test_dns: String,
    pub max_wait: Duration,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub score_base: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    #[serde(default, deserialize_with = "upstream_option")]
    pub delay: Option<Duration>,
    #[serde(default, deserialize_with = "upstream_option")]
    pub score: Option<i32>,
    pub conn_alive: u32,
    pub conn_total: u32,
    #[serde(default)]
    pub conn_error: u32,
    #[serde(default)]
    pub close_history: u64,
}

/// A monitored proxy server as of one snapshot.
///
/// The upstream document nests the server under `server` next to its
/// `throughput`; the flattened shape is what the rest of the crate works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireServerEntry", into = "WireServerEntry")]
pub struct ServerEntry {
    pub tag: String,
    pub addr: String,
    pub proto: ProxyProto,
    pub config: ServerConfig,
    pub status: ServerStatus,
    pub traffic: Traffic,
    pub throughput: Throughput,
}

impl ServerEntry {
    pub fn proxy_url(&self) -> String {
        format!("{}://{}", self.proto, self.addr)
    }

    /// Number of meaningful low bits in `status.close_history`.
    pub fn close_history_size(&self) -> u32 {
        close_history::history_size(self.status.conn_total, self.status.conn_alive)
    }

    pub fn close_history(&self) -> CloseHistory {
        close_history::decode(self.status.close_history, self.close_history_size())
    }
}

#[derive(Serialize, Deserialize)]
struct WireServer {
    addr: String,
    proto: ProxyProto,
    tag: String,
    config: ServerConfig,
    status: ServerStatus,
    traffic: Traffic,
}

#[derive(Serialize, Deserialize)]
struct WireServerEntry {
    server: WireServer,
    #[serde(default)]
    throughput: Throughput,
}

impl From<WireServerEntry> for ServerEntry {
    fn from(wire: WireServerEntry) -> Self {
        let WireServerEntry { server, throughput } = wire;
        Self {
            tag: server.tag,
            addr: server.addr,
            proto: server.proto,
            config: server.config,
            status: server.status,
            traffic: server.traffic,
            throughput,
        }
    }
}

impl From<ServerEntry> for WireServerEntry {
    fn from(entry: ServerEntry) -> Self {
        Self {
            server: WireServer {
                addr: entry.addr,
                proto: entry.proto,
                tag: entry.tag,
                config: entry.config,
                status: entry.status,
                traffic: entry.traffic,
            },
            throughput: entry.throughput,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UpstreamOption<T> {
    Wrapped {
        #[serde(rename = "Some")]
        some: T,
    },
    Bare(T),
}

/// Accepts `null`, a bare value, or the `{"Some": value}` wrapper some
/// upstream builds emit for optional fields.
fn upstream_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<UpstreamOption<T>>::deserialize(deserializer)?;
    Ok(value.map(|value| match value {
        UpstreamOption::Wrapped { some } => some,
        UpstreamOption::Bare(value) => value,
    }))
}

/// Taxonomy of the non-fatal conditions the dashboard core can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FetchFailed,
    SelectionMiss,
    NavigationDesync,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FetchFailed => "fetch-failed",
            ErrorKind::SelectionMiss => "selection-miss",
            ErrorKind::NavigationDesync => "navigation-desync",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn server(tag: &str) -> ServerEntry {
        ServerEntry {
            tag: tag.to_string(),
            addr: format!("{tag}.example:1080"),
            proto: ProxyProto::Socks5 {
                fake_handshaking: false,
            },
            config: ServerConfig {
                test_dns: "8.8.8.8:53".to_string(),
                max_wait: Duration::from_secs(4),
                capabilities: BTreeSet::new(),
                score_base: 0,
            },
            status: ServerStatus {
                delay: Some(Duration::from_millis(120)),
                score: Some(120),
                conn_alive: 1,
                conn_total: 4,
                conn_error: 1,
                close_history: 0b001,
            },
            traffic: Traffic {
                tx_bytes: 1024,
                rx_bytes: 4096,
            },
            throughput: Throughput::default(),
        }
    }

    pub fn snapshot(tags: &[&str]) -> Snapshot {
        Snapshot {
            servers: tags.iter().map(|tag| server(tag)).collect(),
            uptime: Duration::from_secs(3600),
            throughput: Throughput::default(),
        }
    }
}
