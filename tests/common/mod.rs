//! Shared helpers for integration tests
//!
//! - golden JSON files under `tests/testdata`, rewritten with `UPDATE_GOLDEN=1`
//! - [`FakeNode`], a minimal HTTP/1.1 server answering the node API from a
//!   [`MockNodeClient`]

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use lightweight_skycoin_libs::client::{
    balance_from_outputs, balances_from_outputs, BalanceResponse, MockNodeClient, NodeClient,
    ReadableBlocks,
};
use lightweight_skycoin_libs::crypto::hash::Sha256Hash;
use lightweight_skycoin_libs::errors::{ErrorKind, SkyWalletError, SkyWalletResult};
use lightweight_skycoin_libs::Address;

/// File under `tests/testdata`
pub fn testdata_path(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("testdata")
        .join(file)
}

pub fn golden_path(name: &str) -> PathBuf {
    testdata_path(&format!("{}.golden", name))
}

pub fn update_golden() -> bool {
    std::env::var("UPDATE_GOLDEN").map(|v| v == "1").unwrap_or(false)
}

/// Whether tests against a live node at `SKYCOIN_NODE_HOST` should run
pub fn live_tests_enabled() -> bool {
    std::env::var("SKYCOIN_INTEGRATION_TESTS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Compare `actual` structurally with `tests/testdata/<name>.golden`
pub fn assert_golden(name: &str, actual: &Value) {
    let path = golden_path(name);
    if update_golden() {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        actual.serialize(&mut ser).unwrap();
        buf.push(b'\n');
        std::fs::write(&path, buf).unwrap();
        return;
    }

    let expected = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read {}: {}", path.display(), e));
    let expected: Value = serde_json::from_str(&expected).unwrap();
    assert_eq!(
        &expected,
        actual,
        "{} differs from golden file; rerun with UPDATE_GOLDEN=1 to refresh",
        name
    );
}

/// Canned reply that replaces routing for every request
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP front for a [`MockNodeClient`], bound to an ephemeral local port
pub struct FakeNode {
    pub mock: MockNodeClient,
    addr: SocketAddr,
    raw: Arc<Mutex<Option<RawResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl FakeNode {
    pub async fn start(mock: MockNodeClient) -> FakeNode {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let raw = Arc::new(Mutex::new(None));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let mock = mock.clone();
            let raw = raw.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let mock = mock.clone();
                    let raw = raw.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let _ = serve(stream, mock, raw, requests).await;
                    });
                }
            })
        };

        FakeNode {
            mock,
            addr,
            raw,
            requests,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer every following request with `status` and `body`
    pub fn respond_with(&self, status: u16, body: &str) {
        *self.raw.lock().unwrap() = Some(RawResponse {
            status,
            body: body.to_string(),
        });
    }

    pub fn clear_response(&self) {
        *self.raw.lock().unwrap() = None;
    }

    /// Request targets received so far, decoded
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    mock: MockNodeClient,
    raw: Arc<Mutex<Option<RawResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    requests.lock().unwrap().push(percent_decode(&target));

    let canned = raw.lock().unwrap().clone();
    let (status, body) = match canned {
        Some(r) => (r.status, r.body),
        None => route(&mock, &target).await,
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(b) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(if bytes[i] == b'+' { b' ' } else { bytes[i] });
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|kv| !kv.is_empty())
        .map(|kv| {
            let (k, v) = kv.split_once('=').unwrap_or((kv, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect()
}

fn csv<T: std::str::FromStr>(value: Option<&String>) -> Result<Vec<T>, SkyWalletError>
where
    SkyWalletError: From<T::Err>,
{
    match value {
        None => Ok(Vec::new()),
        Some(v) => v
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<T>().map_err(SkyWalletError::from))
            .collect(),
    }
}

fn param<T: std::str::FromStr>(params: &HashMap<String, String>, key: &str) -> SkyWalletResult<T> {
    params
        .get(key)
        .ok_or_else(|| SkyWalletError::invalid_argument(format!("{} is required", key)))?
        .parse::<T>()
        .map_err(|_| SkyWalletError::invalid_argument(format!("invalid {}", key)))
}

fn to_json<T: Serialize>(result: SkyWalletResult<T>) -> SkyWalletResult<String> {
    result.and_then(|v| Ok(serde_json::to_string(&v)?))
}

async fn dispatch(mock: &MockNodeClient, path: &str, params: &HashMap<String, String>) -> SkyWalletResult<String> {
    match path {
        "version" => to_json(mock.version().await),
        "coinSupply" => to_json(mock.coin_supply().await),
        "outputs" => {
            let addrs: Vec<Address> = csv(params.get("addrs"))?;
            let hashes: Vec<Sha256Hash> = csv(params.get("hashes"))?;
            to_json(mock.outputs_filtered(&addrs, &hashes).await)
        }
        "block" => {
            if params.contains_key("hash") {
                let hash: Sha256Hash = params["hash"].parse()?;
                to_json(mock.block_by_hash(&hash).await)
            } else {
                to_json(mock.block_by_seq(param(params, "seq")?).await)
            }
        }
        "blocks" => {
            let start: i64 = param(params, "start")?;
            let end: i64 = param(params, "end")?;
            // The node answers with whatever part of the range it has
            let tip = mock.chain().len() as i64 - 1;
            let blocks = mock.blocks(start, end.min(tip)).await?;
            to_json(Ok(ReadableBlocks { blocks }))
        }
        "blockchain/metadata" => to_json(mock.blockchain_metadata().await),
        "blockchain/progress" => to_json(mock.blockchain_progress().await),
        "balance" => {
            let addrs: Vec<Address> = csv(params.get("addrs"))?;
            let outputs = mock.outputs_for_addresses(&addrs).await?;
            let pair = balance_from_outputs(&outputs)?;
            to_json(Ok(BalanceResponse {
                confirmed: pair.confirmed,
                predicted: pair.predicted,
                addresses: balances_from_outputs(&outputs)?,
            }))
        }
        "uxout" => {
            let uxid: Sha256Hash = param::<String>(params, "uxid")?.parse()?;
            to_json(mock.ux_out(&uxid).await)
        }
        "address_uxouts" => {
            let address: String = param(params, "address")?;
            to_json(mock.address_ux_outs(&address).await)
        }
        "health" => to_json(mock.health().await),
        other => Err(SkyWalletError::not_found(format!("no route {}", other))),
    }
}

async fn route(mock: &MockNodeClient, target: &str) -> (u16, String) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let path = path.trim_start_matches("/api/v1/");
    let params = parse_query(query);

    match dispatch(mock, path, &params).await {
        Ok(body) => (200, body),
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::InvalidArgument | ErrorKind::InvalidEncoding => 400,
                ErrorKind::NotFound => 404,
                ErrorKind::Unavailable | ErrorKind::Timeout => 503,
                _ => 500,
            };
            (status, format!("{} - {}", status, e))
        }
    }
}
