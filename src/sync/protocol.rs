// Protocol - Request vocabulary and wire framing
//
// One request per connection:
// - Request: a single UTF-8 line, `\n` terminated (EOF also ends it)
// - Response: raw UTF-8 bytes, ended by the server closing the connection
//
// Both directions are bounded by a maximum frame size. Requests are decoded
// once into a `Request` and matched exhaustively by the handlers.

use crate::ledger::{Checksum, CoinCollection, CoinKind};
use crate::sync::peer::PeerRegistry;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

pub const REQUEST_NODES: &str = "request_nodes";
pub const REQUEST_UNMINTED_COINS: &str = "request_unminted_coins";
pub const REQUEST_MINTED_COINS: &str = "request_minted_coins";
pub const REQUEST_CHECKSUM: &str = "request_checksum";

/// Primary's reply to an accepted registration
pub const REGISTER_OK: &str = "Node registered successfully.";
/// Primary's reply to a registration it could not parse
pub const REGISTER_FAILED: &str = "Failed to register node.";

/// Default bound on request and response frames
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// REGISTRATION
// ============================================================================

/// A node announcing itself to the primary as `[id, host, port]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub node_id: String,
    pub host: String,
    pub port: u16,
}

impl Registration {
    pub fn new(node_id: &str, host: &str, port: u16) -> Self {
        Self {
            node_id: node_id.to_string(),
            host: host.to_string(),
            port,
        }
    }

    /// Parse a JSON triple. The port may be a number or a numeric string.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::InvalidRegistration(e.to_string()))?;

        let items = match value {
            Value::Array(items) if items.len() == 3 => items,
            _ => {
                return Err(ProtocolError::InvalidRegistration(
                    "expected [id, host, port]".to_string(),
                ))
            }
        };

        let node_id = items[0]
            .as_str()
            .ok_or_else(|| ProtocolError::InvalidRegistration("id must be a string".to_string()))?;
        let host = items[1]
            .as_str()
            .ok_or_else(|| ProtocolError::InvalidRegistration("host must be a string".to_string()))?;
        let port = match &items[2] {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.trim().parse::<u16>().ok(),
            _ => None,
        }
        .ok_or_else(|| ProtocolError::InvalidRegistration("port out of range".to_string()))?;

        Ok(Self::new(node_id, host.trim(), port))
    }

    /// Encode as the JSON triple
    pub fn to_line(&self) -> String {
        serde_json::json!([self.node_id, self.host, self.port]).to_string()
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// Every request a node or primary can receive
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    RequestNodes,
    RequestUnmintedCoins,
    RequestMintedCoins,
    RequestChecksum,
    Register(Registration),
    /// Looked like a registration triple but did not parse as one
    MalformedRegistration(String),
    Unknown(String),
}

impl Request {
    /// The request that fetches a coin collection of the given kind
    pub fn coins(kind: CoinKind) -> Self {
        match kind {
            CoinKind::Unminted => Request::RequestUnmintedCoins,
            CoinKind::Minted => Request::RequestMintedCoins,
        }
    }

    /// Decode one request line
    pub fn decode(line: &str) -> Self {
        let line = line.trim();
        match line {
            REQUEST_NODES => Request::RequestNodes,
            REQUEST_UNMINTED_COINS => Request::RequestUnmintedCoins,
            REQUEST_MINTED_COINS => Request::RequestMintedCoins,
            REQUEST_CHECKSUM => Request::RequestChecksum,
            _ if line.starts_with('[') => match Registration::parse(line) {
                Ok(registration) => Request::Register(registration),
                Err(_) => Request::MalformedRegistration(line.to_string()),
            },
            _ => Request::Unknown(line.to_string()),
        }
    }

    /// Encode as a request line, without the trailing newline
    pub fn encode(&self) -> String {
        match self {
            Request::RequestNodes => REQUEST_NODES.to_string(),
            Request::RequestUnmintedCoins => REQUEST_UNMINTED_COINS.to_string(),
            Request::RequestMintedCoins => REQUEST_MINTED_COINS.to_string(),
            Request::RequestChecksum => REQUEST_CHECKSUM.to_string(),
            Request::Register(registration) => registration.to_line(),
            Request::MalformedRegistration(text) | Request::Unknown(text) => text.clone(),
        }
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

/// Every response a handler can produce
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Nodes(PeerRegistry),
    Coins(CoinCollection),
    Checksum(Checksum),
    Registered,
    RegistrationFailed,
}

impl Response {
    /// Encode for the wire: JSON mappings, raw hex checksum, or a fixed string
    pub fn encode(&self) -> Vec<u8> {
        match self {
            // Maps of strings cannot fail to serialize
            Response::Nodes(registry) => serde_json::to_vec(registry).unwrap_or_default(),
            Response::Coins(coins) => serde_json::to_vec(coins).unwrap_or_default(),
            Response::Checksum(checksum) => checksum.as_str().as_bytes().to_vec(),
            Response::Registered => REGISTER_OK.as_bytes().to_vec(),
            Response::RegistrationFailed => REGISTER_FAILED.as_bytes().to_vec(),
        }
    }

    /// Decode a `request_nodes` reply
    pub fn decode_nodes(bytes: &[u8]) -> Result<PeerRegistry, ProtocolError> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedResponse(e.to_string()))
    }

    /// Decode a `request_unminted_coins` / `request_minted_coins` reply
    pub fn decode_coins(bytes: &[u8]) -> Result<CoinCollection, ProtocolError> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedResponse(e.to_string()))
    }

    /// Decode a `request_checksum` reply: 64 hex characters
    pub fn decode_checksum(bytes: &[u8]) -> Result<Checksum, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        let checksum = Checksum::from_hex(text);
        let is_digest = checksum.as_str().len() == 64
            && checksum.as_str().bytes().all(|b| b.is_ascii_hexdigit());
        if !is_digest {
            return Err(ProtocolError::MalformedResponse(format!(
                "not a sha256 hex digest: {:?}",
                text
            )));
        }
        Ok(checksum)
    }

    /// Decode the primary's reply to a registration
    pub fn decode_registration(bytes: &[u8]) -> Result<(), ProtocolError> {
        let text = String::from_utf8_lossy(bytes);
        match text.trim() {
            REGISTER_OK => Ok(()),
            REGISTER_FAILED => Err(ProtocolError::InvalidRegistration(
                "rejected by primary".to_string(),
            )),
            other => Err(ProtocolError::UnexpectedResponse(other.to_string())),
        }
    }
}

// ============================================================================
// FRAMING
// ============================================================================

/// Read one request line of at most `max_bytes` (excluding the newline)
pub async fn read_request<R>(reader: R, max_bytes: usize) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut limited = BufReader::new(reader.take(max_bytes as u64 + 1));
    let mut buf = Vec::new();
    limited.read_until(b'\n', &mut buf).await?;

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > max_bytes {
        return Err(ProtocolError::FrameTooLarge { limit: max_bytes });
    }

    String::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Read a full response of at most `max_bytes`, up to end of stream
pub async fn read_response<R>(reader: R, max_bytes: usize) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take(max_bytes as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > max_bytes {
        return Err(ProtocolError::FrameTooLarge { limit: max_bytes });
    }
    Ok(buf)
}
