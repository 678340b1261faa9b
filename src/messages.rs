//! Stratum v1 message types and JSON-RPC serialization.
//!
//! Defines the wire format using serde, the closed set of Stratum methods,
//! typed parsing for server notifications and tracked responses, and the
//! command/event types carried on the channels between the façade and the
//! I/O task.
//!
//! ## Why not use a JSON-RPC library?
//!
//! Stratum v1 predates JSON-RPC 2.0 and uses non-standard conventions:
//! notifications carry `id: null` instead of omitting the field, errors are
//! plain arrays instead of structured objects, and there is no version
//! field. A small custom envelope fits those quirks without adapter layers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::job::{self, JobResult};
use crate::target::DIFFICULTY_SCALE;

/// JSON-RPC message envelope.
///
/// Messages are either requests/notifications (method plus params, id
/// optional) or responses (id plus result or error).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    /// Request or notification, from either side. A frame with a `method`
    /// is a server call regardless of its id.
    Request {
        /// Message id; `None` serializes as `null` and marks a notification.
        #[serde(default)]
        id: Option<u64>,
        /// Wire method name.
        method: String,
        /// Positional parameters.
        params: Value,
    },

    /// Response to a request.
    Response {
        /// Id of the request being answered.
        id: u64,
        /// Result payload, present on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error payload, non-null on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
}

impl Envelope {
    /// Create a request with an id.
    pub fn request(id: u64, method: impl Into<String>, params: Value) -> Self {
        Envelope::Request {
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// The message id, if present.
    pub fn id(&self) -> Option<u64> {
        match self {
            Envelope::Request { id, .. } => *id,
            Envelope::Response { id, .. } => Some(*id),
        }
    }

    /// The method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Envelope::Request { method, .. } => Some(method),
            Envelope::Response { .. } => None,
        }
    }
}

/// The closed set of Stratum methods this client speaks.
///
/// Anything else on the wire is logged and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StratumMethod {
    /// `mining.subscribe` (client to server).
    Subscribe,
    /// `mining.authorize` (client to server).
    Authorize,
    /// `mining.submit` (client to server).
    Submit,
    /// `mining.suggest_difficulty` (client to server, untracked).
    SuggestDifficulty,
    /// `mining.notify` (server notification).
    Notify,
    /// `mining.set_difficulty` (server notification).
    SetDifficulty,
    /// `mining.set_extranonce` (server notification).
    SetExtranonce,
    /// `client.reconnect` (server notification).
    Reconnect,
}

impl StratumMethod {
    /// The string sent on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            StratumMethod::Subscribe => "mining.subscribe",
            StratumMethod::Authorize => "mining.authorize",
            StratumMethod::Submit => "mining.submit",
            StratumMethod::SuggestDifficulty => "mining.suggest_difficulty",
            StratumMethod::Notify => "mining.notify",
            StratumMethod::SetDifficulty => "mining.set_difficulty",
            StratumMethod::SetExtranonce => "mining.set_extranonce",
            StratumMethod::Reconnect => "client.reconnect",
        }
    }

    /// Parse a wire method name; `None` for methods outside the set.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "mining.subscribe" => Some(StratumMethod::Subscribe),
            "mining.authorize" => Some(StratumMethod::Authorize),
            "mining.submit" => Some(StratumMethod::Submit),
            "mining.suggest_difficulty" => Some(StratumMethod::SuggestDifficulty),
            "mining.notify" => Some(StratumMethod::Notify),
            "mining.set_difficulty" => Some(StratumMethod::SetDifficulty),
            "mining.set_extranonce" => Some(StratumMethod::SetExtranonce),
            "client.reconnect" => Some(StratumMethod::Reconnect),
            _ => None,
        }
    }
}

impl fmt::Display for StratumMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Mining job notification (`mining.notify`).
///
/// Fields stay in their wire hex form; the job builder consumes them as-is
/// (in particular `prev_hash` passes into the header untransformed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNotification {
    /// Unique job identifier.
    pub job_id: String,

    /// Previous block hash, 64 hex chars, used verbatim.
    pub prev_hash: String,

    /// First half of the coinbase transaction (before the extranonce).
    pub coinb1: String,

    /// Second half of the coinbase transaction (after the extranonce).
    pub coinb2: String,

    /// Ordered sibling hashes for the Merkle fold.
    pub merkle_branch: Vec<String>,

    /// Block version, 8 hex chars.
    pub block_version: String,

    /// Encoded difficulty target, 8 hex chars.
    pub nbits: String,

    /// Block timestamp, 8 hex chars.
    pub ntime: String,

    /// When true, every previously announced job is void.
    pub clean_jobs: bool,
}

fn param_str(params: &[Value], index: usize, field: &str) -> Result<String> {
    params
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::ProtocolShape(format!("{} not a string", field)))
}

fn check_u32_hex(field: &str, hex: &str) -> Result<()> {
    if hex.len() != 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::ProtocolShape(format!(
            "{} must be 8 hex chars, got {:?}",
            field, hex
        )));
    }
    Ok(())
}

impl JobNotification {
    /// Parse from `mining.notify` positional params.
    ///
    /// Manual parsing for better error context than serde tuple structs.
    pub fn from_params(params: &Value) -> Result<Self> {
        let params = params
            .as_array()
            .ok_or_else(|| Error::ProtocolShape("notify params not an array".to_string()))?;
        if params.len() < 9 {
            return Err(Error::ProtocolShape(format!(
                "notify params too short: {}",
                params.len()
            )));
        }

        let job_id = param_str(params, 0, "job_id")?;
        let prev_hash = param_str(params, 1, "prev_hash")?;
        let coinb1 = param_str(params, 2, "coinb1")?;
        let coinb2 = param_str(params, 3, "coinb2")?;

        let branches = params[4]
            .as_array()
            .ok_or_else(|| Error::ProtocolShape("merkle_branch not an array".to_string()))?;
        let mut merkle_branch = Vec::with_capacity(branches.len());
        for branch in branches {
            let branch = branch
                .as_str()
                .ok_or_else(|| Error::ProtocolShape("merkle branch not a string".to_string()))?;
            merkle_branch.push(branch.to_string());
        }

        let block_version = param_str(params, 5, "block_version")?;
        let nbits = param_str(params, 6, "nbits")?;
        let ntime = param_str(params, 7, "ntime")?;
        check_u32_hex("block_version", &block_version)?;
        check_u32_hex("nbits", &nbits)?;
        check_u32_hex("ntime", &ntime)?;

        let clean_jobs = params[8]
            .as_bool()
            .ok_or_else(|| Error::ProtocolShape("clean_jobs not a bool".to_string()))?;

        Ok(Self {
            job_id,
            prev_hash,
            coinb1,
            coinb2,
            merkle_branch,
            block_version,
            nbits,
            ntime,
            clean_jobs,
        })
    }
}

/// Result of a successful `mining.subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeResult {
    /// Pool-assigned extranonce prefix, hex.
    pub extranonce1: String,

    /// Width of the worker-controlled extranonce2 field in bytes.
    pub extranonce2_size: u32,
}

impl SubscribeResult {
    /// Parse from the subscribe response result:
    /// `[[subscriptions...], extranonce1, extranonce2_size]`.
    pub fn from_result(result: &Value) -> Result<Self> {
        let arr = result
            .as_array()
            .ok_or_else(|| Error::ProtocolShape("subscribe result not an array".to_string()))?;
        if arr.len() < 3 {
            return Err(Error::ProtocolShape(
                "subscribe result too short".to_string(),
            ));
        }

        let extranonce1 = arr[1]
            .as_str()
            .ok_or_else(|| Error::ProtocolShape("extranonce1 not a string".to_string()))?
            .to_string();
        let extranonce2_size = arr[2]
            .as_u64()
            .ok_or_else(|| Error::ProtocolShape("extranonce2_size not a number".to_string()))?
            as u32;

        Ok(Self {
            extranonce1,
            extranonce2_size,
        })
    }
}

/// Parse `mining.set_difficulty` params: one number, integer or float.
pub fn parse_set_difficulty(params: &Value) -> Result<f64> {
    let difficulty = params
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            Error::ProtocolShape("set_difficulty params must be [number]".to_string())
        })?;

    // A difficulty at or below zero, or too small for the decimal scale,
    // makes the target division ill-defined.
    if (difficulty * DIFFICULTY_SCALE as f64).floor() < 1.0 {
        return Err(Error::ProtocolShape(format!(
            "unusable difficulty {}",
            difficulty
        )));
    }
    Ok(difficulty)
}

/// Parse `mining.set_extranonce` params: `[extranonce1, extranonce2_size]`.
pub fn parse_set_extranonce(params: &Value) -> Result<(String, u32)> {
    let arr = params
        .as_array()
        .ok_or_else(|| Error::ProtocolShape("set_extranonce params not an array".to_string()))?;
    if arr.len() < 2 {
        return Err(Error::ProtocolShape(
            "set_extranonce params too short".to_string(),
        ));
    }

    let extranonce1 = arr[0]
        .as_str()
        .ok_or_else(|| Error::ProtocolShape("extranonce1 not a string".to_string()))?
        .to_string();
    let extranonce2_size = arr[1]
        .as_u64()
        .ok_or_else(|| Error::ProtocolShape("extranonce2_size not a number".to_string()))?
        as u32;

    Ok((extranonce1, extranonce2_size))
}

/// Params for `mining.subscribe`.
pub fn subscribe_params(user_agent: &str) -> Value {
    json!([user_agent])
}

/// Params for `mining.authorize`.
pub fn authorize_params(worker: &str, password: &str) -> Value {
    json!([worker, password])
}

/// Params for `mining.suggest_difficulty`.
pub fn suggest_difficulty_params(difficulty: f64) -> Value {
    json!([difficulty])
}

/// Params for `mining.submit`:
/// `[worker, job_id, extranonce2_hex, ntime_hex, nonce_hex]`.
///
/// `snapshot_size` is the extranonce2 width captured in the job table when
/// the job was announced, which tolerates a `mining.set_extranonce` landing
/// between the notification and the submit. The ntime and nonce fields go
/// out in hashing byte order (bytes reversed relative to the host u32).
pub fn submit_params(result: &JobResult, snapshot_size: u32) -> Result<Value> {
    Ok(json!([
        result.worker_name,
        result.job_id,
        job::extranonce2_hex(result.extranonce2, snapshot_size)?,
        job::swapped_u32_hex(result.ntime),
        job::swapped_u32_hex(result.nonce),
    ]))
}

/// A typed request the façade asks the I/O task to perform.
#[derive(Debug, Clone)]
pub enum Request {
    /// `mining.subscribe`.
    Subscribe {
        /// User agent advertised to the pool.
        user_agent: String,
    },

    /// `mining.authorize`.
    Authorize {
        /// Worker identity.
        worker: String,
        /// Authorization secret.
        password: String,
    },

    /// `mining.submit`.
    Submit {
        /// The solved share.
        result: JobResult,
    },
}

impl Request {
    /// The Stratum method this request maps to.
    pub fn method(&self) -> StratumMethod {
        match self {
            Request::Subscribe { .. } => StratumMethod::Subscribe,
            Request::Authorize { .. } => StratumMethod::Authorize,
            Request::Submit { .. } => StratumMethod::Submit,
        }
    }
}

/// Commands sent from the façade to the I/O task.
#[derive(Debug)]
pub enum ClientCommand {
    /// Perform a tracked request; the response event echoes the token.
    Call {
        /// Façade-side marker used to discard stale responses.
        token: u64,
        /// The request to perform.
        request: Request,
    },

    /// Send `mining.suggest_difficulty`, fire and forget.
    SuggestDifficulty(f64),
}

/// Typed payload of a successful tracked response.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// Subscribe succeeded; extranonce parameters captured.
    Subscribed(SubscribeResult),

    /// Authorize result from the pool.
    Authorized(bool),

    /// Submit acknowledged (true) or refused (false) by the pool.
    Submitted(bool),
}

/// A server-initiated state change, forwarded after the I/O task has
/// applied it to its own state. The façade replays these onto its mirror
/// in the same order.
#[derive(Debug, Clone)]
pub enum ServerNotification {
    /// New job accepted into the job table.
    NewJob(JobNotification),

    /// Share difficulty replaced.
    SetDifficulty(f64),

    /// Extranonce parameters replaced.
    SetExtranonce {
        /// New pool-assigned prefix.
        extranonce1: String,
        /// New extranonce2 width in bytes.
        extranonce2_size: u32,
    },
}

/// Events pushed from the I/O task to the façade.
#[derive(Debug)]
pub enum ClientEvent {
    /// TCP connection established.
    Connected,

    /// A server notification, already applied to the I/O task's state.
    Notification(ServerNotification),

    /// Outcome of a tracked request.
    Response {
        /// Echo of the command's token.
        token: u64,
        /// The typed result or per-call error.
        outcome: Result<ResponsePayload>,
    },

    /// The connection is gone; `None` means a clean local close.
    Closed {
        /// Terminal error, if the close was not requested locally.
        error: Option<Error>,
    },
}
