//! Synchronous client façade.
//!
//! [`Client`] gives a worker thread a blocking API over the asynchronous
//! I/O task: connect performs the subscribe/authorize handshake, jobs are
//! built from mirrored protocol state, and submits rendezvous with their
//! responses under a deadline. While a call is blocked, server
//! notifications keep flowing into the mirror, so nothing is lost during
//! a request.

use std::sync::mpsc::{self as sync_mpsc, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::io;
use crate::job::{self, Job, JobResult};
use crate::messages::{
    ClientCommand, ClientEvent, Request, ResponsePayload, ServerNotification,
};
use crate::state::ProtocolState;

/// Deadline for each step of the connect handshake, including the wait for
/// the first job.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Pool hostname.
    pub hostname: String,

    /// Pool TCP port.
    pub port: u16,

    /// Worker identity, used for subscribe, authorize, and submit.
    pub worker_name: String,

    /// Authorization secret.
    pub password: String,
}

/// Synchronous Stratum v1 client.
///
/// One instance owns one connection. The socket, framer, and protocol
/// state live on a dedicated I/O thread; this handle holds only channel
/// endpoints and a mirror of the state, so nothing here is shared across
/// threads.
pub struct Client {
    command_tx: mpsc::Sender<ClientCommand>,
    event_rx: sync_mpsc::Receiver<ClientEvent>,
    shutdown: CancellationToken,
    io_thread: Option<std::thread::JoinHandle<()>>,

    /// Mirror of the I/O task's protocol state, fed by the event channel.
    mirror: ProtocolState,

    /// Set when a new job lands, consumed by [`Client::wait_for_job`].
    pending_job: Option<String>,

    /// Terminal error once the connection is gone.
    terminal: Option<Error>,

    next_token: u64,
    response_timeout: Duration,
}

impl Client {
    /// Connect to a pool and perform the Stratum handshake: subscribe
    /// (advertising the worker name), authorize, and wait for the first
    /// job. Every step runs under a 10 second deadline; any failure closes
    /// the connection.
    pub fn connect(params: ConnectionParams) -> Result<Self> {
        let handle = io::spawn(params.hostname.clone(), params.port)?;

        let mut client = Client {
            command_tx: handle.command_tx,
            event_rx: handle.event_rx,
            shutdown: handle.shutdown,
            io_thread: Some(handle.thread),
            mirror: ProtocolState::new(),
            pending_job: None,
            terminal: None,
            next_token: 0,
            response_timeout: io::RESPONSE_TIMEOUT,
        };

        // Dropping the client on failure cancels the I/O task and joins
        // its thread.
        client.handshake(&params)?;
        Ok(client)
    }

    fn handshake(&mut self, params: &ConnectionParams) -> Result<()> {
        self.wait_connected()?;

        debug!(worker = %params.worker_name, "subscribing");
        let payload = self.call(Request::Subscribe {
            user_agent: params.worker_name.clone(),
        })?;
        let subscription = match payload {
            ResponsePayload::Subscribed(subscription) => subscription,
            other => return Err(unexpected_payload("subscribe", &other)),
        };
        debug!(
            extranonce1 = %subscription.extranonce1,
            extranonce2_size = subscription.extranonce2_size,
            "subscribed"
        );
        self.mirror
            .set_extranonce(subscription.extranonce1, subscription.extranonce2_size);

        match self.call(Request::Authorize {
            worker: params.worker_name.clone(),
            password: params.password.clone(),
        })? {
            ResponsePayload::Authorized(true) => debug!("authorized"),
            ResponsePayload::Authorized(false) => {
                return Err(Error::Rpc(json!("authorization rejected")));
            }
            other => return Err(unexpected_payload("authorize", &other)),
        }

        let job_id = self.wait_for_job(CONNECT_TIMEOUT)?;
        debug!(job_id = %job_id, "first job received");
        Ok(())
    }

    fn wait_connected(&mut self) -> Result<()> {
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        loop {
            match self.recv_deadline(deadline)? {
                ClientEvent::Connected => return Ok(()),
                ClientEvent::Notification(notification) => {
                    self.apply_notification(notification)
                }
                ClientEvent::Response { token, .. } => {
                    trace!(token, "discarding stale response");
                }
                ClientEvent::Closed { error } => {
                    return Err(self.mark_terminal(closed_error(error)));
                }
            }
        }
    }

    /// Build a [`Job`] from the current notification, applying the given
    /// extranonce2. Pure with respect to network state: only the local
    /// mirror is read.
    ///
    /// The extranonce snapshot captured with the job is used, so a
    /// `mining.set_extranonce` that arrived after the notification does
    /// not skew the coinbase.
    pub fn build_current_job(&mut self, extranonce2: u32) -> Result<Job> {
        self.drain_events();

        let Some(notification) = self.mirror.current() else {
            return Err(Error::LocalReject("no job announced yet".to_string()));
        };
        let entry = self
            .mirror
            .job_entry(&notification.job_id)
            .ok_or_else(|| Error::LocalReject("current job evicted".to_string()))?;

        job::build(
            notification,
            &entry.extranonce1,
            entry.extranonce2_size,
            extranonce2,
            self.mirror.difficulty(),
        )
    }

    /// Hand out the next extranonce2 value for the current job. The
    /// counter restarts at zero whenever the job or the extranonce
    /// parameters change.
    pub fn next_extranonce2(&mut self) -> u32 {
        self.drain_events();
        self.mirror.next_extranonce2()
    }

    /// Submit a solved share.
    ///
    /// An empty result or a job id missing from the job table is refused
    /// locally with [`Error::LocalReject`]; nothing reaches the wire.
    /// Otherwise returns the pool's verdict. A pool error payload
    /// surfaces as [`Error::Rpc`], verbatim.
    pub fn submit(&mut self, result: &JobResult) -> Result<bool> {
        self.drain_events();
        if let Some(err) = &self.terminal {
            return Err(err.clone());
        }

        if result.is_empty() {
            warn!("refusing empty job result");
            return Err(Error::LocalReject("empty job result".to_string()));
        }
        if self.mirror.job_entry(&result.job_id).is_none() {
            warn!(job_id = %result.job_id, "refusing submit for unknown job");
            return Err(Error::LocalReject(format!(
                "job {} is not in the job table",
                result.job_id
            )));
        }

        match self.call(Request::Submit {
            result: result.clone(),
        })? {
            ResponsePayload::Submitted(accepted) => {
                debug!(job_id = %result.job_id, accepted, "share submitted");
                Ok(accepted)
            }
            other => Err(unexpected_payload("submit", &other)),
        }
    }

    /// Ask the pool for a difficulty. Fire and forget: pools answer
    /// indirectly with `mining.set_difficulty`, if at all.
    pub fn suggest_difficulty(&mut self, difficulty: f64) -> Result<()> {
        self.drain_events();
        if let Some(err) = &self.terminal {
            return Err(err.clone());
        }

        self.command_tx
            .blocking_send(ClientCommand::SuggestDifficulty(difficulty))
            .map_err(|_| {
                self.mark_terminal(Error::Transport("I/O task terminated".to_string()))
            })
    }

    /// Block until the pool announces a job, returning its id.
    pub fn wait_for_job(&mut self, timeout: Duration) -> Result<String> {
        self.drain_events();
        if let Some(job_id) = self.pending_job.take() {
            return Ok(job_id);
        }
        if let Some(err) = &self.terminal {
            return Err(err.clone());
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.recv_deadline(deadline)? {
                ClientEvent::Notification(notification) => {
                    self.apply_notification(notification);
                    if let Some(job_id) = self.pending_job.take() {
                        return Ok(job_id);
                    }
                }
                ClientEvent::Response { token, .. } => {
                    trace!(token, "discarding stale response");
                }
                ClientEvent::Connected => {}
                ClientEvent::Closed { error } => {
                    return Err(self.mark_terminal(closed_error(error)));
                }
            }
        }
    }

    /// Current share difficulty, after applying any queued notifications.
    pub fn difficulty(&mut self) -> f64 {
        self.drain_events();
        self.mirror.difficulty()
    }

    /// Current extranonce parameters as `(extranonce1, extranonce2_size)`.
    pub fn extranonce(&mut self) -> (String, u32) {
        self.drain_events();
        let extranonce = self.mirror.extranonce();
        (extranonce.extranonce1.clone(), extranonce.extranonce2_size)
    }

    /// Id of the most recently announced job, if any.
    pub fn current_job_id(&mut self) -> Option<String> {
        self.drain_events();
        self.mirror.current().map(|n| n.job_id.clone())
    }

    /// Close the connection and join the I/O thread. Dropping the client
    /// does the same; this just makes the intent explicit.
    pub fn close(self) {
        drop(self);
    }

    /// Send a tracked request and block for its response, applying
    /// notifications that arrive in the meantime.
    fn call(&mut self, request: Request) -> Result<ResponsePayload> {
        if let Some(err) = &self.terminal {
            return Err(err.clone());
        }

        let token = self.next_token;
        self.next_token += 1;

        self.command_tx
            .blocking_send(ClientCommand::Call { token, request })
            .map_err(|_| {
                self.mark_terminal(Error::Transport("I/O task terminated".to_string()))
            })?;

        let deadline = Instant::now() + self.response_timeout;
        loop {
            match self.recv_deadline(deadline)? {
                ClientEvent::Notification(notification) => {
                    self.apply_notification(notification)
                }
                ClientEvent::Response {
                    token: response_token,
                    outcome,
                } if response_token == token => return outcome,
                ClientEvent::Response { token, .. } => {
                    trace!(token, "discarding stale response");
                }
                ClientEvent::Connected => {}
                ClientEvent::Closed { error } => {
                    return Err(self.mark_terminal(closed_error(error)));
                }
            }
        }
    }

    fn recv_deadline(&mut self, deadline: Instant) -> Result<ClientEvent> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout);
        }

        match self.event_rx.recv_timeout(remaining) {
            Ok(event) => Ok(event),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(self
                .mark_terminal(Error::Transport("I/O task terminated".to_string()))),
        }
    }

    /// Apply queued events without blocking.
    fn drain_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(ClientEvent::Notification(notification)) => {
                    self.apply_notification(notification)
                }
                Ok(ClientEvent::Response { token, .. }) => {
                    trace!(token, "discarding stale response");
                }
                Ok(ClientEvent::Connected) => {}
                Ok(ClientEvent::Closed { error }) => {
                    let err = closed_error(error);
                    self.terminal = Some(err);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn apply_notification(&mut self, notification: ServerNotification) {
        match notification {
            ServerNotification::NewJob(job) => {
                self.pending_job = Some(job.job_id.clone());
                self.mirror.apply_notify(job);
            }
            ServerNotification::SetDifficulty(difficulty) => {
                self.mirror.set_difficulty(difficulty)
            }
            ServerNotification::SetExtranonce {
                extranonce1,
                extranonce2_size,
            } => self.mirror.set_extranonce(extranonce1, extranonce2_size),
        }
    }

    fn mark_terminal(&mut self, err: Error) -> Error {
        self.terminal = Some(err.clone());
        err
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(thread) = self.io_thread.take() {
            let _ = thread.join();
        }
    }
}

fn closed_error(error: Option<Error>) -> Error {
    error.unwrap_or_else(|| Error::Transport("connection closed".to_string()))
}

fn unexpected_payload(what: &str, payload: &ResponsePayload) -> Error {
    Error::ProtocolShape(format!("unexpected {} payload: {:?}", what, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};

    const PREV_HASH: &str =
        "81cd02ab7e569e8bcd9317e2fe99f2de44d49ab2b8851ba4a308000000000000";
    const COINB1: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff20020862062f503253482f04b8864e5008";
    const COINB2: &str = "072f736c7573682f000000000100f2052a010000001976a914d23fcdf86f7e756a64a7a9688ef9903327048ed988ac00000000";

    /// Scripted pool speaking real TCP, blocking I/O on its own thread.
    struct PoolConn {
        reader: BufReader<TcpStream>,
        writer: TcpStream,
    }

    impl PoolConn {
        fn new(stream: TcpStream) -> Self {
            let reader = BufReader::new(stream.try_clone().unwrap());
            Self {
                reader,
                writer: stream,
            }
        }

        fn read_request(&mut self) -> Value {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line).unwrap();
            assert!(n > 0, "client closed while the pool expected a request");
            serde_json::from_str(&line).unwrap()
        }

        /// Read lines until the client closes; keeps the socket open.
        fn drain_until_close(&mut self) {
            let mut line = String::new();
            while self.reader.read_line(&mut line).unwrap_or(0) > 0 {
                line.clear();
            }
        }

        fn send(&mut self, value: Value) {
            writeln!(self.writer, "{}", value).unwrap();
        }

        fn respond(&mut self, id: &Value, result: Value) {
            self.send(json!({"id": id, "result": result, "error": null}));
        }

        fn respond_error(&mut self, id: &Value, error: Value) {
            self.send(json!({"id": id, "result": null, "error": error}));
        }

        fn notify_job(&mut self, job_id: &str, clean_jobs: bool) {
            self.send(json!({
                "id": null,
                "method": "mining.notify",
                "params": [
                    job_id, PREV_HASH, COINB1, COINB2, [],
                    "00000001", "1a44b9f2", "4dd7f5c7", clean_jobs
                ]
            }));
        }

        /// Standard handshake: subscribe, authorize, one clean job.
        fn handshake(&mut self, worker: &str, job_id: &str) {
            let subscribe = self.read_request();
            assert_eq!(subscribe["method"], "mining.subscribe");
            assert_eq!(subscribe["params"], json!([worker]));
            self.respond(&subscribe["id"], json!([[], "2a010000", 4]));

            let authorize = self.read_request();
            assert_eq!(authorize["method"], "mining.authorize");
            assert_eq!(authorize["params"], json!([worker, "pw"]));
            self.respond(&authorize["id"], json!(true));

            self.notify_job(job_id, true);
        }
    }

    fn spawn_pool<F>(script: F) -> (u16, std::thread::JoinHandle<()>)
    where
        F: FnOnce(&mut PoolConn) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut conn = PoolConn::new(stream);
            script(&mut conn);
        });

        (port, handle)
    }

    fn params(port: u16) -> ConnectionParams {
        ConnectionParams {
            hostname: "127.0.0.1".to_string(),
            port,
            worker_name: "w".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn test_connect_performs_handshake() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();

        assert_eq!(client.current_job_id(), Some("j1".to_string()));
        assert_eq!(client.difficulty(), 1.0);
        assert_eq!(client.extranonce(), ("2a010000".to_string(), 4));

        client.close();
        pool.join().unwrap();
    }

    #[test]
    fn test_authorize_refusal_surfaces_rpc_error() {
        let (port, pool) = spawn_pool(|conn| {
            let subscribe = conn.read_request();
            conn.respond(&subscribe["id"], json!([[], "2a010000", 4]));

            let authorize = conn.read_request();
            conn.respond_error(&authorize["id"], json!([21, "unauthorized", null]));
            conn.drain_until_close();
        });

        match Client::connect(params(port)) {
            Err(Error::Rpc(payload)) => {
                assert_eq!(payload, json!([21, "unauthorized", null]));
            }
            other => panic!("expected Rpc error, got {:?}", other.map(|_| ())),
        }
        pool.join().unwrap();
    }

    #[test]
    fn test_authorize_false_fails_connect() {
        let (port, pool) = spawn_pool(|conn| {
            let subscribe = conn.read_request();
            conn.respond(&subscribe["id"], json!([[], "2a010000", 4]));

            let authorize = conn.read_request();
            conn.respond(&authorize["id"], json!(false));
            conn.drain_until_close();
        });

        assert!(matches!(
            Client::connect(params(port)),
            Err(Error::Rpc(_))
        ));
        pool.join().unwrap();
    }

    #[test]
    fn test_build_and_submit_round_trip() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");

            let submit = conn.read_request();
            assert_eq!(submit["method"], "mining.submit");
            assert_eq!(
                submit["params"],
                json!(["w", "j1", "0000002a", "78563412", "f0debc9a"])
            );
            conn.respond(&submit["id"], json!(true));
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();

        let job = client.build_current_job(42).unwrap();
        assert_eq!(job.job_id, "j1");
        assert_eq!(job.header_hex.len(), 160);
        assert_eq!(&job.header_hex[..8], "01000000");
        assert_eq!(&job.header_hex[152..], "00000000");
        assert_eq!(job.target[6], 0xffff0000);

        let accepted = client
            .submit(&JobResult {
                worker_name: "w".to_string(),
                job_id: "j1".to_string(),
                ntime: 0x12345678,
                nonce: 0x9abcdef0,
                extranonce2: 42,
                extranonce2_size: 4,
            })
            .unwrap();
        assert!(accepted);

        client.close();
        pool.join().unwrap();
    }

    #[test]
    fn test_submit_unknown_job_never_reaches_the_wire() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");

            // The first request after the handshake must already be the
            // valid submit; the rejected one produced no traffic.
            let submit = conn.read_request();
            assert_eq!(submit["params"][1], json!("j1"));
            conn.respond(&submit["id"], json!(true));
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();

        let ghost = JobResult {
            worker_name: "w".to_string(),
            job_id: "ghost".to_string(),
            ..JobResult::default()
        };
        assert!(matches!(
            client.submit(&ghost),
            Err(Error::LocalReject(_))
        ));
        assert!(matches!(
            client.submit(&JobResult::default()),
            Err(Error::LocalReject(_))
        ));

        let valid = JobResult {
            worker_name: "w".to_string(),
            job_id: "j1".to_string(),
            extranonce2_size: 4,
            ..JobResult::default()
        };
        assert!(client.submit(&valid).unwrap());

        client.close();
        pool.join().unwrap();
    }

    #[test]
    fn test_pool_rejection_preserves_error_payload() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");

            let submit = conn.read_request();
            conn.respond_error(&submit["id"], json!([23, "low difficulty share", null]));
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();

        let result = JobResult {
            worker_name: "w".to_string(),
            job_id: "j1".to_string(),
            extranonce2_size: 4,
            ..JobResult::default()
        };
        match client.submit(&result) {
            Err(Error::Rpc(payload)) => {
                assert_eq!(payload, json!([23, "low difficulty share", null]));
            }
            other => panic!("expected Rpc error, got {:?}", other),
        }

        client.close();
        pool.join().unwrap();
    }

    /// Notifications that land while a call is blocked are applied, not
    /// lost: difficulty changes, and a clean job evicts the old one.
    #[test]
    fn test_notifications_apply_during_blocked_call() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");

            let submit = conn.read_request();
            conn.send(json!({
                "id": null,
                "method": "mining.set_difficulty",
                "params": [2048]
            }));
            conn.notify_job("j2", true);
            conn.respond(&submit["id"], json!(true));
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();

        let result = JobResult {
            worker_name: "w".to_string(),
            job_id: "j1".to_string(),
            extranonce2_size: 4,
            ..JobResult::default()
        };
        assert!(client.submit(&result).unwrap());

        assert_eq!(client.difficulty(), 2048.0);
        assert_eq!(client.current_job_id(), Some("j2".to_string()));

        // j1 was evicted by the clean job; submits for it now fail locally.
        assert!(matches!(
            client.submit(&result),
            Err(Error::LocalReject(_))
        ));

        client.close();
        pool.join().unwrap();
    }

    #[test]
    fn test_reconnect_unblocks_inflight_call() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");

            let _submit = conn.read_request();
            conn.send(json!({
                "id": null,
                "method": "client.reconnect",
                "params": []
            }));
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();

        let result = JobResult {
            worker_name: "w".to_string(),
            job_id: "j1".to_string(),
            extranonce2_size: 4,
            ..JobResult::default()
        };
        assert!(matches!(
            client.submit(&result),
            Err(Error::Transport(_))
        ));

        // The connection is terminally gone.
        assert!(client.suggest_difficulty(64.0).is_err());

        client.close();
        pool.join().unwrap();
    }

    #[test]
    fn test_wait_for_job_sees_later_notifications() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");

            // Wait for the suggest so the second job cannot race the
            // handshake's first-job wait.
            let suggest = conn.read_request();
            assert_eq!(suggest["method"], "mining.suggest_difficulty");
            assert_eq!(suggest["params"][0].as_f64(), Some(1024.0));

            conn.notify_job("j2", false);
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();

        client.suggest_difficulty(1024.0).unwrap();
        let job_id = client.wait_for_job(Duration::from_secs(5)).unwrap();
        assert_eq!(job_id, "j2");

        // Both jobs remain valid: the second notify was not clean.
        assert!(client.mirror.job_entry("j1").is_some());
        assert!(client.mirror.job_entry("j2").is_some());

        client.close();
        pool.join().unwrap();
    }

    /// A façade-side timeout leaves the connection usable and the late
    /// response is discarded by token.
    #[test]
    fn test_timeout_then_stale_response_is_discarded() {
        let (port, pool) = spawn_pool(|conn| {
            conn.handshake("w", "j1");

            // First submit: sit on it past the client's deadline.
            let first = conn.read_request();
            std::thread::sleep(Duration::from_millis(500));

            // Second submit arrives, then answer the stale one first.
            let second = conn.read_request();
            conn.respond(&first["id"], json!(false));
            conn.respond(&second["id"], json!(true));
            conn.drain_until_close();
        });

        let mut client = Client::connect(params(port)).unwrap();
        client.response_timeout = Duration::from_millis(100);

        let result = JobResult {
            worker_name: "w".to_string(),
            job_id: "j1".to_string(),
            extranonce2_size: 4,
            ..JobResult::default()
        };
        assert!(matches!(client.submit(&result), Err(Error::Timeout)));

        // The retry gets the fresh response, not the stale `false`.
        assert!(client.submit(&result).unwrap());

        client.close();
        pool.join().unwrap();
    }

    #[test]
    fn test_connect_refused_is_transport_error() {
        // Bind and drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        assert!(matches!(
            Client::connect(params(port)),
            Err(Error::Transport(_))
        ));
    }
}
