//! The connection I/O task.
//!
//! One task per connection exclusively owns the socket, the pending-call
//! table, and the protocol state. The façade talks to it over two
//! channels: typed commands in, typed events out. The task applies server
//! notifications to its state in receive order before any dependent
//! response is delivered, so the façade's mirror can never observe them
//! out of order.

use std::sync::mpsc as sync_mpsc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::connection::{Connection, Transport};
use crate::error::{Error, Result};
use crate::job::JobResult;
use crate::messages::{
    authorize_params, parse_set_difficulty, parse_set_extranonce, subscribe_params,
    submit_params, suggest_difficulty_params, ClientCommand, ClientEvent, Envelope,
    JobNotification, Request, ResponsePayload, ServerNotification, StratumMethod,
    SubscribeResult,
};
use crate::rpc::RpcTracker;
use crate::state::ProtocolState;

/// Default deadline for a tracked request.
pub(crate) const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Cadence of the pending-call deadline sweep.
const SWEEP_INTERVAL: Duration = Duration::from_millis(10);

const COMMAND_QUEUE_DEPTH: usize = 16;

/// Channel endpoints and thread handle for a spawned I/O task.
pub(crate) struct IoHandle {
    pub command_tx: mpsc::Sender<ClientCommand>,
    pub event_rx: sync_mpsc::Receiver<ClientEvent>,
    pub shutdown: CancellationToken,
    pub thread: std::thread::JoinHandle<()>,
}

/// Spawn the I/O task on its own thread with a single-threaded runtime.
///
/// The thread connects, reports `Connected` (or `Closed` with the error),
/// and then runs the event loop until the peer closes, a fatal error
/// occurs, or the token is cancelled.
pub(crate) fn spawn(hostname: String, port: u16) -> Result<IoHandle> {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (event_tx, event_rx) = sync_mpsc::channel();
    let shutdown = CancellationToken::new();

    let token = shutdown.clone();
    let thread = std::thread::Builder::new()
        .name("galena-io".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = event_tx.send(ClientEvent::Closed {
                        error: Some(Error::Transport(format!("runtime: {}", err))),
                    });
                    return;
                }
            };

            runtime.block_on(async move {
                let conn = tokio::select! {
                    conn = Connection::connect(&hostname, port) => match conn {
                        Ok(conn) => conn,
                        Err(err) => {
                            let _ = event_tx.send(ClientEvent::Closed { error: Some(err) });
                            return;
                        }
                    },
                    _ = token.cancelled() => return,
                };

                if event_tx.send(ClientEvent::Connected).is_err() {
                    return;
                }

                IoTask::new(conn, event_tx, command_rx, token).run().await;
            });
        })
        .map_err(|err| Error::Transport(format!("spawn I/O thread: {}", err)))?;

    Ok(IoHandle {
        command_tx,
        event_rx,
        shutdown,
        thread,
    })
}

/// The per-connection I/O actor.
pub(crate) struct IoTask<T: Transport> {
    conn: T,
    rpc: RpcTracker,
    state: ProtocolState,
    event_tx: sync_mpsc::Sender<ClientEvent>,
    command_rx: mpsc::Receiver<ClientCommand>,
    shutdown: CancellationToken,
    response_timeout: Duration,
}

impl<T: Transport> IoTask<T> {
    pub fn new(
        conn: T,
        event_tx: sync_mpsc::Sender<ClientEvent>,
        command_rx: mpsc::Receiver<ClientCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            conn,
            rpc: RpcTracker::new(),
            state: ProtocolState::new(),
            event_tx,
            command_rx,
            shutdown,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    /// Run until the connection ends, then tear down: close the socket,
    /// fail every pending call, and report the terminal state.
    pub async fn run(mut self) {
        let error = match self.event_loop().await {
            Ok(()) => None,
            Err(err) => {
                debug!(error = %err, "connection terminated");
                Some(err)
            }
        };

        self.conn.close().await;

        let terminal = error
            .clone()
            .unwrap_or_else(|| Error::Transport("connection closed".to_string()));
        for (id, call) in self.rpc.drain() {
            trace!(id, token = call.token, "failing pending call at teardown");
            let _ = self.event_tx.send(ClientEvent::Response {
                token: call.token,
                outcome: Err(terminal.clone()),
            });
        }

        // OwnerGone stays internal: nobody is left to hear about it.
        if !matches!(error, Some(Error::OwnerGone)) {
            let _ = self.event_tx.send(ClientEvent::Closed { error });
        }
    }

    async fn event_loop(&mut self) -> Result<()> {
        let mut sweep = interval(SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = self.conn.read_message() => {
                    match msg? {
                        Some(envelope) => self.handle_frame(envelope)?,
                        None => {
                            debug!("pool closed the connection");
                            return Err(Error::Transport(
                                "connection closed by pool".to_string(),
                            ));
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await?,
                        None => {
                            debug!("owner dropped the command channel");
                            return Err(Error::OwnerGone);
                        }
                    }
                }

                _ = sweep.tick() => self.sweep_deadlines()?,

                _ = self.shutdown.cancelled() => {
                    debug!("local close requested");
                    return Ok(());
                }
            }
        }
    }

    fn handle_frame(&mut self, envelope: Envelope) -> Result<()> {
        match envelope {
            Envelope::Request { id, method, params } => {
                self.handle_server_call(id, &method, params)
            }
            Envelope::Response { id, result, error } => {
                self.handle_response(id, result, error)
            }
        }
    }

    fn handle_server_call(
        &mut self,
        id: Option<u64>,
        method: &str,
        params: Value,
    ) -> Result<()> {
        if id.is_some() {
            // Server calls carry no response obligation from us, but a
            // non-null id is unusual enough to note.
            debug!(method = %method, "server call carries an id");
        }

        let Some(method) = StratumMethod::from_wire(method) else {
            warn!(method = %method, "ignoring unknown method");
            return Ok(());
        };

        match method {
            StratumMethod::Notify => {
                let notification = JobNotification::from_params(&params)?;
                debug!(
                    job_id = %notification.job_id,
                    clean_jobs = notification.clean_jobs,
                    "new job"
                );
                self.state.apply_notify(notification.clone());
                self.emit(ClientEvent::Notification(ServerNotification::NewJob(
                    notification,
                )))
            }
            StratumMethod::SetDifficulty => {
                let difficulty = parse_set_difficulty(&params)?;
                debug!(difficulty, "difficulty changed");
                self.state.set_difficulty(difficulty);
                self.emit(ClientEvent::Notification(
                    ServerNotification::SetDifficulty(difficulty),
                ))
            }
            StratumMethod::SetExtranonce => {
                let (extranonce1, extranonce2_size) = parse_set_extranonce(&params)?;
                debug!(extranonce1 = %extranonce1, extranonce2_size, "extranonce changed");
                self.state
                    .set_extranonce(extranonce1.clone(), extranonce2_size);
                self.emit(ClientEvent::Notification(
                    ServerNotification::SetExtranonce {
                        extranonce1,
                        extranonce2_size,
                    },
                ))
            }
            StratumMethod::Reconnect => {
                debug!("pool requested reconnect");
                Err(Error::Transport("server requested reconnect".to_string()))
            }
            other => {
                warn!(method = %other, "ignoring client-to-server method from pool");
                Ok(())
            }
        }
    }

    fn handle_response(
        &mut self,
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    ) -> Result<()> {
        let Some(call) = self.rpc.complete(id) else {
            debug!(id, "dropping response with unknown id");
            return Ok(());
        };

        let outcome = if let Some(error) = error {
            Err(Error::Rpc(error))
        } else {
            self.parse_payload(call.method, result)
        };

        match outcome {
            // A tracked response we cannot decode fails this call and then
            // the connection.
            Err(err @ Error::ProtocolShape(_)) => {
                self.emit(ClientEvent::Response {
                    token: call.token,
                    outcome: Err(err.clone()),
                })?;
                Err(err)
            }
            outcome => self.emit(ClientEvent::Response {
                token: call.token,
                outcome,
            }),
        }
    }

    fn parse_payload(
        &mut self,
        method: StratumMethod,
        result: Option<Value>,
    ) -> Result<ResponsePayload> {
        let result = result.ok_or_else(|| {
            Error::ProtocolShape(format!(
                "{} response carries neither result nor error",
                method
            ))
        })?;

        match method {
            StratumMethod::Subscribe => {
                let subscription = SubscribeResult::from_result(&result)?;
                self.state.set_extranonce(
                    subscription.extranonce1.clone(),
                    subscription.extranonce2_size,
                );
                Ok(ResponsePayload::Subscribed(subscription))
            }
            StratumMethod::Authorize => {
                let authorized = result.as_bool().ok_or_else(|| {
                    Error::ProtocolShape("authorize result not a bool".to_string())
                })?;
                Ok(ResponsePayload::Authorized(authorized))
            }
            StratumMethod::Submit => {
                let accepted = result.as_bool().ok_or_else(|| {
                    Error::ProtocolShape("submit result not a bool".to_string())
                })?;
                Ok(ResponsePayload::Submitted(accepted))
            }
            other => Err(Error::ProtocolShape(format!(
                "unexpected tracked response for {}",
                other
            ))),
        }
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::Call { token, request } => {
                if let Request::Submit { result } = &request {
                    if let Some(reason) = self.submit_reject_reason(result) {
                        warn!(job_id = %result.job_id, reason = %reason, "refusing submit locally");
                        return self.emit(ClientEvent::Response {
                            token,
                            outcome: Err(Error::LocalReject(reason)),
                        });
                    }
                }

                let params = match self.request_params(&request) {
                    Ok(params) => params,
                    Err(err) => {
                        return self.emit(ClientEvent::Response {
                            token,
                            outcome: Err(err),
                        });
                    }
                };

                let method = request.method();
                let id = self.rpc.begin(method, token, self.response_timeout);
                let envelope = Envelope::request(id, method.wire_name(), params);
                self.conn.write_message(&envelope).await
            }

            ClientCommand::SuggestDifficulty(difficulty) => {
                // Sent with an id but left untracked; a pool that answers
                // anyway hits the unknown-id drop path.
                let id = self.rpc.mint_untracked();
                let envelope = Envelope::request(
                    id,
                    StratumMethod::SuggestDifficulty.wire_name(),
                    suggest_difficulty_params(difficulty),
                );
                self.conn.write_message(&envelope).await
            }
        }
    }

    fn submit_reject_reason(&self, result: &JobResult) -> Option<String> {
        if result.is_empty() {
            return Some("empty job result".to_string());
        }
        if self.state.job_entry(&result.job_id).is_none() {
            return Some(format!("job {} is not in the job table", result.job_id));
        }
        None
    }

    fn request_params(&self, request: &Request) -> Result<Value> {
        match request {
            Request::Subscribe { user_agent } => Ok(subscribe_params(user_agent)),
            Request::Authorize { worker, password } => {
                Ok(authorize_params(worker, password))
            }
            Request::Submit { result } => {
                let entry = self.state.job_entry(&result.job_id).ok_or_else(|| {
                    Error::LocalReject(format!("job {} is not in the job table", result.job_id))
                })?;
                submit_params(result, entry.extranonce2_size)
            }
        }
    }

    fn sweep_deadlines(&mut self) -> Result<()> {
        for (id, call) in self.rpc.sweep(Instant::now()) {
            warn!(id, method = %call.method, "call timed out");
            self.emit(ClientEvent::Response {
                token: call.token,
                outcome: Err(Error::Timeout),
            })?;
        }
        Ok(())
    }

    fn emit(&self, event: ClientEvent) -> Result<()> {
        self.event_tx.send(event).map_err(|_| Error::OwnerGone)
    }
}
