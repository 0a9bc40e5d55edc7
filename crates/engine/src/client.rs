//! Supervisor-side audit client.
//!
//! One constructed handle with an owned lifecycle: `start` spawns the audit
//! worker on its own thread and runtime, `shutdown` drains it. The worker is
//! reachable only through the framed transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

use audient_protocol::{
    Command, CommandAction, CommandResponse, FrameReceiver, FrameSender, HookEvent,
};

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::processor::EventProcessor;

const TRANSPORT_BUFFER_BYTES: usize = 64 * 1024;
const INIT_WAIT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct AuditClient {
    sender: Mutex<FrameSender<WriteHalf<DuplexStream>>>,
    receiver: Mutex<FrameReceiver<ReadHalf<DuplexStream>>>,
    worker: parking_lot::Mutex<Option<std::thread::JoinHandle<()>>>,
    execution_id: String,
    running: AtomicBool,
    response_timeout: Duration,
}

impl AuditClient {
    /// Spawn the audit worker and wait for its readiness signal.
    ///
    /// # Errors
    /// Fails if the worker thread cannot be spawned, the policy file does
    /// not load, or readiness is not observed within the wait bound; no
    /// commands may be issued after such a failure.
    pub async fn start(config: AuditConfig) -> Result<Self, AuditError> {
        let processor = EventProcessor::from_config(&config)?;
        let (supervisor_end, worker_end) = tokio::io::duplex(TRANSPORT_BUFFER_BYTES);
        let (ready_tx, ready_rx) = oneshot::channel();

        debug!("Starting audit worker thread");
        let handle = std::thread::Builder::new()
            .name("audient-worker".to_string())
            .spawn(move || processor.start(worker_end, ready_tx))?;

        match tokio::time::timeout(INIT_WAIT, ready_rx).await {
            Ok(Ok(())) => info!("Audit worker initialized successfully"),
            _ => {
                return Err(AuditError::Initialization(
                    "audit worker did not signal readiness".to_string(),
                ))
            }
        }

        let (read_half, write_half) = tokio::io::split(supervisor_end);
        Ok(Self {
            sender: Mutex::new(FrameSender::new(write_half)),
            receiver: Mutex::new(FrameReceiver::new(read_half)),
            worker: parking_lot::Mutex::new(Some(handle)),
            execution_id: uuid::Uuid::new_v4().simple().to_string(),
            running: AtomicBool::new(true),
            response_timeout: Duration::from_secs_f64(config.response_timeout_secs),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Send a command without waiting for its response.
    ///
    /// # Returns
    /// The command's callback id for later correlation.
    pub async fn send_command(
        &self,
        action: CommandAction,
        params: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<String, AuditError> {
        if !self.is_running() {
            return Err(AuditError::NotRunning);
        }
        let command = Command::new(&self.execution_id, action, params);
        let callback_id = command.callback_id.clone();
        self.write_command(&command).await?;
        Ok(callback_id)
    }

    /// Send a command and wait for its correlated response.
    ///
    /// Responses addressed to other in-flight callers are skipped. A wait
    /// past the configured timeout is reported as [`AuditError::Timeout`];
    /// `Ok(None)` means a response frame arrived but could not be decoded.
    pub async fn send_command_wait(
        &self,
        action: CommandAction,
        params: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<Option<CommandResponse>, AuditError> {
        if !self.is_running() {
            return Err(AuditError::NotRunning);
        }
        let command = Command::new(&self.execution_id, action, params);
        let callback_id = command.callback_id.clone();
        self.write_command(&command).await?;

        let deadline = Instant::now() + self.response_timeout;
        let mut receiver = self.receiver.lock().await;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AuditError::Timeout);
            }
            match tokio::time::timeout(remaining, receiver.recv::<CommandResponse>()).await {
                Ok(Ok(Some(response))) => {
                    if response.callback_id.as_deref() == Some(callback_id.as_str()) {
                        debug!("Received response for command {}", callback_id);
                        return Ok(Some(response));
                    }
                    debug!(
                        "Ignoring response for different command {:?}",
                        response.callback_id
                    );
                }
                Ok(Ok(None)) => {
                    debug!("Discarded an undecodable response frame");
                    return Ok(None);
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(AuditError::Timeout),
            }
        }
    }

    /// Forward one intercepted traffic event to the audit worker.
    pub async fn process_event(&self, event: &HookEvent) -> Result<String, AuditError> {
        debug!("Forwarding hook event: {:?}", event.event_type);
        let value = serde_json::to_value(event)?;
        let params = value
            .as_object()
            .cloned()
            .map(|map| map.into_iter().collect());
        self.send_command(CommandAction::Event, params).await
    }

    /// Register a notification webhook on the worker.
    pub async fn add_webhook(&self, url: &str) -> Result<String, AuditError> {
        let mut params = HashMap::new();
        params.insert("url".to_string(), serde_json::Value::String(url.to_string()));
        self.send_command(CommandAction::AddWebhook, Some(params))
            .await
    }

    /// Shut the worker down: SHUTDOWN command, then a bounded join.
    ///
    /// A worker that overruns the grace period is detached with a warning;
    /// an in-process thread has no forceful-kill escalation.
    pub async fn shutdown(&self) -> Result<(), AuditError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Audit worker is not running");
            return Ok(());
        }
        debug!("Shutting down audit worker");
        let command = Command::new(&self.execution_id, CommandAction::Shutdown, None);
        if let Err(e) = self.write_command(&command).await {
            error!("Error sending shutdown command: {}", e);
        }

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let join = tokio::task::spawn_blocking(move || handle.join());
            match tokio::time::timeout(SHUTDOWN_GRACE, join).await {
                Ok(Ok(Ok(()))) => info!("Audit worker shut down successfully"),
                Ok(_) => warn!("Audit worker thread panicked during shutdown"),
                Err(_) => {
                    warn!("Audit worker did not shut down within the grace period, detaching")
                }
            }
        }
        Ok(())
    }

    async fn write_command(&self, command: &Command) -> Result<(), AuditError> {
        debug!(
            "Sending command {:?} with callback_id {}",
            command.action, command.callback_id
        );
        self.sender
            .lock()
            .await
            .send(command)
            .await
            .map_err(|e| {
                error!("Error writing command {:?}: {}", command.action, e);
                AuditError::Transport(e)
            })
    }
}
