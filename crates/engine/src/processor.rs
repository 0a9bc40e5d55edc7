//! Event processor — the audit worker's command loop.
//!
//! A poller task drains the transport into a bounded queue; a pool of worker
//! tasks executes commands and writes responses back. The whole worker runs
//! on a dedicated current-thread runtime so the supervisor and the audit
//! share no memory, only the transport.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, error, info, warn};

use audient_extract::{process_hook_event, NormalizerSet, PatternDetector, PiiDetector};
use audient_graph::{GraphBuilder, GraphStructure};
use audient_policy::RuntimeChecker;
use audient_protocol::{
    Command, CommandAction, CommandResponse, FrameReceiver, FrameSender, HookEvent, TransportError,
};

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::metrics::{
    increment_commands_processed, increment_events_extracted, increment_unrecognized_payloads,
    MetricTimer,
};
use crate::webhooks::{SinkRegistry, Webhook, WebhookSink};

const QUEUE_CAPACITY: usize = 256;

struct AuditState {
    graph: GraphBuilder,
    checker: Option<RuntimeChecker>,
    sinks: SinkRegistry,
    normalizers: NormalizerSet,
    detector: Box<dyn PiiDetector>,
    verbose: bool,
}

/// Owns the audit worker's lifecycle.
pub struct EventProcessor {
    num_workers: usize,
    state: Arc<Mutex<AuditState>>,
}

impl EventProcessor {
    pub fn new(
        num_workers: usize,
        checker: Option<RuntimeChecker>,
        detector: Box<dyn PiiDetector>,
    ) -> Self {
        Self {
            num_workers: num_workers.max(1),
            state: Arc::new(Mutex::new(AuditState {
                graph: GraphBuilder::new(),
                checker,
                sinks: SinkRegistry::new(),
                normalizers: NormalizerSet::new(),
                detector,
                verbose: false,
            })),
        }
    }

    /// Build a processor from configuration: expand the policy file into a
    /// checker (absent file disables compliance) and register startup
    /// webhooks.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        let checker = config.build_policy_targets()?.map(RuntimeChecker::new);
        let processor = Self::new(config.num_workers, checker, Box::new(PatternDetector));
        {
            let mut state = processor
                .state
                .try_lock()
                .map_err(|_| AuditError::Initialization("state lock contended".to_string()))?;
            for url in &config.webhooks {
                state
                    .sinks
                    .register(Box::new(WebhookSink::new(Webhook::create(url))));
            }
        }
        Ok(processor)
    }

    /// Snapshot of the accumulated graph.
    pub async fn snapshot(&self) -> GraphStructure {
        self.state.lock().await.graph.snapshot()
    }

    /// Whether a VERBOSE command has raised the log verbosity.
    pub async fn verbose(&self) -> bool {
        self.state.lock().await.verbose
    }

    /// Thread entry point: builds a current-thread runtime and runs the
    /// processing loop until shutdown.
    pub fn start<T>(self, transport: T, ready: oneshot::Sender<()>)
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run(transport, ready)),
            Err(e) => error!("Failed to build audit worker runtime: {}", e),
        }
        info!("Audit worker shut down");
    }

    /// Run the poller and worker pool until a SHUTDOWN command completes or
    /// the transport closes.
    pub async fn run<T>(&self, transport: T, ready: oneshot::Sender<()>)
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(transport);
        let mut receiver = FrameReceiver::new(read_half);
        let writer = Arc::new(Mutex::new(FrameSender::new(write_half)));

        let (queue_tx, queue_rx) = mpsc::channel::<Command>(QUEUE_CAPACITY);
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        // Readiness is signalled before the first poll; the supervisor
        // blocks on this with a bounded wait.
        if ready.send(()).is_err() {
            warn!("Supervisor dropped before initialization completed");
            return;
        }

        let poller = tokio::spawn(async move {
            loop {
                match receiver.recv::<Command>().await {
                    Ok(Some(command)) => {
                        debug!("Queueing command {:?}", command.action);
                        if queue_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    // Corrupt frame: logged by the transport, keep polling.
                    Ok(None) => continue,
                    Err(TransportError::Closed) => {
                        debug!("Transport closed, stopping poller");
                        break;
                    }
                    Err(e) => {
                        error!("Transport read error: {}", e);
                        break;
                    }
                }
            }
        });

        let mut workers = Vec::new();
        for task_num in 0..self.num_workers {
            let queue_rx = queue_rx.clone();
            let writer = writer.clone();
            let state = self.state.clone();
            let shutdown_tx = shutdown_tx.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let command = { queue_rx.lock().await.recv().await };
                    let Some(command) = command else { break };

                    let is_shutdown = command.action == CommandAction::Shutdown;
                    if let Some(response) = execute_command(command, &state).await {
                        if let Err(e) = writer.lock().await.send(&response).await {
                            error!("Failed to write response: {}", e);
                        }
                    }
                    if is_shutdown {
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                }
                debug!("Worker task-{} finished", task_num);
            }));
        }
        drop(shutdown_tx);

        // Park until SHUTDOWN is acked or every worker is gone.
        while shutdown_rx.changed().await.is_ok() {
            if *shutdown_rx.borrow() {
                break;
            }
        }

        // Cooperative drain: stop ingesting first, let in-flight commands
        // finish, close sinks, then the transport drops with the halves.
        poller.abort();
        let _ = poller.await;
        for worker in workers {
            let _ = worker.await;
        }
        self.state.lock().await.sinks.close().await;
        info!("Event processor drained");
    }
}

async fn execute_command(
    command: Command,
    state: &Arc<Mutex<AuditState>>,
) -> Option<CommandResponse> {
    let _timer = MetricTimer::new("command_processing_latency");
    increment_commands_processed();

    let callback_id = command.callback_id.clone();
    match command.action {
        CommandAction::Ping => Some(CommandResponse::ok(&callback_id, None)),
        CommandAction::Verbose => {
            state.lock().await.verbose = true;
            info!("Verbose mode enabled");
            Some(CommandResponse::ok(&callback_id, None))
        }
        CommandAction::AddWebhook => match command.params.get("url").and_then(|v| v.as_str()) {
            Some(url) => {
                let webhook = Webhook::create(url);
                debug!("Registering webhook: {} {}", webhook.method, webhook.url);
                state
                    .lock()
                    .await
                    .sinks
                    .register(Box::new(WebhookSink::new(webhook)));
                Some(CommandResponse::ok(&callback_id, None))
            }
            None => Some(CommandResponse::failure(
                &callback_id,
                "Missing webhook url parameter".to_string(),
            )),
        },
        CommandAction::Event => Some(handle_event(command, state).await),
        CommandAction::Shutdown => {
            info!("Shutdown requested");
            Some(CommandResponse::ok(&callback_id, None))
        }
    }
}

async fn handle_event(command: Command, state: &Arc<Mutex<AuditState>>) -> CommandResponse {
    let callback_id = command.callback_id.clone();
    let params = serde_json::Value::Object(command.params.into_iter().collect());
    let event: HookEvent = match serde_json::from_value(params) {
        Ok(event) => event,
        Err(e) => {
            return CommandResponse::failure(&callback_id, format!("Invalid hook event: {}", e))
        }
    };

    // One lock spans extraction, policy checking and the graph append so
    // concurrent workers cannot interleave one event's updates with
    // another's.
    let mut state = state.lock().await;
    let AuditState {
        graph,
        checker,
        sinks,
        normalizers,
        detector,
        ..
    } = &mut *state;

    match process_hook_event(&event, normalizers, detector.as_ref(), checker.as_mut()) {
        Ok(Some(structure)) => {
            increment_events_extracted();
            graph.append_structure(structure);
            let snapshot = graph.snapshot();
            sinks.notify(&snapshot).await;
            CommandResponse::ok(&callback_id, None)
        }
        Ok(None) => {
            increment_unrecognized_payloads();
            CommandResponse::ok(&callback_id, None)
        }
        Err(e) => CommandResponse::failure(&callback_id, e.to_string()),
    }
}
