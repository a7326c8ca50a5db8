use crate::client::{ConsoleViewer, FramebufferSurface, HostHooks};
use crate::console::cli::Cli;
use crate::console::error::CliError;
use crate::telemetry::{self, logging};
use crate::transport::HttpTransport;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug)]
enum HostEvent {
    ClientError(String),
    Resized { width: u32, height: u32 },
    SessionEnded(String),
}

/// Forwards viewer callbacks to the run loop.
struct ChannelHooks {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl HostHooks for ChannelHooks {
    fn on_client_error(&self, error: &(dyn std::error::Error + Send + Sync)) {
        let _ = self.tx.send(HostEvent::ClientError(error.to_string()));
    }

    fn on_canvas_size_change(&self, width: u32, height: u32) {
        let _ = self.tx.send(HostEvent::Resized { width, height });
    }

    fn on_session_end(&self, document: &str) {
        let _ = self.tx.send(HostEvent::SessionEnded(document.to_string()));
    }
}

#[derive(Debug)]
enum Exit {
    SessionEnded(String),
    Interrupted,
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let log_config = cli.logging.to_config();
    logging::init(&log_config).map_err(|err| CliError::Logging(err.to_string()))?;
    debug!(log_level = ?log_config.level, log_file = ?log_config.file, "logging configured");

    let config = cli.viewer_config()?;
    let transport = HttpTransport::new(config.update_url.clone(), config.timing.request_timeout)?;
    let surface = FramebufferSurface::new();
    let (tx, mut host_events) = mpsc::unbounded_channel();

    let viewer = ConsoleViewer::new(
        config,
        Arc::new(transport),
        Box::new(surface.clone()),
        Arc::new(ChannelHooks { tx }),
    )?;
    viewer.start()?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let exit = loop {
        tokio::select! {
            event = host_events.recv() => match event {
                Some(HostEvent::SessionEnded(document)) => break Exit::SessionEnded(document),
                Some(HostEvent::ClientError(message)) => {
                    debug!(target: "porthole::console", error = %message, "viewer reported error");
                }
                Some(HostEvent::Resized { width, height }) => {
                    info!(target: "porthole::console", width, height, "console resized");
                }
                None => break Exit::Interrupted,
            },
            line = stdin.next_line(), if stdin_open => match line? {
                Some(line) => viewer.type_text(&format!("{line}\n")),
                None => {
                    debug!(target: "porthole::console", "stdin closed; input forwarding stopped");
                    stdin_open = false;
                }
            },
            result = &mut ctrl_c => {
                if let Err(err) = result {
                    warn!(target: "porthole::console", error = %err, "ctrl-c handler failed");
                }
                break Exit::Interrupted;
            }
        }
    };

    viewer.stop();

    if let Some(path) = &cli.snapshot {
        surface
            .save_png(path)
            .map_err(|source| CliError::Snapshot {
                path: path.clone(),
                source,
            })?;
        info!(target: "porthole::console", path = %path.display(), "snapshot written");
    }
    telemetry::report();

    match exit {
        Exit::SessionEnded(document) => {
            eprintln!("console session ended by host");
            debug!(target: "porthole::console", document = %document, "session end document");
        }
        Exit::Interrupted => info!(target: "porthole::console", "interrupted"),
    }
    Ok(())
}
