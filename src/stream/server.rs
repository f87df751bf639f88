use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::protocol::{NonBinaryKind, StreamEvent, classify, is_malformed_frame};
use super::session::{ConnectionSession, SessionStatus};
use crate::audio::{AtomicSequence, RecordingFactory};
use crate::config::RecorderConfig;
use crate::error::{RecorderError, Result};

/// WebSocket endpoint the microphone node streams into
/// - accepts any number of concurrent devices
/// - one task and one WAV file per connection
pub struct RecorderServer {
    listener: TcpListener,
    factory: RecordingFactory,
}

impl RecorderServer {
    /// Bind the configured address with a fresh recording index starting at 0
    pub async fn bind(config: &RecorderConfig) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RecorderError::Bind { addr, source })?;
        let factory = RecordingFactory::new(
            &config.output_dir,
            config.format,
            Arc::new(AtomicSequence::new()),
        );
        Ok(Self::with_factory(listener, factory))
    }

    pub fn with_factory(listener: TcpListener, factory: RecordingFactory) -> Self {
        Self { listener, factory }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(RecorderError::LocalAddr)
    }

    /// Accept connections forever
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections still streaming at shutdown keep their provisional header.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(
            output_dir = %self.factory.output_dir().display(),
            "Recorder ready for device connections"
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down recorder server");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let factory = self.factory.clone();
                            let span = info_span!(
                                "connection",
                                session_id = %Uuid::new_v4(),
                                peer = %addr
                            );

                            //Handle device in separate task
                            tokio::spawn(
                                async move {
                                    if let Err(e) = handle_connection(stream, factory).await {
                                        error!("Connection ended with error: {}", e);
                                    }
                                }
                                .instrument(span),
                            );
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }
    }
}

/// Run blocking file I/O without stalling the other connections' tasks
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::current().runtime_flavor() {
        RuntimeFlavor::MultiThread => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// Drive one device connection from handshake to finalized file
async fn handle_connection(stream: TcpStream, factory: RecordingFactory) -> Result<()> {
    let mut ws = accept_async(stream).await?;
    info!("Device connected");

    let mut session = ConnectionSession::new(factory);
    if let Err(e) = run_blocking(|| session.handle(StreamEvent::Opened)) {
        let _ = ws.close(None).await;
        return Err(e);
    }

    let mut finished = false;
    let mut reply = None;
    while let Some(next) = ws.next().await {
        let msg = match next {
            Ok(msg) => msg,
            Err(e) if finished => {
                debug!("Socket ended after close handshake: {}", e);
                break;
            }
            Err(e) => {
                if is_malformed_frame(&e) {
                    warn!("Malformed frame from device: {}", e);
                    let malformed = StreamEvent::NonBinary(NonBinaryKind::Malformed);
                    run_blocking(|| session.handle(malformed))?;
                    reply = Some(CloseFrame {
                        code: CloseCode::Invalid,
                        reason: "malformed frame".into(),
                    });
                } else {
                    warn!("Device dropped without closing handshake: {}", e);
                }
                // tungstenite fuses the stream after any read error
                break;
            }
        };
        let Some(event) = classify(&msg) else {
            continue;
        };

        match run_blocking(|| session.handle(event)) {
            Ok(SessionStatus::Recording) => {}
            Ok(SessionStatus::Finished(info)) => {
                info!(
                    file = %info.file_path.display(),
                    "Device disconnected, WAV header finalized"
                );
                finished = true;
                // keep reading so tungstenite can flush the close reply
            }
            Err(e) => {
                error!("Abandoning recording: {}", e);
                let _ = ws.close(None).await;
                return Err(e);
            }
        }
    }

    if !finished {
        // no close frame, but everything appended so far is still a valid recording
        let status = run_blocking(|| session.handle(StreamEvent::Closed))?;
        if let SessionStatus::Finished(info) = status {
            info!(
                file = %info.file_path.display(),
                "Device gone without close, WAV header finalized"
            );
        }
        let _ = ws.close(reply).await;
    }
    Ok(())
}
