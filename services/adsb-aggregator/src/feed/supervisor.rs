//! Receiver connection supervisor
//!
//! `Disconnected -> Connecting -> Connected -> (Closed | Errored) -> Connecting`
//! with a fixed reconnect delay. Errors arm the synthetic fallback, a
//! successful connect disarms it.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fallback::{FallbackSettings, SyntheticFallback};
use super::transport::{connect, ReadEvent, ReceiverConnection};
use crate::adsb::ModeSDecoder;
use crate::aircraft::SharedEngine;
use crate::beast::Deframer;
use crate::config::Config;
use crate::decoder::DecoderAdapter;
use crate::error::TransportError;

/// Interval between feed summary log lines
const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Addresses the decoder tracks for CPR pairing and parity recovery
const DECODER_MAX_AIRCRAFT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
    Errored,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub upstream_addr: String,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub address_ttl: Duration,
    pub synthetic_fallback: bool,
}

impl From<&Config> for SupervisorSettings {
    fn from(config: &Config) -> Self {
        Self {
            upstream_addr: config.upstream_addr(),
            connect_timeout: config.connect_timeout,
            reconnect_delay: config.reconnect_delay,
            address_ttl: config.stale_timeout,
            synthetic_fallback: config.synthetic_fallback,
        }
    }
}

/// How a connected session ended
enum SessionEnd {
    Closed,
    Errored(TransportError),
    Cancelled,
}

pub struct FeedSupervisor {
    settings: SupervisorSettings,
    engine: SharedEngine,
    fallback: Option<SyntheticFallback>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl FeedSupervisor {
    pub fn new(
        settings: SupervisorSettings,
        fallback: FallbackSettings,
        engine: SharedEngine,
        cancel: CancellationToken,
    ) -> Self {
        let fallback = settings
            .synthetic_fallback
            .then(|| SyntheticFallback::new(fallback, engine.clone(), cancel.clone()));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            settings,
            engine,
            fallback,
            state_tx,
            cancel,
        }
    }

    /// Watch connection state transitions
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("[Feed] State -> {}", state);
        self.state_tx.send_replace(state);
    }

    /// Connect, pump, reconnect until cancelled
    pub async fn run(mut self) {
        info!("[Feed] Supervising receiver at {}", self.settings.upstream_addr);

        loop {
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                r = connect(&self.settings.upstream_addr, self.settings.connect_timeout) => r,
            };

            match connected {
                Ok(stream) => {
                    info!("[Feed] Connected to receiver {}", self.settings.upstream_addr);
                    self.set_state(ConnectionState::Connected);
                    if let Some(fallback) = self.fallback.as_mut() {
                        fallback.disarm().await;
                    }

                    match self.pump(ReceiverConnection::new(stream)).await {
                        SessionEnd::Cancelled => break,
                        SessionEnd::Closed => {
                            info!("[Feed] Receiver closed the connection");
                            self.set_state(ConnectionState::Closed);
                        }
                        SessionEnd::Errored(e) => self.on_error(e),
                    }
                }
                Err(e) => self.on_error(e),
            }

            debug!("[Feed] Reconnecting in {:?}", self.settings.reconnect_delay);
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.reconnect_delay) => {}
            }
        }

        if let Some(fallback) = self.fallback.as_mut() {
            fallback.disarm().await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("[Feed] Supervisor stopped");
    }

    fn on_error(&mut self, e: TransportError) {
        warn!("[Feed] {}. Retrying in {:?}...", e, self.settings.reconnect_delay);
        self.set_state(ConnectionState::Errored);
        if let Some(fallback) = self.fallback.as_mut() {
            fallback.arm();
        }
    }

    /// Route bytes through deframer, decoder and engine until the session ends
    async fn pump(&self, mut conn: ReceiverConnection) -> SessionEnd {
        let mut deframer = Deframer::new();
        let mut adapter = DecoderAdapter::new(Box::new(ModeSDecoder::new(
            DECODER_MAX_AIRCRAFT,
            self.settings.address_ttl,
        )));

        let mut report = tokio::time::interval(REPORT_INTERVAL);
        report.set_missed_tick_behavior(MissedTickBehavior::Delay);
        report.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
                _ = report.tick() => {
                    let decoder = adapter.stats();
                    let summary = self.engine.summary().await;
                    info!(
                        "[Feed] frames={} decoded={} errors={} skipped={} | {}",
                        deframer.frames_extracted(),
                        decoder.frames_decoded,
                        decoder.decode_errors,
                        decoder.frames_skipped,
                        summary
                    );
                }
                read = conn.read() => match read {
                    Ok(ReadEvent::Data(bytes)) => {
                        let messages: Vec<_> = deframer
                            .push(bytes)
                            .iter()
                            .flat_map(|frame| adapter.decode_frame(frame))
                            .collect();
                        self.engine.apply_all(&messages).await;
                    }
                    Ok(ReadEvent::Closed) => return SessionEnd::Closed,
                    Err(e) => return SessionEnd::Errored(e),
                },
            }
        }
    }
}
