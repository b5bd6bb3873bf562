// src/session.rs
//! Device acquisition: match a port, open it, wait for the device to settle
//! and read sentences until a valid fix arrives or the deadline passes.

use crate::{
    device::{match_port, DeviceConfig, DeviceDescriptor, PortEnumerator, PortHandle},
    error::AcquisitionError,
    gps::{nmea::SENTENCE_MARKER, ChecksumPolicy, FixAccumulator, FixRecord, ValidatorMode},
    observer::{LogObserver, SessionObserver},
    transport::{Channel, Transport},
};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use std::{fmt, io, sync::Arc};
use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;

pub type AcquisitionResult = std::result::Result<Acquisition, AcquisitionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Matching,
    Opening,
    Stabilizing,
    Listening,
    Succeeded,
    TimedOut,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Matching => "matching",
            SessionState::Opening => "opening",
            SessionState::Stabilizing => "stabilizing",
            SessionState::Listening => "listening",
            SessionState::Succeeded => "succeeded",
            SessionState::TimedOut => "timed out",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Line counters for the most recent acquisition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentenceStats {
    /// Every line read from the port
    pub total_sentences: u64,
    /// Lines starting with `$` that were handed to the parser
    pub parsed_sentences: u64,
    /// Lines after which the fix was valid
    pub valid_sentences: u64,
}

/// A successful acquisition
#[derive(Debug, Clone, Serialize)]
pub struct Acquisition {
    pub device: String,
    pub port: PortHandle,
    pub fix: FixRecord,
    pub stats: SentenceStats,
    pub acquired_at: DateTime<Utc>,
}

struct MatchedPort {
    descriptor: DeviceDescriptor,
    port: PortHandle,
}

/// An open channel that is closed exactly once, when the guard is dropped
struct OpenPort {
    handle: PortHandle,
    channel: Box<dyn Channel>,
    observer: Arc<dyn SessionObserver>,
}

impl Drop for OpenPort {
    fn drop(&mut self) {
        self.channel.close();
        self.observer.on_port_closed(&self.handle);
    }
}

/// Runs acquisitions against one enumerator and transport.
///
/// A session remembers the port it matched after a success or a timeout and
/// reuses it for the same device; any other failure forgets it so the next
/// attempt enumerates again.
pub struct AcquisitionSession<E, T> {
    enumerator: E,
    transport: T,
    mode: ValidatorMode,
    checksum: ChecksumPolicy,
    observer: Arc<dyn SessionObserver>,
    cancel: CancellationToken,
    matched: Option<MatchedPort>,
    state: SessionState,
    stats: SentenceStats,
}

impl<E: PortEnumerator, T: Transport> AcquisitionSession<E, T> {
    pub fn new(enumerator: E, transport: T) -> Self {
        Self {
            enumerator,
            transport,
            mode: ValidatorMode::default(),
            checksum: ChecksumPolicy::default(),
            observer: Arc::new(LogObserver),
            cancel: CancellationToken::new(),
            matched: None,
            state: SessionState::Idle,
            stats: SentenceStats::default(),
        }
    }

    pub fn with_validator(mut self, mode: ValidatorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_checksum(mut self, checksum: ChecksumPolicy) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Token that aborts a running acquisition when cancelled.
    ///
    /// Once cancelled, every later `acquire` returns `Cancelled` without
    /// touching a port until [`AcquisitionSession::reset_cancel`] is called.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Re-arm a cancelled session and return its new token
    pub fn reset_cancel(&mut self) -> CancellationToken {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SentenceStats {
        self.stats
    }

    /// Port remembered from the last successful or timed-out attempt
    pub fn matched_port(&self) -> Option<&PortHandle> {
        self.matched.as_ref().map(|matched| &matched.port)
    }

    /// Acquire one fix from the device described by `config`.
    ///
    /// The port is always closed before this returns.
    pub async fn acquire(&mut self, config: &DeviceConfig) -> AcquisitionResult {
        self.stats = SentenceStats::default();

        let result = self.run(config).await;

        let terminal = match &result {
            Ok(_) => SessionState::Succeeded,
            Err(AcquisitionError::Timeout { .. }) => SessionState::TimedOut,
            Err(_) => SessionState::Failed,
        };
        if let Err(e) = &result {
            if e.requires_rematch() {
                self.matched = None;
            }
        }
        self.transition(terminal);
        result
    }

    /// Try each device in order; return the first fix or the last failure
    pub async fn acquire_any(&mut self, configs: &[DeviceConfig]) -> AcquisitionResult {
        let mut last_error = AcquisitionError::NoDeviceMatched {
            device: "no devices configured".to_string(),
        };

        for config in configs {
            match self.acquire(config).await {
                Ok(acquisition) => return Ok(acquisition),
                Err(AcquisitionError::Cancelled) => return Err(AcquisitionError::Cancelled),
                Err(e) => {
                    warn!("{}: {}", config.descriptor().name, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    fn transition(&mut self, state: SessionState) {
        self.state = state;
        self.observer.on_state(state);
    }

    fn remembered_port(&self, descriptor: &DeviceDescriptor) -> Option<PortHandle> {
        self.matched
            .as_ref()
            .filter(|matched| &matched.descriptor == descriptor)
            .map(|matched| matched.port.clone())
    }

    fn find_port(&mut self, descriptor: &DeviceDescriptor) -> Option<PortHandle> {
        if let Some(port) = self.remembered_port(descriptor) {
            return Some(port);
        }

        let devices = self.enumerator.enumerate().unwrap_or_else(|e| {
            warn!("Port enumeration failed: {}", e);
            Vec::new()
        });
        let port = match_port(descriptor, &devices)?;
        self.matched = Some(MatchedPort {
            descriptor: descriptor.clone(),
            port: port.clone(),
        });
        Some(port)
    }

    async fn run(&mut self, config: &DeviceConfig) -> AcquisitionResult {
        let descriptor = config.descriptor();
        if self.cancel.is_cancelled() {
            return Err(AcquisitionError::Cancelled);
        }

        self.transition(SessionState::Matching);
        let port = self
            .find_port(descriptor)
            .ok_or_else(|| AcquisitionError::NoDeviceMatched {
                device: descriptor.name.clone(),
            })?;
        self.observer.on_port_matched(descriptor, &port);

        self.transition(SessionState::Opening);
        let channel = self
            .transport
            .open(&port, config.baud_rate())
            .await
            .map_err(|source| AcquisitionError::PortOpenFailed {
                port: port.clone(),
                source,
            })?;
        let mut open = OpenPort {
            handle: port,
            channel,
            observer: Arc::clone(&self.observer),
        };

        self.transition(SessionState::Stabilizing);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(AcquisitionError::Cancelled),
            _ = sleep(config.stabilization_time()) => {}
        }

        self.transition(SessionState::Listening);
        self.listen(&mut open, config).await
    }

    async fn listen(&mut self, open: &mut OpenPort, config: &DeviceConfig) -> AcquisitionResult {
        let mut fix = FixAccumulator::new(self.mode).with_checksum(self.checksum);
        let started = Instant::now();
        let deadline = started + config.fetch_timeout();

        loop {
            if Instant::now() >= deadline {
                return Err(AcquisitionError::Timeout {
                    port: open.handle.clone(),
                    waited: started.elapsed(),
                });
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AcquisitionError::Cancelled),
                next = timeout_at(deadline, open.channel.next_line()) => next,
            };

            let line = match next {
                // Deadline reached mid-read; reported at the top of the loop
                Err(_) => continue,
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    return Err(AcquisitionError::Io {
                        port: open.handle.clone(),
                        source: io::Error::new(io::ErrorKind::UnexpectedEof, "device stopped sending data"),
                    })
                }
                Ok(Err(source)) => {
                    return Err(AcquisitionError::Io {
                        port: open.handle.clone(),
                        source,
                    })
                }
            };

            self.stats.total_sentences += 1;
            self.observer.on_sentence(&line);
            if !line.trim_start().starts_with(SENTENCE_MARKER) {
                continue;
            }

            self.stats.parsed_sentences += 1;
            fix.feed(&line);
            if fix.is_valid() {
                self.stats.valid_sentences += 1;
                let record = fix.snapshot();
                self.observer.on_fix(&record);
                return Ok(Acquisition {
                    device: config.descriptor().name.clone(),
                    port: open.handle.clone(),
                    fix: record,
                    stats: self.stats,
                    acquired_at: Utc::now(),
                });
            }
        }
    }
}
