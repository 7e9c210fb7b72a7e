// Remux interactor - Runs the mapping policy ladder for one request

use std::sync::Arc;

use tracing::{error, info};

use crate::app::packet_relay::PacketRelay;
use crate::app::source_opener::SourceOpener;
use crate::app::stream_mapper::StreamMapper;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Source locator and destination path of one remux
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxRequest {
    pub source: String,
    pub destination: String,
}

impl RemuxRequest {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Reject blank arguments before any resource is touched
    pub fn validate(&self) -> Result<(), RemuxError> {
        if self.source.trim().is_empty() {
            return Err(RemuxError::BadArgs("source locator is blank".to_string()));
        }
        if self.destination.trim().is_empty() {
            return Err(RemuxError::BadArgs("destination path is blank".to_string()));
        }
        Ok(())
    }
}

/// Holds the backend's network setup for as long as it lives
pub(crate) struct NetworkSession<'a, B: MediaBackend> {
    backend: &'a B,
}

impl<'a, B: MediaBackend> NetworkSession<'a, B> {
    pub(crate) fn open(backend: &'a B) -> Self {
        backend.network_init();
        Self { backend }
    }
}

impl<B: MediaBackend> Drop for NetworkSession<'_, B> {
    fn drop(&mut self) {
        self.backend.network_deinit();
    }
}

/// Interactor for the remux use case
pub struct RemuxInteractor<B: MediaBackend> {
    backend: B,
    config: RemuxConfig,
    progress: Arc<dyn ProgressPort>,
}

impl<B: MediaBackend> RemuxInteractor<B> {
    pub fn new(backend: B, config: RemuxConfig, progress: Arc<dyn ProgressPort>) -> Self {
        Self {
            backend,
            config,
            progress,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Remux `request.source` into `request.destination`.
    ///
    /// Policies from [`MappingPolicy::FALLBACK_ORDER`] are tried in turn; the
    /// first success wins and otherwise the error of the last attempt is
    /// returned. Every attempt releases its source and destination before
    /// the next one starts.
    pub fn remux(&self, request: &RemuxRequest) -> Result<RemuxReport, RemuxError> {
        request.validate()?;

        let _network = NetworkSession::open(&self.backend);
        info!("Remuxing {} -> {}", request.source, request.destination);

        let mut last_error = None;
        for (position, policy) in MappingPolicy::FALLBACK_ORDER.iter().copied().enumerate() {
            let attempt = position + 1;
            self.progress.on_event(&RemuxEvent::Started {
                attempt,
                policy,
                output: request.destination.clone(),
            });

            match self.run_attempt(request, policy, attempt) {
                Ok(report) => {
                    self.progress.on_event(&RemuxEvent::Done {
                        output: report.output.clone(),
                        policy,
                        bytes: report.stats.bytes_written,
                    });
                    return Ok(report);
                }
                Err(e) => {
                    error!(
                        stage = e.stage(),
                        code = e.code(),
                        attempt,
                        policy = %policy,
                        "Remux attempt failed: {}",
                        e
                    );
                    self.progress.on_event(&RemuxEvent::Failed {
                        attempt,
                        policy,
                        stage: e.stage().to_string(),
                        code: e.code(),
                    });
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(RemuxError::NoStreams))
    }

    fn run_attempt(
        &self,
        request: &RemuxRequest,
        policy: MappingPolicy,
        attempt: usize,
    ) -> Result<RemuxReport, RemuxError> {
        info!(attempt, policy = %policy, "Starting remux attempt");

        let mut source = SourceOpener::new(&self.backend, &self.config).open(&request.source)?;
        let probe = source.probe_status();

        let (mut sink, table) = StreamMapper::new(&self.backend, &self.config.output).map(
            &source,
            &request.destination,
            policy,
        )?;

        let mut relay = PacketRelay::new(self.progress.as_ref(), self.config.progress_interval);
        let stats = relay.run(&mut source, &mut sink, &table)?;

        Ok(RemuxReport {
            source: request.source.clone(),
            output: request.destination.clone(),
            policy,
            attempts: attempt,
            streams_written: table.output_streams(),
            probe,
            stats,
        })
    }
}
