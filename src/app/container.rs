use std::sync::Arc;

use crate::adapters::{LibavBackend, TracingProgressAdapter};
use crate::app::{InspectInteractor, RemuxInteractor};
use crate::domain::model::RemuxConfig;
use crate::error::HlsRemuxResult;
use crate::ports::ProgressPort;

/// Wires the libav backend and the tracing progress observer into interactors
pub struct DefaultAppContainer {
    backend: LibavBackend,
    config: RemuxConfig,
    progress: Arc<dyn ProgressPort>,
}

impl DefaultAppContainer {
    pub fn new(config: RemuxConfig) -> HlsRemuxResult<Self> {
        Ok(Self {
            backend: LibavBackend::new()?,
            config,
            progress: Arc::new(TracingProgressAdapter::new()),
        })
    }

    pub fn remux_interactor(&self) -> RemuxInteractor<LibavBackend> {
        RemuxInteractor::new(self.backend, self.config.clone(), Arc::clone(&self.progress))
    }

    pub fn inspect_interactor(&self) -> InspectInteractor<LibavBackend> {
        InspectInteractor::new(self.backend, self.config.clone())
    }
}
