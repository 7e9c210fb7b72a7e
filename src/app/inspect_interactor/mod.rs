// Inspect interactor - Opens a source and previews what each policy would carry

use serde::Serialize;
use tracing::info;

use crate::app::remux_interactor::NetworkSession;
use crate::app::source_opener::SourceOpener;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Streams a mapping policy would carry into the destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyPreview {
    pub policy: MappingPolicy,
    /// (source, destination) index pairs
    pub carried: Vec<(usize, usize)>,
    /// True when the policy would end in [`RemuxError::NoStreams`]
    pub no_streams: bool,
}

/// Source description produced by [`InspectInteractor::inspect`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub locator: String,
    pub streams: Vec<SourceStream>,
    pub probe: ProbeStatus,
    pub policies: Vec<PolicyPreview>,
}

/// Interactor for source inspection
pub struct InspectInteractor<B: MediaBackend> {
    backend: B,
    config: RemuxConfig,
}

impl<B: MediaBackend> InspectInteractor<B> {
    pub fn new(backend: B, config: RemuxConfig) -> Self {
        Self { backend, config }
    }

    /// Open `locator` the same way a remux would, without creating any destination
    pub fn inspect(&self, locator: &str) -> Result<InspectReport, RemuxError> {
        if locator.trim().is_empty() {
            return Err(RemuxError::BadArgs("source locator is blank".to_string()));
        }

        let _network = NetworkSession::open(&self.backend);
        let source = SourceOpener::new(&self.backend, &self.config).open(locator)?;
        let streams = source.streams();

        let policies = MappingPolicy::FALLBACK_ORDER
            .iter()
            .map(|policy| {
                let table = StreamMappingTable::build(&streams, *policy);
                PolicyPreview {
                    policy: *policy,
                    carried: table.included().collect(),
                    no_streams: table.output_streams() == 0,
                }
            })
            .collect();

        info!("Inspected {}: {} streams", locator, streams.len());

        Ok(InspectReport {
            locator: locator.to_string(),
            streams,
            probe: source.probe_status(),
            policies,
        })
    }
}
