// Stream mapper - Decides which source streams reach the destination

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Creates the destination and its streams for a mapping policy
pub struct StreamMapper<'a, B: MediaBackend> {
    backend: &'a B,
    config: &'a OutputConfig,
}

impl<'a, B: MediaBackend> StreamMapper<'a, B> {
    pub fn new(backend: &'a B, config: &'a OutputConfig) -> Self {
        Self { backend, config }
    }

    /// Build the mapping table for `policy`, then create the destination at
    /// `destination` with one stream per included source stream.
    ///
    /// The destination is only created once at least one stream is known to
    /// be carried.
    pub fn map<S>(
        &self,
        source: &S,
        destination: &str,
        policy: MappingPolicy,
    ) -> Result<(B::Sink, StreamMappingTable), RemuxError>
    where
        S: DemuxSource<Parameters = B::Parameters>,
    {
        let streams = source.streams();
        let table = StreamMappingTable::build(&streams, policy);

        if table.output_streams() == 0 {
            return Err(RemuxError::NoStreams);
        }

        let mut sink = self.backend.create_sink(destination, self.config)?;

        for (source_index, expected) in table.included() {
            let stream = &streams[source_index];
            let parameters = source.parameters(source_index).ok_or_else(|| {
                RemuxError::stream_creation(
                    format!("source stream {} has no codec parameters", source_index),
                    CODE_UNKNOWN,
                )
            })?;

            let created = sink.add_stream(&parameters, stream.time_base)?;
            if created != expected {
                return Err(RemuxError::stream_creation(
                    format!(
                        "destination assigned index {} to source stream {}, expected {}",
                        created, source_index, expected
                    ),
                    CODE_UNKNOWN,
                ));
            }

            debug!(
                source_index,
                destination_index = created,
                kind = %stream.kind,
                codec = %stream.codec,
                time_base = %stream.time_base,
                "Mapped stream"
            );
        }

        info!(
            "Mapped {} of {} source streams ({})",
            table.output_streams(),
            table.len(),
            policy
        );

        Ok((sink, table))
    }
}
