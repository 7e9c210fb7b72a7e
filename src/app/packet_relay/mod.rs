// Packet relay - Retimes source packets and feeds the interleaving writer

use tracing::{info, trace, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Drains a source into a destination following a [`StreamMappingTable`]
pub struct PacketRelay<'a> {
    progress: &'a dyn ProgressPort,
    progress_interval: u64,
    state: RelayState,
}

impl<'a> PacketRelay<'a> {
    pub fn new(progress: &'a dyn ProgressPort, progress_interval: u64) -> Self {
        Self {
            progress,
            progress_interval,
            state: RelayState::Initializing,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Write the header, relay every packet, then write the trailer.
    ///
    /// The trailer is written after a mid-stream read or write failure too;
    /// the first failure is returned. A header failure skips the trailer.
    /// After the trailer the byte sink is closed explicitly so close errors
    /// fail the run.
    pub fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        table: &StreamMappingTable,
    ) -> Result<RelayStats, RemuxError>
    where
        S: DemuxSource,
        K: MuxSink<Packet = S::Packet>,
    {
        self.transition(RelayState::Initializing);
        if let Err(e) = sink.write_header() {
            self.transition(RelayState::Failed);
            return Err(e);
        }

        // Muxers may pick their own time base while writing the header
        let source_time_bases: Vec<Timebase> =
            source.streams().iter().map(|stream| stream.time_base).collect();
        let destination_time_bases: Vec<Option<Timebase>> = (0..sink.stream_count())
            .map(|index| sink.stream_time_base(index))
            .collect();

        let mut stats = RelayStats::default();
        let mut failure = None;

        loop {
            self.transition(RelayState::Reading);
            let mut packet = match source.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            let source_index = packet.stream_index();
            let route = table.destination(source_index).and_then(|destination| {
                let from = *source_time_bases.get(source_index)?;
                let to = (*destination_time_bases.get(destination)?)?;
                Some((destination, from, to))
            });
            let Some((destination, from, to)) = route else {
                trace!(source_index, "Skipping packet of unmapped stream");
                stats.packets_skipped += 1;
                continue;
            };

            Self::retime(&mut packet, destination, from, to);

            self.transition(RelayState::Writing);
            let size = packet.size() as u64;
            if let Err(e) = sink.write_interleaved(packet) {
                failure = Some(e);
                break;
            }

            stats.packets_written += 1;
            stats.bytes_written += size;
            if self.progress_interval > 0 && stats.packets_written % self.progress_interval == 0 {
                self.progress.on_event(&RemuxEvent::Running {
                    packets: stats.packets_written,
                    bytes: stats.bytes_written,
                });
            }
        }

        self.transition(RelayState::Finalizing);
        let trailer = sink.write_trailer().and_then(|()| sink.close());

        match (failure, trailer) {
            (Some(e), trailer) => {
                if let Err(trailer_error) = trailer {
                    warn!("Finalizing after failed relay also failed: {}", trailer_error);
                }
                self.transition(RelayState::Failed);
                Err(e)
            }
            (None, Err(e)) => {
                self.transition(RelayState::Failed);
                Err(e)
            }
            (None, Ok(())) => {
                self.transition(RelayState::Done);
                info!(
                    "Relayed {} packets ({} bytes), skipped {}",
                    stats.packets_written, stats.bytes_written, stats.packets_skipped
                );
                Ok(stats)
            }
        }
    }

    /// Move a packet into the destination stream's time reference
    fn retime<P: MediaPacket>(packet: &mut P, destination: usize, from: Timebase, to: Timebase) {
        packet.rescale_ts(from, to);
        packet.clear_position();
        packet.set_stream_index(destination);
    }

    fn transition(&mut self, next: RelayState) {
        if self.state != next {
            trace!(from = ?self.state, to = ?next, "Relay state");
            self.state = next;
        }
    }
}
