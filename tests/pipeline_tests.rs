//! Pipeline tests against the in-memory backend

use std::sync::{Arc, Mutex};

use hls_remux::adapters::{JournalEvent, MemoryBackend, MemoryMedia, SinkFaults};
use hls_remux::app::packet_relay::PacketRelay;
use hls_remux::app::source_opener::SourceOpener;
use hls_remux::app::stream_mapper::StreamMapper;
use hls_remux::app::{InspectInteractor, RemuxInteractor, RemuxRequest};
use hls_remux::domain::errors::*;
use hls_remux::domain::model::*;
use hls_remux::ports::ProgressPort;

const SOURCE: &str = "downloads/show/index.m3u8";
const OUTPUT: &str = "show.mp4";

// Test utilities

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<RemuxEvent>>,
}

impl RecordingProgress {
    fn events(&self) -> Vec<RemuxEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressPort for RecordingProgress {
    fn on_event(&self, event: &RemuxEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Video, audio and a timed metadata stream, ten packets of each A/V stream
fn hls_media() -> MemoryMedia {
    let mut media = MemoryMedia::new()
        .video("h264", Timebase::mpegts(), 1280, 720)
        .stream(MediaKind::Audio, "aac", Timebase::mpegts())
        .stream(MediaKind::Other, "timed_id3", Timebase::mpegts())
        .packet(Packet::new(2, 0, 0, vec![0xff; 16]));

    for i in 0..10i64 {
        media = media
            .packet(Packet::new(0, i * 3003, 3003, vec![1; 100]).at_position(i * 188))
            .packet(Packet::new(1, i * 1920, 1920, vec![2; 20]));
    }
    media
}

fn interactor(
    backend: MemoryBackend,
    config: RemuxConfig,
) -> (RemuxInteractor<MemoryBackend>, Arc<RecordingProgress>) {
    let progress = Arc::new(RecordingProgress::default());
    let interactor = RemuxInteractor::new(backend, config, progress.clone());
    (interactor, progress)
}

fn request() -> RemuxRequest {
    RemuxRequest::new(SOURCE, OUTPUT)
}

#[test]
fn test_audio_and_video_are_carried() {
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media());
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let report = interactor.remux(&request()).unwrap();
    assert_eq!(report.policy, MappingPolicy::AudioAndVideo);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.streams_written, 2);
    assert_eq!(report.stats.packets_written, 20);
    assert_eq!(report.stats.packets_skipped, 1);
    assert_eq!(report.stats.bytes_written, 10 * 100 + 10 * 20);

    let output = interactor.backend().output(OUTPUT).unwrap();
    assert!(output.header_written);
    assert!(output.trailer_written);
    assert!(output.closed);
    assert_eq!(output.streams.len(), 2);
    assert_eq!(output.streams[0].0.kind, MediaKind::Video);
    assert_eq!(output.streams[1].0.kind, MediaKind::Audio);
    assert_eq!(output.packets.len(), 20);
    assert!(output.packets.iter().all(|packet| packet.stream_index < 2));
    assert!(output.packets.iter().all(|packet| packet.position.is_none()));
}

#[test]
fn test_corrupt_audio_falls_back_to_video_only() {
    let faults = SinkFaults {
        reject_kind: Some(MediaKind::Audio),
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, progress) = interactor(backend, RemuxConfig::default());

    let report = interactor.remux(&request()).unwrap();
    assert_eq!(report.policy, MappingPolicy::VideoOnly);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.streams_written, 1);

    let output = interactor.backend().output(OUTPUT).unwrap();
    assert_eq!(output.streams.len(), 1);
    assert_eq!(output.streams[0].0.kind, MediaKind::Video);
    assert_eq!(output.packets.len(), 10);
    assert!(output.packets.iter().all(|packet| packet.stream_index == 0));

    let events = progress.events();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], RemuxEvent::Started { attempt: 1, policy: MappingPolicy::AudioAndVideo, .. }));
    assert!(matches!(
        &events[1],
        RemuxEvent::Failed { attempt: 1, stage, code, .. } if stage == "write_frame" && *code == CODE_INVALID_DATA
    ));
    assert!(matches!(events[2], RemuxEvent::Started { attempt: 2, policy: MappingPolicy::VideoOnly, .. }));
    assert!(matches!(events[3], RemuxEvent::Done { policy: MappingPolicy::VideoOnly, .. }));
}

#[test]
fn test_attempt_handles_closed_before_retry() {
    let faults = SinkFaults {
        reject_kind: Some(MediaKind::Audio),
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, _) = interactor(backend, RemuxConfig::default());
    interactor.remux(&request()).unwrap();

    let events = interactor.backend().journal().events;
    let position = |event: JournalEvent| events.iter().position(|recorded| *recorded == event).unwrap();
    let second_open = events
        .iter()
        .rposition(|event| *event == JournalEvent::SourceOpened(SOURCE.to_string()))
        .unwrap();

    assert!(position(JournalEvent::SinkClosed(OUTPUT.to_string())) < second_open);
    assert!(position(JournalEvent::SourceClosed(SOURCE.to_string())) < second_open);
    // Destination is closed before its source
    assert!(
        position(JournalEvent::SinkClosed(OUTPUT.to_string()))
            < position(JournalEvent::SourceClosed(SOURCE.to_string()))
    );
}

#[test]
fn test_all_unsupported_streams() {
    let media = MemoryMedia::new()
        .stream(MediaKind::Other, "webvtt", Timebase::new(1, 1000).unwrap())
        .stream(MediaKind::Other, "timed_id3", Timebase::mpegts())
        .packet(Packet::new(0, 0, 10, vec![0; 4]));
    let backend = MemoryBackend::new().with_source(SOURCE, media);
    let (interactor, progress) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();
    assert_eq!(error, RemuxError::NoStreams);
    assert_eq!(error.code(), CODE_INVALID_DATA);

    let failures: Vec<_> = progress
        .events()
        .into_iter()
        .filter(|event| matches!(event, RemuxEvent::Failed { stage, .. } if stage == "no_streams"))
        .collect();
    assert_eq!(failures.len(), 2);

    let journal = interactor.backend().journal();
    assert_eq!(journal.count(&JournalEvent::SinkCreated(OUTPUT.to_string())), 0);
    assert!(interactor.backend().output(OUTPUT).is_none());
}

#[test]
fn test_unreachable_source() {
    let backend = MemoryBackend::new();
    let (interactor, progress) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();
    assert!(matches!(error, RemuxError::Open { code: -2, .. }));
    assert_eq!(error.stage(), "open_input");

    let failed_attempts: Vec<usize> = progress
        .events()
        .into_iter()
        .filter_map(|event| match event {
            RemuxEvent::Failed { attempt, stage, .. } if stage == "open_input" => Some(attempt),
            _ => None,
        })
        .collect();
    assert_eq!(failed_attempts, vec![1, 2]);
}

#[test]
fn test_discovery_failure() {
    let media = hls_media().fail_discovery(RemuxError::metadata("invalid playlist", CODE_INVALID_DATA));
    let backend = MemoryBackend::new().with_source(SOURCE, media);
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();
    assert_eq!(error.stage(), "find_stream_info");
    assert_eq!(error.code(), CODE_INVALID_DATA);

    let journal = interactor.backend().journal();
    assert_eq!(journal.count(&JournalEvent::SourceOpened(SOURCE.to_string())), 2);
    assert_eq!(journal.count(&JournalEvent::SourceClosed(SOURCE.to_string())), 2);
}

#[test]
fn test_network_bracket_once_per_remux() {
    for backend in [
        MemoryBackend::new().with_source(SOURCE, hls_media()),
        MemoryBackend::new(),
    ] {
        let (interactor, _) = interactor(backend, RemuxConfig::default());
        let _ = interactor.remux(&request());

        let journal = interactor.backend().journal();
        assert_eq!(journal.count(&JournalEvent::NetworkInit), 1);
        assert_eq!(journal.count(&JournalEvent::NetworkDeinit), 1);
        assert_eq!(journal.events.first(), Some(&JournalEvent::NetworkInit));
        assert_eq!(journal.events.last(), Some(&JournalEvent::NetworkDeinit));
    }
}

#[test]
fn test_blank_arguments_touch_nothing() {
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media());
    let (interactor, progress) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&RemuxRequest::new(SOURCE, "")).unwrap_err();
    assert!(matches!(error, RemuxError::BadArgs(_)));
    assert!(interactor.backend().journal().events.is_empty());
    assert!(progress.events().is_empty());
}

#[test]
fn test_timestamps_rescaled_to_destination() {
    let faults = SinkFaults {
        header_time_base: Some(Timebase::new(1, 1000).unwrap()),
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, _) = interactor(backend, RemuxConfig::default());
    interactor.remux(&request()).unwrap();

    let output = interactor.backend().output(OUTPUT).unwrap();
    let video: Vec<(Option<i64>, i64)> = output
        .packets
        .iter()
        .filter(|packet| packet.stream_index == 0)
        .map(|packet| (packet.pts, packet.duration))
        .take(4)
        .collect();
    assert_eq!(video, vec![(Some(0), 33), (Some(33), 33), (Some(67), 33), (Some(100), 33)]);

    let audio: Vec<Option<i64>> = output
        .packets
        .iter()
        .filter(|packet| packet.stream_index == 1)
        .map(|packet| packet.dts)
        .take(3)
        .collect();
    assert_eq!(audio, vec![Some(0), Some(21), Some(43)]);
}

#[test]
fn test_absent_timestamps_stay_absent() {
    let media = MemoryMedia::new()
        .video("h264", Timebase::mpegts(), 640, 360)
        .packet(Packet::new(0, 0, 3003, vec![1; 8]).with_dts(None))
        .packet(Packet::new(0, 3003, 3003, vec![1; 8]));
    let faults = SinkFaults {
        header_time_base: Some(Timebase::new(1, 1000).unwrap()),
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, media).with_faults(faults);
    let (interactor, _) = interactor(backend, RemuxConfig::default());
    interactor.remux(&request()).unwrap();

    let output = interactor.backend().output(OUTPUT).unwrap();
    assert_eq!(output.packets[0].dts, None);
    assert_eq!(output.packets[0].pts, Some(0));
    assert_eq!(output.packets[1].dts, Some(33));
}

#[test]
fn test_repeat_runs_are_identical() {
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media());
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let first_report = interactor.remux(&request()).unwrap();
    let first = interactor.backend().output(OUTPUT).unwrap();
    let second_report = interactor.remux(&request()).unwrap();
    let second = interactor.backend().output(OUTPUT).unwrap();

    assert_eq!(first_report, second_report);
    assert_eq!(first, second);
}

#[test]
fn test_late_dimensions_are_awaited() {
    let mut media = MemoryMedia::new()
        .stream(MediaKind::Video, "h264", Timebase::mpegts())
        .stream(MediaKind::Audio, "aac", Timebase::mpegts())
        .dimensions_after(0, 640, 360, 3);
    for i in 0..4i64 {
        media = media
            .packet(Packet::new(0, i * 3003, 3003, vec![1; 10]))
            .packet(Packet::new(1, i * 1920, 1920, vec![2; 5]));
    }
    let faults = SinkFaults {
        reject_unsized_video: true,
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, media).with_faults(faults);
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let report = interactor.remux(&request()).unwrap();
    assert_eq!(report.probe, ProbeStatus::Ready { packets_read: 3 });
    assert_eq!(report.stats.packets_written, 8);

    let output = interactor.backend().output(OUTPUT).unwrap();
    assert_eq!((output.streams[0].0.width, output.streams[0].0.height), (640, 360));
    // Probed packets come out first and in source order
    let order: Vec<(usize, Option<i64>)> = output
        .packets
        .iter()
        .take(4)
        .map(|packet| (packet.stream_index, packet.pts))
        .collect();
    assert_eq!(order, vec![(0, Some(0)), (1, Some(0)), (0, Some(3003)), (1, Some(1920))]);
}

#[test]
fn test_unknown_dimensions_rejected_at_header() {
    let media = MemoryMedia::new()
        .stream(MediaKind::Video, "h264", Timebase::mpegts())
        .packets((0..10i64).map(|i| Packet::new(0, i * 3003, 3003, vec![1; 10])));
    let faults = SinkFaults {
        reject_unsized_video: true,
        ..SinkFaults::default()
    };
    let config = RemuxConfig {
        dimension_probe_packets: 4,
        ..RemuxConfig::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, media).with_faults(faults);
    let (interactor, _) = interactor(backend, config);

    let error = interactor.remux(&request()).unwrap_err();
    assert_eq!(error.stage(), "write_header");
    assert_eq!(error.code(), CODE_INVALID_ARGUMENT);

    let output = interactor.backend().output(OUTPUT).unwrap();
    assert!(!output.header_written);
    assert!(!output.trailer_written);
    assert!(output.packets.is_empty());
}

#[test]
fn test_strict_dimensions_fail_before_destination() {
    let media = MemoryMedia::new()
        .stream(MediaKind::Video, "h264", Timebase::mpegts())
        .packets((0..10i64).map(|i| Packet::new(0, i * 3003, 3003, vec![1; 10])));
    let config = RemuxConfig {
        strict_dimensions: true,
        dimension_probe_packets: 4,
        ..RemuxConfig::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, media);
    let (interactor, _) = interactor(backend, config);

    let error = interactor.remux(&request()).unwrap_err();
    assert!(matches!(error, RemuxError::Metadata { .. }));
    assert_eq!(
        interactor
            .backend()
            .journal()
            .count(&JournalEvent::SinkCreated(OUTPUT.to_string())),
        0
    );
}

#[test]
fn test_read_failure_still_writes_trailer() {
    let media = hls_media().fail_read_after(5);
    let backend = MemoryBackend::new().with_source(SOURCE, media);
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();
    assert!(matches!(error, RemuxError::Read { code: CODE_IO, .. }));

    let output = interactor.backend().output(OUTPUT).unwrap();
    assert!(output.trailer_written);
    // Attempt 2 is video-only: of the first five packets two are video
    assert_eq!(output.packets.len(), 2);
}

#[test]
fn test_stream_allocation_limit_falls_back() {
    let faults = SinkFaults {
        max_streams: Some(1),
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, progress) = interactor(backend, RemuxConfig::default());

    let report = interactor.remux(&request()).unwrap();
    assert_eq!(report.policy, MappingPolicy::VideoOnly);
    assert!(progress
        .events()
        .iter()
        .any(|event| matches!(event, RemuxEvent::Failed { stage, .. } if stage == "new_stream")));
}

#[test]
fn test_trailer_failure_fails_attempt() {
    let faults = SinkFaults {
        fail_trailer: true,
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();
    assert_eq!(error.stage(), "write_frame");
}

#[test]
fn test_last_attempt_error_is_surfaced() {
    let faults = SinkFaults {
        max_streams: Some(1),
        fail_trailer: true,
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, progress) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();

    let failed: Vec<(usize, String)> = progress
        .events()
        .into_iter()
        .filter_map(|event| match event {
            RemuxEvent::Failed { attempt, stage, .. } => Some((attempt, stage)),
            _ => None,
        })
        .collect();
    assert_eq!(
        failed,
        vec![(1, "new_stream".to_string()), (2, "write_frame".to_string())]
    );
    assert_eq!(error.stage(), "write_frame");
    assert!(matches!(error, RemuxError::WriteFrame { .. }));
}

#[test]
fn test_close_failure_fails_attempt() {
    let faults = SinkFaults {
        fail_close: true,
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();
    assert!(matches!(error, RemuxError::Io { code: -28, .. }));

    let output = interactor.backend().output(OUTPUT).unwrap();
    assert!(output.trailer_written);
    assert!(!output.closed);
}

#[test]
fn test_destination_creation_failure() {
    let faults = SinkFaults {
        fail_create: true,
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let (interactor, _) = interactor(backend, RemuxConfig::default());

    let error = interactor.remux(&request()).unwrap_err();
    assert!(matches!(error, RemuxError::Io { code: -13, .. }));
}

#[test]
fn test_progress_events_follow_interval() {
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media());
    let config = RemuxConfig {
        progress_interval: 4,
        ..RemuxConfig::default()
    };
    let (interactor, progress) = interactor(backend, config);
    interactor.remux(&request()).unwrap();

    let running: Vec<u64> = progress
        .events()
        .into_iter()
        .filter_map(|event| match event {
            RemuxEvent::Running { packets, .. } => Some(packets),
            _ => None,
        })
        .collect();
    assert_eq!(running, vec![4, 8, 12, 16, 20]);
}

#[test]
fn test_relay_writes_trailer_after_write_failure() {
    let faults = SinkFaults {
        reject_kind: Some(MediaKind::Audio),
        ..SinkFaults::default()
    };
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media()).with_faults(faults);
    let config = RemuxConfig::default();
    let progress = RecordingProgress::default();

    {
        let mut source = SourceOpener::new(&backend, &config).open(SOURCE).unwrap();
        assert_eq!(source.probe_status(), ProbeStatus::Ready { packets_read: 0 });

        let (mut sink, table) = StreamMapper::new(&backend, &config.output)
            .map(&source, OUTPUT, MappingPolicy::AudioAndVideo)
            .unwrap();
        assert_eq!(table.destination(2), None);

        let mut relay = PacketRelay::new(&progress, 0);
        let error = relay.run(&mut source, &mut sink, &table).unwrap_err();
        assert_eq!(error.stage(), "write_frame");
        assert_eq!(relay.state(), RelayState::Failed);
    }

    let output = backend.output(OUTPUT).unwrap();
    assert!(output.trailer_written);
    assert_eq!(output.packets.len(), 1);
}

#[test]
fn test_inspect_previews_policies() {
    let backend = MemoryBackend::new().with_source(SOURCE, hls_media());
    let inspector = InspectInteractor::new(backend, RemuxConfig::default());

    let report = inspector.inspect(SOURCE).unwrap();
    assert_eq!(report.streams.len(), 3);
    assert!(report.probe.is_ready());
    assert_eq!(report.policies[0].policy, MappingPolicy::AudioAndVideo);
    assert_eq!(report.policies[0].carried, vec![(0, 0), (1, 1)]);
    assert_eq!(report.policies[1].carried, vec![(0, 0)]);
    assert!(!report.policies[1].no_streams);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["streams"][0]["kind"], "video");
    assert_eq!(json["probe"]["status"], "ready");
}
