//! Full task lifecycle: both transfer branches, naming, progress shape,
//! failure paths, and intermediate-file cleanup.

use super::events_until_terminal;
use crate::downloader::test_helpers::{
    FakeProvider, FakeTranscoder, InputKind, create_test_downloader, test_metadata,
};
use crate::types::{Event, TaskOptions};

fn percentages_for(events: &[Event], video_id: &str) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress {
                video_id: id,
                progress,
                ..
            } if id == video_id => Some(progress.percentage),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn streaming_branch_produces_a_tagged_result() {
    let provider =
        FakeProvider::new().with_metadata(test_metadata("dQw4w9WgXcQ", "Some Artist - A Song", 200));
    let harness = create_test_downloader(provider, FakeTranscoder::new(), 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit("dQw4w9WgXcQ", TaskOptions::default())
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "dQw4w9WgXcQ").await;

    let result = match events.last() {
        Some(Event::TaskFinished { result }) => result.clone(),
        other => panic!("expected TaskFinished, got: {:?}", other),
    };
    assert_eq!(result.artist, "Some Artist");
    assert_eq!(result.title, "A Song");
    assert_eq!(result.video_title, "Some_Artist_-_A_Song");
    assert_eq!(result.file_name, "Some_Artist_-_A_Song.mp3");
    assert_eq!(
        result.youtube_url,
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
    );
    assert_eq!(
        result.thumbnail.as_deref(),
        Some("https://img.example/dQw4w9WgXcQ.jpg")
    );

    let stats = result.stats.expect("streaming branch reports stats");
    assert_eq!(stats.transferred_bytes, 8);

    assert!(result.file.exists(), "output file should exist");

    let jobs = harness.transcoder.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].0, InputKind::Stream);
    assert_eq!(jobs[0].1.audio_bitrate_kbps, 128);
    assert_eq!(jobs[0].1.title, "A Song");
    assert_eq!(jobs[0].1.artist, "Some Artist");

    let percentages = percentages_for(&events, "dQw4w9WgXcQ");
    assert!(
        percentages.windows(2).all(|w| w[0] <= w[1]),
        "progress must be non-decreasing: {:?}",
        percentages
    );
    assert_eq!(percentages.last().copied(), Some(100.0));
    assert_eq!(
        percentages.iter().filter(|p| **p == 100.0).count(),
        1,
        "exactly one 100% sample"
    );
}

#[tokio::test]
async fn long_form_media_routes_through_a_staged_file() {
    // 1500 seconds is past the 20 minute threshold
    let provider = FakeProvider::new().with_metadata(test_metadata("long1", "Artist - Epic", 1500));
    let harness = create_test_downloader(provider, FakeTranscoder::new(), 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit("long1", TaskOptions::default())
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "long1").await;

    let result = match events.last() {
        Some(Event::TaskFinished { result }) => result.clone(),
        other => panic!("expected TaskFinished, got: {:?}", other),
    };
    assert_eq!(result.file_name, "Artist_-_Epic.mp3");
    assert!(result.stats.is_none(), "staged branch reports no stats");
    assert!(result.file.exists());

    // The staged intermediate was handed to the engine, then removed
    let jobs = harness.transcoder.jobs();
    assert_eq!(jobs.len(), 1);
    match &jobs[0].0 {
        InputKind::File(path) => {
            assert!(path.to_string_lossy().ends_with("Artist_-_Epic.mp4"));
            assert!(!path.exists(), "staged file should be cleaned up");
        }
        other => panic!("expected a file input, got: {:?}", other),
    }

    let delete = events.iter().find_map(|e| match e {
        Event::Delete {
            video_file_name, ..
        } => Some(video_file_name.clone()),
        _ => None,
    });
    assert_eq!(delete, Some(Some("Artist_-_Epic.mp4".to_string())));

    assert_eq!(
        percentages_for(&events, "long1"),
        vec![0.0, 50.0, 100.0],
        "staged branch reports fixed milestones"
    );
}

#[tokio::test]
async fn quality_override_keeps_the_transferred_container() {
    let mut metadata = test_metadata("vid1", "Artist - Song", 200);
    metadata.variants[0].has_video = false;
    let provider = FakeProvider::new().with_metadata(metadata);
    let harness = create_test_downloader(provider, FakeTranscoder::new(), 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit(
            "vid1",
            TaskOptions {
                quality: Some(crate::types::Quality::LowestAudio),
            },
        )
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "vid1").await;

    let result = match events.last() {
        Some(Event::TaskFinished { result }) => result.clone(),
        other => panic!("expected TaskFinished, got: {:?}", other),
    };
    assert_eq!(result.file_name, "Artist_-_Song.mp4");
    assert!(result.file.exists());
    assert_eq!(
        std::fs::read(&result.file).unwrap(),
        b"01234567",
        "the transferred bytes are kept verbatim"
    );

    assert!(
        harness.transcoder.jobs().is_empty(),
        "no transcode for a non-default quality"
    );
    assert_eq!(percentages_for(&events, "vid1"), vec![0.0, 100.0]);
}

#[tokio::test]
async fn metadata_failure_fails_the_task() {
    let harness = create_test_downloader(FakeProvider::new(), FakeTranscoder::new(), 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit("unknown", TaskOptions::default())
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "unknown").await;

    match events.last() {
        Some(Event::TaskFailed {
            error, file_name, ..
        }) => {
            assert!(
                error.contains("metadata fetch failed"),
                "unexpected error: {}",
                error
            );
            assert!(file_name.is_none(), "no name derived before metadata");
        }
        other => panic!("expected TaskFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn empty_variant_set_fails_the_task() {
    let mut metadata = test_metadata("vid1", "Artist - Song", 200);
    metadata.variants[0].container = crate::types::Container::Webm;
    let provider = FakeProvider::new().with_metadata(metadata);
    let harness = create_test_downloader(provider, FakeTranscoder::new(), 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit("vid1", TaskOptions::default())
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "vid1").await;

    match events.last() {
        Some(Event::TaskFailed { error, .. }) => {
            assert!(
                error.contains("no matching stream variant"),
                "unexpected error: {}",
                error
            );
        }
        other => panic!("expected TaskFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn streaming_transport_error_is_reported_as_a_transfer_failure() {
    let provider = FakeProvider::new()
        .with_metadata(test_metadata("vid1", "Artist - Song", 200))
        .with_stream_error("connection reset");
    let harness = create_test_downloader(provider, FakeTranscoder::new(), 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit("vid1", TaskOptions::default())
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "vid1").await;

    match events.last() {
        Some(Event::TaskFailed {
            error, file_name, ..
        }) => {
            assert!(
                error.contains("stream failed: connection reset"),
                "unexpected error: {}",
                error
            );
            assert_eq!(file_name.as_deref(), Some("Artist_-_Song.mp3"));
        }
        other => panic!("expected TaskFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn staged_transport_error_announces_the_partial_without_unlinking_it() {
    let provider = FakeProvider::new()
        .with_metadata(test_metadata("long1", "Artist - Epic", 1500))
        .with_stream_error("connection reset");
    let harness = create_test_downloader(provider, FakeTranscoder::new(), 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit("long1", TaskOptions::default())
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "long1").await;

    match events.last() {
        Some(Event::TaskFailed {
            error, file_name, ..
        }) => {
            assert!(
                error.contains("stream failed: connection reset"),
                "unexpected error: {}",
                error
            );
            assert_eq!(file_name.as_deref(), Some("Artist_-_Epic.mp3"));
        }
        other => panic!("expected TaskFailed, got: {:?}", other),
    }

    let delete = events.iter().find_map(|e| match e {
        Event::Delete {
            video_file_name, ..
        } => Some(video_file_name.clone()),
        _ => None,
    });
    assert_eq!(delete, Some(Some("Artist_-_Epic.mp4".to_string())));

    // The intent is announced; removal is left to the subscriber
    let staged = harness.temp_dir.path().join("out").join("Artist_-_Epic.mp4");
    assert!(staged.exists(), "partial staged file must be left in place");
    assert_eq!(std::fs::read(&staged).unwrap(), b"01234567");
}

#[tokio::test]
async fn engine_failure_on_the_staged_branch_cleans_up() {
    let provider = FakeProvider::new().with_metadata(test_metadata("long1", "Artist - Epic", 1500));
    let transcoder = FakeTranscoder::new()
        .with_engine_error("encoder exploded")
        .with_deleted_input();
    let harness = create_test_downloader(provider, transcoder, 1).await;
    let mut rx = harness.downloader.subscribe();

    harness
        .downloader
        .submit("long1", TaskOptions::default())
        .await
        .unwrap();
    let events = events_until_terminal(&mut rx, "long1").await;

    match events.last() {
        Some(Event::TaskFailed {
            error, file_name, ..
        }) => {
            assert!(
                error.contains("encoder exploded"),
                "engine diagnostics must survive: {}",
                error
            );
            assert_eq!(file_name.as_deref(), Some("Artist_-_Epic.mp3"));
        }
        other => panic!("expected TaskFailed, got: {:?}", other),
    }

    // Delete intent is announced even though the unlink itself fails (the
    // engine already consumed the file)
    let delete = events.iter().find_map(|e| match e {
        Event::Delete {
            video_file_name, ..
        } => Some(video_file_name.clone()),
        _ => None,
    });
    assert_eq!(delete, Some(Some("Artist_-_Epic.mp4".to_string())));
}
