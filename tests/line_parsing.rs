// tests/line_parsing.rs

//! Classification of ffmpeg report lines: progress events, final-result
//! tallies, and noise.

use std::error::Error;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use ffdrive::{FfmpegProgress, FfmpegResult, FfmpegResultReader, StdReader};
use test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn progress_line_parses_recognised_keys() {
    init_tracing();

    let progress =
        FfmpegProgress::from_line("frame=10 fps=25 out_time_us=400000").expect("progress line");
    assert_eq!(progress.frame, Some(10));
    assert_eq!(progress.fps, Some(25.0));
    assert_eq!(progress.out_time_us, Some(400000));
    assert_eq!(progress.total_size, None);
}

#[test]
fn progress_line_strips_unit_suffixes() {
    init_tracing();

    let line = "frame=100 fps=29.97 bitrate=1187.6kbits/s total_size=1048576 \
                out_time_us=4000000 dup_frames=0 drop_frames=2 speed=1.01x";
    let progress = FfmpegProgress::from_line(line).expect("progress line");
    assert_eq!(progress.frame, Some(100));
    assert_eq!(progress.bitrate_kbits, Some(1187.6));
    assert_eq!(progress.total_size, Some(1048576));
    assert_eq!(progress.dup_frames, Some(0));
    assert_eq!(progress.drop_frames, Some(2));
    assert_eq!(progress.speed, Some(1.01));
}

#[test]
fn non_progress_lines_are_rejected() {
    init_tracing();

    assert_eq!(FfmpegProgress::from_line(""), None);
    assert_eq!(FfmpegProgress::from_line("Press [q] to stop"), None);
    assert_eq!(
        FfmpegProgress::from_line("video:10kB audio:0kB"),
        None,
        "a tally line is not a progress event"
    );
    assert_eq!(
        FfmpegProgress::from_line("codec=h264 profile=high"),
        None,
        "key=value tokens without a recognised key are not progress"
    );
}

#[test]
fn minimal_tally_parses() {
    init_tracing();

    let result = FfmpegResult::from_line("video:1024kB audio:128kB").expect("tally line");
    assert_eq!(result.video_kb, 1024);
    assert_eq!(result.audio_kb, 128);
    assert_eq!(result.subtitle_kb, None);
    assert_eq!(result.muxing_overhead_percent, None);
}

#[test]
fn full_tally_parses() {
    init_tracing();

    let line = "video:1024kB audio:128kB subtitle:0kB other streams:0kB \
                global headers:2kB muxing overhead: 0.521311%";
    let result = FfmpegResult::from_line(line).expect("tally line");
    assert_eq!(result.video_kb, 1024);
    assert_eq!(result.audio_kb, 128);
    assert_eq!(result.subtitle_kb, Some(0));
    assert_eq!(result.other_streams_kb, Some(0));
    assert_eq!(result.global_headers_kb, Some(2));
    assert_eq!(result.muxing_overhead_percent, Some(0.521311));
}

#[test]
fn non_tally_lines_are_rejected() {
    init_tracing();

    assert_eq!(FfmpegResult::from_line(""), None);
    assert_eq!(FfmpegResult::from_line("frame=10 fps=25"), None);
    assert_eq!(FfmpegResult::from_line("Stream mapping:"), None);
}

#[tokio::test]
async fn reader_delivers_progress_and_retains_last_tally() -> TestResult {
    init_tracing();

    let data = b"frame=10 fps=25 out_time_us=400000\n\
                 Stream mapping:\n\
                 video:5kB audio:1kB\n\
                 video:10kB audio:2kB\n"
        .to_vec();

    let events: Arc<Mutex<Vec<FfmpegProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let reader: Box<dyn StdReader<FfmpegResult>> = Box::new(FfmpegResultReader::with_listener(
        Box::new(move |p| sink.lock().unwrap().push(p)),
    ));

    let result = reader.read(Box::new(Cursor::new(data))).await?;

    let result = result.expect("a tally was retained");
    assert_eq!(result.video_kb, 10, "the last tally wins");
    assert_eq!(result.audio_kb, 2);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1, "exactly one progress event was delivered");
    assert_eq!(events[0].frame, Some(10));
    assert_eq!(events[0].fps, Some(25.0));
    assert_eq!(events[0].out_time_us, Some(400000));
    Ok(())
}

#[tokio::test]
async fn reader_returns_none_without_tally() -> TestResult {
    init_tracing();

    let data = b"Stream mapping:\nPress [q] to stop\n".to_vec();
    let reader: Box<dyn StdReader<FfmpegResult>> = Box::new(FfmpegResultReader::new());

    let result = reader.read(Box::new(Cursor::new(data))).await?;
    assert!(result.is_none());
    Ok(())
}
