// tests/job_execution.rs

//! End-to-end jobs against a fake `ffmpeg` shell script.

use std::error::Error;
use std::sync::{Arc, Mutex};

use ffdrive::{FfdriveError, FfmpegJob, FfmpegProgress, Input, Output};
use tempfile::tempdir;
use test_utils::fake_child::install_fake_ffmpeg;
use test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn happy_path_runs_the_fake_ffmpeg() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let argv_file = dir.path().join("argv.txt");
    install_fake_ffmpeg(
        dir.path(),
        &format!(
            "printf '%s\\n' \"$@\" > {}\necho 'video:1024kB audio:128kB'\nexit 0",
            argv_file.display()
        ),
    );

    let result = with_timeout(
        FfmpegJob::at_path(dir.path())
            .input(Input::from_url("a.mp4"))
            .overwrite(true)
            .output(Output::to_url("b.mp4"))
            .execute(),
    )
    .await?;

    assert_eq!(result.video_kb, 1024);
    assert_eq!(result.audio_kb, 128);

    let received: Vec<String> = std::fs::read_to_string(&argv_file)?
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(received, ["-i", "a.mp4", "-y", "b.mp4"]);
    Ok(())
}

#[tokio::test]
async fn progress_events_are_delivered_before_the_tally() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    install_fake_ffmpeg(
        dir.path(),
        "echo 'frame=10 fps=25 out_time_us=400000'\necho 'video:10kB audio:0kB'\nexit 0",
    );

    let events: Arc<Mutex<Vec<FfmpegProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let result = with_timeout(
        FfmpegJob::at_path(dir.path())
            .input(Input::from_url("a.mp4"))
            .overwrite(true)
            .output(Output::to_url("b.mp4"))
            .on_progress(move |p| sink.lock().unwrap().push(p))
            .execute(),
    )
    .await?;

    assert_eq!(result.video_kb, 10);
    assert_eq!(result.audio_kb, 0);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].frame, Some(10));
    assert_eq!(events[0].fps, Some(25.0));
    assert_eq!(events[0].out_time_us, Some(400000));
    Ok(())
}

#[tokio::test]
async fn silent_failure_maps_to_non_zero_exit() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    install_fake_ffmpeg(dir.path(), "exit 2");

    let outcome = with_timeout(
        FfmpegJob::at_path(dir.path())
            .input(Input::from_url("a.mp4"))
            .overwrite(true)
            .output(Output::to_url("b.mp4"))
            .execute(),
    )
    .await;

    match outcome {
        Err(FfdriveError::NonZeroExit(2)) => Ok(()),
        other => panic!("expected NonZeroExit(2), got {other:?}"),
    }
}

#[tokio::test]
async fn noisy_stderr_does_not_wedge_the_child() -> TestResult {
    init_tracing();

    // Far more stderr output than a pipe buffer holds; the default
    // gobbler has to keep draining it.
    let dir = tempdir()?;
    install_fake_ffmpeg(
        dir.path(),
        "head -c 200000 /dev/zero >&2\necho 'video:1kB audio:0kB'\nexit 0",
    );

    let result = with_timeout(
        FfmpegJob::at_path(dir.path())
            .input(Input::from_url("a.mp4"))
            .overwrite(true)
            .output(Output::to_url("b.mp4"))
            .execute(),
    )
    .await?;

    assert_eq!(result.video_kb, 1);
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_an_io_error() {
    init_tracing();

    let outcome = with_timeout(
        FfmpegJob::new("/nonexistent/ffmpeg")
            .input(Input::from_url("a.mp4"))
            .overwrite(true)
            .output(Output::to_url("b.mp4"))
            .execute(),
    )
    .await;

    match outcome {
        Err(FfdriveError::Io(_)) => {}
        other => panic!("expected Io error, got {other:?}"),
    }
}
