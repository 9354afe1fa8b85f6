// src/ffmpeg/result.rs

//! The final result tally ffmpeg prints when a job completes.

use std::sync::OnceLock;

use regex::Regex;

/// The stream-size tally from ffmpeg's closing report line, e.g.
///
/// ```text
/// video:1024kB audio:128kB subtitle:0kB other streams:0kB global headers:0kB muxing overhead: 0.521311%
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegResult {
    pub video_kb: u64,
    pub audio_kb: u64,
    pub subtitle_kb: Option<u64>,
    pub other_streams_kb: Option<u64>,
    pub global_headers_kb: Option<u64>,
    pub muxing_overhead_percent: Option<f64>,
}

fn tally_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            video:\s*(\d+)\s*[kK]i?B\s+
            audio:\s*(\d+)\s*[kK]i?B
            (?:\s+subtitle:\s*(\d+)\s*[kK]i?B)?
            (?:\s+other\ streams:\s*(\d+)\s*[kK]i?B)?
            (?:\s+global\ headers:\s*(\d+)\s*[kK]i?B)?
            (?:\s+muxing\ overhead:\s*([0-9.]+)\s*%)?
            ",
        )
        .expect("tally pattern is a valid regex")
    })
}

impl FfmpegResult {
    /// Parse a line as the final tally, or `None` if it is not one.
    pub fn from_line(line: &str) -> Option<Self> {
        let caps = tally_re().captures(line)?;
        Some(Self {
            video_kb: caps.get(1)?.as_str().parse().ok()?,
            audio_kb: caps.get(2)?.as_str().parse().ok()?,
            subtitle_kb: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            other_streams_kb: caps.get(4).and_then(|m| m.as_str().parse().ok()),
            global_headers_kb: caps.get(5).and_then(|m| m.as_str().parse().ok()),
            muxing_overhead_percent: caps.get(6).and_then(|m| m.as_str().parse().ok()),
        })
    }
}
