// src/ffmpeg/progress.rs

//! Progress events parsed from the child's report lines.

/// A progress report, parsed from a line of whitespace-separated
/// `key=value` tokens (the format of `-progress` output and of ffmpeg's
/// periodic status lines).
///
/// Every field is optional; a line only needs one recognised key to count
/// as progress. Values ffmpeg prints as `N/A` are left unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    /// Output bitrate in kbit/s (the `kbits/s` unit suffix is stripped).
    pub bitrate_kbits: Option<f64>,
    pub total_size: Option<u64>,
    pub out_time_us: Option<u64>,
    pub dup_frames: Option<u64>,
    pub drop_frames: Option<u64>,
    /// Encoding speed relative to realtime (the `x` suffix is stripped).
    pub speed: Option<f64>,
}

impl FfmpegProgress {
    /// Parse a line as a progress event, or `None` if it is not one.
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut progress = Self::default();
        let mut recognised = false;
        for token in trimmed.split_whitespace() {
            // A single token that is not key=value disqualifies the line.
            let (key, value) = token.split_once('=')?;
            match key {
                "frame" => {
                    progress.frame = value.parse().ok();
                    recognised = true;
                }
                "fps" => {
                    progress.fps = value.parse().ok();
                    recognised = true;
                }
                "bitrate" => {
                    progress.bitrate_kbits =
                        value.strip_suffix("kbits/s").unwrap_or(value).parse().ok();
                    recognised = true;
                }
                "total_size" => {
                    progress.total_size = value.parse().ok();
                    recognised = true;
                }
                "out_time_us" => {
                    progress.out_time_us = value.parse().ok();
                    recognised = true;
                }
                "dup_frames" => {
                    progress.dup_frames = value.parse().ok();
                    recognised = true;
                }
                "drop_frames" => {
                    progress.drop_frames = value.parse().ok();
                    recognised = true;
                }
                "speed" => {
                    progress.speed = value.strip_suffix('x').unwrap_or(value).parse().ok();
                    recognised = true;
                }
                _ => {}
            }
        }

        recognised.then_some(progress)
    }
}
