//! Controllable stand-ins for the real ffmpeg binary.
//!
//! Tests drive the supervision machinery with `/bin/sh` one-liners
//! (`echo`, `exit`, `read`, `sleep`) instead of spawning real ffmpeg
//! processes.

use std::fs;
use std::path::{Path, PathBuf};

/// Shell used to fake child processes.
pub const SH: &str = "/bin/sh";

/// Argument vector that runs `script` under [`SH`].
pub fn sh_args(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

/// Write an executable fake `ffmpeg` into `dir` running `body` as a
/// shell script, and return its path.
///
/// `dir` can then be handed to `FfmpegJob::at_path`.
pub fn install_fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ffmpeg");
    let script = format!("#!/bin/sh\n{body}\n");
    fs::write(&path, script).expect("failed to write fake ffmpeg script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to mark fake ffmpeg executable");
    }

    path
}
