// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::{path::PathBuf, process::Stdio};

pub const TEST_VIDEO_FPS: u64 = 25;
pub const TEST_VIDEO_LENGTH_SEC: u64 = 10;
pub const TEST_VIDEO_FRAMES: u64 = TEST_VIDEO_FPS * TEST_VIDEO_LENGTH_SEC;

/// Returns cargo's tmpdir
pub fn cargo_tmpdir() -> PathBuf {
    PathBuf::from(option_env!("CARGO_TARGET_TMPDIR").expect("no cargo tmpdir???"))
}

/// A 10 second, 25 fps test pattern, created with the ffmpeg binary once per test run
pub fn create_test_video() -> PathBuf {
    let tmpvideo = cargo_tmpdir().join("keyframes-testvideo.mkv");

    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::fs::remove_file(&tmpvideo).ok();
        let status = std::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                &format!("testsrc=duration={TEST_VIDEO_LENGTH_SEC}:rate={TEST_VIDEO_FPS}"),
                tmpvideo.as_os_str().to_str().expect("no probs, probably"),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .status()
            .expect("failed to execute ffmpeg");
        assert!(status.success(), "ffmpeg failed to create the test video");
    });

    tmpvideo
}

pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            p.file_name()
                .expect("has a name")
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}
