//! Media classification by file extension

use serde::{Deserialize, Serialize};
use std::path::Path;

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "mpc", "m4p", "m4a", "aac", "ogg", "oga", "wav", "aif", "aiff", "rm", "wma", "asf",
    "flac", "opus", "spx", "ra", "ape", "shn", "wv",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mpg", "mpeg", "flv", "m4v", "mp4", "webm", "mkv", "wmv", "ogv", "mov", "divx", "m2ts",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Unsupported,
}

/// Classify a file name by its extension, case-insensitively.
pub fn classify(file_name: &str) -> MediaKind {
    let extension = match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return MediaKind::Unsupported,
    };

    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Audio
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("song1.mp3"), MediaKind::Audio);
        assert_eq!(classify("song2.FLAC"), MediaKind::Audio);
        assert_eq!(classify("clip.mkv"), MediaKind::Video);
        assert_eq!(classify("cover.jpg"), MediaKind::Unsupported);
        assert_eq!(classify("README"), MediaKind::Unsupported);
        assert_eq!(classify(".mp3"), MediaKind::Unsupported);
    }
}
