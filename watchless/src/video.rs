//! Video identifiers from watch URLs and embed frame sources.

use std::sync::LazyLock;

use regex::Regex;

/// Marker an embed frame's `src` must contain to be replaced by a player.
pub const EMBED_MARKER: &str = "youtube.com/embed";

const VIDEO_ID_LEN: usize = 11;

static WATCH_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("watch url regex")
});

/// Extract the video id from a watch, share or embed URL.
///
/// Only ids of exactly eleven characters are accepted.
pub fn video_id_from_url(url: &str) -> Option<&str> {
    let id = WATCH_URL_REGEX.captures(url)?.get(2)?.as_str();
    (id.len() == VIDEO_ID_LEN).then_some(id)
}

/// Extract the video id from an embed frame source.
///
/// Returns `None` when the source does not reference the embed path or the
/// last path segment is empty.
pub fn embed_video_id(src: &str) -> Option<&str> {
    if !src.contains(EMBED_MARKER) {
        return None;
    }
    let last = src.rsplit('/').next()?;
    let id = last.split('?').next()?;
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_url_forms() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ?start=10",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ#t=5",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
        ] {
            assert_eq!(video_id_from_url(url), Some("dQw4w9WgXcQ"), "{url}");
        }
    }

    #[test]
    fn watch_url_rejects_wrong_length_ids() {
        assert_eq!(video_id_from_url("https://youtu.be/short"), None);
        assert_eq!(video_id_from_url("https://example.com/page"), None);
    }

    #[test]
    fn embed_source_takes_last_segment_before_query() {
        assert_eq!(
            embed_video_id("https://www.youtube.com/embed/abc123?si=xyz&start=4"),
            Some("abc123")
        );
        assert_eq!(embed_video_id("https://www.youtube.com/embed/abc123"), Some("abc123"));
    }

    #[test]
    fn non_embed_sources_are_ignored() {
        assert_eq!(embed_video_id("https://player.vimeo.com/video/42"), None);
        assert_eq!(embed_video_id("https://www.youtube.com/watch?v=abc"), None);
        assert_eq!(embed_video_id("https://www.youtube.com/embed/"), None);
    }
}
