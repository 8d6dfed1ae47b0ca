//! Media-segment detection in live playlists.

/// Returns true if the playlist body references at least one media segment.
///
/// A URI line (non-empty, not starting with `#`) or an `#EXTINF` tag
/// counts as a segment reference. This is deliberately a heuristic, not a
/// full playlist parser; a manifest that omits segment text while still
/// being live classifies as UNKNOWN, never as ENDED.
pub fn has_segment_references(body: &str) -> bool {
    body.lines().map(str::trim).any(|line| {
        !line.is_empty() && (!line.starts_with('#') || line.starts_with("#EXTINF"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_with_segments() {
        let body = "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:4.0,\nseg-001.ts\n#EXTINF:4.0,\nseg-002.ts\n";
        assert!(has_segment_references(body));
    }

    #[test]
    fn test_playlist_without_segments() {
        let body = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-ENDLIST\n";
        assert!(!has_segment_references(body));
    }

    #[test]
    fn test_empty_body() {
        assert!(!has_segment_references(""));
        assert!(!has_segment_references("\n\n"));
    }

    #[test]
    fn test_extinf_without_uri_still_counts() {
        assert!(has_segment_references("#EXTM3U\n#EXTINF:4.0,\n"));
    }
}
