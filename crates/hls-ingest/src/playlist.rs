//! M3U8 parsing: classify master vs media, extract variants/segments, resolve relative URLs.

use m3u8_rs::Playlist as M3u8Playlist;
use url::Url;

/// One renditions of an HLS stream at a given bitrate/resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub url: String,
    pub bandwidth: u64,
    pub codecs: Option<String>,
    pub width: Option<u64>,
    pub height: Option<u64>,
}

/// A playlist that lists renditions rather than segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterPlaylist {
    pub variants: Vec<Variant>,
}

/// One segment line of a media playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEntry {
    pub url: String,
    pub duration: f32,
    pub discontinuity_before: bool,
}

/// A playlist that lists segments directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaPlaylist {
    pub segments: Vec<SegmentEntry>,
    pub has_endlist: bool,
    pub media_sequence: u64,
}

/// Either shape a fetched M3U8 body can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPlaylist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

/// Non-fatal problem encountered while parsing; the caller decides whether to proceed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub message: String,
}

/// Best-effort parse result: a playlist (possibly with some variants/segments dropped) plus
/// any diagnostics produced along the way. Parsing a playlist never fails outright.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub playlist: ParsedPlaylist,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parse `body` (the raw playlist bytes) fetched from `base_url`, resolving every segment
/// and variant URI against it.
pub fn parse(body: &[u8], base_url: &str) -> ParseOutcome {
    let mut diagnostics = Vec::new();

    let parsed = match m3u8_rs::parse_playlist(body) {
        Ok((_, playlist)) => playlist,
        Err(e) => {
            return ParseOutcome {
                playlist: ParsedPlaylist::Media(MediaPlaylist::default()),
                diagnostics: vec![ParseDiagnostic {
                    message: format!("failed to parse playlist: {e}"),
                }],
            };
        }
    };

    match parsed {
        M3u8Playlist::MasterPlaylist(master) => {
            let mut variants = Vec::with_capacity(master.variants.len());
            for v in master.variants {
                if v.bandwidth == 0 {
                    diagnostics.push(ParseDiagnostic {
                        message: format!("variant '{}' missing BANDWIDTH, dropped", v.uri),
                    });
                    continue;
                }
                variants.push(Variant {
                    url: resolve_url(base_url, &v.uri),
                    bandwidth: v.bandwidth,
                    codecs: v.codecs,
                    width: v.resolution.map(|r| r.width),
                    height: v.resolution.map(|r| r.height),
                });
            }
            ParseOutcome {
                playlist: ParsedPlaylist::Master(MasterPlaylist { variants }),
                diagnostics,
            }
        }
        M3u8Playlist::MediaPlaylist(media) => {
            let segments = media
                .segments
                .iter()
                .map(|s| SegmentEntry {
                    url: resolve_url(base_url, &s.uri),
                    duration: s.duration,
                    discontinuity_before: s.discontinuity,
                })
                .collect();
            ParseOutcome {
                playlist: ParsedPlaylist::Media(MediaPlaylist {
                    segments,
                    has_endlist: media.end_list,
                    media_sequence: media.media_sequence,
                }),
                diagnostics,
            }
        }
    }
}

/// Resolve `relative` against `base`.
///
/// Absolute URIs pass through unchanged; a leading `/` keeps only `base`'s scheme and
/// authority; everything else is resolved against `base`'s directory, collapsing `.`/`..`.
/// Idempotent when `relative` is already absolute.
pub fn resolve_url(base: &str, relative: &str) -> String {
    if let Ok(url) = Url::parse(relative) {
        return url.to_string();
    }
    match Url::parse(base) {
        Ok(base_url) => match base_url.join(relative) {
            Ok(joined) => joined.to_string(),
            Err(_) => relative.to_string(),
        },
        Err(_) => relative.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=500000,CODECS=\"avc1.42001e\"\nlow/index.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=5000000,CODECS=\"avc1.640029\",RESOLUTION=1920x1080\nhigh/index.m3u8\n";

    const MEDIA: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:42\n#EXTINF:6.0,\nseg42.ts\n#EXT-X-DISCONTINUITY\n#EXTINF:6.0,\nseg43.ts\n";

    #[test]
    fn classifies_master_playlist() {
        let outcome = parse(MASTER.as_bytes(), "http://host/stream/index.m3u8");
        match outcome.playlist {
            ParsedPlaylist::Master(m) => {
                assert_eq!(m.variants.len(), 2);
                assert_eq!(m.variants[1].bandwidth, 5_000_000);
                assert_eq!(m.variants[1].url, "http://host/stream/high/index.m3u8");
            }
            _ => panic!("expected master"),
        }
    }

    #[test]
    fn classifies_media_playlist_and_flags_discontinuity() {
        let outcome = parse(MEDIA.as_bytes(), "http://host/stream/index.m3u8");
        match outcome.playlist {
            ParsedPlaylist::Media(m) => {
                assert_eq!(m.media_sequence, 42);
                assert_eq!(m.segments.len(), 2);
                assert!(!m.segments[0].discontinuity_before);
                assert!(m.segments[1].discontinuity_before);
                assert_eq!(m.segments[0].url, "http://host/stream/seg42.ts");
            }
            _ => panic!("expected media"),
        }
    }

    #[test]
    fn resolve_url_is_idempotent_on_absolute() {
        let absolute = "http://example.com/a/b.ts";
        assert_eq!(resolve_url("http://other/x.m3u8", absolute), absolute);
    }

    #[test]
    fn resolve_url_collapses_relative_segments() {
        let resolved = resolve_url("http://host/live/chan/index.m3u8", "../alt/seg.ts");
        assert_eq!(resolved, "http://host/live/alt/seg.ts");
    }
}
