//! Quality-tier to engine format-selection mapping.
//!
//! A request names a quality tier as a bare number: 0 selects audio-only
//! extraction, any other value is a vertical-resolution ceiling. The tier is
//! resolved here into the engine's format-selection expression plus the
//! post-processing switches that go with it.

/// Highest supported resolution ceiling (8K)
pub const QUALITY_CEILING: u32 = 4320;

/// MP3 bitrate used for audio-only extraction
pub const AUDIO_BITRATE: &str = "320K";

/// Audio extraction post-processing parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioPostProcess {
    /// Target codec passed to the engine (`--audio-format`)
    pub codec: &'static str,
    /// Target bitrate passed to the engine (`--audio-quality`)
    pub bitrate: &'static str,
}

/// Resolved engine format selection for one download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatSelection {
    /// Format-selection expression (`-f`)
    pub format: String,
    /// Container to merge separate streams into (`--merge-output-format`)
    pub merge_output_format: Option<&'static str>,
    /// Audio extraction settings; `Some` only for the audio tier
    pub audio: Option<AudioPostProcess>,
}

impl FormatSelection {
    /// True when this selection produces an audio artifact
    pub fn is_audio_only(&self) -> bool {
        self.audio.is_some()
    }
}

/// Resolve a requested tier: absent means "best available", and anything
/// above the ceiling clamps down to it. 0 passes through as the audio tier.
pub fn resolve_tier(requested: Option<u32>) -> u32 {
    match requested {
        None => QUALITY_CEILING,
        Some(h) => h.min(QUALITY_CEILING),
    }
}

/// Map a resolved tier to the engine's format selection.
///
/// Video tiers request an mp4-native pairing first and fall back through
/// progressively looser selections; the engine walks the `/`-separated
/// alternatives itself, so the degradation needs no logic here. The final
/// bare `best` means a request can exceed its ceiling rather than fail when
/// nothing at or below it exists.
pub fn select_format(tier: u32) -> FormatSelection {
    if tier == 0 {
        return FormatSelection {
            format: "bestaudio/best".to_string(),
            merge_output_format: None,
            audio: Some(AudioPostProcess {
                codec: "mp3",
                bitrate: AUDIO_BITRATE,
            }),
        };
    }

    FormatSelection {
        format: format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/bestvideo[height<={h}]+bestaudio/best[height<={h}]/best",
            h = tier
        ),
        merge_output_format: Some("mp4"),
        audio: None,
    }
}

/// Human-readable label for a resolution, as shown in quality listings
pub fn quality_label(height: u32) -> String {
    match height {
        0 => "Audio Only (MP3)".to_string(),
        h if h >= 2160 => format!("4K ({h}p)"),
        h if h >= 1440 => format!("2K ({h}p)"),
        h => format!("{h}p"),
    }
}
