//! Import configuration.

use std::time::Duration;

/// Default vertex color (ABGR) used when a mesh has no per-vertex colors.
pub const DEFAULT_VERTEX_COLOR: u32 = 0xbfff_ffff;

/// Alpha written to every palette entry of a semi-transparent material.
///
/// Kept at the historical value. It approximates the intended opacity and
/// should not be re-derived.
pub const SEMI_TRANSPARENT_ALPHA: u8 = 127;

/// Frame duration used for tracks that carry none.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(100);

/// Settings shared by the model, material and animation importers.
///
/// # Example
///
/// ```ignore
/// let settings = ImportSettings::default()
///     .with_loop_animations(false)
///     .with_frame_duration(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    /// Color written to vertices of meshes without color data.
    pub default_vertex_color: u32,
    /// Alpha for the fixed semi-transparency render mode.
    pub semi_transparent_alpha: u8,
    /// Frame duration for tracks without one.
    pub frame_duration: Duration,
    /// Whether evaluation wraps past the last frame (otherwise clamps).
    pub loop_animations: bool,
    /// Whether materials of invisible slots are loaded on export.
    pub export_invisible: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            default_vertex_color: DEFAULT_VERTEX_COLOR,
            semi_transparent_alpha: SEMI_TRANSPARENT_ALPHA,
            frame_duration: DEFAULT_FRAME_DURATION,
            loop_animations: true,
            export_invisible: false,
        }
    }
}

impl ImportSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default vertex color.
    #[must_use]
    pub fn with_default_vertex_color(mut self, color: u32) -> Self {
        self.default_vertex_color = color;
        self
    }

    /// Set the alpha used by the semi-transparent render mode.
    #[must_use]
    pub fn with_semi_transparent_alpha(mut self, alpha: u8) -> Self {
        self.semi_transparent_alpha = alpha;
        self
    }

    /// Set the fallback frame duration.
    #[must_use]
    pub fn with_frame_duration(mut self, duration: Duration) -> Self {
        self.frame_duration = duration;
        self
    }

    /// Enable or disable animation looping.
    #[must_use]
    pub fn with_loop_animations(mut self, enabled: bool) -> Self {
        self.loop_animations = enabled;
        self
    }

    /// Enable or disable exporting materials of invisible slots.
    #[must_use]
    pub fn with_export_invisible(mut self, enabled: bool) -> Self {
        self.export_invisible = enabled;
        self
    }
}
