use std::path::PathBuf;

use crate::core::{Canvas, Rgba8};
use crate::data::TimePoint;
use crate::error::{ReelError, ReelResult};

/// Race-level configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// How many entries each frame keeps.
    pub top_n: usize,
    /// Preview pacing between frames, in milliseconds.
    pub frame_interval_ms: u64,
    /// Export frame rate (integer frames per second).
    pub export_fps: u32,
    /// Base title; the frame's time value is appended per frame.
    pub title: String,
    /// Palette seed. Changing it re-shuffles label colors deterministically.
    pub palette_seed: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            frame_interval_ms: 200,
            export_fps: 5,
            title: String::new(),
            palette_seed: 0,
        }
    }
}

impl RaceConfig {
    pub fn validate(&self) -> ReelResult<()> {
        if self.top_n == 0 {
            return Err(ReelError::input("top_n must be >= 1"));
        }
        if self.export_fps == 0 {
            return Err(ReelError::input("export_fps must be >= 1"));
        }
        Ok(())
    }
}

/// Explicit chart style. Never ambient: every renderer is built from one.
///
/// The defaults reproduce a despined whitegrid look: no top/right/left
/// border, a single bottom spine, no tick marks, a light vertical value
/// grid, and the frame's time value drawn inside the plot near the
/// bottom-right corner.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Theme {
    pub canvas: Canvas,
    pub background: Rgba8,

    /// Fraction of the canvas width reserved for entity labels.
    pub label_column_frac: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    /// Gap between bar slots as a fraction of the slot height.
    pub bar_gap_frac: f64,

    pub grid: bool,
    pub grid_divisions: usize,

    pub spine_color: Rgba8,
    pub grid_color: Rgba8,
    pub title_color: Rgba8,
    pub label_color: Rgba8,
    pub value_color: Rgba8,
    pub tick_color: Rgba8,
    pub time_color: Rgba8,

    pub title_size: f32,
    pub label_size: f32,
    pub tick_size: f32,
    pub time_size: f32,

    /// Horizontal anchor of the time annotation, as a fraction of the plot
    /// width (text is centered on it).
    pub time_x_frac: f64,
    /// Vertical anchor, as a fraction of the plot height above its bottom.
    pub time_y_frac: f64,

    /// Font file to rasterize text with. When unset, a list of common
    /// system font files is probed; if none resolves, text is skipped.
    pub font: Option<PathBuf>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 1200,
                height: 600,
            },
            background: Rgba8::rgb(255, 255, 255),
            label_column_frac: 0.18,
            margin_top: 60.0,
            margin_right: 90.0,
            margin_bottom: 40.0,
            bar_gap_frac: 0.25,
            grid: true,
            grid_divisions: 5,
            spine_color: Rgba8::rgb(40, 40, 40),
            grid_color: Rgba8::rgb(210, 210, 210),
            title_color: Rgba8::rgb(32, 32, 32),
            label_color: Rgba8::rgb(32, 32, 32),
            value_color: Rgba8::rgb(0, 0, 0),
            tick_color: Rgba8::rgb(120, 120, 120),
            time_color: Rgba8::rgb(0x0B, 0x01, 0x01),
            title_size: 28.0,
            label_size: 16.0,
            tick_size: 12.0,
            time_size: 21.0,
            time_x_frac: 0.9,
            time_y_frac: 0.05,
            font: None,
        }
    }
}

impl Theme {
    pub fn validate(&self) -> ReelResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ReelError::input("canvas dimensions must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.label_column_frac) {
            return Err(ReelError::input("label_column_frac must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.bar_gap_frac) {
            return Err(ReelError::input("bar_gap_frac must be in [0, 1)"));
        }
        Ok(())
    }
}

/// A bar's value label, always two decimals.
pub fn format_value(value: f64) -> String {
    format!("{value:.2}")
}

/// Per-frame chart title. An empty base title yields the time value alone.
pub fn format_title(base: &str, time: &TimePoint) -> String {
    if base.is_empty() {
        time.to_string()
    } else {
        format!("{base} - {time}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_contract() {
        let cfg = RaceConfig::default();
        assert_eq!(cfg.top_n, 10);
        assert_eq!(cfg.frame_interval_ms, 200);
        assert_eq!(cfg.export_fps, 5);
        assert_eq!(cfg.title, "");
    }

    #[test]
    fn config_validation_rejects_zeros() {
        let mut cfg = RaceConfig {
            top_n: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        cfg.top_n = 10;
        cfg.export_fps = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn theme_deserializes_from_partial_json() {
        let theme: Theme = serde_json::from_value(serde_json::json!({
            "canvas": {"width": 640, "height": 360},
            "time_color": "#0B0101"
        }))
        .unwrap();
        assert_eq!(theme.canvas.width, 640);
        assert_eq!(theme.time_color, Rgba8::rgb(0x0B, 0x01, 0x01));
        assert_eq!(theme.title_size, Theme::default().title_size);
    }

    #[test]
    fn theme_validation_rejects_degenerate_geometry() {
        let mut theme = Theme {
            canvas: Canvas {
                width: 0,
                height: 600,
            },
            ..Default::default()
        };
        assert!(theme.validate().is_err());
        theme.canvas.width = 1200;
        theme.label_column_frac = 1.0;
        assert!(theme.validate().is_err());
    }

    #[test]
    fn value_labels_have_two_decimals() {
        assert_eq!(format_value(1200.5), "1200.50");
        assert_eq!(format_value(0.0), "0.00");
        assert_eq!(format_value(3.14159), "3.14");
        assert_eq!(format_value(-2.5), "-2.50");
    }

    #[test]
    fn title_combines_base_and_time() {
        assert_eq!(
            format_title("Top 10 Populations", &TimePoint::Int(2000)),
            "Top 10 Populations - 2000"
        );
        assert_eq!(format_title("", &TimePoint::Int(2000)), "2000");
    }
}
