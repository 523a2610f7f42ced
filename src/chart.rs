use kurbo::Rect;

use crate::style::Theme;

/// Canvas regions of one chart frame.
///
/// Geometry only; painting happens in the renderer. The label column sits
/// left of the plot area, the title zone above it, the tick strip below.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ChartLayout {
    pub(crate) plot: Rect,
    pub(crate) label_column: Rect,
}

impl ChartLayout {
    pub(crate) fn new(theme: &Theme) -> Self {
        let w = f64::from(theme.canvas.width);
        let h = f64::from(theme.canvas.height);
        let label_w = w * theme.label_column_frac;
        let plot = Rect::new(
            label_w,
            theme.margin_top,
            (w - theme.margin_right).max(label_w),
            (h - theme.margin_bottom).max(theme.margin_top),
        );
        let label_column = Rect::new(0.0, plot.y0, label_w, plot.y1);
        Self { plot, label_column }
    }

    /// Bar rectangles for one frame, top slot first.
    ///
    /// The plot height is divided evenly among the frame's entries, the way
    /// a categorical bar chart spreads however many categories it has.
    pub(crate) fn bar_slots(&self, count: usize, gap_frac: f64) -> Vec<BarSlot> {
        if count == 0 {
            return Vec::new();
        }
        let slot_h = self.plot.height() / count as f64;
        let gap = slot_h * gap_frac / 2.0;
        (0..count)
            .map(|i| {
                let top = self.plot.y0 + slot_h * i as f64;
                BarSlot {
                    y0: top + gap,
                    y1: top + slot_h - gap,
                }
            })
            .collect()
    }

    /// X coordinate of `value` on the plot's value axis.
    pub(crate) fn value_x(&self, value: f64, max: f64) -> f64 {
        self.plot.x0 + self.plot.width() * scale_value(value, max)
    }
}

/// One bar's vertical extent. Horizontal extent comes from the value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BarSlot {
    pub(crate) y0: f64,
    pub(crate) y1: f64,
}

impl BarSlot {
    pub(crate) fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    pub(crate) fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Fraction of the plot width a value occupies, in `[0, 1]`.
pub(crate) fn scale_value(value: f64, max: f64) -> f64 {
    if max <= 0.0 || !max.is_finite() {
        return 0.0;
    }
    (value / max).clamp(0.0, 1.0)
}

/// Grid tick positions from zero up to `max`, at a "nice" step.
pub(crate) fn nice_ticks(max: f64, divisions: usize) -> Vec<f64> {
    if max <= 0.0 || !max.is_finite() || divisions == 0 {
        return Vec::new();
    }
    let step = nice_step(max / divisions as f64);
    if step <= 0.0 {
        return Vec::new();
    }
    let limit = max * (1.0 + 1e-9);
    (0..)
        .map(|i| i as f64 * step)
        .take_while(|tick| *tick <= limit)
        .collect()
}

/// Round a raw step up to 1, 2, or 5 times a power of ten.
fn nice_step(raw: f64) -> f64 {
    if raw <= 0.0 || !raw.is_finite() {
        return 0.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let mantissa = raw / magnitude;
    let nice = if mantissa <= 1.0 {
        1.0
    } else if mantissa <= 2.0 {
        2.0
    } else if mantissa <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick label text, with just enough decimals for the step size.
pub(crate) fn format_tick(value: f64, step: f64) -> String {
    if step >= 1.0 {
        format!("{value:.0}")
    } else {
        let decimals = (-step.log10()).ceil().max(1.0) as usize;
        format!("{value:.decimals$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ChartLayout {
        ChartLayout::new(&Theme::default())
    }

    #[test]
    fn plot_sits_inside_the_canvas() {
        let theme = Theme::default();
        let l = ChartLayout::new(&theme);
        assert!(l.plot.x0 > 0.0);
        assert!(l.plot.x1 < f64::from(theme.canvas.width));
        assert!(l.plot.y0 >= theme.margin_top);
        assert!(l.plot.y1 <= f64::from(theme.canvas.height) - theme.margin_bottom);
        assert_eq!(l.label_column.x1, l.plot.x0);
    }

    #[test]
    fn slots_partition_the_plot_height() {
        let l = layout();
        let slots = l.bar_slots(5, 0.25);
        assert_eq!(slots.len(), 5);
        assert!(slots[0].y0 >= l.plot.y0);
        assert!(slots[4].y1 <= l.plot.y1 + 1e-9);
        for pair in slots.windows(2) {
            assert!(pair[0].y1 < pair[1].y0);
        }
        let heights: Vec<f64> = slots.iter().map(BarSlot::height).collect();
        for h in &heights {
            assert!((h - heights[0]).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_entries_means_no_slots() {
        assert!(layout().bar_slots(0, 0.25).is_empty());
    }

    #[test]
    fn value_scaling_clamps_and_handles_degenerate_max() {
        assert_eq!(scale_value(5.0, 10.0), 0.5);
        assert_eq!(scale_value(20.0, 10.0), 1.0);
        assert_eq!(scale_value(-3.0, 10.0), 0.0);
        assert_eq!(scale_value(1.0, 0.0), 0.0);
        assert_eq!(scale_value(1.0, -4.0), 0.0);
    }

    #[test]
    fn ticks_use_nice_steps() {
        assert_eq!(nice_ticks(937.0, 5), vec![0.0, 200.0, 400.0, 600.0, 800.0]);
        assert_eq!(nice_ticks(9.2, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(nice_ticks(10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(nice_ticks(0.0, 5).is_empty());
        assert!(nice_ticks(-1.0, 5).is_empty());
    }

    #[test]
    fn small_ranges_get_fractional_ticks() {
        let ticks = nice_ticks(0.042, 5);
        assert_eq!(ticks.len(), 5);
        assert!((ticks[1] - 0.01).abs() < 1e-12);
        assert_eq!(format_tick(ticks[1], 0.01), "0.01");
    }

    #[test]
    fn tick_labels_match_step_precision() {
        assert_eq!(format_tick(200.0, 200.0), "200");
        assert_eq!(format_tick(0.5, 0.5), "0.5");
    }
}
