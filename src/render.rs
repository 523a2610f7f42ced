use crate::chart::{self, ChartLayout};
use crate::core::{FrameRgba, Rgba8};
use crate::data::{RaceEntry, TimePoint};
use crate::error::{ReelError, ReelResult};
use crate::icons::IconSet;
use crate::palette::Palette;
use crate::style::{self, Theme};
use crate::text::{TextBrushRgba8, TextEngine};

/// Horizontal padding between a bar's leading edge and its value label.
const VALUE_PAD: f64 = 6.0;
/// Horizontal padding between the entity label and the plot edge.
const LABEL_PAD: f64 = 8.0;
const SPINE_THICKNESS: f64 = 1.5;
const GRID_THICKNESS: f64 = 1.0;

/// Draws one bar chart frame per call.
///
/// The rendering context is reused across frames (cleared, not recreated),
/// so a renderer is cheap to call per time value but must not be shared
/// between concurrent paths; each path builds its own.
#[derive(Debug)]
pub struct FrameRenderer {
    theme: Theme,
    title_base: String,
    layout: ChartLayout,
    palette: Palette,
    icons: IconSet,
    text: TextEngine,
    ctx: Option<vello_cpu::RenderContext>,
}

impl FrameRenderer {
    pub fn new(
        theme: Theme,
        title_base: impl Into<String>,
        palette_seed: u64,
        icons: IconSet,
    ) -> ReelResult<Self> {
        theme.validate()?;
        if u16::try_from(theme.canvas.width).is_err() || u16::try_from(theme.canvas.height).is_err()
        {
            return Err(ReelError::render("canvas dimensions exceed u16"));
        }
        let text = TextEngine::from_theme(&theme)?;
        let layout = ChartLayout::new(&theme);
        Ok(Self {
            theme,
            title_base: title_base.into(),
            layout,
            palette: Palette::with_seed(palette_seed),
            icons,
            text,
            ctx: None,
        })
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Render one frame for `time` from an already ranked selection.
    ///
    /// `entries` must be in display order, largest value first; an empty
    /// selection yields a styled frame with no bars.
    pub fn render_frame(
        &mut self,
        time: &TimePoint,
        entries: &[RaceEntry],
    ) -> ReelResult<FrameRgba> {
        let width = self.theme.canvas.width as u16;
        let height = self.theme.canvas.height as u16;

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();

        self.draw(&mut ctx, time, entries)?;

        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);
        Ok(FrameRgba {
            width: u32::from(width),
            height: u32::from(height),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        time: &TimePoint,
        entries: &[RaceEntry],
    ) -> ReelResult<()> {
        let theme = self.theme.clone();
        let plot = self.layout.plot;

        // Background.
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        set_solid_paint(ctx, theme.background);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(theme.canvas.width),
            f64::from(theme.canvas.height),
        ));

        let max = entries.iter().map(|e| e.value).fold(0.0_f64, f64::max);

        // Value grid and tick labels before the bars so bars paint over it.
        if theme.grid {
            let ticks = chart::nice_ticks(max, theme.grid_divisions);
            let step = ticks.get(1).copied().unwrap_or(1.0);
            for &tick in &ticks {
                let x = self.layout.value_x(tick, max);
                set_solid_paint(ctx, theme.grid_color);
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    x - GRID_THICKNESS / 2.0,
                    plot.y0,
                    x + GRID_THICKNESS / 2.0,
                    plot.y1,
                ));
                self.draw_text(
                    ctx,
                    &chart::format_tick(tick, step),
                    theme.tick_size,
                    theme.tick_color,
                    TextAnchor::Center,
                    x,
                    plot.y1 + 6.0,
                )?;
            }
        }

        // Single bottom spine; top/right/left stay borderless.
        set_solid_paint(ctx, theme.spine_color);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            plot.x0,
            plot.y1 - SPINE_THICKNESS,
            plot.x1,
            plot.y1,
        ));

        let slots = self.layout.bar_slots(entries.len(), theme.bar_gap_frac);
        for (entry, slot) in entries.iter().zip(&slots) {
            let color = self.palette.color_for(&entry.label);
            let bar_end = self.layout.value_x(entry.value, max);

            set_solid_paint(ctx, color);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                plot.x0, slot.y0, bar_end, slot.y1,
            ));

            self.draw_text(
                ctx,
                &entry.label,
                theme.label_size,
                theme.label_color,
                TextAnchor::Right,
                plot.x0 - LABEL_PAD,
                slot.center_y(),
            )?;

            // Icon at the bar's leading edge, value label after it.
            let mut cursor = bar_end + VALUE_PAD;
            if let Some(icon) = self.icons.get(&entry.label).cloned() {
                let size = slot.height();
                let scale = size / f64::from(icon.height.max(1));
                ctx.set_transform(
                    vello_cpu::kurbo::Affine::translate((cursor, slot.y0))
                        * vello_cpu::kurbo::Affine::scale(scale),
                );
                ctx.set_paint(icon.paint.clone());
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(icon.width),
                    f64::from(icon.height),
                ));
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                cursor += f64::from(icon.width) * scale + VALUE_PAD;
            } else {
                tracing::trace!(label = %entry.label, "no icon for label");
            }

            self.draw_text(
                ctx,
                &style::format_value(entry.value),
                theme.label_size,
                theme.value_color,
                TextAnchor::Left,
                cursor,
                slot.center_y(),
            )?;
        }

        // Time annotation inside the plot, near the bottom-right.
        self.draw_text(
            ctx,
            &time.to_string(),
            theme.time_size,
            theme.time_color,
            TextAnchor::Center,
            plot.x0 + plot.width() * theme.time_x_frac,
            plot.y1 - plot.height() * theme.time_y_frac - f64::from(theme.time_size),
        )?;

        let title = style::format_title(&self.title_base, time);
        self.draw_text(
            ctx,
            &title,
            theme.title_size,
            theme.title_color,
            TextAnchor::Center,
            plot.x0 + plot.width() / 2.0,
            theme.margin_top / 2.0 - f64::from(theme.title_size) / 2.0,
        )?;

        Ok(())
    }

    /// Lay out and fill one line of text anchored at `(x, y)`.
    ///
    /// `y` is the vertical center for `Left`/`Right` anchors and the top for
    /// `Center`. A fontless engine makes this a no-op.
    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        content: &str,
        size: f32,
        color: Rgba8,
        anchor: TextAnchor,
        x: f64,
        y: f64,
    ) -> ReelResult<()> {
        let brush = TextBrushRgba8 {
            r: color.r,
            g: color.g,
            b: color.b,
            a: color.a,
        };
        let Some(layout) = self.text.layout_line(content, size, brush)? else {
            return Ok(());
        };
        let Some(font) = self.text.font_data() else {
            return Ok(());
        };

        let (w, h) = (f64::from(layout.width()), f64::from(layout.height()));
        let origin_x = match anchor {
            TextAnchor::Left => x,
            TextAnchor::Center => x - w / 2.0,
            TextAnchor::Right => x - w,
        };
        let origin_y = match anchor {
            TextAnchor::Center => y,
            TextAnchor::Left | TextAnchor::Right => y - h / 2.0,
        };

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((origin_x, origin_y)));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let b = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum TextAnchor {
    Left,
    Center,
    Right,
}

fn set_solid_paint(ctx: &mut vello_cpu::RenderContext, color: Rgba8) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Canvas;

    fn small_theme() -> Theme {
        Theme {
            canvas: Canvas {
                width: 160,
                height: 90,
            },
            ..Default::default()
        }
    }

    fn entries(values: &[(&str, f64)]) -> Vec<RaceEntry> {
        values
            .iter()
            .map(|&(label, value)| RaceEntry {
                label: label.to_owned(),
                value,
            })
            .collect()
    }

    #[test]
    fn renders_expected_byte_len() {
        let mut r = FrameRenderer::new(small_theme(), "", 0, IconSet::new()).unwrap();
        let frame = r
            .render_frame(&TimePoint::Int(2000), &entries(&[("A", 2.0), ("B", 1.0)]))
            .unwrap();
        assert_eq!(frame.width, 160);
        assert_eq!(frame.height, 90);
        assert_eq!(frame.data.len(), FrameRgba::expected_len(160, 90));
        assert!(frame.premultiplied);
    }

    #[test]
    fn empty_selection_renders_background_only_frame() {
        let mut r = FrameRenderer::new(small_theme(), "", 0, IconSet::new()).unwrap();
        let frame = r.render_frame(&TimePoint::Int(1999), &[]).unwrap();
        assert_eq!(frame.data.len(), FrameRgba::expected_len(160, 90));
    }

    #[test]
    fn context_reuse_does_not_leak_between_frames() {
        let mut r = FrameRenderer::new(small_theme(), "", 0, IconSet::new()).unwrap();
        let rows = entries(&[("A", 5.0), ("B", 3.0)]);
        let first = r.render_frame(&TimePoint::Int(2000), &rows).unwrap();
        // A different frame in between must not change a re-render.
        r.render_frame(&TimePoint::Int(2001), &entries(&[("C", 9.0)]))
            .unwrap();
        let again = r.render_frame(&TimePoint::Int(2000), &rows).unwrap();
        assert_eq!(first.data, again.data);
    }

    #[test]
    fn bars_change_the_canvas() {
        let mut r = FrameRenderer::new(small_theme(), "", 0, IconSet::new()).unwrap();
        let empty = r.render_frame(&TimePoint::Int(2000), &[]).unwrap();
        let bars = r
            .render_frame(&TimePoint::Int(2000), &entries(&[("A", 4.0)]))
            .unwrap();
        assert_ne!(empty.data, bars.data);
    }

    #[test]
    fn oversized_canvas_is_render_error() {
        let theme = Theme {
            canvas: Canvas {
                width: 70_000,
                height: 90,
            },
            ..Default::default()
        };
        let err = FrameRenderer::new(theme, "", 0, IconSet::new()).unwrap_err();
        assert!(matches!(err, ReelError::Render(_)));
    }
}
