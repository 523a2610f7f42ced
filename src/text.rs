use std::path::Path;

use crate::error::{ReelError, ReelResult};
use crate::style::Theme;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color carried through Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Common system font files probed when the theme names no font.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/gnu-free/FreeSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

struct LoadedFont {
    family: String,
    data: vello_cpu::peniko::FontData,
}

/// Stateful helper for shaping single-line chart text with Parley.
///
/// The font is registered once at construction. An engine without a usable
/// font still works: `layout_line` answers `None` and the renderer skips
/// text, so headless environments keep rendering geometry.
pub(crate) struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    font: Option<LoadedFont>,
    warned_missing: bool,
}

impl std::fmt::Debug for TextEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEngine")
            .field("has_font", &self.font.is_some())
            .finish_non_exhaustive()
    }
}

impl TextEngine {
    /// Build an engine from explicit font bytes, or without any font.
    pub(crate) fn new(font_bytes: Option<Vec<u8>>) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let font = match font_bytes {
            Some(bytes) => Some(register_font(&mut font_ctx, bytes)?),
            None => None,
        };
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            font,
            warned_missing: false,
        })
    }

    /// Resolve the theme's font and build an engine for it.
    ///
    /// An explicit theme font that cannot be read is an input error; absent
    /// that, the candidate list is probed and a total miss degrades to a
    /// fontless engine.
    pub(crate) fn from_theme(theme: &Theme) -> ReelResult<Self> {
        let bytes = match &theme.font {
            Some(path) => Some(std::fs::read(path).map_err(|e| {
                ReelError::input(format!("cannot read font {}: {e}", path.display()))
            })?),
            None => probe_font_candidates(),
        };
        Self::new(bytes)
    }

    pub(crate) fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Font handle for glyph drawing. `Some` whenever `has_font`.
    pub(crate) fn font_data(&self) -> Option<&vello_cpu::peniko::FontData> {
        self.font.as_ref().map(|f| &f.data)
    }

    /// Shape one line of text at its natural width.
    ///
    /// Answers `Ok(None)` when no font is available (warned once) or the
    /// text is empty.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> ReelResult<Option<parley::Layout<TextBrushRgba8>>> {
        if text.is_empty() {
            return Ok(None);
        }
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::render("text size_px must be finite and > 0"));
        }
        let Some(font) = &self.font else {
            if !self.warned_missing {
                tracing::warn!("no usable font found; chart text will be skipped");
                self.warned_missing = true;
            }
            return Ok(None);
        };
        let family = font.family.clone();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(Some(layout))
    }
}

fn register_font(font_ctx: &mut parley::FontContext, bytes: Vec<u8>) -> ReelResult<LoadedFont> {
    let families = font_ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
    let family_id = families
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(|| ReelError::input("no font families registered from font bytes"))?;
    let family = font_ctx
        .collection
        .family_name(family_id)
        .ok_or_else(|| ReelError::input("registered font family has no name"))?
        .to_string();

    let data = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
    Ok(LoadedFont { family, data })
}

fn probe_font_candidates() -> Option<Vec<u8>> {
    for candidate in FONT_CANDIDATES {
        let path = Path::new(candidate);
        if let Ok(bytes) = std::fs::read(path) {
            tracing::debug!(font = %path.display(), "using probed system font");
            return Some(bytes);
        }
    }
    None
}
