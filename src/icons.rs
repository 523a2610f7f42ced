use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ReelError, ReelResult};

/// A decoded icon ready to be used as a fill paint.
#[derive(Clone, Debug)]
pub(crate) struct IconPaint {
    pub(crate) paint: vello_cpu::Image,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// Optional per-entity icon images, keyed by entity label.
///
/// Icons are decoded once at load time and shared across renderers; a label
/// without an icon is normal and looked up silently. The default set is
/// empty, which renders every bar without an icon.
#[derive(Clone, Debug, Default)]
pub struct IconSet {
    icons: HashMap<String, IconPaint>,
}

impl IconSet {
    /// An icon set with no icons.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.png` file in `dir`, keyed by file stem.
    ///
    /// `china.png` becomes the icon for the label `china`. Files that fail
    /// to decode are skipped with a warning; an unreadable directory is an
    /// input error.
    pub fn load_dir(dir: impl AsRef<Path>) -> ReelResult<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ReelError::input(format!("cannot read icon directory {}: {e}", dir.display()))
        })?;

        let mut icons = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ReelError::input(format!("cannot read icon directory {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            let is_png = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if !is_png {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let bytes = match std::fs::read(&path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(icon = %path.display(), "skipping unreadable icon: {e}");
                    continue;
                }
            };
            match decode_icon(&bytes) {
                Ok(icon) => {
                    icons.insert(stem.to_owned(), icon);
                }
                Err(e) => {
                    tracing::warn!(icon = %path.display(), "skipping undecodable icon: {e}");
                }
            }
        }

        tracing::info!(dir = %dir.display(), icons = icons.len(), "icon set loaded");
        Ok(Self { icons })
    }

    /// The icon for `label`, if one was loaded. A miss is not an error.
    pub(crate) fn get(&self, label: &str) -> Option<&IconPaint> {
        self.icons.get(label)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

/// Decode encoded image bytes into a premultiplied pixmap paint.
fn decode_icon(bytes: &[u8]) -> ReelResult<IconPaint> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ReelError::input(format!("decode icon image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut premul);

    let pixmap = pixmap_from_premul_bytes(&premul, width, height)?;
    Ok(IconPaint {
        paint: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
        width,
        height,
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}
