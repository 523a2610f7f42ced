use std::io::Write;

use crate::core::{FrameIndex, FrameRgba};
use crate::encode::SinkConfig;
use crate::error::{ReelError, ReelResult};

/// What the viewer wants after seeing a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayControl {
    /// Keep playing.
    Continue,
    /// Close the viewer; remaining frames are skipped.
    Stop,
}

/// Display-side sink: where preview frames go.
///
/// The driver calls `present` synchronously per frame and handles pacing
/// itself, so an implementation only draws. Whether that is a terminal, a
/// window owned by the embedding application, or nothing at all is not the
/// driver's concern.
pub trait DisplaySurface {
    /// Called once before the first frame.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Show one frame. Answering [`DisplayControl::Stop`] closes the viewer.
    fn present(
        &mut self,
        idx: FrameIndex,
        frame: &FrameRgba,
        time_label: &str,
    ) -> ReelResult<DisplayControl>;
    /// Called once after the last presented frame, on every exit path.
    fn end(&mut self) -> ReelResult<()>;
}

/// Headless surface that counts frames. Useful in tests and for running the
/// export path "with preview" when no one is watching.
#[derive(Debug, Default)]
pub struct NullDisplay {
    /// Frames presented so far.
    pub presented: u64,
    /// Answer `Stop` once this many frames were presented.
    pub stop_after: Option<u64>,
    /// Labels seen, in presentation order.
    pub labels: Vec<String>,
}

impl NullDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping_after(frames: u64) -> Self {
        Self {
            stop_after: Some(frames),
            ..Self::default()
        }
    }
}

impl DisplaySurface for NullDisplay {
    fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
        Ok(())
    }

    fn present(
        &mut self,
        _idx: FrameIndex,
        _frame: &FrameRgba,
        time_label: &str,
    ) -> ReelResult<DisplayControl> {
        self.presented += 1;
        self.labels.push(time_label.to_owned());
        match self.stop_after {
            Some(limit) if self.presented >= limit => Ok(DisplayControl::Stop),
            _ => Ok(DisplayControl::Continue),
        }
    }

    fn end(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

/// ANSI 24-bit terminal preview using half-block glyphs.
///
/// Each character cell carries two pixels: the upper half as foreground, the
/// lower as background, both picked by nearest-neighbor from the frame
/// (flattened over white, since frames arrive premultiplied). Good enough to
/// eyeball a race without a GUI.
pub struct TerminalDisplay<W: Write> {
    out: W,
    cols: u32,
    rows: u32,
    cfg: Option<SinkConfig>,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, cols: u32) -> Self {
        Self {
            out,
            cols: cols.max(8),
            rows: 0,
            cfg: None,
        }
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::render("terminal display needs non-zero frames"));
        }
        // Two pixels per text row; keep the frame's aspect ratio.
        let rows_px = (u64::from(self.cols) * u64::from(cfg.height) / u64::from(cfg.width)).max(2);
        self.rows = (rows_px / 2 * 2) as u32;
        self.cfg = Some(cfg);
        write!(self.out, "\x1b[2J")
            .map_err(|e| ReelError::render(format!("terminal write failed: {e}")))?;
        Ok(())
    }

    fn present(
        &mut self,
        _idx: FrameIndex,
        frame: &FrameRgba,
        time_label: &str,
    ) -> ReelResult<DisplayControl> {
        let Some(cfg) = self.cfg else {
            return Err(ReelError::render("terminal display not started"));
        };
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::render("terminal display frame size mismatch"));
        }

        let mut buf = String::with_capacity((self.cols as usize + 16) * self.rows as usize);
        buf.push_str("\x1b[H");
        for row_pair in (0..self.rows).step_by(2) {
            for col in 0..self.cols {
                let (tr, tg, tb) = sample(frame, col, row_pair, self.cols, self.rows);
                let (br, bg, bb) = sample(frame, col, row_pair + 1, self.cols, self.rows);
                buf.push_str(&format!(
                    "\x1b[38;2;{tr};{tg};{tb}m\x1b[48;2;{br};{bg};{bb}m\u{2580}"
                ));
            }
            buf.push_str("\x1b[0m\n");
        }
        buf.push_str(&format!("\x1b[0m {time_label}\x1b[K\n"));

        self.out
            .write_all(buf.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| ReelError::render(format!("terminal write failed: {e}")))?;
        Ok(DisplayControl::Continue)
    }

    fn end(&mut self) -> ReelResult<()> {
        writeln!(self.out, "\x1b[0m")
            .map_err(|e| ReelError::render(format!("terminal write failed: {e}")))?;
        self.cfg = None;
        Ok(())
    }
}

/// Nearest-neighbor sample of the frame at terminal cell resolution,
/// flattened over white.
fn sample(frame: &FrameRgba, col: u32, row: u32, cols: u32, rows: u32) -> (u8, u8, u8) {
    let x = (u64::from(col) * u64::from(frame.width) / u64::from(cols))
        .min(u64::from(frame.width) - 1) as usize;
    let y = (u64::from(row) * u64::from(frame.height) / u64::from(rows))
        .min(u64::from(frame.height) - 1) as usize;
    let i = (y * frame.width as usize + x) * 4;
    let px = &frame.data[i..i + 4];
    if !frame.premultiplied || px[3] == 255 {
        return (px[0], px[1], px[2]);
    }
    let a = px[3] as u16;
    let inv = 255 - a;
    let over = |c: u8| -> u8 { (c as u16 + (255 * inv + 127) / 255).min(255) as u8 };
    (over(px[0]), over(px[1]), over(px[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> FrameRgba {
        FrameRgba {
            width,
            height,
            data: rgba
                .iter()
                .copied()
                .cycle()
                .take((width * height * 4) as usize)
                .collect(),
            premultiplied: true,
        }
    }

    fn cfg(width: u32, height: u32) -> SinkConfig {
        SinkConfig {
            width,
            height,
            fps: 5,
        }
    }

    #[test]
    fn null_display_counts_and_stops() {
        let mut d = NullDisplay::stopping_after(2);
        d.begin(cfg(4, 4)).unwrap();
        let f = solid_frame(4, 4, [0, 0, 0, 255]);
        assert_eq!(
            d.present(FrameIndex(0), &f, "2000").unwrap(),
            DisplayControl::Continue
        );
        assert_eq!(
            d.present(FrameIndex(1), &f, "2001").unwrap(),
            DisplayControl::Stop
        );
        d.end().unwrap();
        assert_eq!(d.presented, 2);
        assert_eq!(d.labels, ["2000", "2001"]);
    }

    #[test]
    fn terminal_display_emits_ansi_frames() {
        let mut out = Vec::new();
        {
            let mut d = TerminalDisplay::new(&mut out, 16);
            d.begin(cfg(32, 16)).unwrap();
            d.present(FrameIndex(0), &solid_frame(32, 16, [200, 10, 10, 255]), "2000")
                .unwrap();
            d.end().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[2J"));
        assert!(text.contains("\x1b[38;2;200;10;10m"));
        assert!(text.contains('\u{2580}'));
        assert!(text.contains("2000"));
    }

    #[test]
    fn terminal_display_rejects_mismatched_frame() {
        let mut out = Vec::new();
        let mut d = TerminalDisplay::new(&mut out, 16);
        d.begin(cfg(32, 16)).unwrap();
        let err = d
            .present(FrameIndex(0), &solid_frame(8, 8, [0, 0, 0, 255]), "t")
            .unwrap_err();
        assert!(matches!(err, ReelError::Render(_)));
    }

    #[test]
    fn sample_flattens_transparent_pixels_to_white() {
        let frame = solid_frame(2, 2, [0, 0, 0, 0]);
        assert_eq!(sample(&frame, 0, 0, 2, 2), (255, 255, 255));
    }
}
