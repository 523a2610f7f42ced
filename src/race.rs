use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use rayon::prelude::*;

use crate::core::{FrameIndex, FrameRgba};
use crate::display::{DisplayControl, DisplaySurface};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::{FrameSink, SinkConfig, resolve_output_path};
use crate::error::{ReelError, ReelResult};
use crate::icons::IconSet;
use crate::render::FrameRenderer;
use crate::select::select_top_n;
use crate::style::{RaceConfig, Theme};
use crate::data::{RaceTable, TimePoint};

/// Options controlling the export path.
#[derive(Clone, Debug)]
pub struct ExportOpts {
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Render frames on a rayon pool instead of sequentially. Frame bytes
    /// are identical either way; only wall time changes.
    pub parallel: bool,
    /// Worker thread count override. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Bounded channel capacity between render workers and the encoder.
    pub channel_capacity: usize,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            overwrite: true,
            parallel: false,
            threads: None,
            channel_capacity: 4,
        }
    }
}

/// What an export produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportReport {
    /// The file that was written.
    pub path: PathBuf,
    /// Frames encoded into it.
    pub frames: u64,
}

/// How a preview run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayStats {
    /// Frames actually presented.
    pub frames_presented: u64,
    /// `true` when the surface answered `Stop` before the last frame.
    pub stopped_early: bool,
}

/// The animation driver: one immutable race, two consumption modes.
///
/// A `Race` owns the table, config, and theme, and sequences one frame per
/// distinct time value in the table's first-appearance order. It is shared
/// read-only between the preview and export paths; each path builds its own
/// renderer (and rendering context) from it, so the paths never share
/// mutable state.
#[derive(Debug)]
pub struct Race {
    table: Arc<RaceTable>,
    config: RaceConfig,
    theme: Theme,
    icons: IconSet,
}

impl Race {
    pub fn new(
        table: RaceTable,
        config: RaceConfig,
        theme: Theme,
        icons: IconSet,
    ) -> ReelResult<Self> {
        config.validate()?;
        theme.validate()?;
        if table.is_empty() {
            return Err(ReelError::input("race table has no rows"));
        }
        Ok(Self {
            table: Arc::new(table),
            config,
            theme,
            icons,
        })
    }

    pub fn table(&self) -> &RaceTable {
        &self.table
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Frame order: the table's distinct time values, first appearance first.
    pub fn times(&self) -> &[TimePoint] {
        self.table.times()
    }

    /// A fresh renderer for one consumption path.
    pub fn renderer(&self) -> ReelResult<FrameRenderer> {
        FrameRenderer::new(
            self.theme.clone(),
            self.config.title.clone(),
            self.config.palette_seed,
            self.icons.clone(),
        )
    }

    fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.theme.canvas.width,
            height: self.theme.canvas.height,
            fps: self.config.export_fps,
        }
    }

    /// Play the race into a display surface on the calling thread.
    ///
    /// Frames are presented in time order, paced by the configured frame
    /// interval. The surface can stop playback early; the driver then skips
    /// the remaining frames and closes the surface normally.
    #[tracing::instrument(skip_all, fields(frames = self.times().len()))]
    pub fn play(&self, surface: &mut dyn DisplaySurface) -> ReelResult<PlayStats> {
        let mut renderer = self.renderer()?;
        surface.begin(self.sink_config())?;

        let result = self.play_frames(&mut renderer, surface);
        let end_result = surface.end();
        let stats = result?;
        end_result?;

        tracing::info!(
            presented = stats.frames_presented,
            stopped_early = stats.stopped_early,
            "preview finished"
        );
        Ok(stats)
    }

    fn play_frames(
        &self,
        renderer: &mut FrameRenderer,
        surface: &mut dyn DisplaySurface,
    ) -> ReelResult<PlayStats> {
        let times = self.times();
        let interval = Duration::from_millis(self.config.frame_interval_ms);
        let mut stats = PlayStats::default();

        for (i, time) in times.iter().enumerate() {
            let entries = select_top_n(&self.table, time, self.config.top_n);
            let frame = renderer.render_frame(time, &entries)?;
            let control = surface.present(FrameIndex(i as u64), &frame, &time.to_string())?;
            stats.frames_presented += 1;
            if control == DisplayControl::Stop {
                stats.stopped_early = i + 1 < times.len();
                break;
            }
            if i + 1 < times.len() {
                std::thread::sleep(interval);
            }
        }
        Ok(stats)
    }

    /// Encode the full race into an MP4 at `target`.
    ///
    /// A `target` that is an existing directory gets a timestamped file name
    /// inside it. Blocks until the file is fully written.
    #[tracing::instrument(skip_all, fields(target = %target.as_ref().display()))]
    pub fn encode_to_file(
        &self,
        target: impl AsRef<Path>,
        opts: &ExportOpts,
    ) -> ReelResult<ExportReport> {
        let path = resolve_output_path(target);
        let mut sink = FfmpegSink::new(FfmpegSinkOpts {
            out_path: path.clone(),
            overwrite: opts.overwrite,
            bg_rgba: [
                self.theme.background.r,
                self.theme.background.g,
                self.theme.background.b,
                255,
            ],
        });
        let frames = self.encode_frames(&mut sink, opts)?;
        tracing::info!(path = %path.display(), frames, "export finished");
        Ok(ExportReport { path, frames })
    }

    /// Drive every frame, in order, into an arbitrary sink.
    ///
    /// With `opts.parallel`, frames are produced on a rayon pool and
    /// reordered across a bounded channel before the sink, which still sees
    /// strictly increasing frame indices. Sequential and parallel runs
    /// deliver byte-identical frames.
    pub fn encode_frames(
        &self,
        sink: &mut dyn FrameSink,
        opts: &ExportOpts,
    ) -> ReelResult<u64> {
        let times = self.times();
        if opts.parallel && times.len() > 1 {
            self.encode_frames_parallel(sink, opts)
        } else {
            self.encode_frames_sequential(sink)
        }
    }

    fn encode_frames_sequential(&self, sink: &mut dyn FrameSink) -> ReelResult<u64> {
        let times = self.times();
        let mut renderer = self.renderer()?;
        sink.begin(self.sink_config())?;
        for (i, time) in times.iter().enumerate() {
            let entries = select_top_n(&self.table, time, self.config.top_n);
            let frame = renderer.render_frame(time, &entries)?;
            sink.push_frame(FrameIndex(i as u64), &frame)?;
        }
        sink.end()?;
        Ok(times.len() as u64)
    }

    fn encode_frames_parallel(
        &self,
        sink: &mut dyn FrameSink,
        opts: &ExportOpts,
    ) -> ReelResult<u64> {
        let times = self.times();
        let total = times.len() as u64;
        let cfg = self.sink_config();
        let cap = opts.channel_capacity.max(1);
        let top_n = self.config.top_n;

        let mut pool_builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = opts.threads {
            pool_builder = pool_builder.num_threads(threads);
        }
        let pool = pool_builder
            .build()
            .map_err(|e| ReelError::render(format!("failed to build render pool: {e}")))?;

        // Encoder thread: enforce in-order delivery to the sink regardless of
        // worker completion order.
        std::thread::scope(|scope| -> ReelResult<u64> {
            let (tx, rx) = mpsc::sync_channel::<(u64, FrameRgba)>(cap);
            let sink_ref: &mut dyn FrameSink = sink;

            let enc = scope.spawn(move || -> ReelResult<()> {
                sink_ref.begin(cfg)?;

                let mut next = 0u64;
                let mut pending = HashMap::<u64, FrameRgba>::new();
                while next < total {
                    if let Some(frame) = pending.remove(&next) {
                        sink_ref.push_frame(FrameIndex(next), &frame)?;
                        next += 1;
                        continue;
                    }
                    let (idx, frame) = rx.recv().map_err(|_| {
                        ReelError::encode("encoder channel disconnected unexpectedly")
                    })?;
                    pending.insert(idx, frame);
                }

                sink_ref.end()?;
                Ok(())
            });

            let produced = pool.install(|| {
                times.par_iter().enumerate().try_for_each_init(
                    || self.renderer(),
                    |renderer, (i, time)| -> ReelResult<()> {
                        let renderer = renderer.as_mut().map_err(|e| {
                            ReelError::render(format!("worker renderer init failed: {e}"))
                        })?;
                        let entries = select_top_n(&self.table, time, top_n);
                        let frame = renderer.render_frame(time, &entries)?;
                        tx.send((i as u64, frame)).map_err(|_| {
                            ReelError::encode("encoder thread is not accepting frames")
                        })
                    },
                )
            });
            drop(tx);

            let encoded = enc
                .join()
                .map_err(|_| ReelError::encode("encoder thread panicked"))?;
            // One failure is usually seen from both ends of the channel:
            // a dead producer gives the encoder a disconnect, a dead
            // encoder gives the producers a rejected send. Report the root
            // cause, not the follow-on channel error.
            match (produced, encoded) {
                (Ok(()), Ok(())) => Ok(total),
                (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
                (Err(produce_err), Err(encode_err)) => {
                    if matches!(&produce_err, ReelError::Encode(msg) if msg.contains("not accepting frames"))
                    {
                        Err(encode_err)
                    } else {
                        Err(produce_err)
                    }
                }
            }
        })
    }
}
