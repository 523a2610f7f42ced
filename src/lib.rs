//! rankreel renders animated bar chart races.
//!
//! Given a table of (time, entity, value) rows, it produces one horizontal
//! bar chart frame per distinct time value, with the top-N entities ranked
//! by value and a stable per-entity color, and drives those frames either
//! into a display surface (interactive preview) or through `ffmpeg` into an
//! MP4 file. The two paths can run concurrently against the same immutable
//! [`Race`].

#![forbid(unsafe_code)]

mod chart;
pub mod core;
pub mod data;
pub mod display;
pub mod encode;
pub mod error;
pub mod export;
pub mod icons;
pub mod palette;
pub mod race;
pub mod render;
pub mod select;
pub mod style;
mod text;

pub use core::{Canvas, FrameIndex, FrameRgba, Rgba8};
pub use data::csv::{CsvColumns, load_csv};
pub use data::{RaceEntry, RaceRow, RaceTable, TimePoint};
pub use display::{DisplayControl, DisplaySurface, NullDisplay, TerminalDisplay};
pub use encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use encode::{FrameSink, InMemorySink, SinkConfig, resolve_output_path};
pub use error::{ReelError, ReelResult};
pub use export::{ExportHandle, RaceOutcome, run_with_preview, spawn_export};
pub use icons::IconSet;
pub use palette::Palette;
pub use race::{ExportOpts, ExportReport, PlayStats, Race};
pub use render::FrameRenderer;
pub use select::select_top_n;
pub use style::{RaceConfig, Theme};
