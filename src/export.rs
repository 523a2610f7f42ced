use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::display::DisplaySurface;
use crate::error::{ReelError, ReelResult};
use crate::race::{ExportOpts, ExportReport, PlayStats, Race};

/// A running background export.
///
/// The export owns its own renderer and ffmpeg process; nothing is shared
/// with the spawning thread except the immutable [`Race`]. Dropping the
/// handle without joining detaches the export, which still runs to
/// completion.
pub struct ExportHandle {
    join: JoinHandle<ReelResult<ExportReport>>,
    target: PathBuf,
}

impl ExportHandle {
    /// The target the export was asked to write (before directory targets
    /// are resolved to a timestamped file name).
    pub fn target(&self) -> &PathBuf {
        &self.target
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the export finishes and take its result.
    ///
    /// A panic on the export thread surfaces as an encode error instead of
    /// propagating into the joining thread.
    pub fn join(self) -> ReelResult<ExportReport> {
        self.join
            .join()
            .map_err(|_| ReelError::encode("export thread panicked"))?
    }
}

/// Start encoding `race` to `target` on a background thread.
pub fn spawn_export(race: Arc<Race>, target: impl Into<PathBuf>, opts: ExportOpts) -> ExportHandle {
    let target = target.into();
    let thread_target = target.clone();
    let join = std::thread::Builder::new()
        .name("race-export".to_owned())
        .spawn(move || race.encode_to_file(&thread_target, &opts))
        .unwrap_or_else(|e| {
            // Thread spawn failure is rare enough to fold into the result.
            let err = ReelError::encode(format!("failed to spawn export thread: {e}"));
            std::thread::spawn(move || Err(err))
        });
    ExportHandle { join, target }
}

/// Both halves of a simultaneous preview + export run, reported
/// independently. One side failing never cancels the other.
#[derive(Debug)]
pub struct RaceOutcome {
    pub preview: ReelResult<PlayStats>,
    pub export: ReelResult<ExportReport>,
}

impl RaceOutcome {
    pub fn is_ok(&self) -> bool {
        self.preview.is_ok() && self.export.is_ok()
    }
}

/// Export in the background while playing the preview on the calling thread.
///
/// Waits for the export even when the viewer closes the preview early, so
/// the overall operation is only done once the file is fully written (or the
/// export has reported its failure).
pub fn run_with_preview(
    race: Arc<Race>,
    surface: &mut dyn DisplaySurface,
    target: impl Into<PathBuf>,
    opts: ExportOpts,
) -> RaceOutcome {
    let export = spawn_export(race.clone(), target, opts);
    let preview = race.play(surface);
    let export = export.join();
    RaceOutcome { preview, export }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Canvas;
    use crate::data::{RaceRow, RaceTable, TimePoint};
    use crate::display::NullDisplay;
    use crate::icons::IconSet;
    use crate::style::{RaceConfig, Theme};

    fn race() -> Arc<Race> {
        let table = RaceTable::from_rows(
            (0..3_i64)
                .map(|t| RaceRow {
                    time: TimePoint::Int(2000 + t),
                    label: "A".to_owned(),
                    value: t as f64 + 1.0,
                })
                .collect(),
        );
        let config = RaceConfig {
            frame_interval_ms: 0,
            ..Default::default()
        };
        let theme = Theme {
            canvas: Canvas {
                width: 64,
                height: 36,
            },
            ..Default::default()
        };
        Arc::new(Race::new(table, config, theme, IconSet::new()).unwrap())
    }

    #[test]
    fn export_failure_does_not_poison_the_preview() {
        let race = race();
        let mut surface = NullDisplay::new();
        let outcome = run_with_preview(
            race,
            &mut surface,
            "/proc/definitely/not/writable/out.mp4",
            ExportOpts::default(),
        );
        assert!(outcome.preview.is_ok());
        assert!(outcome.export.is_err());
        assert!(!outcome.is_ok());
        assert_eq!(outcome.preview.unwrap().frames_presented, 3);
    }

    #[test]
    fn early_preview_stop_still_joins_the_export() {
        let race = race();
        let mut surface = NullDisplay::stopping_after(1);
        let outcome = run_with_preview(
            race,
            &mut surface,
            "/proc/definitely/not/writable/out.mp4",
            ExportOpts::default(),
        );
        // Preview stopped after one frame; the export still ran to its own
        // (failing) conclusion and was waited on.
        let stats = outcome.preview.unwrap();
        assert_eq!(stats.frames_presented, 1);
        assert!(stats.stopped_early);
        assert!(outcome.export.is_err());
    }

    #[test]
    fn handle_reports_target() {
        let race = race();
        let handle = spawn_export(
            race,
            "/proc/definitely/not/writable/out.mp4",
            ExportOpts::default(),
        );
        assert_eq!(
            handle.target(),
            &PathBuf::from("/proc/definitely/not/writable/out.mp4")
        );
        assert!(handle.join().is_err());
    }
}
