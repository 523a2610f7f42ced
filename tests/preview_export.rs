use std::sync::Arc;

use rankreel::{
    Canvas, ExportOpts, IconSet, InMemorySink, NullDisplay, Race, RaceConfig, RaceRow, RaceTable,
    Theme, TimePoint, run_with_preview, spawn_export,
};

fn race() -> Arc<Race> {
    let rows = (0..5_i64)
        .flat_map(|t| {
            [("A", 3.0), ("B", 2.0), ("C", 1.0)]
                .into_iter()
                .map(move |(label, base)| RaceRow {
                    time: TimePoint::Int(2000 + t),
                    label: label.to_owned(),
                    value: base * (t + 1) as f64,
                })
        })
        .collect();
    let config = RaceConfig {
        frame_interval_ms: 0,
        ..Default::default()
    };
    let theme = Theme {
        canvas: Canvas {
            width: 80,
            height: 44,
        },
        ..Default::default()
    };
    Arc::new(Race::new(RaceTable::from_rows(rows), config, theme, IconSet::new()).unwrap())
}

#[test]
fn preview_and_export_run_concurrently_without_interference() {
    let race = race();

    // Reference: an export run alone.
    let mut alone = InMemorySink::new();
    race.encode_frames(&mut alone, &ExportOpts::default()).unwrap();

    // Same export while a preview hammers its own renderer on this thread.
    let race_bg = race.clone();
    let concurrent = std::thread::spawn(move || {
        let mut sink = InMemorySink::new();
        race_bg
            .encode_frames(&mut sink, &ExportOpts::default())
            .map(|_| sink)
    });
    let mut surface = NullDisplay::new();
    let stats = race.play(&mut surface).unwrap();
    let sink = concurrent.join().unwrap().unwrap();

    assert_eq!(stats.frames_presented, 5);
    assert_eq!(sink.frames().len(), alone.frames().len());
    for ((ia, fa), (ib, fb)) in alone.frames().iter().zip(sink.frames()) {
        assert_eq!(ia, ib);
        assert_eq!(fa.data, fb.data, "concurrent export must match a solo run");
    }
}

#[test]
fn closing_the_preview_does_not_cancel_the_export() {
    let race = race();
    let mut surface = NullDisplay::stopping_after(2);

    // The export target is unwritable, so it fails on its own terms; the
    // point is that both results come back independently.
    let outcome = run_with_preview(
        race,
        &mut surface,
        "/proc/definitely/not/writable/race.mp4",
        ExportOpts::default(),
    );

    let stats = outcome.preview.expect("preview should succeed");
    assert_eq!(stats.frames_presented, 2);
    assert!(stats.stopped_early);
    assert!(outcome.export.is_err());
}

#[test]
fn spawned_export_failure_is_contained_to_its_handle() {
    let race = race();
    let handle = spawn_export(
        race.clone(),
        "/proc/definitely/not/writable/race.mp4",
        ExportOpts::default(),
    );

    // The foreground path keeps working while the export fails behind it.
    let mut surface = NullDisplay::new();
    assert!(race.play(&mut surface).is_ok());
    assert!(handle.join().is_err());
}
