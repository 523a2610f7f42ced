use std::path::PathBuf;

use rankreel::{
    Canvas, ExportOpts, IconSet, Race, RaceConfig, RaceRow, RaceTable, Theme, TimePoint,
    is_ffmpeg_on_path, select_top_n,
};

fn build_table() -> RaceTable {
    let countries = [
        ("China", 1270.0),
        ("India", 1050.0),
        ("USA", 282.0),
        ("Indonesia", 214.0),
        ("Brazil", 175.0),
        ("Pakistan", 142.0),
        ("Russia", 146.0),
        ("Bangladesh", 131.0),
        ("Japan", 127.0),
        ("Nigeria", 122.0),
        ("Mexico", 98.0),
        ("Germany", 82.0),
    ];

    let mut rows = Vec::new();
    for year in 0..12_i64 {
        for (i, (label, base)) in countries.iter().enumerate() {
            // Uneven growth so the ranking reorders over the years.
            let growth = 1.0 + (i as f64 * 0.35 + 1.0) / 100.0;
            rows.push(RaceRow {
                time: TimePoint::Int(2000 + year),
                label: (*label).to_owned(),
                value: base * growth.powi(year as i32),
            });
        }
    }
    RaceTable::from_rows(rows)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let table = build_table();
    let config = RaceConfig {
        title: "Population (millions)".to_owned(),
        ..Default::default()
    };
    let theme = Theme {
        canvas: Canvas {
            width: 1200,
            height: 600,
        },
        ..Default::default()
    };
    let race = Race::new(table, config, theme, IconSet::new())?;

    let out_dir = PathBuf::from("target").join("demo");
    std::fs::create_dir_all(&out_dir)?;

    // Write a single frame PNG for quick sanity checking.
    let time = TimePoint::Int(2005);
    let entries = select_top_n(race.table(), &time, race.config().top_n);
    let mut renderer = race.renderer()?;
    let frame = renderer.render_frame(&time, &entries)?;
    let out_png = out_dir.join("race_frame.png");
    image::save_buffer_with_format(
        &out_png,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    eprintln!("wrote {}", out_png.display());

    if !is_ffmpeg_on_path() {
        eprintln!("ffmpeg not found on PATH; skipping MP4 export");
        return Ok(());
    }

    let report = race.encode_to_file(
        out_dir.join("race.mp4"),
        &ExportOpts {
            parallel: true,
            ..Default::default()
        },
    )?;
    eprintln!("wrote {} ({} frames)", report.path.display(), report.frames);
    Ok(())
}
