use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use rankreel::{
    CsvColumns, ExportOpts, IconSet, Race, RaceConfig, TerminalDisplay, Theme, TimePoint,
    load_csv, run_with_preview, select_top_n,
};

#[derive(Parser, Debug)]
#[command(name = "rankreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 bar chart race (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single time value as a PNG.
    Frame(FrameArgs),
    /// Play the race in the terminal.
    Preview(PreviewArgs),
    /// Export in the background while previewing in the terminal.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Input CSV file.
    #[arg(long)]
    data: PathBuf,

    /// Time column name.
    #[arg(long, default_value = "Time")]
    time_col: String,

    /// Entity label column name.
    #[arg(long, default_value = "Location")]
    label_col: String,

    /// Metric value column name.
    #[arg(long, default_value = "Value")]
    value_col: String,
}

#[derive(Args, Debug)]
struct ChartArgs {
    /// Chart title prefix; the time value is appended per frame.
    #[arg(long, default_value = "")]
    title: String,

    /// Ranked entities shown per frame.
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Canvas width in pixels (must be even for MP4 output).
    #[arg(long, default_value_t = 1200)]
    width: u32,

    /// Canvas height in pixels (must be even for MP4 output).
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Directory of per-entity PNG icons, keyed by file stem.
    #[arg(long)]
    icons: Option<PathBuf>,

    /// Font file for chart text. Defaults to probing common system fonts.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Palette seed; changing it re-shuffles entity colors.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output MP4 path, or an existing directory for a timestamped name.
    #[arg(long)]
    out: PathBuf,

    /// Export frame rate.
    #[arg(long, default_value_t = 5)]
    fps: u32,

    /// Overwrite the output file if it exists.
    #[arg(long)]
    overwrite: bool,

    /// Render frames on a thread pool.
    #[arg(long)]
    parallel: bool,

    /// Worker thread count (implies --parallel).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    data: DataArgs,
    #[command(flatten)]
    chart: ChartArgs,
    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    data: DataArgs,
    #[command(flatten)]
    chart: ChartArgs,

    /// Time value to render (e.g. `2000`).
    #[arg(long)]
    time: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    data: DataArgs,
    #[command(flatten)]
    chart: ChartArgs,

    /// Terminal columns for the preview.
    #[arg(long, default_value_t = 100)]
    cols: u32,

    /// Pacing between frames, in milliseconds.
    #[arg(long, default_value_t = 200)]
    interval_ms: u64,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[command(flatten)]
    preview: PreviewArgs,
    #[command(flatten)]
    export: ExportArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn build_race(
    data: &DataArgs,
    chart: &ChartArgs,
    interval_ms: u64,
    fps: u32,
) -> anyhow::Result<Race> {
    let columns = CsvColumns {
        time: data.time_col.clone(),
        label: data.label_col.clone(),
        value: data.value_col.clone(),
    };
    let table = load_csv(&data.data, &columns)
        .with_context(|| format!("load data from '{}'", data.data.display()))?;

    let icons = match &chart.icons {
        Some(dir) => {
            IconSet::load_dir(dir).with_context(|| format!("load icons from '{}'", dir.display()))?
        }
        None => IconSet::new(),
    };

    let config = RaceConfig {
        top_n: chart.top_n,
        frame_interval_ms: interval_ms,
        export_fps: fps,
        title: chart.title.clone(),
        palette_seed: chart.seed,
    };
    let theme = Theme {
        canvas: rankreel::Canvas {
            width: chart.width,
            height: chart.height,
        },
        font: chart.font.clone(),
        ..Default::default()
    };

    Ok(Race::new(table, config, theme, icons)?)
}

fn export_opts(args: &ExportArgs) -> ExportOpts {
    ExportOpts {
        overwrite: args.overwrite,
        parallel: args.parallel || args.threads.is_some(),
        threads: args.threads,
        ..Default::default()
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let race = build_race(&args.data, &args.chart, 200, args.export.fps)?;
    let report = race.encode_to_file(&args.export.out, &export_opts(&args.export))?;
    eprintln!("wrote {} ({} frames)", report.path.display(), report.frames);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let race = build_race(&args.data, &args.chart, 200, 5)?;
    let time = TimePoint::parse(&args.time);
    if !race.times().contains(&time) {
        eprintln!("note: time value '{time}' has no rows; rendering an empty chart");
    }

    let entries = select_top_n(race.table(), &time, race.config().top_n);
    let mut renderer = race.renderer()?;
    let frame = renderer.render_frame(&time, &entries)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let race = build_race(&args.data, &args.chart, args.interval_ms, 5)?;
    let mut surface = TerminalDisplay::new(std::io::stdout().lock(), args.cols);
    let stats = race.play(&mut surface)?;
    eprintln!("played {} frames", stats.frames_presented);
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let race = Arc::new(build_race(
        &args.preview.data,
        &args.preview.chart,
        args.preview.interval_ms,
        args.export.fps,
    )?);

    let mut surface = TerminalDisplay::new(std::io::stdout().lock(), args.preview.cols);
    let outcome = run_with_preview(
        race,
        &mut surface,
        args.export.out.clone(),
        export_opts(&args.export),
    );

    match &outcome.preview {
        Ok(stats) => eprintln!("played {} frames", stats.frames_presented),
        Err(e) => eprintln!("preview failed: {e}"),
    }
    match outcome.export {
        Ok(report) => {
            eprintln!("wrote {} ({} frames)", report.path.display(), report.frames);
        }
        Err(e) => {
            outcome.preview?;
            return Err(e.into());
        }
    }
    outcome.preview?;
    Ok(())
}
