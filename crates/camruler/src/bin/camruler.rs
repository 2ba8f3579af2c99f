use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use camruler::checkerboard::{render_checkerboard, CheckerboardSpec};
use camruler::core::{Color, OverlayRenderer, PixelPoint};
use camruler::io::{load_calibration, load_config, load_frame, save_calibration, save_frame};
use camruler::pipeline::{calibrate_from_checkerboard, calibrate_from_points, measure_frame};
use camruler::{ImageDirSink, ImageSequenceSource, MeasuredObject, Session, SessionConfig};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use serde::Serialize;

/// Camera ruler: calibrate a pixel-to-centimeter scale and measure objects.
#[derive(Debug, Parser)]
#[command(name = "camruler", version, about)]
struct Cli {
    /// Optional JSON session config. Defaults are used for missing sections.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug records.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a virtual checkerboard image.
    RenderBoard {
        #[arg(long, value_parser = parse_squares, default_value = "9x6")]
        squares: [u32; 2],
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 480)]
        height: u32,
        #[arg(long)]
        out: PathBuf,
    },
    /// Calibrate from two pixel positions a known distance apart.
    CalibrateManual {
        /// Frame the points were picked on; used to check the points.
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long, value_parser = parse_point)]
        p1: PixelPoint,
        #[arg(long, value_parser = parse_point)]
        p2: PixelPoint,
        #[arg(long)]
        distance_cm: f64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Calibrate from a checkerboard visible in a frame.
    CalibrateCheckerboard {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, value_parser = parse_squares, default_value = "9x6")]
        squares: [u32; 2],
        /// Side length of one square, in centimeters.
        #[arg(long, default_value_t = 1.0)]
        square_size: f64,
        #[arg(long)]
        out: PathBuf,
        /// Write the frame with the detected corners marked.
        #[arg(long)]
        annotated: Option<PathBuf>,
    },
    /// Measure the objects of one frame and print them as JSON.
    Measure {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        calibration: PathBuf,
        #[arg(long)]
        annotated: Option<PathBuf>,
    },
    /// Run the measurement session over a directory of frames.
    Run {
        #[arg(long)]
        frames: PathBuf,
        #[arg(long)]
        calibration: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[derive(Serialize)]
struct ObjectReport {
    width_cm: f64,
    height_cm: f64,
    area_cm2: f64,
    x: i32,
    y: i32,
    width_px: u32,
    height_px: u32,
}

impl From<&MeasuredObject> for ObjectReport {
    fn from(m: &MeasuredObject) -> Self {
        Self {
            width_cm: m.width_cm,
            height_cm: m.height_cm,
            area_cm2: m.area_cm2(),
            x: m.bbox.x,
            y: m.bbox.y,
            width_px: m.bbox.width,
            height_px: m.bbox.height,
        }
    }
}

#[derive(Serialize)]
struct CheckerboardReport {
    pixel_to_cm: f64,
    rms_error: f64,
    fx: f64,
    fy: f64,
    corners: usize,
}

fn parse_squares(s: &str) -> Result<[u32; 2], String> {
    let (c, r) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected COLSxROWS, got {s:?}"))?;
    let cols = c.trim().parse().map_err(|e| format!("bad column count: {e}"))?;
    let rows = r.trim().parse().map_err(|e| format!("bad row count: {e}"))?;
    Ok([cols, rows])
}

fn parse_point(s: &str) -> Result<PixelPoint, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok(PixelPoint::new(x, y))
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    camruler::core::init_tracing(cli.json_log);
    // The subscriber normally installs the bridge itself.
    let _ = tracing_log::LogTracer::init();
    if cli.verbose {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = camruler::core::init_with_level(level);
    if cli.json_log {
        log::warn!("--json-log needs the `tracing` feature; using plain logs");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn session_config(path: Option<&Path>) -> Result<SessionConfig, Box<dyn Error>> {
    Ok(match path {
        Some(p) => load_config(p)?,
        None => SessionConfig::default(),
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = session_config(cli.config.as_deref())?;

    match cli.command {
        Command::RenderBoard {
            squares,
            width,
            height,
            out,
        } => {
            let board = render_checkerboard(width, height, squares);
            save_frame(&out, &board)?;
            info!("wrote {}x{} board to {}", squares[0], squares[1], out.display());
        }
        Command::CalibrateManual {
            image,
            p1,
            p2,
            distance_cm,
            out,
        } => {
            if let Some(path) = image {
                let frame = load_frame(&path)?;
                let (w, h) = (frame.width() as i32, frame.height() as i32);
                for p in [p1, p2] {
                    if p.x < 0 || p.y < 0 || p.x >= w || p.y >= h {
                        return Err(
                            format!("point ({}, {}) is outside the {w}x{h} frame", p.x, p.y)
                                .into(),
                        );
                    }
                }
            }
            let state = calibrate_from_points(p1, p2, distance_cm)?;
            save_calibration(&out, &state)?;
            print_json(&state)?;
        }
        Command::CalibrateCheckerboard {
            image,
            squares,
            square_size,
            out,
            annotated,
        } => {
            let frame = load_frame(&image)?;
            let spec = CheckerboardSpec::new(squares, square_size)?;
            let (state, calib) = calibrate_from_checkerboard(&frame, &spec, config.calibration)?;
            save_calibration(&out, &state)?;

            if let Some(path) = annotated {
                let overlay = OverlayRenderer::new(config.overlay)?;
                let mut marked = frame;
                for c in &calib.corners {
                    let p = PixelPoint::new(c.x.round() as i32, c.y.round() as i32);
                    overlay.draw_point(&mut marked, p, 3, Color::Red);
                }
                save_frame(&path, &marked)?;
            }

            print_json(&CheckerboardReport {
                pixel_to_cm: calib.pixel_to_cm,
                rms_error: calib.lens.rms_error,
                fx: calib.lens.fx,
                fy: calib.lens.fy,
                corners: calib.corners.len(),
            })?;
        }
        Command::Measure {
            image,
            calibration,
            annotated,
        } => {
            let frame = load_frame(&image)?;
            let state = load_calibration(&calibration)?;
            let (objects, marked) = measure_frame(&frame, &state, &config)?;
            if let Some(path) = annotated {
                save_frame(&path, &marked)?;
            }
            let report: Vec<ObjectReport> = objects.iter().map(ObjectReport::from).collect();
            print_json(&report)?;
        }
        Command::Run {
            frames,
            calibration,
            out_dir,
        } => {
            let source = ImageSequenceSource::open(&frames)?;
            let sink = ImageDirSink::create(&out_dir)?;
            let mut session = Session::new(source, sink, config)?;
            if let Some(path) = calibration {
                session.restore_calibration(load_calibration(&path)?);
            }
            let processed = session.run(|objects| {
                let report: Vec<ObjectReport> = objects.iter().map(ObjectReport::from).collect();
                if let Ok(json) = serde_json::to_string(&report) {
                    println!("{json}");
                }
            })?;
            println!("processed {processed} frames");
        }
    }
    Ok(())
}
