use anyhow::{anyhow, Context, Result};
use config::Config;
use crossbeam::channel;
use engine::Engine;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use ui::UiState;

mod angle;
mod config;
mod detector;
mod engine;
mod error;
mod overlay;
mod pipeline;
mod point;
mod pose;
mod posture;
mod surface;
mod ui;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Analyze landmark frames recorded as JSON lines.
    Replay(Replay),
    /// Write the default configuration to a file.
    InitConfig {
        /// Destination of the TOML configuration.
        path: PathBuf,
    },
}

#[derive(structopt::StructOpt)]
struct Replay {
    /// JSON lines of landmark frames, or - to read standard input.
    frames: PathBuf,

    /// TOML configuration file; defaults apply when omitted.
    #[structopt(short, long)]
    config: Option<PathBuf>,

    /// The width of the overlay canvas.
    #[structopt(short, long, default_value = "1080")]
    width: u32,

    /// The height of the overlay canvas.
    #[structopt(short = "H", long, default_value = "1920")]
    height: u32,

    /// Print the angle report of every displayed frame.
    #[structopt(short, long)]
    print_reports: bool,

    #[structopt(short, long)]
    show_progress: bool,
}

#[cfg(not(feature = "gui"))]
fn make_surface() -> surface::RecordingSurface {
    surface::RecordingSurface::default()
}

#[cfg(feature = "gui")]
fn make_surface() -> surface::WindowSurface {
    surface::WindowSurface::new("reba-pose")
}

fn replay(opt: Replay) -> Result<()> {
    let config = match &opt.config {
        Some(path) => Config::load(path).context("failed loading configuration")?,
        None => Config::default(),
    };
    let mut engine = Engine::from_config(&config).context("invalid configuration")?;
    let stroke = config.stroke().context("invalid stroke width")?;
    let source = detector::open(&opt.frames).context("failed opening landmark frames")?;

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();

    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let pb_frames = if opt.show_progress {
        Some(
            ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{prefix:.bold.dim} {spinner} {wide_msg}"),
            ),
        )
    } else {
        None
    };

    let mut state = UiState::new(make_surface(), stroke);
    state
        .resize(opt.width, opt.height)
        .context("failed sizing overlay surface")?;

    let (events_tx, events_rx) = channel::bounded(1);
    let (publisher, frames_rx) = pipeline::frame_slot();
    let (notices_tx, notices_rx) = channel::unbounded();
    let print_reports = opt.print_reports;
    let pb_worker = pb_frames.as_ref();

    let (submitted, analyzed) = crossbeam::thread::scope(|scope| {
        let running_source = running.clone();
        let source_thread = scope.spawn(move |_| {
            detector::run_source(source, &events_tx, &running_source)
        });

        let worker_thread = scope.spawn(move |_| {
            pipeline::run_worker(&mut engine, &events_rx, &publisher, &notices_tx, pb_worker)
                .map(|()| engine.frame_num())
        });

        ui::run_ui(&mut state, &frames_rx, &notices_rx, |id, report| {
            if print_reports {
                println!("frame {}\n{}", id, report);
            }
        });

        let submitted = source_thread
            .join()
            .map_err(|_| anyhow!("landmark source panicked"))?
            .context("failed reading landmark frames")?;
        let analyzed = worker_thread
            .join()
            .map_err(|_| anyhow!("analysis worker panicked"))?
            .context("analysis worker failed")?;
        Ok::<_, anyhow::Error>((submitted, analyzed))
    })
    .map_err(|_| anyhow!("replay threads panicked"))??;

    if let Some(pb_frames) = pb_frames {
        pb_frames.finish_and_clear();
    }

    #[cfg(not(feature = "gui"))]
    {
        let surface = state.surface();
        tracing::debug!(
            message = "final overlay",
            segments = surface.segments().len(),
            clears = surface.clears(),
            presents = surface.presents(),
            dimensions = ?surface.dimensions()
        );
    }

    info!(
        message = "replay finished",
        submitted,
        analyzed,
        last_frame = ?state.frame_id(),
        segments = state.overlay().len(),
        notices = state.notices().len()
    );

    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    match opt.command {
        Command::Replay(replay_opt) => replay(replay_opt),
        Command::InitConfig { path } => {
            Config::default()
                .save(&path)
                .context("failed writing default configuration")?;
            info!(message = "wrote default configuration", path = %path.display());
            Ok(())
        }
    }
}
