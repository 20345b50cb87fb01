use std::path::PathBuf;

use clap::Parser;
use nix::sys::signal::{SigSet, Signal};

use piclock::widgets::{Clock, MainWidget, SensorHub, Widget};
use piclock::{matrix, render, Error, FrameSync, Options};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The configuration document describing the matrix and its widgets
    #[clap(short, long, env = "PICLOCK_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    /// The I2C device to use to communicate with the display, overrides `matrix.device`
    #[clap(long)]
    device: Option<PathBuf>,
}

/// Blocks SIGINT and SIGTERM for this thread and every thread spawned after
/// it, then waits for them on a dedicated thread that shuts the render loop
/// down.
fn watch_signals(sync: std::sync::Arc<FrameSync>) -> Result<(), Error> {
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    signals.thread_block()?;

    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || match signals.wait() {
            Ok(signal) => {
                log::info!("Received {:?}, shutting down", signal);
                sync.close();
            }
            Err(e) => log::error!("Waiting for signals failed: {}", e),
        })?;
    Ok(())
}

fn run(args: Args) -> Result<(), Error> {
    log::info!("Used config file: {}", args.config.display());
    let options = Options::load(&args.config)?;

    let mut matrix_options = options.matrix()?;
    if let Some(device) = args.device {
        matrix_options.device = Some(device);
    }

    // everything that can be misconfigured is built before touching hardware
    let mut main_widget = MainWidget::new(options.background()?);

    let clock = match options.has_node("clock") {
        true => Some(Clock::new(&options, main_widget.wrapper())?),
        false => None,
    };
    let hub = match options.has_node("sensors") {
        true => Some(SensorHub::new(&options, main_widget.wrapper())?),
        false => None,
    };
    if clock.is_none() && hub.is_none() {
        return Err(Error::invalid_argument(
            "Options",
            "node",
            "Neither clock nor sensors configured",
        ));
    }

    watch_signals(main_widget.sync().clone())?;

    let mut matrix = matrix::open(&matrix_options)?;

    let mut producers: Vec<Box<dyn Widget>> = Vec::with_capacity(2);
    if let Some(clock) = clock {
        clock.start_ticking()?;
        producers.push(Box::new(clock));
    }
    if let Some(hub) = hub {
        hub.start()?;
        producers.push(Box::new(hub));
    }
    main_widget.add_widgets(producers);

    log::info!("Started with {} widgets", main_widget.len());
    let frames = render::run(&main_widget, matrix.as_mut())?;
    log::info!("Stopped after {} frames", frames);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("{:?}", args);

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
