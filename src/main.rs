#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use overlay_meter::class_icons::PlayerClass;
use overlay_meter::config::ConfigPaths;
use overlay_meter::constants;
use overlay_meter::detector::ScriptedDetector;
use overlay_meter::messaging::{SubscriberId, VisibilityMessage, VisibilitySignal};
use overlay_meter::overlay::{
    OverlayController, OverlayWindow, PinnedPreference, Visibility, VisibilityDetector,
};
use overlay_meter::services::{lock_store, Services};

#[derive(Parser, Debug)]
#[command(name = "overlay-meter", version, about = "Overlay settings and visibility tool")]
struct Cli {
    /// Settings directory (defaults to <config dir>/overlay-meter)
    #[arg(long, global = true, env = constants::config::DIR_ENV)]
    config_dir: Option<PathBuf>,

    /// Resource directory holding class-icons/
    #[arg(long, global = true, env = constants::resources::DIR_ENV)]
    resource_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the settings file and resource locations
    Path,
    /// Print the current settings as stored on disk
    Show,
    /// Keep the overlay visible regardless of the game window
    Pin,
    /// Let the overlay follow the game window again
    Unpin,
    /// Restore default settings
    Reset,
    /// Print class icon paths
    Icons {
        /// Only this class
        class: Option<PlayerClass>,
    },
    /// Drive an overlay from stdin: visible | hidden | unknown | pin | unpin | refresh | quit
    Watch,
}

/// Stand-in overlay that reports its transitions on stdout
struct ConsoleWindow {
    visibility: Visibility,
}

impl OverlayWindow for ConsoleWindow {
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        println!("overlay: {visibility}");
    }
}

fn init_logging() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var(constants::logging::LEVEL_ENV)
        .unwrap_or_else(|_| constants::logging::DEFAULT_LEVEL.to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    // stdout is reserved for command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

fn run_watch(services: &Services) -> Result<()> {
    let store = services.store()?;
    let messenger = services.messenger();
    let detector = ScriptedDetector::new(messenger.clone());

    let view_model = SubscriberId::next();
    messenger.register(view_model, |message: &VisibilityMessage| {
        debug!(signal = %message.signal, "Detector reported");
    });

    let pinned: Arc<dyn PinnedPreference> = lock_store(&store).pinned_flag();
    let window = ConsoleWindow {
        visibility: Visibility::Visible,
    };
    let controller =
        OverlayController::attach(messenger, pinned, window, &detector).with_view_model(view_model);
    println!("overlay: {}", controller.state());

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "refresh" => detector.force_refresh(),
            command @ ("pin" | "unpin") => {
                let saved = lock_store(&store).set_pinned(command == "pin");
                if let Err(e) = saved {
                    error!(
                        error = ?e,
                        "Failed to save pinned preference, keeping it for this session"
                    );
                }
                detector.force_refresh();
            }
            other => match other.parse::<VisibilitySignal>() {
                Ok(signal) => {
                    detector.report(signal);
                }
                Err(e) => warn!(error = %e, "Ignoring input"),
            },
        }
    }

    info!(state = %controller.state(), "Watch finished");
    Ok(())
}

fn set_pinned(services: &Services, pinned: bool) -> Result<()> {
    let store = services.store()?;
    lock_store(&store).set_pinned(pinned)?;
    println!("pinned: {pinned}");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let paths = cli
        .config_dir
        .map(ConfigPaths::new)
        .unwrap_or_else(ConfigPaths::default_location);
    let services = Services::new(paths, cli.resource_dir);

    match cli.command {
        Command::Path => {
            let store = services.store()?;
            let store = lock_store(&store);
            println!("settings:  {}", store.paths().config_file().display());
            println!("resources: {}", store.data().resource_directory().display());
        }
        Command::Show => {
            let store = services.store()?;
            println!("{}", lock_store(&store).to_json()?);
        }
        Command::Pin => set_pinned(&services, true)?,
        Command::Unpin => set_pinned(&services, false)?,
        Command::Reset => {
            let store = services.store()?;
            lock_store(&store).reset()?;
            println!("settings reset: {}", services.paths().config_file().display());
        }
        Command::Icons { class } => {
            let store = services.store()?;
            let store = lock_store(&store);
            match class {
                Some(class) => println!("{}", store.get_image(class).display()),
                None => {
                    for (class, path) in store.class_icons().iter() {
                        println!("{:<10} {}", class, path.display());
                    }
                }
            }
        }
        Command::Watch => run_watch(&services)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    run(cli)
}
