use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use keyfx_core::{
    Controller, Environment, EnvironmentConfig, KeyDatabase, PaletteController, RenderTarget,
};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the Lua effect script
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Key layout (JSON)
    #[arg(long, value_name = "FILE")]
    layout: Option<PathBuf>,

    /// Environment configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Render target size when no layout is given
    #[arg(long, default_value_t = 16)]
    keys: usize,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Seconds to run
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(cli.log_level.to_string().parse()?)
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match cli.log_format {
        LogFormat::Json => subscriber_builder.json().init(),
        // Script output is logged under the `keyfx::script` target.
        LogFormat::Pretty => subscriber_builder.with_target(true).pretty().init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = match &cli.config {
        Some(path) => EnvironmentConfig::load(path)?,
        None => EnvironmentConfig::default(),
    };

    let database = match &cli.layout {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read layout {}", path.display()))?;
            let database = KeyDatabase::from_json(&text)
                .with_context(|| format!("Invalid layout {}", path.display()))?;
            info!(keys = database.len(), groups = database.groups().len(), "Layout loaded");
            Some(Rc::new(database))
        }
        None => None,
    };
    let size = database.as_ref().map_or(cli.keys, |db| db.len());
    let target = Rc::new(RefCell::new(RenderTarget::new(size)));

    info!("Script: {:?}", cli.script);
    let source = fs::read_to_string(&cli.script)
        .with_context(|| format!("Failed to read script {}", cli.script.display()))?;
    let name = cli
        .script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "effect".to_string());

    let env = Environment::new(config.clone())?;
    let controller: Rc<dyn Controller> = Rc::new(PaletteController::new(config.palette()));
    env.attach_controller(&controller)?;
    if let Some(database) = &database {
        env.set_key_database(database)?;
    }

    env.load(&name, &source)?;
    if !env.invoke("init", ())? {
        debug!("Script has no init function");
    }

    let fps = cli.fps.max(1);
    let frames = (cli.duration.max(0.0) * fps as f64).ceil() as u64;
    info!(frames, fps, "Rendering...");
    let mut rendered = false;
    for frame in 0..=frames {
        let now = frame as f64 / fps as f64;
        rendered |= env.render(now, &target)?;
        for failure in env.take_failures() {
            warn!(frame, "{}", failure);
        }
    }
    if !rendered {
        warn!("Script has no render function; the target was never written");
    }

    let colors: Vec<String> = target.borrow().colors().iter().map(ToString::to_string).collect();
    let last_frame = serde_json::to_string(&colors)?;
    info!(
        threads = env.thread_states().len(),
        frame = %last_frame,
        "Render complete."
    );

    env.detach_controller()?;
    Ok(())
}
