use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::io;
use std::path::Path;
use voxcmd::app::{self, App};
use voxcmd::cli::{Cli, Commands, ConfigAction};
use voxcmd::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    voxcmd::logging::init(cli.verbose, cli.quiet);
    tracing::debug!(version = %voxcmd::version_string(), "voxcmd starting");

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = load_config(&config_path)?;
    let app = App::new(config, cli.store.clone(), cli.quiet);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Record {
            name,
            duration,
            device,
        } => {
            record(&app, &name, duration, device, &mut stdout).await?;
        }
        Commands::Add { name, file } => {
            app.add(&name, &file, &mut stdout)?;
        }
        Commands::Remove { name } => {
            app.remove(&name, &mut stdout)?;
        }
        Commands::List => {
            app.list(&mut stdout)?;
        }
        Commands::Play { name } => {
            play(&app, &name).await?;
        }
        Commands::Export { name, output } => {
            app.export(&name, &output, &mut stdout)?;
        }
        Commands::Info { file } => {
            app::info(&file, &mut stdout)?;
        }
        Commands::Devices => {
            list_audio_devices()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(app.config())?);
                println!("# store: {}", app.store_path().display());
            }
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "voxcmd", &mut io::stdout());
        }
    }

    Ok(())
}

/// Load config from file (or defaults) and apply environment overrides.
fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)?.with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "cpal-audio")]
async fn record(
    app: &App,
    name: &str,
    duration: std::time::Duration,
    device: Option<String>,
    out: &mut impl io::Write,
) -> Result<()> {
    Ok(app.record(name, duration, device, out).await?)
}

#[cfg(not(feature = "cpal-audio"))]
async fn record(
    _app: &App,
    _name: &str,
    _duration: std::time::Duration,
    _device: Option<String>,
    _out: &mut impl io::Write,
) -> Result<()> {
    anyhow::bail!("voxcmd was built without audio support (enable the `cpal-audio` feature)")
}

#[cfg(feature = "cpal-audio")]
async fn play(app: &App, name: &str) -> Result<()> {
    Ok(app.play(name).await?)
}

#[cfg(not(feature = "cpal-audio"))]
async fn play(_app: &App, _name: &str) -> Result<()> {
    anyhow::bail!("voxcmd was built without audio support (enable the `cpal-audio` feature)")
}

/// List available audio input devices.
#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = voxcmd::audio::capture::list_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        std::process::exit(1);
    }

    println!("Available audio input devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    anyhow::bail!("voxcmd was built without audio support (enable the `cpal-audio` feature)")
}
