use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use vision_clip::{
    DialogError, GeneratorOptions, TTSError, TTSFactory, VisionClipGenerator,
    dialog::{DEFAULT_SOUNDS_DIR, DEFAULT_TEMP_DIR},
};

/// Vision Clip Generator - phone-call demo audio from dialog scripts
#[derive(Parser, Debug)]
#[command(name = "vision-clip")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the dialog script
    #[arg(long = "file", value_name = "PATH")]
    file: PathBuf,

    /// Output file (default: basename of the script with a .wav extension)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// TTS configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// TTS provider (google, azure, elevenlabs, aws)
    #[arg(long = "provider")]
    provider: Option<String>,

    /// Keep intermediate audio segments
    #[arg(long = "keep-temp")]
    keep_temp: bool,

    /// Parent directory for the per-run segment directory
    #[arg(long = "temp-dir", value_name = "DIR", default_value = DEFAULT_TEMP_DIR)]
    temp_dir: PathBuf,

    /// Directory holding the sound clips
    #[arg(long = "sounds-dir", value_name = "DIR", default_value = DEFAULT_SOUNDS_DIR)]
    sounds_dir: PathBuf,

    /// Console log level
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Also write logs to a file (default path: vision-clip.log)
    #[arg(
        long = "log-file",
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_LOG_FILE
    )]
    log_file: Option<PathBuf>,

    /// File log level
    #[arg(long = "log-file-level", value_enum, default_value_t = LogLevel::Debug)]
    log_file_level: LogLevel,
}

const DEFAULT_LOG_FILE: &str = "vision-clip.log";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Console output plus an optional, more detailed log file.
fn init_logging(cli: &Cli) {
    let console = fmt::layer().with_filter(LevelFilter::from_level(cli.log_level.into()));

    let mut file_error = None;
    let file = cli.log_file.as_ref().and_then(|path| match File::create(path) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Arc::new(file))
                .with_filter(LevelFilter::from_level(cli.log_file_level.into())),
        ),
        Err(e) => {
            file_error = Some(e);
            None
        }
    });

    tracing_subscriber::registry().with(console).with(file).init();

    if let Some(path) = &cli.log_file {
        match file_error {
            Some(e) => warn!(path = %path.display(), error = %e, "Could not create log file"),
            None => info!(path = %path.display(), "Logging to file"),
        }
    }
}

/// `<script stem>.wav` in the current directory.
fn default_output(script: &Path) -> PathBuf {
    let stem = script
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vc".to_string());
    PathBuf::from(format!("{stem}.wav"))
}

/// The TTS configuration error behind `e`, if that is what failed.
fn configuration_error(e: &anyhow::Error) -> Option<&TTSError> {
    let tts = match e.downcast_ref::<DialogError>() {
        Some(DialogError::Tts(tts)) => Some(tts),
        _ => e.downcast_ref::<TTSError>(),
    };
    tts.filter(|tts| tts.is_configuration_error())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let output = cli.output.clone().unwrap_or_else(|| default_output(&cli.file));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create output directory {}", parent.display()))?;
    }

    info!(
        file = %cli.file.display(),
        output = %output.display(),
        provider = ?cli.provider,
        "Vision Clip Generator starting"
    );

    let factory = TTSFactory::with_builtin_providers();
    let provider = factory.create_provider(
        cli.provider.as_deref(),
        cli.config.as_deref(),
        Map::<String, Value>::new(),
    )?;

    let generator = VisionClipGenerator::new(
        provider,
        GeneratorOptions {
            temp_dir: cli.temp_dir,
            sounds_dir: cli.sounds_dir,
            keep_temp: cli.keep_temp,
        },
    );

    let written = generator.generate_file(&cli.file, &output).await?;
    info!(output = %written.display(), "Generated vision clip");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if it exists (must be done before config resolution)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(tts) = configuration_error(&e) {
                error!(error = %tts, "Configuration error");
                error!("Check the provider credentials in the environment or the --config file");
                return ExitCode::FAILURE;
            }
            error!(error = %format!("{e:#}"), "Vision clip generation failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_flag_forms() {
        let cli = Cli::try_parse_from(["vision-clip", "--file", "demo.txt"]).unwrap();
        assert!(cli.log_file.is_none());
        assert!(matches!(cli.log_file_level, LogLevel::Debug));

        let cli = Cli::try_parse_from(["vision-clip", "--log-file", "--file", "demo.txt"]).unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from(DEFAULT_LOG_FILE)));

        let cli = Cli::try_parse_from([
            "vision-clip",
            "--file",
            "demo.txt",
            "--log-file",
            "run.log",
            "--log-file-level",
            "warn",
        ])
        .unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
        assert!(matches!(cli.log_file_level, LogLevel::Warn));
    }

    #[test]
    fn test_default_output_uses_script_stem() {
        assert_eq!(
            default_output(Path::new("dialogs/balance.txt")),
            PathBuf::from("balance.wav")
        );
    }
}
