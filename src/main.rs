// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};

use w3translate::app_config::{Config, LogLevel, SyncMode, TranslationProvider};
use w3translate::pipeline::{CampaignTranslator, PipelineStage, ProgressCallback, RunProgress};
use w3translate::Language;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Google,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Mock,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Google => TranslationProvider::Google,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Mock => TranslationProvider::Mock,
        }
    }
}

/// CLI Wrapper for SyncMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSyncMode {
    Preserve,
    Synchronize,
}

impl From<CliSyncMode> for SyncMode {
    fn from(cli_mode: CliSyncMode) -> Self {
        match cli_mode {
            CliSyncMode::Preserve => SyncMode::Preserve,
            CliSyncMode::Synchronize => SyncMode::Synchronize,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a campaign archive
    Translate(TranslateArgs),

    /// Generate shell completions for w3translate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Campaign archive (.w3n) to translate
    #[arg(value_name = "CAMPAIGN")]
    input_path: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Source language, by name or code (e.g. 'chinese', 'zh-cn')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language, by name or code (e.g. 'english', 'en')
    #[arg(short, long)]
    target_language: Option<String>,

    /// How identifiers with a dictionary entry are translated
    #[arg(short, long, value_enum)]
    mode: Option<CliSyncMode>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Identifier dictionary (JSON or numbered text)
    #[arg(short, long)]
    dictionary: Option<PathBuf>,

    /// Path to the mpqcli executable
    #[arg(long)]
    tool_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// w3translate - Warcraft III campaign translator
///
/// Translates the string tables of a campaign and its maps, keeping strings
/// the map scripts depend on consistent.
#[derive(Parser, Debug)]
#[command(name = "w3translate")]
#[command(version)]
#[command(about = "Warcraft III campaign translation tool")]
#[command(long_about = "w3translate extracts a Warcraft III campaign with mpqcli, translates its string tables and repacks it.

EXAMPLES:
    w3translate translate Campaign.w3n                     # Translate using conf.json
    w3translate translate -s zh-cn -t en Campaign.w3n      # Chinese to English
    w3translate translate -m preserve -d dict.txt a.w3n    # Keep dictionary terms verbatim
    w3translate completions bash > w3translate.bash        # Generate bash completions

OUTPUT:
    backup/      verified copy of the input, named <name>_<timestamp>.w3n
    translated/  the translated campaign
    protected/   translated copies of protected maps

SUPPORTED PROVIDERS:
    google    - Google Translate (Cloud API when a key is configured)
    openai    - OpenAI-compatible API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    mock      - Offline backend that only tags texts")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Level is lowered or raised once the config is known
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::FAILURE;
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "w3translate", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load `conf.json`, or write a default one when it does not exist
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

fn apply_overrides(config: &mut Config, options: &TranslateArgs) -> Result<()> {
    if let Some(source) = &options.source_language {
        config.source_language = source.parse::<Language>()?;
    }
    if let Some(target) = &options.target_language {
        config.target_language = target.parse::<Language>()?;
    }
    if let Some(mode) = &options.mode {
        config.mode = mode.clone().into();
    }
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(dictionary) = &options.dictionary {
        config.identifiers.dictionary_path = Some(dictionary.clone());
    }
    if let Some(tool_path) = &options.tool_path {
        config.archive.tool_path = tool_path.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    Ok(())
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut config = load_config(&options.config_path)?;
    apply_overrides(&mut config, &options)?;
    log::set_max_level(level_filter(&config.log_level));

    config.validate().context("Configuration validation failed")?;

    let source = config.source_language;
    let target = config.target_language;
    let mode = config.mode;
    info!(
        "Translating {:?} from {} to {} with {} ({:?} mode)",
        options.input_path,
        source,
        target,
        config.translation.provider.display_name(),
        mode
    );

    let translator = CampaignTranslator::from_config(config)?;

    let progress_bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} maps {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("=> "));

    let pb = progress_bar.clone();
    let on_progress = move |progress: RunProgress| {
        pb.set_length(progress.maps_total as u64);
        pb.set_position(progress.maps_done as u64);
        let message = match (&progress.map, progress.stage) {
            (Some(map), stage) => format!("{}: {}", map, stage),
            (None, PipelineStage::Done) => "done".to_string(),
            (None, stage) => stage.to_string(),
        };
        pb.set_message(message);
    };

    let outcome = translator
        .translate_campaign_with_progress(&options.input_path, source, target, mode, Some(&on_progress as &ProgressCallback))
        .await;
    progress_bar.finish_and_clear();
    let outcome = outcome?;

    info!("Backup: {:?}", outcome.backup_path);
    info!("Translated campaign: {:?}", outcome.translated_path);
    for path in &outcome.protected_map_paths {
        info!("Protected map: {:?}", path);
    }

    let summary = outcome.report.summary();
    if outcome.report.is_degraded() {
        warn!("{}", summary);
    } else {
        info!("{}", summary);
    }

    Ok(())
}
