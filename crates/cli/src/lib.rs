pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use renoquote_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use rust_decimal::Decimal;

use crate::commands::{feedback::FeedbackArgs, generate::GenerateArgs};

#[derive(Debug, Parser)]
#[command(
    name = "renoquote",
    about = "Renovation quote generator",
    long_about = "Turn a renovation request transcript into an itemized, priced quote.",
    after_help = "Examples:\n  renoquote generate \"A 4m² bathroom. Remove the old tiles. Located in Paris.\"\n  renoquote generate --file request.txt --stdout\n  renoquote --vat-type standard --output-dir quotes generate --file request.txt\n  renoquote feedback --quote output/PROJ-20260101-120000.json --corrected-total 1100 --notes \"site visit\"\n  renoquote doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load instead of renoquote.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Reference data file (TOML or JSON) to price against")]
    reference_data: Option<PathBuf>,
    #[arg(long, global = true, help = "Directory generated quotes are written to")]
    output_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "VAT rate type applied to quotes")]
    vat_type: Option<String>,
    #[arg(long, global = true, help = "Log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate a quote from a transcript (argument, --file, or stdin)")]
    Generate {
        #[arg(help = "Transcript text")]
        text: Option<String>,
        #[arg(long, conflicts_with = "text", help = "Read the transcript from a file")]
        file: Option<PathBuf>,
        #[arg(long, help = "Write the quote to this path instead of the output directory")]
        output: Option<PathBuf>,
        #[arg(long, conflicts_with = "output", help = "Print the quote JSON instead of saving it")]
        stdout: bool,
    },
    #[command(about = "Record a corrected final price on a saved quote")]
    Feedback {
        #[arg(long, help = "Saved quote JSON to update in place")]
        quote: PathBuf,
        #[arg(long, help = "Corrected final total price")]
        corrected_total: Decimal,
        #[arg(long, help = "Why the price was corrected")]
        notes: String,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and reference data, then price a probe transcript")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                reference_data_path: self.reference_data.clone(),
                output_directory: self.output_dir.clone(),
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                vat_type: self.vat_type.clone(),
            },
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A second initialization (e.g. from tests) is a no-op.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    // Config failures are reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Generate { text, file, output, stdout } => {
            commands::generate::run(options, GenerateArgs { text, file, output, stdout })
        }
        Command::Feedback { quote, corrected_total, notes } => {
            commands::feedback::run(FeedbackArgs { quote, corrected_total, notes })
        }
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
