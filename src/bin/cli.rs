// HistoryMind CLI - Format history Q&A backend responses from the terminal
//
// Usage: historymind <command> [options]

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use historymind::{
    get_settings_path, read_settings, write_settings, FormatReport, FormatterSettings,
    ResponseFormatter, DEFAULT_BANNED_PREFIXES,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Helper to safely serialize JSON for output. Returns error JSON if serialization fails.
fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"JSON serialization failed: {}\"}}", e))
}

#[derive(Parser)]
#[command(
    name = "historymind",
    version = VERSION,
    about = "Format history Q&A backend responses into markdown",
    long_about = None
)]
struct Cli {
    /// Output as JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Log pipeline decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format a backend response as markdown
    Format {
        /// File holding the response (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Show how a response moves through the formatter
    Inspect {
        /// File holding the response (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Manage formatter configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// Restore default settings
    Reset,
    /// Print the settings file path
    Path,
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Format { file } => handle_format(file, cli.json),
        Commands::Inspect { file } => handle_inspect(file, cli.json),
        Commands::Config { action } => handle_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn read_input(file: Option<PathBuf>) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(buf)
        }
    }
}

fn load_formatter() -> Result<ResponseFormatter, String> {
    Ok(ResponseFormatter::new(read_settings()?))
}

// ============================================================================
// Format / Inspect Handlers
// ============================================================================

fn handle_format(file: Option<PathBuf>, json: bool) -> Result<(), String> {
    let input = read_input(file)?;
    let markdown = load_formatter()?.format_text(&input);

    if json {
        println!("{}", to_json(&serde_json::json!({ "markdown": markdown })));
    } else {
        println!("{}", markdown);
    }
    Ok(())
}

fn handle_inspect(file: Option<PathBuf>, json: bool) -> Result<(), String> {
    let input = read_input(file)?;
    let report = load_formatter()?.inspect_text(&input);

    if json {
        println!("{}", to_json(&report));
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &FormatReport) {
    println!("{}", "Response".bold());
    println!();
    println!("  Shape: {}", report.shape.as_str().cyan());
    println!("  Records: {}", report.records_total);
    println!("  Dropped (empty): {}", report.dropped_empty);
    println!("  Dropped (scaffold): {}", report.dropped_scaffold);
    println!("  Dropped (too short): {}", report.dropped_short);
    println!("  Duplicates: {}", report.duplicates);
    if report.answer_used {
        println!("  {}", "Prose answer takes precedence over events".yellow());
    }
    if let Some(reason) = &report.degraded {
        println!("  {} {}", "Degraded:".red(), reason);
    }

    if !report.years.is_empty() {
        println!();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Year", "Kept"]);
        for year in &report.years {
            table.add_row(vec![year.year.clone(), year.kept.to_string()]);
        }
        println!("{table}");
    }

    println!();
    println!("{}", "Output".bold());
    println!();
    println!("{}", report.output);
}

// ============================================================================
// Config Handlers
// ============================================================================

fn handle_config(action: ConfigAction, json: bool) -> Result<(), String> {
    match action {
        ConfigAction::Show => {
            let settings = read_settings()?;
            let path = get_settings_path()?;

            if json {
                println!(
                    "{}",
                    to_json(&serde_json::json!({
                        "settings_path": path.display().to_string(),
                        "settings": settings,
                    }))
                );
            } else {
                println!("{}", "Configuration".bold());
                println!();
                println!("  Settings file: {}", path.display().to_string().dimmed());
                println!("  Key length: {}", settings.key_length);
                println!(
                    "  Min key length: {}",
                    if settings.min_key_length == 0 {
                        "off".dimmed().to_string()
                    } else {
                        settings.min_key_length.to_string()
                    }
                );
                println!(
                    "  Unicode NFC: {}",
                    if settings.unicode_nfc {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
                println!();
                println!("{}", "Banned prefixes".bold());
                println!();
                for prefix in &settings.banned_prefixes {
                    println!("  - {}", prefix.cyan());
                }
            }
        }

        ConfigAction::Set { key, value } => {
            let mut settings = read_settings()?;
            apply_setting(&mut settings, &key, &value)?;
            write_settings(&settings)?;

            if json {
                println!("{}", to_json(&settings));
            } else {
                println!("{} Set {} = {}", "✓".green(), key, value);
            }
        }

        ConfigAction::Reset => {
            let settings = FormatterSettings::default();
            write_settings(&settings)?;

            if json {
                println!("{}", to_json(&settings));
            } else {
                println!("{} Restored default settings", "✓".green());
            }
        }

        ConfigAction::Path => {
            let path = get_settings_path()?;
            if json {
                println!("{}", serde_json::json!({ "settings_path": path.display().to_string() }));
            } else {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn apply_setting(settings: &mut FormatterSettings, key: &str, value: &str) -> Result<(), String> {
    match key {
        "key_length" => {
            settings.key_length = value
                .parse()
                .map_err(|_| "Invalid number for key_length")?;
        }
        "min_key_length" => {
            settings.min_key_length = value
                .parse()
                .map_err(|_| "Invalid number for min_key_length")?;
        }
        "unicode_nfc" | "nfc" => {
            settings.unicode_nfc = value
                .parse()
                .map_err(|_| "Invalid boolean for unicode_nfc")?;
        }
        "banned_prefixes" | "prefixes" => {
            settings.banned_prefixes = if value == "default" {
                DEFAULT_BANNED_PREFIXES.iter().map(|p| p.to_string()).collect()
            } else {
                value
                    .split('|')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            };
        }
        _ => return Err(format!("Unknown config key: {}", key)),
    }

    settings.validate()
}
