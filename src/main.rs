//! bodyscope - inspect captured HTTP response bodies from the terminal

use std::path::PathBuf;

use bodyscope::body::headers::HeaderSet;
use bodyscope::capture::{self, parse_header_arg};
use bodyscope::{BodyInspector, BodyKind, CapturedBody, DecodeOptions, DisplayResult, InspectorConfig};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "BODYSCOPE_LOG";

#[derive(Parser, Debug)]
#[command(name = "bodyscope", version, about = "Decode and classify captured HTTP response bodies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one captured body for display
    Inspect {
        /// JSON capture file (`{"body": "<base64>", "headers": {...}}`), `-` for stdin
        #[arg(long, conflicts_with = "raw", required_unless_present = "raw")]
        capture: Option<PathBuf>,
        /// Raw body file, `-` for stdin
        #[arg(long)]
        raw: Option<PathBuf>,
        /// Extra header, e.g. -H "Content-Encoding: gzip" (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header_arg)]
        headers: Vec<(String, String)>,
        /// Override the Content-Type header
        #[arg(long)]
        content_type: Option<String>,
        /// Maximum bytes to materialize
        #[arg(long)]
        max_preview: Option<usize>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize two captured bodies side by side
    Diff {
        /// Left capture file
        left: PathBuf,
        /// Right capture file
        right: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Inspect {
            capture,
            raw,
            headers,
            content_type,
            max_preview,
            json,
        } => {
            inspect(
                capture,
                raw,
                headers,
                DecodeOptions {
                    content_type,
                    max_preview_bytes: max_preview,
                },
                json,
            )
            .await
        }
        Command::Diff { left, right } => diff(left, right),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "✗".red(), e);
        std::process::exit(1);
    }
}

async fn inspect(
    capture: Option<PathBuf>,
    raw: Option<PathBuf>,
    extra_headers: Vec<(String, String)>,
    options: DecodeOptions,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut captured = match (capture, raw) {
        (Some(path), _) => capture::load_capture(&path)?,
        (None, Some(path)) => capture::load_raw(&path, HeaderSet::new())?,
        (None, None) => return Err("either --capture or --raw is required".into()),
    };

    // Command-line headers take precedence over captured ones.
    if !extra_headers.is_empty() {
        let mut headers: HeaderSet = extra_headers.into_iter().collect();
        for (name, value) in captured.headers.iter() {
            headers.insert(name, value);
        }
        captured.headers = headers;
    }

    let inspector = BodyInspector::new(InspectorConfig::default());
    let CapturedBody { body, headers } = captured;
    let result = inspector
        .decode_body_for_display(body, headers, options)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &DisplayResult) {
    let kind = match result.kind {
        BodyKind::Empty => "empty".dimmed(),
        BodyKind::Text => "text".green(),
        BodyKind::Binary => "binary".yellow(),
    };
    println!("{} {}", "Kind:".bold(), kind);
    println!("{} {} bytes", "Size:".bold(), result.size);
    if let Some(content_type) = &result.content_type {
        println!("{} {}", "Content-Type:".bold(), content_type);
    }
    if let Some(encoding) = &result.content_encoding {
        println!("{} {}", "Content-Encoding:".bold(), encoding);
    }
    if let Some(charset) = &result.charset {
        println!("{} {}", "Charset:".bold(), charset);
    }
    if let Some(detected) = &result.detected_type {
        println!("{} {}", "Detected:".bold(), detected);
    }
    if result.truncated {
        println!("{} {}", "Truncated:".bold(), "yes".yellow());
    }
    if let Some(warning) = &result.warning {
        println!("{} {}", "⚠".yellow(), warning.yellow());
    }
    if let Some(text) = &result.text {
        println!();
        println!("{}", text);
    }
}

fn diff(left: PathBuf, right: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let inspector = BodyInspector::default();
    let left_capture = capture::load_capture(&left)?;
    let right_capture = capture::load_capture(&right)?;

    let left_summary =
        inspector.summarize_body_for_diff(left_capture.body.as_deref(), &left_capture.headers);
    let right_summary =
        inspector.summarize_body_for_diff(right_capture.body.as_deref(), &right_capture.headers);

    let show = |summary: &Option<String>| summary.clone().unwrap_or_else(|| "(no body)".to_string());
    println!("{} {}", "◀".cyan(), left.display());
    println!("{}", show(&left_summary));
    println!("{} {}", "▶".cyan(), right.display());
    println!("{}", show(&right_summary));

    if left_summary == right_summary {
        println!("{} Bodies match", "●".green());
    } else {
        println!("{} Bodies differ", "○".yellow());
    }
    Ok(())
}
