use std::{error::Error, path::PathBuf, sync::Arc, sync::mpsc, time::Duration};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesnap::{
    EventLog, FfmpegDecoder, FfmpegLogLevel, MediaHandle, MediaSource, NoOpLog, OverlayFont,
    SamplePlan, SnapshotRequest, Snapshotter, format_clock,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framesnap snapshot input.mp4 --count 5 --out shots\n  framesnap snapshot input.mp4 --count-per-minute 2 --prefix \"Cam 1\" --json\n  framesnap plan --duration 0:02:10 --count 3\n  framesnap probe input.mp4\n  framesnap completions zsh > _framesnap";

#[derive(Debug, Parser)]
#[command(
    name = "framesnap",
    version,
    about = "Sample timestamped JPEG snapshots from video files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show request-level log events on stderr.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write evenly-spaced snapshots of a video.
    #[command(
        about = "Take snapshots",
        after_help = "Examples:\n  framesnap snapshot input.mp4 --count 3 --out shots\n  framesnap snapshot file:///sdcard/clip.mp4 --no-time-stamp --quality 70"
    )]
    Snapshot {
        /// Input media path, file:// URI, or URL.
        input: String,
        /// Number of snapshots.
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Snapshots per minute of video; overrides --count when non-zero.
        #[arg(long, default_value_t = 0)]
        count_per_minute: u32,
        /// JPEG quality (0-100).
        #[arg(long, default_value_t = 90)]
        quality: u8,
        /// Do not draw the elapsed-time label.
        #[arg(long)]
        no_time_stamp: bool,
        /// Text drawn before the clock.
        #[arg(long, default_value = "")]
        prefix: String,
        /// Label size in pixels at a 1280-pixel frame width.
        #[arg(long, default_value_t = 48)]
        text_size: u32,
        /// Output directory (defaults to the pictures directory).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Font file for the label (defaults to a discovered system font).
        #[arg(long)]
        font: Option<PathBuf>,
        /// Print the JSON response instead of one path per line.
        #[arg(long)]
        json: bool,
        /// Render sample points across threads (requires the `rayon` feature).
        #[arg(long)]
        parallel: bool,
    },

    /// Print the sample plan for a duration without opening any media.
    #[command(about = "Print a sample plan")]
    Plan {
        /// Video duration in seconds or [HH:]MM:SS[.fff].
        #[arg(long)]
        duration: String,
        /// Number of snapshots.
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Snapshots per minute of video.
        #[arg(long, default_value_t = 0)]
        count_per_minute: u32,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the duration of a video.
    #[command(about = "Print media duration")]
    Probe {
        /// Input media path, file:// URI, or URL.
        input: String,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Colored stderr sink for request-level events.
struct TerminalLog;

impl EventLog for TerminalLog {
    fn info(&self, tag: &str, message: &str) {
        eprintln!("{} {message}", format!("[{tag}]").cyan().bold());
    }

    fn error(&self, tag: &str, message: &str, cause: &dyn Error) {
        eprintln!(
            "{} {} {}",
            format!("[{tag}]").red().bold(),
            message.red(),
            format!("({cause})").dimmed()
        );
    }
}

/// Parse seconds (`130`, `130.5`) or `[HH:]MM:SS[.fff]` into milliseconds.
fn parse_duration_ms(value: &str) -> Result<u64, Box<dyn Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration cannot be empty".into());
    }

    let total_seconds = if let Ok(seconds) = trimmed.parse::<f64>() {
        seconds
    } else {
        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [hours, minutes, seconds] => (hours.parse::<u64>()?, minutes.parse::<u64>()?, *seconds),
            [minutes, seconds] => (0, minutes.parse::<u64>()?, *seconds),
            _ => return Err(format!("invalid duration format: {trimmed}").into()),
        };
        (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds.parse::<f64>()?
    };

    if !total_seconds.is_finite() || total_seconds < 0.0 {
        return Err(format!("invalid duration: {trimmed}").into());
    }
    Ok((total_seconds * 1000.0).round() as u64)
}

fn event_log(global: &GlobalOptions) -> Arc<dyn EventLog> {
    if global.verbose {
        Arc::new(TerminalLog)
    } else {
        Arc::new(NoOpLog)
    }
}

fn apply_global_options(global: &GlobalOptions) {
    if let Some(level) = global.log_level {
        framesnap::set_ffmpeg_log_level(level);
    }
}

fn spinner(message: String) -> Result<ProgressBar, Box<dyn Error>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global);

    match cli.command {
        Commands::Snapshot {
            input,
            count,
            count_per_minute,
            quality,
            no_time_stamp,
            prefix,
            text_size,
            out,
            font,
            json,
            parallel,
        } => {
            let request = SnapshotRequest::new(input.clone())
                .with_count(count)
                .with_count_per_minute(count_per_minute)
                .with_quality(quality)
                .with_time_stamp(!no_time_stamp)
                .with_prefix(prefix)
                .with_text_size(text_size);

            let mut snapshotter = Snapshotter::new().with_logger(event_log(&cli.global));
            if let Some(directory) = out {
                snapshotter = snapshotter.with_output_directory(directory);
            }
            if let Some(path) = font {
                snapshotter = snapshotter.with_font(OverlayFont::from_file(path)?);
            }
            #[cfg(feature = "rayon")]
            {
                snapshotter = snapshotter.with_parallel(parallel);
            }
            #[cfg(not(feature = "rayon"))]
            if parallel {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    "--parallel requires building with the `rayon` feature".yellow()
                );
            }

            let progress = spinner(format!("Sampling {input}"))?;
            let (sender, receiver) = mpsc::channel();
            let worker = snapshotter.submit(request, move |result| {
                // The receiver outlives the worker.
                let _ = sender.send(result);
            })?;
            let result = receiver.recv()?;
            progress.finish_and_clear();
            if worker.join().is_err() {
                return Err("snapshot worker panicked".into());
            }

            let snapshots = result?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshots.to_json())?);
            } else {
                for path in &snapshots.paths {
                    println!("{}", path.display());
                }
                if cli.global.verbose {
                    eprintln!(
                        "{} {} snapshot(s) from {}",
                        "done:".green().bold(),
                        snapshots.paths.len(),
                        format_clock(snapshots.duration_ms)
                    );
                }
            }
        }
        Commands::Plan {
            duration,
            count,
            count_per_minute,
            json,
        } => {
            let duration_ms = parse_duration_ms(&duration)?;
            let plan = SamplePlan::new(duration_ms, count, count_per_minute);
            if json {
                let payload = json!({
                    "duration_ms": plan.duration_ms(),
                    "count": plan.count(),
                    "delta_ms": plan.delta_ms(),
                    "points": plan.points(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (index, time_ms) in plan.iter() {
                    println!("{index:>4}  {time_ms:>10} ms  {}", format_clock(time_ms));
                }
                if plan.is_empty() {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "no sample point fits in this duration".yellow()
                    );
                }
            }
        }
        Commands::Probe { input, json } => {
            let source = MediaSource::parse(&input)?;
            let decoder = FfmpegDecoder::new();
            let mut handle = MediaHandle::open(&decoder, &source, event_log(&cli.global))?;
            let duration_ms = handle.probe_duration_ms()?;
            if json {
                let payload = json!({
                    "source": source.as_str(),
                    "file_name": source.file_name(),
                    "duration_ms": duration_ms,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} ({duration_ms} ms)", format_clock(duration_ms));
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesnap", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_duration_ms};
    use clap::{CommandFactory, Parser};

    #[test]
    fn parse_duration_formats() {
        assert_eq!(parse_duration_ms("130").unwrap(), 130_000);
        assert_eq!(parse_duration_ms("02:10").unwrap(), 130_000);
        assert_eq!(parse_duration_ms("00:02:10.5").unwrap(), 130_500);
        assert!(parse_duration_ms("").is_err());
        assert!(parse_duration_ms("1:2:3:4").is_err());
        assert!(parse_duration_ms("-5").is_err());
    }

    #[test]
    fn log_level_flag_accepts_aliases() {
        let cli = Cli::try_parse_from(["framesnap", "--log-level", "warn", "plan", "--duration", "60"])
            .unwrap();
        assert!(cli.global.log_level.is_some());
        assert!(
            Cli::try_parse_from(["framesnap", "--log-level", "loud", "plan", "--duration", "60"])
                .is_err()
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
