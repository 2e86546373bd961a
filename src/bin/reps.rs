//! Reps CLI - Command-line interface for Synheart Reps
//!
//! Commands:
//! - count: Count reps in a recorded pose file (batch mode)
//! - run: Process pose frames streamed on stdin (streaming mode)
//! - validate: Check a pose file for malformed frames
//! - exercises: List the exercise catalogue
//! - doctor: Diagnose configuration and catalogue health

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_reps::config::PipelineConfig;
use synheart_reps::definition::ExerciseRegistry;
use synheart_reps::exercises::ExerciseKind;
use synheart_reps::frames::FrameAdapter;
use synheart_reps::pipeline::RepProcessor;
use synheart_reps::pose::PoseFrame;
use synheart_reps::{PRODUCER_NAME, REPS_VERSION};

/// Reps - On-device repetition counting and form scoring
#[derive(Parser)]
#[command(name = "reps")]
#[command(author = "Synheart AI Inc")]
#[command(version = REPS_VERSION)]
#[command(about = "Count exercise reps from 2D pose keypoints", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Replacement exercise catalogue (JSON array of definitions)
    #[arg(long, global = true)]
    definitions: Option<PathBuf>,

    /// Log level written to stderr
    #[arg(long, global = true, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Subcommand)]
enum Commands {
    /// Count reps in a recorded pose file (batch mode)
    Count {
        /// Exercise identifier (pushup, squat, lunges, plank)
        #[arg(short, long)]
        exercise: String,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Challenge target; omit for free practice
        #[arg(long)]
        target_reps: Option<u32>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Process NDJSON pose frames from stdin (streaming mode)
    Run {
        /// Exercise identifier (pushup, squat, lunges, plank)
        #[arg(short, long)]
        exercise: String,

        /// Challenge target; omit for free practice
        #[arg(long)]
        target_reps: Option<u32>,

        /// Flush output after each frame
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Check a pose file for malformed frames
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the exercise catalogue
    Exercises {
        /// Output full definitions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and catalogue health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(cli.global.log_level))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RepsCliError> {
    let global = cli.global;

    match cli.command {
        Commands::Count {
            exercise,
            input,
            input_format,
            target_reps,
            output_format,
        } => {
            let processor = build_processor(&global, &exercise, target_reps)?;
            cmd_count(processor, &input, input_format, output_format)
        }

        Commands::Run {
            exercise,
            target_reps,
            flush,
        } => {
            let processor = build_processor(&global, &exercise, target_reps)?;
            cmd_run(processor, flush)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Exercises { json } => cmd_exercises(&load_registry(&global)?, json),

        Commands::Doctor { json } => cmd_doctor(&global, json),
    }
}

fn cmd_count(
    mut processor: RepProcessor,
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), RepsCliError> {
    let frames = read_frames(input, input_format)?;

    if frames.is_empty() {
        return Err(RepsCliError::NoFrames);
    }

    let summary = processor.count(&frames)?;

    let output = match output_format {
        OutputFormat::Json => serde_json::to_string(&summary)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&summary)?,
    };
    println!("{}", output);

    Ok(())
}

fn cmd_run(mut processor: RepProcessor, flush: bool) -> Result<(), RepsCliError> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let frame: PoseFrame = serde_json::from_str(trimmed).map_err(|e| {
            RepsCliError::ParseError(format!("Failed to parse frame on line {}: {}", line_num + 1, e))
        })?;

        let outcome = processor.process_frame(&frame)?;
        writeln!(stdout, "{}", serde_json::to_string(&outcome)?)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), RepsCliError> {
    let frames = read_frames(input, input_format)?;
    let issues = FrameAdapter::validate_frames(&frames);

    let invalid = FrameAdapter::invalid_frames(&issues);

    let report = ValidationReport {
        total_frames: frames.len(),
        valid_frames: frames.len() - invalid.len(),
        invalid_frames: invalid.len(),
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!("  - Frame {}: {}", issue.index, issue.problem);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(RepsCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_exercises(registry: &ExerciseRegistry, json: bool) -> Result<(), RepsCliError> {
    if json {
        println!("{}", registry.to_json()?);
        return Ok(());
    }

    println!("Exercises");
    println!("=========");
    for definition in registry.definitions() {
        println!();
        println!("{} ({}) - {} points", definition.name, definition.id, definition.points);
        println!("  {}", definition.description);
        println!("  How: {}", definition.instructions);
        if !definition.tip.is_empty() {
            println!("  Tip: {}", definition.tip);
        }
        for (angle, range) in &definition.target_angles {
            println!("  {:<10} {:>5.0}..{:<5.0}", angle.as_str(), range.min, range.max);
        }
    }

    Ok(())
}

fn cmd_doctor(global: &GlobalArgs, json: bool) -> Result<(), RepsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "reps_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Reps version {}", REPS_VERSION),
    });

    checks.push(match load_config(global.config.as_deref()) {
        Ok(config) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Pipeline config valid (acceptance threshold {:.2}, rep interval {} ms)",
                config.acceptance_threshold(),
                config.min_pose_interval_ms
            ),
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: cli_message(&e),
        },
    });

    checks.push(match load_registry(global) {
        Ok(registry) => {
            let missing: Vec<&str> = ExerciseKind::ALL
                .iter()
                .filter(|kind| registry.get(**kind).is_none())
                .map(|kind| kind.as_str())
                .collect();
            if missing.is_empty() {
                DoctorCheck {
                    name: "definitions".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("{} exercise definitions loaded", registry.len()),
                }
            } else {
                DoctorCheck {
                    name: "definitions".to_string(),
                    status: CheckStatus::Warning,
                    message: format!("No definition for: {}", missing.join(", ")),
                }
            }
        }
        Err(e) => DoctorCheck {
            name: "definitions".to_string(),
            status: CheckStatus::Error,
            message: cli_message(&e),
        },
    });

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: REPS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Reps Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(RepsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn build_processor(
    global: &GlobalArgs,
    exercise: &str,
    target_reps: Option<u32>,
) -> Result<RepProcessor, RepsCliError> {
    let kind: ExerciseKind = exercise.parse()?;
    let config = load_config(global.config.as_deref())?;
    let registry = load_registry(global)?;

    let mut processor = RepProcessor::with_registry(registry, kind, config)?;
    if let Some(target) = target_reps {
        processor = processor.with_target_reps(target);
    }
    Ok(processor)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, RepsCliError> {
    match path {
        Some(path) => Ok(PipelineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn load_registry(global: &GlobalArgs) -> Result<ExerciseRegistry, RepsCliError> {
    match &global.definitions {
        Some(path) => Ok(ExerciseRegistry::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ExerciseRegistry::builtin()),
    }
}

fn read_frames(input: &Path, input_format: InputFormat) -> Result<Vec<PoseFrame>, RepsCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let frames = match input_format {
        InputFormat::Ndjson => FrameAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => FrameAdapter::parse_array(&input_data)?,
    };
    Ok(frames)
}

fn cli_message(e: &RepsCliError) -> String {
    match e {
        RepsCliError::Io(e) => e.to_string(),
        RepsCliError::Compute(e) => e.to_string(),
        RepsCliError::Json(e) => e.to_string(),
        other => format!("{:?}", other),
    }
}

// Error types

#[derive(Debug)]
enum RepsCliError {
    Io(io::Error),
    Compute(synheart_reps::ComputeError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for RepsCliError {
    fn from(e: io::Error) -> Self {
        RepsCliError::Io(e)
    }
}

impl From<synheart_reps::ComputeError> for RepsCliError {
    fn from(e: synheart_reps::ComputeError) -> Self {
        RepsCliError::Compute(e)
    }
}

impl From<serde_json::Error> for RepsCliError {
    fn from(e: serde_json::Error) -> Self {
        RepsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RepsCliError> for CliError {
    fn from(e: RepsCliError) -> Self {
        use synheart_reps::ComputeError;

        match e {
            RepsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RepsCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::UnknownExercise(_) => (
                        "UNKNOWN_EXERCISE",
                        "Run 'reps exercises' to list available exercises",
                    ),
                    ComputeError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'reps doctor --config <file>' for details")
                    }
                    ComputeError::InvalidDefinition(_) => (
                        "INVALID_DEFINITION",
                        "Run 'reps doctor --definitions <file>' for details",
                    ),
                    ComputeError::OutOfOrderFrame(_) => {
                        ("OUT_OF_ORDER_FRAME", "Frames must be sorted by timestamp")
                    }
                    _ => ("PARSE_ERROR", "Ensure input frames match the PoseFrame format"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            RepsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RepsCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No pose frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            RepsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            RepsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            RepsCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    valid_frames: usize,
    invalid_frames: usize,
    issues: Vec<synheart_reps::frames::FrameIssue>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
