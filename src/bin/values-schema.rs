//! Values Schema CLI
//!
//! Command-line interface for generating JSON Schemas from annotated
//! values files and linting their annotations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Generator, Shell};
use tracing::debug;
use values_schema::{
    generate_with, lint, load_override, read_source, spawn, write_output, AnnotateError,
    FileStatus, GenerateOptions, Generated, InferredSchema, Severity, DEFAULT_SCHEMA_URL,
};

#[derive(Parser)]
#[command(name = "values-schema")]
#[command(about = "Generate JSON Schemas from @jsonSchema annotations in YAML values files")]
#[command(version)]
struct Cli {
    /// Increase log detail (-v info, -vv debug)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors and suppress progress output
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a JSON Schema from an annotated values file
    Generate {
        /// Annotated YAML values file
        values: PathBuf,

        /// JSON override merged last: file path or URL (http:// or https://)
        #[arg(long = "override", value_name = "FILE|URL")]
        override_source: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// URI written to the schema's $schema
        #[arg(long, default_value = DEFAULT_SCHEMA_URL)]
        schema_url: String,

        /// Fail when a required annotation targets an object missing from the baseline
        #[arg(long)]
        strict: bool,

        /// Keep repeated names in required arrays
        #[arg(long)]
        keep_duplicates: bool,

        /// Check that the produced document is a valid JSON Schema
        #[arg(long)]
        check: bool,

        /// Run generation on a background worker
        #[arg(long)]
        background: bool,

        /// Give up after this many seconds (implies --background)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print the RFC 6902 patch set instead of the schema
        #[arg(long)]
        patch: bool,
    },

    /// Lint values files for annotation errors (syntax, bad directives, bad flags)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Print a shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

struct GenerateArgs {
    values: PathBuf,
    override_source: Option<String>,
    output: Option<PathBuf>,
    options: GenerateOptions,
    background: bool,
    timeout: Option<u64>,
    patch: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            values,
            override_source,
            output,
            schema_url,
            strict,
            keep_duplicates,
            check,
            background,
            timeout,
            patch,
        } => run_generate(GenerateArgs {
            values,
            override_source,
            output,
            options: GenerateOptions::new()
                .schema_url(schema_url)
                .strict(strict)
                .keep_duplicates(keep_duplicates)
                .check(check),
            background,
            timeout,
            patch,
        }),

        Commands::Lint {
            path,
            format,
            strict,
        } => run_lint(&path, format, strict, cli.quiet),

        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("VALUES_SCHEMA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Logs share the terminal with schema output on stdout.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Print an error and map it to its exit code.
fn fail(e: AnnotateError) -> u8 {
    eprintln!("Error: {}", e);
    if let AnnotateError::Annotations { errors } = &e {
        for error in errors.iter().skip(1) {
            eprintln!("  {}", error);
        }
    }
    e.exit_code() as u8
}

fn run_generate(args: GenerateArgs) -> Result<(), u8> {
    let GenerateArgs {
        values,
        override_source,
        output,
        mut options,
        background,
        timeout,
        patch,
    } = args;

    let source = read_source(&values).map_err(fail)?;

    if let Some(src) = &override_source {
        options = options.override_doc(load_override(src).map_err(fail)?);
    }

    let outcome = if background || timeout.is_some() {
        debug!(timeout = ?timeout, "running on background worker");
        let pending = spawn(source, options);
        match timeout {
            Some(secs) => pending.wait_timeout(Duration::from_secs(secs)),
            None => pending.wait(),
        }
    } else {
        generate_with(&source, &InferredSchema::default(), &options)
    };
    let generated = outcome.map_err(fail)?;

    let rendered = render(&generated, patch).map_err(fail)?;

    match output {
        Some(path) => write_output(&path, &rendered).map_err(fail)?,
        None => print!("{}", rendered),
    }

    Ok(())
}

fn render(generated: &Generated, patch: bool) -> Result<String, AnnotateError> {
    if patch {
        generated.render_patch()
    } else {
        generated.render()
    }
}

fn print_completion<G: Generator>(generator: G) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(generator, &mut command, name, &mut std::io::stdout());
}

fn run_lint(path: &Path, format: Format, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(3);
    }

    let result = lint(path, strict);

    if format == Format::Json {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        // Text output
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                let location = match diag.line {
                    Some(line) => format!("line {}, {}", line, diag.path),
                    None => diag.path.clone(),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, location, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
