use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use anyhow::Result;
use locklevel::{analyze_file, Config, Report};
use std::fs;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "locklevel")]
#[command(about = "Static guard and lock-level checker")]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check .lkl files, or directories of them
    Check {
        /// Input files or directories
        #[arg(value_name = "PATH", required = true)]
        inputs: Vec<PathBuf>,

        /// Order callee effects against held frames at call sites
        #[arg(long)]
        strict_calls: bool,

        /// Check top-level statements like routine code
        #[arg(long)]
        no_toplevel_exemption: bool,

        /// Report at most N diagnostics per file
        #[arg(long, value_name = "N")]
        max_diagnostics: Option<usize>,
    },

    /// Print each routine's effective lock level
    Effects {
        /// Input .lkl file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Parse a .lkl file and show the AST
    Parse {
        /// Input .lkl file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show detailed AST information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Lexically analyze a .lkl file
    Lex {
        /// Input .lkl file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show token locations
        #[arg(short, long)]
        locations: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match &cli.command {
        Commands::Check { inputs, strict_calls, no_toplevel_exemption, max_diagnostics } => {
            let mut config = Config::from_env().with_max_diagnostics(*max_diagnostics);
            if *strict_calls {
                config = config.with_call_site_ordering(true);
            }
            if *no_toplevel_exemption {
                config = config.with_top_level_exemption(false);
            }
            config.validate()?;
            if !check_paths(inputs, &config)? {
                std::process::exit(1);
            }
        }
        Commands::Effects { input } => {
            print_effects(input)?;
        }
        Commands::Parse { input, detailed } => {
            parse_file(input, *detailed)?;
        }
        Commands::Lex { input, locations } => {
            lex_file(input, *locations)?;
        }
    }

    Ok(())
}

/// Expand directories into the `.lkl` files below them, in a stable order.
fn collect_sources(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input) {
                let entry = entry?;
                if entry.file_type().is_file() && entry.path().extension().map_or(false, |ext| ext == "lkl") {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Returns false if any file failed to parse or has error diagnostics.
fn check_paths(inputs: &[PathBuf], config: &Config) -> Result<bool> {
    let files = collect_sources(inputs)?;
    log::debug!("checking {} file(s)", files.len());

    let mut clean = true;
    let (mut errors, mut warnings) = (0usize, 0usize);
    for file in &files {
        match analyze_file(file, config) {
            Ok(report) => {
                print_report(file, &report);
                errors += report.errors().count();
                warnings += report.warnings().count();
                clean &= report.is_clean();
            }
            Err(e) => {
                eprintln!("{}", e);
                clean = false;
            }
        }
    }

    println!(
        "{} file(s) checked: {} error(s), {} warning(s)",
        files.len(),
        errors,
        warnings
    );
    Ok(clean)
}

fn print_report(file: &Path, report: &Report) {
    for diagnostic in &report.diagnostics {
        println!("{}: {}", file.display(), diagnostic);
    }
}

fn print_effects(input: &PathBuf) -> Result<()> {
    let report = analyze_file(input, &Config::from_env())?;
    for (name, effect) in &report.effects {
        match effect.declared {
            Some(declared) => println!("{}: effect {} (inferred {}, declared {})", name, effect.signature(), effect.inferred, declared),
            None => println!("{}: effect {} (inferred)", name, effect.signature()),
        }
    }
    Ok(())
}

fn parse_file(input: &PathBuf, detailed: bool) -> Result<()> {
    let source = fs::read_to_string(input)?;
    let program = locklevel::parser::parse_program(&source)?;

    if detailed {
        println!("{:#?}", program);
    } else {
        println!("{}", program);
    }

    Ok(())
}

fn lex_file(input: &PathBuf, locations: bool) -> Result<()> {
    let source = fs::read_to_string(input)?;
    let lexer = locklevel::parser::Lexer::new(&source);
    let tokens = lexer
        .tokenize()
        .map_err(|e| anyhow::anyhow!("Lexical error at {}: unexpected `{}`", e.location, e.text))?;

    for token in tokens {
        if locations {
            println!("{:?} at {}:{}", token.token_type(), token.location().line, token.location().column);
        } else {
            println!("{:?}: '{}'", token.token_type(), token.lexeme());
        }
    }

    Ok(())
}
