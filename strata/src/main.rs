//! Strata CLI

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use strata::error::{EngineError, report_error};
use strata::{Concrete, FsLoader, Inference, evaluate_project};

#[derive(Parser)]
#[command(name = "strata", version, about = "Strata - abstract interpretation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a module concretely and print its result value
    Run {
        /// Root module to evaluate
        file: PathBuf,
    },
    /// Infer the module's result type
    Infer {
        /// Root module to analyze
        file: PathBuf,
    },
    /// Parse and dump AST (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { file } => run_file(&file),
        Command::Infer { file } => infer_file(&file),
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = FsLoader::new();
    let report = evaluate_project(Concrete, &mut loader, &[module_path(path)]);
    match report.result {
        Ok(value) => {
            println!("{value}");
            Ok(())
        }
        Err(err) => {
            render(path, &err);
            std::process::exit(1);
        }
    }
}

fn infer_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = FsLoader::new();
    let report = evaluate_project(Inference::new(), &mut loader, &[module_path(path)]);
    match report.result {
        Ok(ty) => {
            println!("{}", report.domain.zonk(&ty));
            Ok(())
        }
        Err(err) => {
            render(path, &err);
            std::process::exit(1);
        }
    }
}

fn parse_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let tokens = strata::lexer::tokenize(&source)?;
    let ast = strata::parser::parse(&filename, &source, tokens)?;

    println!("{}", serde_json::to_string_pretty(&ast)?);
    Ok(())
}

fn tokenize_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    let tokens = strata::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(())
}

/// Module paths are given without extension; strip `.sta` when present
fn module_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "sta") {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// Render a diagnostic against the module it names, falling back to the
/// root file
fn render(root: &Path, err: &EngineError) {
    let module = match err {
        EngineError::LookupPath { module, .. } => PathBuf::from(module),
        _ => module_path(root),
    };
    let file = if module.extension().is_none() {
        module.with_extension("sta")
    } else {
        module
    };
    let source = std::fs::read_to_string(&file).unwrap_or_default();
    report_error(&file.display().to_string(), &source, err);
}
