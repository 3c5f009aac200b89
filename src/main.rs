//! decafc - Decaf Compiler
//!
//! Compiles Decaf source to MIPS assembly for the SPIM simulator.

mod backend;
mod driver;
mod feedback;
mod frontend;
mod types;
mod utils;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};

use driver::{compile, Compilation, Failure};
use feedback::CompilationFeedback;
use frontend::lexer::dump_tokens;
use frontend::printer;

/// Decaf Compiler
#[derive(Parser, Debug)]
#[command(name = "decafc")]
#[command(version)]
#[command(about = "Decaf compiler - emits MIPS assembly for SPIM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input source file (.decaf)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a source file
    Build {
        /// Input source file
        input: PathBuf,

        /// Write assembly here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Check a source file for errors
    Check {
        /// Input source file
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the syntax tree
    Ast {
        input: PathBuf,
    },
    /// Print the token stream
    Tokens {
        input: PathBuf,
    },
    /// Print the program as canonical, fully parenthesized source
    Fmt {
        input: PathBuf,
    },
    /// Print version information
    Version,
}

/// How diagnostics are reported
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Dispatch a command, returning the exit code
fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Commands::Build { input, output, format }) => build(&input, output.as_deref(), format),
        Some(Commands::Check { input, format }) => check(&input, format),
        Some(Commands::Ast { input }) => ast(&input),
        Some(Commands::Tokens { input }) => tokens(&input),
        Some(Commands::Fmt { input }) => fmt(&input),
        Some(Commands::Version) => {
            println!("decafc {}", env!("CARGO_PKG_VERSION"));
            println!("Decaf Compiler (MIPS/SPIM)");
            println!("License: Apache-2.0");
            Ok(0)
        }
        None => match cli.input {
            Some(input) => compile_file(&input, cli.output.as_deref()),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: decafc <FILE> or decafc build <FILE>");
                Ok(1)
            }
        },
    }
}

/// Read a source file; `None` once the missing-file message is printed
fn read_source(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        println!("Error: File '{}' not found.", path.display());
        return Ok(None);
    }
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!("read {} bytes from {}", source.len(), path.display());
    Ok(Some(source))
}

fn report_failure(compilation: &Compilation, input: &Path, failure: &Failure, format: Format) {
    match format {
        Format::Text => println!("{}", failure.rendered),
        Format::Json => {
            let feedback = CompilationFeedback::failure(
                input.display().to_string(),
                &failure.errors,
                compilation.stats(None),
            );
            println!("{}", feedback.to_json());
        }
    }
}

/// Compile a source file, printing diagnostics as text
fn compile_file(input: &Path, output: Option<&Path>) -> Result<i32> {
    let Some(source) = read_source(input)? else {
        return Ok(1);
    };

    match compile(&source) {
        Ok(assembly) => {
            match output {
                Some(path) => fs::write(path, &assembly)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{}", assembly),
            }
            Ok(0)
        }
        Err(failure) => {
            println!("{}", failure);
            Ok(1)
        }
    }
}

/// Compile a source file to assembly
fn build(input: &Path, output: Option<&Path>, format: Format) -> Result<i32> {
    let Some(source) = read_source(input)? else {
        return Ok(1);
    };

    let compilation = Compilation::scan(&source);
    let artifact = match compilation.compile() {
        Ok(artifact) => artifact,
        Err(failure) => {
            info!("{} failed in the {:?} stage", input.display(), failure.stage);
            report_failure(&compilation, input, &failure, format);
            return Ok(1);
        }
    };

    match output {
        Some(path) => fs::write(path, &artifact.assembly)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None if format == Format::Text => print!("{}", artifact.assembly),
        None => {}
    }

    if format == Format::Json {
        let feedback = CompilationFeedback::success(
            input.display().to_string(),
            compilation.stats(Some(&artifact)),
        );
        println!("{}", feedback.to_json());
    }
    Ok(0)
}

/// Check a source file for errors without generating code
fn check(input: &Path, format: Format) -> Result<i32> {
    let Some(source) = read_source(input)? else {
        return Ok(1);
    };

    let compilation = Compilation::scan(&source);
    match compilation.check() {
        Ok(_) => {
            if format == Format::Json {
                let feedback =
                    CompilationFeedback::success(input.display().to_string(), compilation.stats(None));
                println!("{}", feedback.to_json());
            }
            Ok(0)
        }
        Err(failure) => {
            report_failure(&compilation, input, &failure, format);
            Ok(1)
        }
    }
}

fn ast(input: &Path) -> Result<i32> {
    let Some(source) = read_source(input)? else {
        return Ok(1);
    };

    let compilation = Compilation::scan(&source);
    match compilation.parse() {
        Ok(program) => {
            print!("{}", printer::dump(&program));
            Ok(0)
        }
        Err(error) => {
            println!("{}", compilation.failure(vec![error]).rendered);
            Ok(1)
        }
    }
}

fn tokens(input: &Path) -> Result<i32> {
    let Some(source) = read_source(input)? else {
        return Ok(1);
    };

    let compilation = Compilation::scan(&source);
    print!("{}", dump_tokens(compilation.tokens()));
    Ok(0)
}

fn fmt(input: &Path) -> Result<i32> {
    let Some(source) = read_source(input)? else {
        return Ok(1);
    };

    let compilation = Compilation::scan(&source);
    match compilation.parse() {
        Ok(program) => {
            print!("{}", printer::render(&program));
            Ok(0)
        }
        Err(error) => {
            println!("{}", compilation.failure(vec![error]).rendered);
            Ok(1)
        }
    }
}
