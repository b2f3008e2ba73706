//! `cinder` command-line driver.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cinder::bytecode::Image;
use cinder::bytecode::disasm::print_bc;
use cinder::frontend::lexer::Lexer;
use cinder::frontend::token_dumper::TokenDumper;
use cinder::runtime::{Vm, VmConfig};
use cinder::{CinderError, analyze_source, compile_source, parse_source};

const SOURCE_EXTENSION: &str = "cn";

#[derive(Parser)]
#[command(name = "cinder", about = "Compiler and stack VM for the Cinder language", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and execute a program; the exit status is main's return value
    Run {
        file: PathBuf,
        #[command(flatten)]
        vm: VmArgs,
    },
    /// Report every scope and type error
    Check { file: PathBuf },
    /// Dump the token stream
    Tokens {
        file: PathBuf,
        #[arg(long)]
        no_color: bool,
        /// Also show each token's debug representation
        #[arg(long)]
        pretty: bool,
    },
    /// Print the parsed tree
    Ast { file: PathBuf },
    /// Print the generated bytecode
    Disasm { file: PathBuf },
    /// Compile to a bytecode image
    Build {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify and execute a bytecode image
    Exec {
        image: PathBuf,
        #[command(flatten)]
        vm: VmArgs,
    },
}

#[derive(Args)]
struct VmArgs {
    /// Cells available to the stack
    #[arg(long, default_value_t = VmConfig::default().stack_cells)]
    stack_cells: usize,

    /// Abort after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Seed for `random`
    #[arg(long, default_value_t = VmConfig::default().seed)]
    seed: u64,
}

impl From<VmArgs> for VmConfig {
    fn from(args: VmArgs) -> Self {
        VmConfig {
            stack_cells: args.stack_cells,
            max_steps: args.max_steps,
            seed: args.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { file, vm } => {
            let source = read_source(&file)?;
            let generated = compile_source(&source).map_err(report)?;
            let status = run_code(&generated.code, generated.strings, vm.into())?;
            std::process::exit(status as i32);
        }
        Command::Check { file } => {
            let source = read_source(&file)?;
            analyze_source(&source).map_err(report)?;
            println!("{}: ok", file.display());
        }
        Command::Tokens {
            file,
            no_color,
            pretty,
        } => {
            let source = read_source(&file)?;
            let tokens = Lexer::new(&source).tokenize().map_err(CinderError::from)?;

            let mut dumper = TokenDumper::new();
            if no_color {
                dumper = dumper.no_color();
            }
            if pretty {
                dumper = dumper.pretty();
            }
            dumper.dump(&mut io::stdout().lock(), &tokens)?;
        }
        Command::Ast { file } => {
            let source = read_source(&file)?;
            let program = parse_source(&source)?;
            println!("== AST ({}) ==", file.display());
            println!("{:#?}", program);
        }
        Command::Disasm { file } => {
            let source = read_source(&file)?;
            let generated = compile_source(&source).map_err(report)?;
            print_bc(&generated.code, &generated.strings, &generated.symbols)?;
        }
        Command::Build { file, output } => {
            let source = read_source(&file)?;
            let generated = compile_source(&source).map_err(report)?;
            let output = output.unwrap_or_else(|| file.with_extension("cnb"));

            Image::from(generated)
                .save(&output)
                .with_context(|| format!("failed to write '{}'", output.display()))?;
            info!(path = %output.display(), "image written");
        }
        Command::Exec { image, vm } => {
            let image = Image::load(&image)
                .with_context(|| format!("failed to load '{}'", image.display()))?;
            let status = run_code(&image.code, image.strings, vm.into())?;
            std::process::exit(status as i32);
        }
    }

    Ok(())
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        bail!("expected a .{} file, got {}", SOURCE_EXTENSION, path.display());
    }
    fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

/// Prints each diagnostic on its own line before handing the error on.
fn report(err: CinderError) -> CinderError {
    if let CinderError::Diagnostics { .. } = &err {
        for message in err.messages() {
            eprintln!("{}", message);
        }
    }
    err
}

fn run_code(code: &[i64], strings: cinder::bytecode::StringTable, config: VmConfig) -> anyhow::Result<i64> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut vm = Vm::new(code, strings, stdin.lock(), stdout.lock(), config);
    Ok(vm.run()?)
}
