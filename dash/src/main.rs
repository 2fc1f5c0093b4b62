//! Dash CLI

use clap::{Parser, Subcommand};
use dash::error::Result;
use dash::interp::StateRef;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dash", version, about = "Dash - a small expression-oriented scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file, or `run repl` for the interactive session
    Run {
        /// Script file to execute, or the literal `repl`
        target: String,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Parse and dump the AST as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { target } if target == "repl" => run_repl(),
        Command::Run { target } => dash::run::run_file(&target),
        Command::Tokens { file } => {
            let state = StateRef::new();
            if let Err(err) = dump_tokens(&file, &state) {
                dash::run::report(&err, &state);
            }
        }
        Command::Parse { file } => {
            let state = StateRef::new();
            if let Err(err) = dump_ast(&file, &state) {
                dash::run::report(&err, &state);
            }
        }
    }
}

fn run_repl() {
    match dash::repl::Repl::new() {
        Ok(mut repl) => {
            if let Err(err) = repl.run() {
                eprintln!("Error: {err}");
            }
        }
        Err(err) => eprintln!("Error: {err}"),
    }
}

fn read_source(path: &Path, state: &StateRef) -> Result<(dash::ast::FileId, String)> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        dash::error::Error::runtime(
            format!("can't read '{}': {e}", path.display()),
            dash::ast::Span::synthetic(dash::ast::FileId(0)),
        )
    })?;
    let file = state.add_source(&path.display().to_string(), &source);
    Ok((file, source))
}

fn dump_tokens(path: &Path, state: &StateRef) -> Result<()> {
    let (file, source) = read_source(path, state)?;
    for (token, span) in dash::lexer::tokenize(&source, file)? {
        println!("{token:?} @ {span}");
    }
    Ok(())
}

fn dump_ast(path: &Path, state: &StateRef) -> Result<()> {
    let (file, source) = read_source(path, state)?;
    let tokens = dash::lexer::tokenize(&source, file)?;
    let mut parser = dash::parser::Parser::new(file, tokens, state.clone());
    let exprs = parser.parse_everything()?;
    match serde_json::to_string_pretty(&exprs) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("Error: {err}"),
    }
    Ok(())
}
