use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, Subcommand};

use vela_compiler::{compile_files, Parser, VelaError};

#[derive(ClapParser)]
#[command(name = "vela")]
#[command(about = "Format, check and inspect Vela schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite matched `.vela` files in place with canonical formatting
    Fmt {
        /// Glob pattern, e.g. "./schemas/*.vela"
        pattern: String,
    },

    /// Parse and validate all matched files as one program
    Check {
        /// Glob patterns, e.g. "./schemas/*.vela" "./shared/*.vela"
        patterns: Vec<String>,
    },

    /// Print the validated document as JSON
    Ast {
        /// Glob patterns, e.g. "./schemas/*.vela"
        patterns: Vec<String>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run() -> Result<(), VelaError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Fmt { pattern } => {
            for path in resolve_globs(std::slice::from_ref(pattern))? {
                let doc = Parser::from_files(std::slice::from_ref(&path)).parse_document()?;
                fs::write(&path, doc.to_string())?;
            }
            Ok(())
        }

        Commands::Check { patterns } => {
            let paths = resolve_globs(patterns)?;
            compile_files(&paths)?;
            println!("ok");
            Ok(())
        }

        Commands::Ast { patterns } => {
            let paths = resolve_globs(patterns)?;
            let doc = compile_files(&paths)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
    }
}

fn resolve_globs(patterns: &[String]) -> Result<Vec<PathBuf>, VelaError> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|err| VelaError::Pattern(err.to_string()))?;
        for entry in matches {
            match entry {
                Ok(path) => paths.push(path),
                Err(err) => return Err(VelaError::Io(err.into_error())),
            }
        }
    }

    Ok(paths)
}
