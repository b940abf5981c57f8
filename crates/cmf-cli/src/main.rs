//! C-minus-f compiler CLI.
//!
//! Provides the `cmf` binary: reads a JSON-encoded AST (`cmf_core::ast::Program`)
//! from a file or stdin, runs lowering, dead-code elimination, and the
//! textual emitter, and writes the resulting `.ll` text to stdout or a
//! file.
//!
//! Uses the same `cmf_core::lower_program` / `cmf_passes::run_dce` /
//! `cmf_codegen::emit_module` pipeline a library caller would use,
//! ensuring the CLI is a thin driver rather than a second implementation.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use cmf_core::ast::Program;

/// C-minus-f compiler: lowers a JSON AST to textual LLVM-dialect IR.
#[derive(Parser)]
#[command(name = "cmf", about = "C-minus-f compiler: AST -> SSA IR -> dead-code elimination -> textual IR")]
struct Cli {
    /// Path to a JSON-encoded `cmf_core::ast::Program`. Reads stdin if omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Path to write the emitted `.ll` text. Writes stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip dead-code elimination and emit the IR straight out of lowering.
    #[arg(long)]
    no_dce: bool,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    process::exit(run(cli));
}

/// Returns the process exit code: 0 = success, 1 = malformed input JSON,
/// 2 = lowering error (a bug in the source program), 3 = I/O error.
fn run(cli: Cli) -> i32 {
    let source = match read_input(cli.input.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to read input: {e}");
            return 3;
        }
    };

    let program: Program = match serde_json::from_str(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: malformed AST JSON: {e}");
            return 1;
        }
    };

    let lower_span = tracing::debug_span!("lower").entered();
    let mut module = match cmf_core::lower_program(&program) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };
    drop(lower_span);

    if cli.no_dce {
        tracing::info!("skipping dead-code elimination (--no-dce)");
    } else {
        let _dce_span = tracing::debug_span!("optimize").entered();
        let report = cmf_passes::run_dce(&mut module);
        tracing::info!(
            blocks_removed = report.blocks_removed,
            instructions_removed = report.instructions_removed,
            functions_removed = report.functions_removed,
            globals_removed = report.globals_removed,
            "dead-code elimination complete"
        );
    }

    let ir = {
        let _emit_span = tracing::debug_span!("emit").entered();
        cmf_codegen::emit_module(&module)
    };

    match write_output(cli.output.as_deref(), &ir) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: failed to write output: {e}");
            3
        }
    }
}

fn read_input(path: Option<&std::path::Path>) -> io::Result<String> {
    match path {
        Some(p) => fs::read_to_string(p),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, ir: &str) -> io::Result<()> {
    match path {
        Some(p) => fs::write(p, ir),
        None => io::stdout().write_all(ir.as_bytes()),
    }
}
