//! Thin CLI driver (§6): `hemlock <script>` evaluates a program; `hemlock
//! --bundle <entry> -o <out>` emits a bundled artifact the core consumes
//! identically to source. Mirrors the teacher's `compiler/src/main.rs`
//! shape: a `clap::Parser`-derived args struct, a `main()` that dispatches
//! on it and prints an error to stderr with a non-zero exit.
//!
//! The lexer/parser and module bundler are out-of-scope external
//! collaborators (§1); what this binary reads from disk is already the
//! serialized AST artifact described in §6, not raw Hemlock source text.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use hemlock_core::program_from_json;
use hemlock_runtime::{Interpreter, InterpreterConfig};

#[derive(ClapParser)]
#[command(name = "hemlock")]
#[command(about = "Hemlock evaluator", long_about = None)]
struct Cli {
    /// Program artifact to run. Omit when bundling with `--bundle`.
    script: Option<PathBuf>,

    /// Bundle this entry artifact (and nothing else — a Non-goal per §1
    /// is a full module resolver) to the path given by `-o`.
    #[arg(long)]
    bundle: Option<PathBuf>,

    /// Minify the bundled artifact's JSON text. Named to match the
    /// external interface's `--compress` flag; this is not byte-level
    /// compression (no such dependency is part of this workspace — see
    /// DESIGN.md), only whitespace removal.
    #[arg(long)]
    compress: bool,

    /// Print the statement count of the bundled artifact to stderr.
    #[arg(long)]
    verbose: bool,

    /// Output path for `--bundle`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra arguments exposed to the script as the global `args` array.
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(entry) = &cli.bundle {
        return match bundle(entry, cli.output.as_deref(), cli.compress, cli.verbose) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("hemlock: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(script) = &cli.script else {
        eprintln!("hemlock: expected a script path or --bundle <entry>");
        return ExitCode::FAILURE;
    };

    let program = match load_program(script) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("hemlock: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = InterpreterConfig::default().with_args(cli.args);
    let interp = Interpreter::new(config);
    hemlock_runtime::interpreter::run_program(&interp, &program);
    ExitCode::SUCCESS
}

fn load_program(path: &std::path::Path) -> Result<hemlock_core::ast::Program, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    program_from_json(&text).map_err(|e| format!("{}: {e}", path.display()))
}

/// `--bundle <entry> -o <out>`: re-serializes the entry artifact's JSON
/// text, optionally stripped of insignificant whitespace, to `out`. The
/// core "consumes bundled artifacts identically to source" (§6) because
/// both are the same JSON-AST format `load_program` reads.
fn bundle(entry: &std::path::Path, output: Option<&std::path::Path>, compress: bool, verbose: bool) -> Result<(), String> {
    let output = output.ok_or("--bundle requires -o <out>")?;
    let text = std::fs::read_to_string(entry).map_err(|e| format!("reading {}: {e}", entry.display()))?;
    let program = program_from_json(&text).map_err(|e| format!("{}: {e}", entry.display()))?;
    if verbose {
        eprintln!("bundled {} top-level statement(s) from {}", program.statements.len(), entry.display());
    }
    let artifact = if compress { minify_json(&text) } else { text };
    std::fs::write(output, artifact).map_err(|e| format!("writing {}: {e}", output.display()))
}

/// Strips whitespace outside of string literals. Not a real compression
/// codec (none is part of this workspace) — just shrinks the artifact.
fn minify_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
        } else if !c.is_whitespace() {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minify_json_drops_insignificant_whitespace_but_not_string_contents() {
        let src = "{ \"a\" : \"b c\" ,\n\"d\": 1 }";
        assert_eq!(minify_json(src), r#"{"a":"b c","d":1}"#);
    }
}
