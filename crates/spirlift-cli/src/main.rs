use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};

use spirlift_translate::Options;

/// spirlift — SPIR-V to OpenCL SPIR IR translator
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Input SPIR-V binary
    input: PathBuf,

    /// Output path for the textual IR (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dump the IR to stderr after translation
    #[arg(long)]
    emit_ir: bool,

    /// Write the translated IR to this file before returning, even on
    /// failure paths
    #[arg(long)]
    debug_ir: Option<PathBuf>,

    /// Translate without producing output
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<()> {
    env_logger::try_init().ok();

    let cli = Cli::parse();

    // 1. Read the binary.
    let bytes = std::fs::read(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", cli.input.display()))?;

    // 2. Decode and translate.
    let options = Options {
        debug_ir_path: cli.debug_ir.clone(),
    };
    let module = spirlift_translate::read_spirv(&bytes, &options)
        .map_err(|e| miette::miette!("{e}"))
        .wrap_err("translation failed")?;

    // 3. Render.
    let text = spirlift_ir::dump_module(&module);
    if cli.emit_ir {
        eprintln!("{text}");
    }
    if cli.dry_run {
        return Ok(());
    }

    // 4. Write output.
    match &cli.output {
        Some(path) => std::fs::write(path, &text)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display()))?,
        None => print!("{text}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["spirlift", "kernel.spv"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("kernel.spv"));
        assert!(cli.output.is_none());
        assert!(!cli.emit_ir);
        assert!(!cli.dry_run);
        assert!(cli.debug_ir.is_none());
    }

    #[test]
    fn cli_all_flags() {
        let cli = Cli::try_parse_from([
            "spirlift",
            "kernel.spv",
            "--output",
            "kernel.ll",
            "--emit-ir",
            "--debug-ir",
            "tmp.ll",
        ])
        .unwrap();
        assert_eq!(cli.output.unwrap(), PathBuf::from("kernel.ll"));
        assert!(cli.emit_ir);
        assert_eq!(cli.debug_ir.unwrap(), PathBuf::from("tmp.ll"));
    }

    #[test]
    fn cli_short_output_flag() {
        let cli = Cli::try_parse_from(["spirlift", "in.spv", "-o", "out.ll"]).unwrap();
        assert_eq!(cli.output.unwrap(), PathBuf::from("out.ll"));
    }

    #[test]
    fn cli_requires_input() {
        assert!(Cli::try_parse_from(["spirlift"]).is_err());
    }

    #[test]
    fn cli_dry_run() {
        let cli = Cli::try_parse_from(["spirlift", "in.spv", "--dry-run"]).unwrap();
        assert!(cli.dry_run);
    }
}
