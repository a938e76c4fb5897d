//! The meddle compiler driver.
//!
//! One invocation compiles every file passed on the command line: lex and
//! parse each into a translation unit, resolve uses and names across the
//! set, run sema, then lower each unit to a MIR segment written next to
//! its source as `<stem>.mir`. The first error is rendered as
//! `<file>:<line>:<col>: error: <message>` and exits with code 1.

use clap::Parser;
use meddle_base::{Diagnostic, Options, Result, Session};
use meddle_mir::{lower, print};
use meddle_sema::UnitManager;
use meddle_syntax::ast::UnitId;
use meddle_syntax::{lexer, parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "meddlec", about = "The meddle compiler", version)]
struct Args {
    /// Source files to compile.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Give MIR blocks and values mnemonic names.
    #[arg(long)]
    named_mir: bool,

    /// Report pipeline statistics.
    #[arg(long)]
    debug: bool,

    /// Report per-phase timings.
    #[arg(long)]
    time: bool,

    /// Print the MIR listings to stdout instead of writing files.
    #[arg(long)]
    stdout: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let opts = Options {
        named_mir: args.named_mir,
        debug: args.debug,
        time: args.time,
    };
    let mut sess = Session::new(opts);

    let status = compile(&args, &mut sess);

    for warning in &sess.warnings {
        eprintln!("{}", warning.render(&sess.sources));
    }
    match status {
        Ok(()) => ExitCode::SUCCESS,
        Err(diag) => {
            eprintln!("{}", diag.render(&sess.sources));
            ExitCode::FAILURE
        }
    }
}

fn compile(args: &Args, sess: &mut Session) -> Result<()> {
    let start = Instant::now();

    let mut units = UnitManager::new();
    let mut unit_ids: Vec<UnitId> = Vec::with_capacity(args.files.len());

    for path in &args.files {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::bare(format!(
                "unable to read file: {}: {e}",
                path.display()
            ))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = sess.sources.add(name, path.clone(), contents);

        let unit = units.create_unit(sess, file)?;
        let tokens = lexer::lex(sess, file)?;
        parser::parse_unit(sess, units.unit_mut(unit), &tokens)?;
        unit_ids.push(unit);
    }
    let parsed = Instant::now();

    if sess.opts.debug {
        eprintln!("meddle: info: parsed {} unit(s)", units.len());
    }

    units.drive(sess)?;
    let analyzed = Instant::now();

    for unit in unit_ids {
        let segment = lower::lower_unit(&units, sess, unit)?;
        let listing = print::print_segment(&segment);

        if args.stdout {
            print!("{listing}");
        } else {
            let source = sess.sources.file(units.unit(unit).file);
            let out_path = source.dir.join(format!("{}.mir", source.stem()));
            std::fs::write(&out_path, listing).map_err(|e| {
                Diagnostic::bare(format!(
                    "unable to write file: {}: {e}",
                    out_path.display()
                ))
            })?;
        }
    }
    let lowered = Instant::now();

    if sess.opts.time {
        eprintln!(
            "meddle: info: parse {:.3}s, analysis {:.3}s, lowering {:.3}s",
            (parsed - start).as_secs_f64(),
            (analyzed - parsed).as_secs_f64(),
            (lowered - analyzed).as_secs_f64()
        );
    }
    Ok(())
}
