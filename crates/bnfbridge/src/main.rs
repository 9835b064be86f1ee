use anyhow::Context as _;
use bnfbridge::{
    generate::{generate, write_files, GenerateOptions},
    grammar::Grammar,
};
use clap::Parser;
use std::{fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The directory where the generated `absyn.rs` and `bridge.rs` are placed.
    /// Defaults to the directory of the grammar file.
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// The module path of the native parser bindings.
    #[arg(short, long)]
    namespace: String,

    /// The module path through which the bridge refers to the abstract syntax.
    #[arg(long, default_value = "super::absyn")]
    absyn_module: String,

    /// Append a case to a generated sum type, in the form `Type=Case`.
    #[arg(long, value_parser = parse_extra_case)]
    extra_case: Vec<(String, String)>,

    /// The path of grammar description file.
    input: PathBuf,
}

fn parse_extra_case(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((ty, case)) if !ty.trim().is_empty() && !case.trim().is_empty() => {
            Ok((ty.trim().to_owned(), case.trim().to_owned()))
        }
        _ => Err(format!("expected `Type=Case`, found `{}`", s)),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.input.display()))?;

    Ok(())
}

fn process_file(args: &Args) -> anyhow::Result<()> {
    let in_file = fs::canonicalize(&args.input) //
        .context("failed to canonicalize the input file name")?;

    let out_dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => in_file
            .parent()
            .map(ToOwned::to_owned)
            .context("the input file has no parent directory")?,
    };

    let s = Instant::now();
    let grammar = Grammar::from_file(&in_file)?;
    tracing::info!("parse_file: {:?} elapsed", s.elapsed());

    let mut options =
        GenerateOptions::new(args.namespace.clone()).absyn_module(args.absyn_module.clone());
    for (ty, case) in &args.extra_case {
        options = options.extra_case(ty.clone(), case.clone());
    }

    let s = Instant::now();
    let files = generate(&grammar, &options)?;
    tracing::info!("generate: {:?} elapsed", s.elapsed());

    write_files(&out_dir, &files, true)
}
