//! Build script support.
//!
//! ```no_run
//! // build.rs
//! fn main() -> anyhow::Result<()> {
//!     bnfbridge::build::process_root("crate::ffi")
//! }
//! ```

use crate::{
    generate::{generate, write_files, GenerateOptions},
    grammar::Grammar,
};
use anyhow::Context as _;
use std::{
    env,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

pub fn process_root(namespace: &str) -> anyhow::Result<()> {
    let build = Build::new(GenerateOptions::new(namespace))?;
    build.process()
}

pub fn process_dir(root_dir: &Path, namespace: &str) -> anyhow::Result<()> {
    let build = Build::with_root_dir(root_dir.to_owned(), GenerateOptions::new(namespace))?;
    build.process()
}

#[derive(Debug)]
pub struct Build {
    root_dir: PathBuf,
    out_dir: PathBuf,
    options: GenerateOptions,
}

impl Build {
    pub fn new(options: GenerateOptions) -> anyhow::Result<Self> {
        let root_dir = env::var_os("CARGO_MANIFEST_DIR")
            .map(PathBuf::from)
            .context("The environment variable `CARGO_MANIFEST_DIR' is not set")?;
        Self::with_root_dir(root_dir, options)
    }

    pub fn with_root_dir(root_dir: PathBuf, options: GenerateOptions) -> anyhow::Result<Self> {
        let out_dir = env::var_os("OUT_DIR")
            .map(PathBuf::from)
            .context("The environment variable `OUT_DIR' is not set")?;
        Ok(Self::with_dirs(root_dir, out_dir, options))
    }

    pub fn with_dirs(root_dir: PathBuf, out_dir: PathBuf, options: GenerateOptions) -> Self {
        Self {
            root_dir,
            out_dir,
            options,
        }
    }

    /// Generate the modules of every `*.cf` grammar under the root directory.
    ///
    /// The grammar `src/calc.cf` produces `$OUT_DIR/src/calc/absyn.rs` and
    /// `$OUT_DIR/src/calc/bridge.rs`.
    pub fn process(&self) -> anyhow::Result<()> {
        let walker = WalkDir::new(&self.root_dir)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != "target");
        for entry in walker {
            let entry = entry.context("from WalkDir entry")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let in_file = entry.path();
            match in_file.extension().and_then(|ext| ext.to_str()) {
                Some("cf") => self.process_file(in_file)?,
                _ => continue,
            }
        }

        Ok(())
    }

    fn process_file(&self, in_file: &Path) -> anyhow::Result<()> {
        let mut out_dir = self.out_dir.join(in_file.strip_prefix(&self.root_dir)?);
        out_dir.set_extension("");

        println!("cargo:rerun-if-changed={}", in_file.display());

        let grammar = Grammar::from_file(in_file)
            .with_context(|| anyhow::anyhow!("during parse {}", in_file.display()))?;
        let files = generate(&grammar, &self.options)
            .with_context(|| anyhow::anyhow!("during generate {}", in_file.display()))?;
        write_files(&out_dir, &files, false)
    }
}
