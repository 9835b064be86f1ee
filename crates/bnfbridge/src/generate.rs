//! Generation of the output files.

use crate::{
    absyn::AbsynCodegen,
    bridge::BridgeCodegen,
    grammar::{GenerateError, Grammar},
    pretty::reindent,
    types::Map,
};
use anyhow::Context as _;
use std::{fs, path::Path};

/// Cases appended verbatim to the generated sum types, keyed by type name.
pub type ExtraCases = Map<String, Vec<String>>;

pub const ABSYN_FILE: &str = "absyn.rs";
pub const BRIDGE_FILE: &str = "bridge.rs";

/// The configuration of a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    namespace: String,
    absyn_module: String,
    extra_cases: ExtraCases,
}

impl GenerateOptions {
    /// Create the options with the module path of the native bindings.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            absyn_module: "super::absyn".into(),
            extra_cases: ExtraCases::default(),
        }
    }

    /// Specify the module path through which the bridge reaches the
    /// abstract syntax (`super::absyn` by default).
    pub fn absyn_module(mut self, path: impl Into<String>) -> Self {
        self.absyn_module = path.into();
        self
    }

    /// Append a case to the generated sum type `ty`.
    pub fn extra_case(mut self, ty: impl Into<String>, case: impl Into<String>) -> Self {
        self.extra_cases
            .entry(ty.into())
            .or_default()
            .push(case.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub name: &'static str,
    pub contents: String,
}

/// Generate the abstract syntax and the bridge modules from `grammar`.
pub fn generate(
    grammar: &Grammar,
    options: &GenerateOptions,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let span = tracing::debug_span!("generate");
    let _entered = span.enter();

    let absyn = AbsynCodegen::new(grammar, &options.extra_cases)?;
    let bridge = BridgeCodegen::new(grammar, &options.namespace, &options.absyn_module)?;

    Ok(vec![
        GeneratedFile {
            name: ABSYN_FILE,
            contents: reindent(&absyn.to_string()),
        },
        GeneratedFile {
            name: BRIDGE_FILE,
            contents: reindent(&bridge.to_string()),
        },
    ])
}

/// Write the generated files into `out_dir`.
///
/// Every file is attempted even if an earlier one fails. With `backup`, an
/// existing file is copied to `*.rs.bak` before it is overwritten.
pub fn write_files(out_dir: &Path, files: &[GeneratedFile], backup: bool) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| anyhow::anyhow!("failed to create {}", out_dir.display()))?;

    let mut num_failed = 0;
    for file in files {
        let out_file = out_dir.join(file.name);
        if let Err(err) = write_file(&out_file, &file.contents, backup) {
            tracing::error!("{:#}", err);
            num_failed += 1;
        }
    }

    if num_failed > 0 {
        anyhow::bail!(
            "failed to write {} of {} generated files",
            num_failed,
            files.len()
        );
    }
    Ok(())
}

fn write_file(out_file: &Path, contents: &str, backup: bool) -> anyhow::Result<()> {
    if backup && out_file.exists() {
        let backup_file = out_file.with_extension("rs.bak");
        fs::copy(out_file, &backup_file).with_context(|| {
            anyhow::anyhow!(
                "failed to backup the output file to {}",
                backup_file.display()
            )
        })?;
    }
    fs::write(out_file, contents)
        .with_context(|| anyhow::anyhow!("failed to write {}", out_file.display()))?;
    tracing::debug!("wrote {}", out_file.display());
    Ok(())
}
