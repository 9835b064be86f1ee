use anyhow::Context as _;
use std::{env, path::PathBuf};

fn main() -> anyhow::Result<()> {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .context("CARGO_MANIFEST_DIR is not set")?;
    let grammars_dir = project_root.join("grammars").canonicalize()?;
    bnfbridge::build::process_dir(&grammars_dir, "super::ffi")
}
