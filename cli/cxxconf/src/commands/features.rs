//! `cxxconf features`: print the resolved feature set.

use anyhow::Result;
use cxxconf_core::Parameters;
use cxxconf_resolve::{ResolvedConfig, Resolver};

/// One feature per line, sorted.
pub fn render(config: &ResolvedConfig) -> String {
    config
        .feature_list()
        .iter()
        .map(|f| format!("{f}\n"))
        .collect()
}

pub fn run(params: Parameters) -> Result<()> {
    let config = Resolver::new(params).resolve()?;
    print!("{}", render(&config));
    Ok(())
}
