mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./daopub.toml",
        "./config.toml",
        "~/.config/daopub/config.toml",
        "/etc/daopub/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.pipeline.workers == 0 {
        anyhow::bail!("pipeline.workers cannot be 0");
    }

    for (name, ext) in [
        ("pipeline.image_extension", &config.pipeline.image_extension),
        ("pipeline.archival_extension", &config.pipeline.archival_extension),
    ] {
        let ext = ext.trim_start_matches('.');
        if ext.is_empty() || ext.contains('/') {
            anyhow::bail!("{} must be a bare file extension", name);
        }
    }

    for (name, url) in [
        ("finding_aids.collections_url", &config.finding_aids.collections_url),
        ("finding_aids.folders_url", &config.finding_aids.folders_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("{} must be an http(s) URL, got '{}'", name, url);
        }
    }

    if config.finding_aids.timeout_secs == 0 || config.tools.timeout_secs == 0 {
        anyhow::bail!("timeouts must be greater than 0 seconds");
    }

    for (name, program) in [
        ("tools.converter", &config.tools.converter.program),
        ("tools.xslt", &config.tools.xslt.program),
        ("tools.pdf", &config.tools.pdf.program),
    ] {
        if program.as_os_str().is_empty() {
            anyhow::bail!("{}.program is empty", name);
        }
    }

    // Missing stores are not fatal: `check-tools` and `validate` run without them.
    let stores = &config.stores;
    for (name, path) in [
        ("image_store", &stores.image_store),
        ("archival_store", &stores.archival_store),
        ("mets_root", &stores.mets_root),
        ("ead_root", &stores.ead_root),
    ] {
        if !path.exists() {
            tracing::warn!("Store path {} does not exist: {:?}", name, path);
        }
    }

    Ok(())
}
