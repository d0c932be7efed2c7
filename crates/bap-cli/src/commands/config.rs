use std::path::PathBuf;

use anyhow::{Context, Result};
use bap_core::composite::BapConfig;
use clap::Args;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit JSON instead of TOML
    #[arg(long)]
    pub json: bool,

    /// Emit the self-describing keyed form (JSON)
    #[arg(long, conflicts_with = "json")]
    pub keyed: bool,
}

/// Print or save a full default BapConfig.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = BapConfig::default();
    let text = if args.keyed {
        serde_json::to_string_pretty(&config.to_keyed()?)? + "\n"
    } else if args.json {
        config.to_json()? + "\n"
    } else {
        toml::to_string_pretty(&config)?
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &text)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", text);
    }

    Ok(())
}
