use anyhow::Result;

use gator_core::AppConfig;

/// Write the configuration file, refusing to clobber an existing one unless forced
pub fn init(config: &AppConfig, force: bool) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() && !force {
        println!("Config already exists: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    config.save()?;
    println!("Wrote config: {}", path.display());
    Ok(())
}

pub fn show(config: &AppConfig) -> Result<()> {
    println!("# {}", AppConfig::config_path().display());
    println!("# database: {}\n", config.database_path().display());
    print!("{}", config.to_toml()?);
    Ok(())
}
