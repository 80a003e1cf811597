use tasker_core::config::AppConfig;
use tasker_core::CliError;

pub fn handle_config(cfg: &AppConfig) -> Result<i32, CliError> {
    let rendered = toml::to_string_pretty(cfg).map_err(|e| CliError::Config(e.to_string()))?;
    print!("{rendered}");
    Ok(0)
}
