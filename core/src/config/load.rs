use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::executor::ExperienceType;

/// Get the default tasker data directory: ~/.tasker
pub fn get_tasker_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".tasker"))
}

pub fn load_from_str(s: &str) -> anyhow::Result<AppConfig> {
    Ok(toml::from_str::<AppConfig>(s)?)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.tasker/config.toml (highest)
    let tasker_dir = get_tasker_data_dir()?;
    let tasker_config = tasker_dir.join("config.toml");

    // Priority 2: ./tasker.toml (current directory)
    let local_config = Path::new("tasker.toml");

    let mut cfg: AppConfig = if tasker_config.exists() {
        load_from_str(&std::fs::read_to_string(&tasker_config)?)?
    } else if local_config.exists() {
        load_from_str(&std::fs::read_to_string(local_config)?)?
    } else {
        AppConfig::default()
    };

    // Update logging directory to use tasker data directory if not set
    if cfg
        .logging
        .directory
        .as_ref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        cfg.logging.directory = Some(tasker_dir.join("logs").to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |name| std::env::var(name).ok())?;
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest)
fn apply_env_overrides(
    cfg: &mut AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("TASKER_MAX_THREADS") {
        let n = v
            .trim()
            .parse::<usize>()
            .map_err(|e| anyhow::anyhow!("TASKER_MAX_THREADS={v}: {e}"))?;
        cfg.execution.max_threads = (n > 0).then_some(n);
    }

    if let Some(v) = var("TASKER_EXPERIENCE") {
        cfg.execution.experience = Some(v.parse::<ExperienceType>()?);
    }

    if let Some(v) = var("TASKER_QUIET") {
        cfg.execution.quiet = matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_from_str_defaults() {
        let cfg = load_from_str("").unwrap();
        assert!(cfg.logging.enabled);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.execution.max_threads, None);
        assert_eq!(cfg.execution.experience, None);
    }

    #[test]
    fn test_load_from_str_execution_section() {
        let cfg = load_from_str(
            r#"
            [execution]
            max_threads = 3
            quiet = true
            experience = "progress"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.execution.max_threads, Some(3));
        assert!(cfg.execution.quiet);
        assert_eq!(cfg.execution.experience, Some(ExperienceType::ProgressBar));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TASKER_MAX_THREADS", "2"),
            ("TASKER_EXPERIENCE", "simple"),
            ("TASKER_QUIET", "true"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.execution.max_threads, Some(2));
        assert_eq!(cfg.execution.experience, Some(ExperienceType::Simple));
        assert!(cfg.execution.quiet);
    }

    #[test]
    fn test_env_override_rejects_bad_thread_count() {
        let mut cfg = AppConfig::default();
        let result = apply_env_overrides(&mut cfg, |name| {
            (name == "TASKER_MAX_THREADS").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }
}
