use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FengshuiPaths {
    pub fengshui_home: PathBuf,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<FengshuiPaths> {
    let fengshui_home = match env::var("FENGSHUI_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join("fengshui"),
    };

    let data_dir = fengshui_home.join("data");
    let db_path = env_or_default_path("FENGSHUI_DB_PATH", data_dir.join("fengshui.db"));
    let export_dir = env_or_default_path("FENGSHUI_EXPORT_DIR", data_dir.join("export"));
    let cache_dir = env_or_default_path("FENGSHUI_CACHE_DIR", fengshui_home.join("cache"));
    let logs_dir = env_or_default_path("FENGSHUI_LOGS_DIR", fengshui_home.join("logs"));

    Ok(FengshuiPaths {
        fengshui_home,
        db_path,
        export_dir,
        cache_dir,
        logs_dir,
    })
}
