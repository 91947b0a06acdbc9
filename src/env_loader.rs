use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(fengshui_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(home) = fengshui_home {
        return Some(home.join(".env"));
    }
    Some(home_dir?.join("fengshui").join(".env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("FENGSHUI_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_reads_env_inside_fengshui_home() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/srv/fengshui")),
            Some(PathBuf::from("/home/lan")),
        );
        assert_eq!(got, Some(PathBuf::from("/srv/fengshui/.env")));
    }

    #[test]
    fn fallback_uses_default_home_when_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/lan")));
        assert_eq!(got, Some(PathBuf::from("/home/lan/fengshui/.env")));
    }

    #[test]
    fn no_home_means_no_fallback() {
        assert_eq!(fallback_dotenv_path(None, None), None);
    }
}
