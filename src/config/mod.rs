use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

pub const ENV_SUPABASE_URL: &str = "SNIPIFY_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SNIPIFY_SUPABASE_ANON_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub backend: BackendConfig,
    pub apis: ApisConfig,
    pub search: SearchConfig,
    pub http: HttpConfig,
    pub colors: ColorsConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct BackendConfig {
    /// Project URL, e.g. https://your-project.supabase.co
    pub url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApisConfig {
    pub deezer_base_url: String,
    pub lrclib_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub song_limit: usize,
    pub friend_limit: usize,
    pub recent_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Disable to skip album-art palette extraction entirely.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
}

impl Default for ApisConfig {
    fn default() -> Self {
        Self {
            deezer_base_url: "https://api.deezer.com".to_string(),
            lrclib_base_url: "https://lrclib.net/api".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            song_limit: 15,
            friend_limit: 10,
            recent_limit: 6,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("snipify/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let proj = ProjectDirs::from("dev", "snipify", "snipify");
        let data_dir = proj
            .as_ref()
            .map(|p| p.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("snipify"));
        Self { data_dir }
    }
}

impl BackendConfig {
    /// A usable project URL and key, not the template placeholders.
    pub fn is_configured(&self) -> bool {
        self.url.starts_with("https://")
            && self.url != "your_supabase_url_here"
            && !self.anon_key.is_empty()
            && self.anon_key != "your_supabase_anon_key_here"
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_SUPABASE_URL)
            && !url.trim().is_empty()
        {
            self.url = url.trim().trim_end_matches('/').to_string();
        }
        if let Ok(key) = std::env::var(ENV_SUPABASE_ANON_KEY)
            && !key.trim().is_empty()
        {
            self.anon_key = key.trim().to_string();
        }
    }
}

impl Config {
    pub fn local_db_path(&self) -> PathBuf {
        self.paths.data_dir.join("local.sqlite3")
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.search.debounce_ms)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.timeout_secs.max(1))
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj =
        ProjectDirs::from("dev", "snipify", "snipify").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?
    } else {
        let cfg = defaults::defaults();
        save(&cfg, Some(&path)).context("write default config")?;
        cfg
    };

    cfg.backend.apply_env();
    cfg.backend.url = cfg.backend.url.trim_end_matches('/').to_string();
    if !cfg.backend.is_configured() {
        tracing::warn!(
            "backend is not configured; set backend.url/backend.anon_key in {} or {}/{}",
            path.display(),
            ENV_SUPABASE_URL,
            ENV_SUPABASE_ANON_KEY
        );
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.search.debounce_ms, 300);
        assert_eq!(cfg.search.recent_limit, 6);
        assert_eq!(cfg.apis.deezer_base_url, "https://api.deezer.com");
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[search]\ndebounce_ms = 150\n").unwrap();
        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.search.debounce_ms, 150);
        assert_eq!(cfg.search.song_limit, 15);
        assert!(cfg.colors.enabled);
    }

    #[test]
    fn placeholder_backend_is_not_configured() {
        let backend = BackendConfig {
            url: "your_supabase_url_here".into(),
            anon_key: "your_supabase_anon_key_here".into(),
        };
        assert!(!backend.is_configured());
        let backend = BackendConfig {
            url: "https://demo.supabase.co".into(),
            anon_key: "anon".into(),
        };
        assert!(backend.is_configured());
    }
}
