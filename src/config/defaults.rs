use super::Config;

/// Config written on first run.
pub fn defaults() -> Config {
    let mut cfg = Config::default();
    cfg.backend.url = "https://your-project.supabase.co".to_string();
    cfg
}
