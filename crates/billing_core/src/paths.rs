use std::path::PathBuf;

/// Billing client configuration directory (~/.billing)
pub fn billing_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".billing")
}

/// ~/.billing/config.json
pub fn config_json_path() -> PathBuf {
    billing_dir().join("config.json")
}
