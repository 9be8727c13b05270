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

    let default_paths = [
        "./livets.toml",
        "~/.config/livets/config.toml",
        "/etc/livets/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.segmenter.interval_ms == 0 {
        anyhow::bail!("Segment interval cannot be 0");
    }

    if config.output.segment_prefix.is_empty() {
        anyhow::bail!("Segment prefix cannot be empty");
    }

    if config.output.segment_prefix.contains(['/', '\\']) {
        anyhow::bail!(
            "Segment prefix '{}' must not contain path separators",
            config.output.segment_prefix
        );
    }

    if config.output.playlist && config.output.playlist_name.is_empty() {
        anyhow::bail!("Playlist is enabled but has no file name");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.segmenter.interval_ms, 3000);
        assert!(!config.segmenter.repeat_parameter_sets);
        assert!(config.decoder.multi_nalu);
        assert_eq!(config.output.segment_prefix, "segment");
        assert_eq!(config.output.playlist_name, "index.m3u8");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
[segmenter]
interval_ms = 6000

[output]
dir = "/srv/live"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.segmenter.interval_ms, 6000);
        assert_eq!(config.output.dir, std::path::PathBuf::from("/srv/live"));
        assert_eq!(config.output.segment_prefix, "segment");
        assert!(config.decoder.multi_nalu);

        let options = config.transmux_options();
        assert_eq!(options.segment_interval_ms, 6000);
        assert!(options.avc.multi_nalu);
        assert!(!options.avc.repeat_parameter_sets);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let file = write_config("[segmenter]\ninterval_ms = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let mut config = Config::default();
        config.output.segment_prefix = String::new();
        assert!(validate_config(&config).is_err());

        config.output.segment_prefix = "a/b".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_playlist_name() {
        let mut config = Config::default();
        config.output.playlist_name = String::new();
        assert!(validate_config(&config).is_err());

        config.output.playlist = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unparseable_file() {
        let file = write_config("[segmenter\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
