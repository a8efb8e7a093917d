#[cfg(test)]
mod tests {
    use pylon_config::ConfigLoader;
    use pylon_config::schema::*;
    use pylon_core::Environment;
    use std::io::Write;
    use std::path::PathBuf;

    // 32 zero bytes, base64.
    const ZERO_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_pylon_config_defaults() {
        let config = PylonConfig::default();
        assert_eq!(config.env, Environment::Production);
        assert_eq!(config.paths.static_root, PathBuf::from("public"));
        assert_eq!(config.paths.plugins, PathBuf::from("data/plugins"));
        assert!(config.plugins.allow_unsigned.is_empty());
        assert!(config.plugin_settings.is_empty());
    }

    #[test]
    fn test_paths_resolve_absolute() {
        let paths = PathsConfig::default().resolve().unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(paths.static_root, cwd.join("public"));
        assert_eq!(paths.plugins, cwd.join("data/plugins"));
        assert!(paths.core_plugins_dir().is_absolute());

        let fixed = PathsConfig {
            static_root: PathBuf::from("/srv/pylon/public"),
            ..PathsConfig::default()
        };
        assert_eq!(fixed.resolve().unwrap().static_root, PathBuf::from("/srv/pylon/public"));
    }

    #[test]
    fn test_updates_config_defaults() {
        let config = UpdatesConfig::default();
        assert!(config.check_url.is_none());
        assert_eq!(config.interval_secs, 600);
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
    }

    #[test]
    fn test_core_plugins_dir() {
        let paths = PathsConfig {
            static_root: PathBuf::from("/usr/share/pylon/public"),
            ..Default::default()
        };
        assert_eq!(
            paths.core_plugins_dir(),
            PathBuf::from("/usr/share/pylon/public/app/plugins")
        );
    }

    // ── TOML tests ─────────────────────────────────────────────

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
env = "development"

[plugins]
allow_unsigned = ["acme-backend-datasource"]
"#;
        let config: PylonConfig = toml::from_str(toml_str).unwrap();
        assert!(config.env.is_development());
        assert_eq!(config.plugins.allow_unsigned, vec!["acme-backend-datasource"]);
        assert_eq!(config.updates.interval_secs, 600);
        assert_eq!(config.paths.bundled_plugins, PathBuf::from("plugins-bundled"));
    }

    #[test]
    fn test_plugin_paths_sorted_and_filtered() {
        let toml_str = r#"
[plugin_settings.zeta-panel]
path = "/opt/zeta"

[plugin_settings.alpha-app]
path = "/opt/alpha"

[plugin_settings.no-path]
api_url = "http://localhost"

[plugin_settings.empty-path]
path = ""
"#;
        let config: PylonConfig = toml::from_str(toml_str).unwrap();
        let paths = config.plugin_paths();
        assert_eq!(
            paths,
            vec![
                ("alpha-app".to_string(), PathBuf::from("/opt/alpha")),
                ("zeta-panel".to_string(), PathBuf::from("/opt/zeta")),
            ]
        );
    }

    #[test]
    fn test_trusted_key_decode() {
        let good = TrustedKey {
            key_id: "k1".into(),
            public_key: ZERO_KEY.into(),
        };
        assert_eq!(good.decode().unwrap().len(), 32);

        let short = TrustedKey {
            key_id: "k2".into(),
            public_key: "AAAA".into(),
        };
        assert!(short.decode().unwrap_err().contains("32 bytes"));

        let garbage = TrustedKey {
            key_id: "k3".into(),
            public_key: "not base64!".into(),
        };
        assert!(garbage.decode().is_err());
    }

    // ── Validation tests ───────────────────────────────────────

    #[test]
    fn test_validate_defaults_ok() {
        let warnings = PylonConfig::default().validate().unwrap();
        assert!(warnings.iter().all(|w| w.severity != WarningSeverity::Error));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = PylonConfig::default();
        config.updates.interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("updates.interval_secs"));
    }

    #[test]
    fn test_validate_rejects_bad_key() {
        let mut config = PylonConfig::default();
        config.plugins.trusted_keys.push(TrustedKey {
            key_id: "".into(),
            public_key: "AAAA".into(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.contains("key_id"));
        assert!(err.contains("public_key"));
    }

    #[test]
    fn test_validate_unknown_level_is_warning() {
        let mut config = PylonConfig::default();
        config.logging.level = "loud".into();
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "logging.level"));
    }

    // ── ConfigLoader tests ─────────────────────────────────────

    #[test]
    fn test_config_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("pylon.toml");
        let mut f = std::fs::File::create(&config_path).unwrap();
        writeln!(
            f,
            r#"
[paths]
static_root = "/srv/public"
plugins = "/srv/plugins"

[[plugins.trusted_keys]]
key_id = "release"
public_key = "{ZERO_KEY}"

[updates]
check_url = "https://example.com/api/versions/stable"
interval_secs = 60
"#
        )
        .unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        let config = loader.get();
        assert_eq!(config.paths.static_root, PathBuf::from("/srv/public"));
        assert_eq!(config.plugins.trusted_keys.len(), 1);
        assert_eq!(config.plugins.trusted_keys[0].key_id, "release");
        assert_eq!(config.updates.interval_secs, 60);
        assert_eq!(loader.path(), config_path.as_path());
    }

    #[test]
    fn test_config_loader_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("pylon.toml");
        std::fs::write(&config_path, "[logging]\nformat = \"xml\"\n").unwrap();
        assert!(ConfigLoader::load(Some(config_path.as_path())).is_err());
    }

    #[test]
    fn test_config_loader_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(loader.get().updates.interval_secs, 600);
    }

    #[test]
    fn test_config_loader_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("pylon.toml");
        std::fs::write(&config_path, "[updates]\ninterval_secs = 30\n").unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        assert_eq!(loader.get().updates.interval_secs, 30);

        std::fs::write(&config_path, "[updates]\ninterval_secs = 90\n").unwrap();
        loader.reload().unwrap();
        assert_eq!(loader.get().updates.interval_secs, 90);

        // An invalid file keeps the previous snapshot.
        std::fs::write(&config_path, "[updates]\ninterval_secs = 0\n").unwrap();
        assert!(loader.reload().is_err());
        assert_eq!(loader.shared().read().updates.interval_secs, 90);
    }

    // ── JSON roundtrip ─────────────────────────────────────────

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = PylonConfig::default();
        config.env = Environment::Development;
        let json = serde_json::to_string(&config).unwrap();
        let restored: PylonConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.env, Environment::Development);
    }
}
