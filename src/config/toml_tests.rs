//! Tests for TOML configuration parsing.

use super::toml::{TomlConfig, default_config_template};

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [locator]
            prefix = "fd97:7b15:d62e:75ac::/64"
        "#;

        let config = TomlConfig::parse(toml).unwrap();

        assert_eq!(
            config.locator.prefix.as_deref(),
            Some("fd97:7b15:d62e:75ac::/64")
        );
        assert!(!config.locator.strict_index);
        assert!(config.monitor.watch_keys.is_none());
        assert!(config.monitor.query_patterns.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [locator]
            prefix = "fd00::/48"
            strict_index = true

            [monitor]
            watch_keys = ["State:/Network/Interface/en0/IPv6"]
            query_patterns = ["State:/Network/Interface/[^/]+/IPv6", "State:/Network/Global/IPv6"]
        "#;

        let config = TomlConfig::parse(toml).unwrap();

        assert!(config.locator.strict_index);
        assert_eq!(
            config.monitor.watch_keys.as_deref(),
            Some(&["State:/Network/Interface/en0/IPv6".to_string()][..])
        );
        assert_eq!(config.monitor.query_patterns.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn parse_empty_config() {
        let config = TomlConfig::parse("").unwrap();

        assert!(config.locator.prefix.is_none());
        assert!(config.monitor.watch_keys.is_none());
    }

    #[test]
    fn explicit_empty_list_is_kept() {
        let config = TomlConfig::parse("[monitor]\nwatch_keys = []\n").unwrap();

        assert_eq!(config.monitor.watch_keys, Some(Vec::new()));
    }
}

mod errors {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn unknown_section_is_rejected() {
        let result = TomlConfig::parse("[webhook]\nurl = \"x\"\n");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result = TomlConfig::parse("[locator]\nprefx = \"fd00::/64\"\n");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let result = TomlConfig::parse("[monitor]\nwatch_keys = \"not-a-list\"\n");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let path = std::path::Path::new("/nonexistent/scdns.toml");

        let result = TomlConfig::load(path);

        match result {
            Err(ConfigError::FileRead { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected FileRead, got {other:?}"),
        }
    }
}

mod template {
    use super::*;

    #[test]
    fn template_parses() {
        let config = TomlConfig::parse(&default_config_template()).unwrap();

        assert!(config.locator.prefix.is_none());
        assert_eq!(
            config.monitor.watch_keys,
            Some(vec!["State:/Network/Interface/[^/]+/IPv6".to_string()])
        );
        assert_eq!(
            config.monitor.query_patterns,
            Some(vec!["State:/Network/Interface/[^/]+/IPv6".to_string()])
        );
    }

    #[test]
    fn template_documents_prefix() {
        let template = default_config_template();

        assert!(template.contains("[locator]"));
        assert!(template.contains("prefix"));
        assert!(template.contains("[monitor]"));
    }
}
