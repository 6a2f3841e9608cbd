#[cfg(test)]
mod tests {
    use super::super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.search.lookback_years, 5);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.mode, SelectionMode::All);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.translation.enabled);
        assert_eq!(config.translation.target_language, "en");
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert!(config.llm.gemini.api_key.is_none());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [search]
            lookback_years = 3
            mode = "random_one"

            [llm.gemini]
            api_key = "AIza-test"
            model = "gemini-1.5-pro"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.lookback_years, 3);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.mode, SelectionMode::RandomOne);
        assert_eq!(config.llm.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.llm.gemini.api_key.as_ref().unwrap().expose_secret(), "AIza-test");
        assert_eq!(config.llm.gemini.base_url, "https://generativelanguage.googleapis.com");
    }

    #[test]
    fn test_blank_key_in_file_falls_back_to_env() {
        let config = Config::from_toml_str("[llm.gemini]\napi_key = \"  \"\n")
            .unwrap()
            .with_env_overrides(|k| (k == GEMINI_KEY_ENV_VAR).then(|| "from-env".to_string()));
        assert_eq!(config.llm.gemini.api_key.unwrap().expose_secret(), "from-env");
    }

    #[test]
    fn test_file_key_wins_over_env() {
        let config = Config::from_toml_str("[llm.gemini]\napi_key = \"from-file\"\n")
            .unwrap()
            .with_env_overrides(|_| Some("from-env".to_string()));
        assert_eq!(config.llm.gemini.api_key.unwrap().expose_secret(), "from-file");
        assert_eq!(config.search.api_key.unwrap().expose_secret(), "from-env");
    }

    #[test]
    fn test_missing_api_key_is_a_startup_error() {
        let config = Config::default().with_env_overrides(|_| None);
        match config.validate() {
            Err(ConfigError::MissingApiKey(var)) => assert_eq!(var, GEMINI_KEY_ENV_VAR),
            other => panic!("expected MissingApiKey, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let config = Config::from_toml_str("[search]\nmax_results = 0\n")
            .unwrap()
            .with_env_overrides(|_| Some("key".to_string()));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "search.max_results", .. })
        ));
    }

    #[test]
    fn test_lookback_years_out_of_range_rejected() {
        for years in [0, MAX_LOOKBACK_YEARS + 1, u32::MAX] {
            let config = Config::from_toml_str(&format!("[search]\nlookback_years = {years}\n"))
                .unwrap()
                .with_env_overrides(|_| Some("key".to_string()));
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::Invalid { field: "search.lookback_years", .. })
                ),
                "{years} accepted"
            );
        }
    }

    #[test]
    fn test_unknown_mode_is_a_parse_error() {
        let err = Config::from_toml_str("[search]\nmode = \"newest\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_debug_output_redacts_keys() {
        let config = Config::default().with_env_overrides(|_| Some("super-secret-key".to_string()));
        let dump = format!("{config:?}");
        assert!(!dump.contains("super-secret-key"));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = Config::from_toml_str(include_str!("../../../medthread.example.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.search.eutils_base_url, defaults.search.eutils_base_url);
        assert_eq!(config.translation.endpoint, defaults.translation.endpoint);
        assert_eq!(config.llm.gemini.model, defaults.llm.gemini.model);
        assert_eq!(config.thread.language, "Japanese");
        assert!(config.llm.gemini.api_key.is_none());
    }
}
