#[cfg(test)]
mod tests {
    use super::super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kb.chunk_size, 500);
        assert_eq!(config.kb.chunk_overlap, 100);
        assert_eq!(config.rag.context_char_limit, 3000);
        assert_eq!(config.server.cookie_name, "amitybot_session");
    }

    #[test]
    fn test_role_based_doc_depth() {
        let rag = RagConfig::default();
        assert_eq!(rag.docs_for(Role::General), 2);
        assert_eq!(rag.docs_for(Role::LoggedIn), 5);
    }

    #[test]
    fn test_default_seed_user_is_admin() {
        let auth = AuthConfig::default();
        assert_eq!(auth.seed_users.len(), 1);
        assert_eq!(auth.seed_users[0].username, "admin");
        assert_eq!(auth.seed_users[0].role, Role::LoggedIn);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [kb]
            chunk_size = 800

            [embedding]
            backend = "ollama"
            base_url = "http://localhost:11434"
            "#,
        )
        .unwrap();
        assert_eq!(config.kb.chunk_size, 800);
        assert_eq!(config.kb.chunk_overlap, 100);
        assert_eq!(config.embedding.backend, EmbeddingBackendKind::Ollama);
        assert_eq!(config.llm.model, "compound-beta");
    }

    #[test]
    fn test_llm_endpoint_follows_backend() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.endpoint(), "https://api.groq.com/openai");

        llm.backend = LlmBackendKind::Ollama;
        assert_eq!(llm.endpoint(), "http://localhost:11434");

        llm.base_url = Some("http://gpu-box:11434".to_string());
        assert_eq!(llm.endpoint(), "http://gpu-box:11434");
    }

    #[test]
    fn test_ollama_toml_without_base_url() {
        let config = Config::from_toml_str(
            r#"
            [llm]
            backend = "ollama"
            model = "llama3:8b"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.endpoint(), "http://localhost:11434");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GROQ_API_KEY", "gsk-test"),
            ("CHROMA_DB_DIR", "/tmp/store"),
            ("CHUNK_SIZE", "300"),
            ("CHUNK_OVERLAP", "50"),
            ("GROQ_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "gsk-test");
        assert_eq!(config.kb.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(config.kb.chunk_size, 300);
        assert_eq!(config.kb.chunk_overlap, 50);
        // blank values are ignored
        assert_eq!(config.llm.model, "compound-beta");
    }

    #[test]
    fn test_bad_numeric_override_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|k| (k == "CHUNK_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CHUNK_SIZE"));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml_str(include_str!("../../../../amitybot.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.backend, LlmBackendKind::OpenAiCompatible);
        assert_eq!(config.embedding.backend, EmbeddingBackendKind::Hashing);
        assert_eq!(config.auth.seed_users[0].role, Role::LoggedIn);
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = Config::default();
        config.kb.chunk_overlap = config.kb.chunk_size;
        assert!(config.validate().is_err());
    }
}
