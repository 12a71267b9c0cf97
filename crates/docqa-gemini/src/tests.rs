//! Snapshot tests for the Gemini clients

#[cfg(test)]
mod snapshot_tests {
    use crate::{GeminiClient, GeminiConfig, GeminiEmbedder, Embedder, Generator};
    use insta::assert_yaml_snapshot;
    use std::time::Duration;

    #[test]
    fn test_config_snapshot() {
        let config = GeminiConfig {
            api_key: "test_api_key_redacted".to_string(),
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            request_timeout: Duration::from_secs(60),
        };

        // the key is never serialized
        assert_yaml_snapshot!(config, @r###"
        ---
        api_url: "https://generativelanguage.googleapis.com/v1beta"
        model: gemini-1.5-flash
        embedding_model: text-embedding-004
        request_timeout:
          secs: 60
          nanos: 0
        "###);
    }

    #[test]
    fn test_model_ids() {
        let client = GeminiClient::new(GeminiConfig::new("key"))
            .unwrap()
            .with_model("gemini-1.5-pro");
        let embedder = GeminiEmbedder::new(GeminiConfig::new("key")).unwrap();

        assert_yaml_snapshot!((client.model_id(), embedder.model_id()), @r###"
        ---
        - gemini-1.5-pro
        - text-embedding-004
        "###);
    }
}
