/// Wire-shape tests against a local mock HTTP server.
#[cfg(test)]
mod wire {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use crate::{GatewayError, GatewayRequest, HttpGateway, ModelGateway};

    fn request(server: &mockito::Server, provider: &str, path: &str) -> GatewayRequest {
        GatewayRequest {
            provider: provider.to_string(),
            endpoint: format!("{}{}", server.url(), path),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
            api_key: None,
        }
    }

    #[test]
    fn single_prompt_round_trip() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "prompt": "do it",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": "{\"tool\":\"explain\"}", "done": true}"#)
            .create();

        let completion = HttpGateway::new()
            .complete(&request(&server, "ollama", "/api/generate"), "do it")
            .unwrap();

        mock.assert();
        assert_eq!(completion.text, r#"{"tool":"explain"}"#);
        assert_eq!(completion.raw["done"], true);
    }

    #[test]
    fn chat_round_trip_with_bearer() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{"role": "user", "content": "scale web"}]
            })))
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "ok"}}]}"#)
            .create();

        let mut req = request(&server, "openai", "/v1/chat/completions");
        req.api_key = Some("sk-test".to_string());
        let completion = HttpGateway::new().complete(&req, "scale web").unwrap();

        mock.assert();
        assert_eq!(completion.text, "ok");
    }

    #[test]
    fn unexpected_shape_yields_empty_text() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"something": "else"}"#)
            .create();

        let completion = HttpGateway::new()
            .complete(&request(&server, "ollama", "/api/generate"), "x")
            .unwrap();
        assert_eq!(completion.text, "");
    }

    #[test]
    fn http_error_status_is_call_failure() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/generate")
            .with_status(500)
            .create();

        let err = HttpGateway::new()
            .complete(&request(&server, "ollama", "/api/generate"), "x")
            .unwrap_err();
        assert!(matches!(err, GatewayError::CallFailed(_)));
        assert!(err.to_string().starts_with("llm_call_failed:"));
    }

    #[test]
    fn non_json_body_is_call_failure() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create();

        let err = HttpGateway::new()
            .complete(&request(&server, "ollama", "/api/generate"), "x")
            .unwrap_err();
        assert!(matches!(err, GatewayError::CallFailed(_)));
    }

    #[test]
    fn unsupported_provider_fails_before_network() {
        let server = mockito::Server::new();
        let err = HttpGateway::new()
            .complete(&request(&server, "bedrock", "/"), "x")
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported_provider:bedrock");
    }

    #[test]
    fn unreachable_endpoint_is_call_failure() {
        let req = GatewayRequest {
            provider: "ollama".to_string(),
            endpoint: "http://127.0.0.1:1/api/generate".to_string(),
            model: "m".to_string(),
            timeout: Duration::from_secs(2),
            api_key: None,
        };
        let err = HttpGateway::new().complete(&req, "x").unwrap_err();
        assert!(matches!(err, GatewayError::CallFailed(_)));
    }
}
