#[cfg(test)]
mod tests {
    use advisor_ox_common::{
        CommonRequestError, SseFrame, SseParser,
        request_builder::{Endpoint, RequestBuilder, RequestConfig},
    };
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    #[test]
    fn test_endpoint_creation() {
        let endpoint = Endpoint::new("api/chat");
        assert_eq!(endpoint.path, "api/chat");
        assert!(endpoint.extra_headers.is_none());

        let endpoint = endpoint.with_header("x-trace", "abc");
        assert_eq!(
            endpoint.extra_headers.unwrap().get("x-trace").map(String::as_str),
            Some("abc")
        );
    }

    #[test]
    fn test_request_config_builder() {
        let config = RequestConfig::new("http://localhost:5000").with_user_agent("advisor-ox/0.1");

        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.user_agent, Some("advisor-ox/0.1".to_string()));
    }

    #[test]
    fn test_url_formation_trims_slashes() {
        let builder = RequestBuilder::new(
            reqwest::Client::new(),
            RequestConfig::new("http://localhost:5000/"),
        );
        let endpoint = Endpoint::new("/api/chat");
        assert_eq!(builder.url_for(&endpoint), "http://localhost:5000/api/chat");
    }

    #[test]
    fn test_request_carries_json_and_endpoint_headers() {
        let builder = RequestBuilder::new(
            reqwest::Client::new(),
            RequestConfig::new("http://localhost:5000").with_user_agent("advisor-ox/0.1"),
        );
        let request = builder
            .build_request(&Endpoint::new("api/chat").with_header("accept", "text/event-stream"))
            .build()
            .unwrap();

        assert_eq!(request.method(), &reqwest::Method::POST);
        let headers = request.headers();
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["accept"], "text/event-stream");
        assert_eq!(headers["user-agent"], "advisor-ox/0.1");
    }

    #[tokio::test]
    async fn test_open_stream_yields_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"message": "hello", "history": []})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("data: {\"chunk\":\"Hi\"}\n\ndata: [DONE]\n\n", "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let builder = RequestBuilder::new(reqwest::Client::new(), RequestConfig::new(server.uri()));
        let stream = builder
            .open_stream(
                &Endpoint::new("api/chat"),
                &json!({"message": "hello", "history": []}),
            )
            .await
            .unwrap();

        let mut parser = SseParser::new(stream);
        assert_eq!(
            parser.next_frame().await.unwrap(),
            Some(SseFrame::Data("{\"chunk\":\"Hi\"}".to_string()))
        );
        assert_eq!(parser.next_frame().await.unwrap(), Some(SseFrame::Done));
        assert_eq!(parser.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_stream_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "An error occurred while processing your request."
            })))
            .mount(&server)
            .await;

        let builder = RequestBuilder::new(reqwest::Client::new(), RequestConfig::new(server.uri()));
        let result = builder
            .open_stream(&Endpoint::new("api/chat"), &json!({"message": "x"}))
            .await;

        match result {
            Err(CommonRequestError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "An error occurred while processing your request.");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a status error"),
        }
    }

    #[tokio::test]
    async fn test_open_stream_rejects_non_object_body() {
        let builder = RequestBuilder::new(
            reqwest::Client::new(),
            RequestConfig::new("http://127.0.0.1:9"),
        );
        let result = builder
            .open_stream(&Endpoint::new("api/chat"), &json!(["not", "an", "object"]))
            .await;

        assert!(matches!(result, Err(CommonRequestError::RequestBuilder(_))));
    }
}
