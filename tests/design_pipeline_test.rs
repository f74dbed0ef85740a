use anyhow::Result;
use httpmock::prelude::*;
use rc_filter_agent::core::fallback::closed_form_design;
use rc_filter_agent::domain::model::ExtractionStrategy;
use rc_filter_agent::{
    ChatCompletionClient, DesignEngine, DesignError, DesignRequest, DesignSource, LocalStorage,
    ServiceSettings,
};
use tempfile::TempDir;

fn settings(server: &MockServer, api_key: Option<&str>) -> ServiceSettings {
    ServiceSettings {
        base_url: server.url("/compatible-mode/v1"),
        api_key: api_key.map(str::to_string),
        timeout_seconds: 10,
        echo_stream: false,
        ..ServiceSettings::default()
    }
}

/// Builds an SSE body, one event per fragment: `("r", text)` for reasoning,
/// `("a", text)` for answer.
fn sse_stream(fragments: &[(&str, &str)]) -> String {
    let mut body = String::from(": connected\n\n");
    for (kind, text) in fragments {
        let delta = match *kind {
            "r" => serde_json::json!({"reasoning_content": text, "content": null}),
            _ => serde_json::json!({"content": text}),
        };
        let chunk = serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion.chunk",
            "model": "qwq-32b",
            "choices": [{"index": 0, "delta": delta, "finish_reason": null}]
        });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn test_end_to_end_model_design() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_dir = temp_dir.path().join("results");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/compatible-mode/v1/chat/completions")
            .header("authorization", "Bearer sk-test")
            .json_body_partial(r#"{"model": "qwq-32b", "stream": true}"#);
        then.status(200)
            .header("Content-Type", "text/event-stream")
            .body(sse_stream(&[
                ("r", "The center frequency is 100 Hz, "),
                ("r", "so choose C = 100 nF."),
                ("a", "Final values:\n```json\n{\"R1\": 1000, \"R2\": "),
                ("a", "2000, \"C1\": 1e-7, \"C2\": 1e-7}\n```"),
            ]));
    });

    let client = ChatCompletionClient::new(&settings(&server, Some("sk-test")))?;
    let storage = LocalStorage::new(output_dir.to_string_lossy().into_owned());
    let engine = DesignEngine::new(client, storage);

    let outcome = engine.run(&DesignRequest::new(100.0, 40.0)).await?;

    api_mock.assert();
    assert_eq!(
        outcome.result.source,
        DesignSource::Model {
            strategy: ExtractionStrategy::FencedJson
        }
    );

    let saved = std::fs::read_to_string(output_dir.join("rc_bandpass.sp"))?;
    assert_eq!(saved, outcome.netlist);
    let lines: Vec<&str> = saved.lines().collect();
    for expected in [
        "C1 in mid 1e-07",
        "R1 mid 0 1000",
        "R2 mid out 2000",
        "C2 out 0 1e-07",
        "Rload out 0 100k",
        ".ac dec 100 10 1000",
    ] {
        assert!(lines.contains(&expected), "missing '{}'", expected);
    }
    Ok(())
}

#[tokio::test]
async fn test_unrecognizable_answer_uses_closed_form() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/compatible-mode/v1/chat/completions");
        then.status(200)
            .header("Content-Type", "text/event-stream")
            .body(sse_stream(&[
                ("r", "Thinking about R1 = 5 ohms..."),
                ("a", "A bandpass filter combines high-pass and low-pass stages."),
            ]));
    });

    let client = ChatCompletionClient::new(&settings(&server, Some("sk-test")))?;
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let request = DesignRequest::new(250.0, 50.0);

    let outcome = DesignEngine::new(client, storage).run(&request).await?;

    api_mock.assert();
    assert!(outcome.result.is_fallback());
    assert_eq!(outcome.result.components, closed_form_design(&request));
    Ok(())
}

#[tokio::test]
async fn test_service_error_uses_closed_form() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/compatible-mode/v1/chat/completions");
        then.status(500).body("upstream unavailable");
    });

    let client = ChatCompletionClient::new(&settings(&server, Some("sk-test")))?;
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let request = DesignRequest::new(100.0, 40.0);

    let outcome = DesignEngine::new(client, storage).run(&request).await?;

    api_mock.assert();
    assert_eq!(outcome.result.components, closed_form_design(&request));
    match &outcome.result.source {
        DesignSource::ClosedForm { reason } => assert!(reason.contains("500")),
        other => panic!("expected closed-form source, got {:?}", other),
    }
    assert!(temp_dir.path().join("rc_bandpass.sp").exists());
    Ok(())
}

#[tokio::test]
async fn test_stream_without_done_marker_is_still_read() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/compatible-mode/v1/chat/completions");
        then.status(200).body(
            "data: {\"choices\":[{\"delta\":{\"content\":\"R1 = 2.2e+3\"}}]}\n\n\
             data: {\"choices\":[{\"delta\":{\"content\":\", C1 = 4.7e-7\"}}]}",
        );
    });

    let client = ChatCompletionClient::new(&settings(&server, Some("sk-test")))?;
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());

    let outcome = DesignEngine::new(client, storage)
        .run(&DesignRequest::new(100.0, 40.0))
        .await?;

    assert_eq!(outcome.result.components.get("R1"), Some(2200.0));
    assert_eq!(outcome.result.components.get("C1"), Some(4.7e-7));
    // Missing entries fall back to the renderer defaults.
    assert!(outcome.netlist.contains("R2 mid out 1000\n"));
    assert!(outcome.netlist.contains("C2 out 0 1e-06\n"));
    Ok(())
}

#[tokio::test]
async fn test_missing_credential_prevents_remote_call() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(200).body("data: [DONE]\n\n");
    });

    let result = ChatCompletionClient::new(&settings(&server, None));

    assert!(matches!(
        result,
        Err(DesignError::MissingConfigError { ref field }) if field == "api_key"
    ));
    assert!(result.unwrap_err().is_fatal());
    assert_eq!(api_mock.hits(), 0);
}
