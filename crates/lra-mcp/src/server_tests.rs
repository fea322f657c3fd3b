use super::*;
use crate::automation::ActionOutput;
use crate::protocol::JsonRpcResponse;
use crate::test_support::{FakeAutomation, FakeLog};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Feed `input` through a server with a fake automation; return parsed output frames.
async fn run(input: &str, output: ActionOutput) -> (Vec<JsonRpcResponse>, Arc<Mutex<FakeLog>>) {
    let (automation, log) = FakeAutomation::new(output);
    let server = McpServer::new(automation, [1920, 1080]);
    let mut out = Vec::new();
    server
        .serve(input.as_bytes(), &mut out, &CancellationToken::new())
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.is_empty() || text.ends_with('\n'));
    let responses = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (responses, log)
}

#[tokio::test]
async fn test_initialize_and_tools_list() {
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
    );
    let (responses, _) = run(input, ActionOutput::default()).await;
    assert_eq!(responses.len(), 2);

    let init = responses[0].result.as_ref().unwrap();
    assert_eq!(responses[0].id, json!(1));
    assert_eq!(init["serverInfo"]["name"], "browser-visual-testing");
    assert_eq!(init["protocolVersion"], "2024-11-05");

    let tools = responses[1].result.as_ref().unwrap()["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "browser_visual_test");
    assert!(tools[0]["inputSchema"]["properties"]["viewport"].is_object());
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found_with_echoed_id() {
    let input = r#"{"jsonrpc":"2.0","id":"req-7","method":"tools/call","params":{"name":"nope","arguments":{}}}"#;
    let (responses, log) = run(&format!("{input}\n"), ActionOutput::default()).await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, json!("req-7"));
    assert!(responses[0].result.is_none());
    let error = responses[0].error.as_ref().unwrap();
    assert_eq!(error.code, -32601);
    assert!(error.message.contains("nope"));
    assert!(log.lock().unwrap().executed.is_empty());
}

#[tokio::test]
async fn test_unknown_method_is_method_not_found() {
    let input = r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#;
    let (responses, _) = run(&format!("{input}\n"), ActionOutput::default()).await;
    assert_eq!(responses[0].error.as_ref().unwrap().code, -32601);
}

#[tokio::test]
async fn test_initialized_notification_writes_nothing() {
    let input = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
    let (responses, _) = run(&format!("{input}\n"), ActionOutput::default()).await;
    assert!(responses.is_empty());
}

#[tokio::test]
async fn test_garbage_lines_are_dropped_and_stream_survives() {
    let input = concat!(
        "this is not json\n",
        "{\"jsonrpc\":\"2.0\",\"id\":1,\n",
        "\n",
        "42\n",
        r#"{"jsonrpc":"2.0","id":9,"method":"tools/list"}"#,
        "\n",
    );
    let (responses, _) = run(input, ActionOutput::default()).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, json!(9));
}

#[tokio::test]
async fn test_invalid_utf8_line_is_dropped() {
    let (automation, _log) = FakeAutomation::new(ActionOutput::default());
    let server = McpServer::new(automation, [1920, 1080]);
    let mut input = vec![0xff, 0xfe, b'\n'];
    input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#);
    input.push(b'\n');

    let mut out = Vec::new();
    server
        .serve(&input[..], &mut out, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
}

#[tokio::test]
async fn test_invalid_utf8_inside_request_is_not_executed() {
    let (automation, log) = FakeAutomation::new(ActionOutput::default());
    let server = McpServer::new(automation, [1920, 1080]);
    let mut input = br#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"browser_visual_test","arguments":{"action":"type","text":""#.to_vec();
    input.push(0xff);
    input.extend_from_slice(b"\"}}}\n");
    input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"initialize"}"#);
    input.push(b'\n');

    let mut out = Vec::new();
    server
        .serve(&input[..], &mut out, &CancellationToken::new())
        .await
        .unwrap();

    let responses: Vec<JsonRpcResponse> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, json!(2));
    assert!(log.lock().unwrap().executed.is_empty());
}

#[tokio::test]
async fn test_cancel_closes_automation_while_stdin_is_open() {
    let (automation, log) = FakeAutomation::new(ActionOutput::default());
    let server = McpServer::new(automation, [1920, 1080]);
    // Keep the client half alive so the reader never sees end of stream.
    let (_client, server_side) = tokio::io::duplex(64);
    let cancel = CancellationToken::new();

    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            server
                .serve(tokio::io::BufReader::new(server_side), tokio::io::sink(), &cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log.lock().unwrap().closed, 0);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("serve should return after cancel")
        .unwrap()
        .unwrap();
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[tokio::test]
async fn test_set_viewport_returns_single_text_block() {
    let input = r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"browser_visual_test","arguments":{"action":"set_viewport","viewport":[375,667]}}}"#;
    let (responses, log) = run(&format!("{input}\n"), ActionOutput::default()).await;

    let content = responses[0].result.as_ref().unwrap()["content"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], "text");
    assert!(content[0]["text"].as_str().unwrap().contains("375x667"));
    assert_eq!(log.lock().unwrap().viewports, vec![(375, 667)]);
}

#[tokio::test]
async fn test_tool_call_content_is_never_empty() {
    let input = r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"browser_visual_test","arguments":{"action":"scroll","scroll_direction":"down"}}}"#;
    let (responses, _) = run(&format!("{input}\n"), ActionOutput::default()).await;
    let content = responses[0].result.as_ref().unwrap()["content"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(content, vec![json!({"type": "text", "text": "Action completed"})]);
}

#[tokio::test]
async fn test_dispatch_error_becomes_internal_error() {
    let input = r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"browser_visual_test","arguments":{"action":"set_viewport","viewport":"big"}}}"#;
    let (responses, _) = run(&format!("{input}\n"), ActionOutput::default()).await;
    let error = responses[0].error.as_ref().unwrap();
    assert_eq!(error.code, -32000);
    assert!(error.message.contains("viewport"));
}

#[tokio::test]
async fn test_automation_closed_once_at_eof() {
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"browser_visual_test","arguments":{}}}"#,
        "\n",
    );
    let (responses, log) = run(input, ActionOutput::default()).await;
    assert_eq!(responses.len(), 1);
    let log = log.lock().unwrap();
    assert_eq!(log.executed.len(), 1);
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn test_request_without_id_gets_no_response() {
    let input = r#"{"jsonrpc":"2.0","method":"tools/list"}"#;
    let (responses, _) = run(&format!("{input}\n"), ActionOutput::default()).await;
    assert!(responses.is_empty());
}
