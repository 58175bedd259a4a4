use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

type StreamSender = mpsc::UnboundedSender<(StreamMessage, u64)>;

fn send_error(tx: &StreamSender, stream_id: u64, error_text: &str) {
    let _ = tx.send((StreamMessage::Error(format_api_error(error_text)), stream_id));
    let _ = tx.send((StreamMessage::End, stream_id));
}

/// Forward one NDJSON line. Returns `true` once the stream is finished.
fn process_ndjson_line(line: &str, tx: &StreamSender, stream_id: u64) -> bool {
    if line.is_empty() {
        return false;
    }

    match serde_json::from_str::<ChatResponse>(line) {
        Ok(ChatResponse {
            error: Some(error), ..
        }) => {
            send_error(tx, stream_id, &error);
            true
        }
        Ok(response) => {
            if let Some(message) = response.message {
                if !message.content.is_empty() {
                    let _ = tx.send((StreamMessage::Chunk(message.content), stream_id));
                }
            }
            if response.done {
                debug!(stream_id, reason = ?response.done_reason, "chat stream done");
                let _ = tx.send((StreamMessage::End, stream_id));
                return true;
            }
            false
        }
        Err(_) => {
            send_error(tx, stream_id, line);
            true
        }
    }
}

/// Decode and forward one raw line. Bytes that are not UTF-8 end the stream
/// with an error rather than dropping part of the reply.
fn process_ndjson_bytes(line: &[u8], tx: &StreamSender, stream_id: u64) -> bool {
    match std::str::from_utf8(line) {
        Ok(line) => process_ndjson_line(line.trim(), tx, stream_id),
        Err(e) => {
            warn!(stream_id, error = %e, "invalid UTF-8 in chat stream");
            send_error(tx, stream_id, &format!("invalid UTF-8 in response: {e}"));
            true
        }
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .get("error")
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.to_string()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|message| message.as_str().map(str::to_owned)),
            _ => None,
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Turn whatever the server (or the transport) said into one readable line.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "Ollama error: <empty response>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("Ollama error: {summary}");
            }
        }
        if let Ok(compact) = serde_json::to_string(&json_value) {
            return format!("Ollama error: {compact}");
        }
    }

    format!("Ollama error: {trimmed}")
}

#[derive(Debug)]
pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub model: String,
    pub api_messages: Vec<ChatMessage>,
    pub stream_id: u64,
}

/// Runs chat requests on background tasks and reports fragments, errors,
/// and completion over one channel, tagged with the stream id.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: StreamSender,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            run_stream(params, &tx).await;
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(params: StreamParams, tx: &StreamSender) {
    let StreamParams {
        client,
        base_url,
        model,
        api_messages,
        stream_id,
    } = params;

    let request = ChatRequest {
        model,
        messages: api_messages,
        stream: true,
    };

    let chat_url = construct_api_url(&base_url, "api/chat");
    debug!(stream_id, url = %chat_url, model = %request.model, messages = request.messages.len(), "starting chat stream");

    let response = match client
        .post(chat_url)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(stream_id, error = %e, "chat request failed");
            send_error(tx, stream_id, &e.to_string());
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        warn!(stream_id, %status, "chat request rejected");
        send_error(tx, stream_id, &error_text);
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(stream_id, error = %e, "chat stream interrupted");
                send_error(tx, stream_id, &e.to_string());
                return;
            }
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let should_end = process_ndjson_bytes(&buffer[..newline_pos], tx, stream_id);
            buffer.drain(..=newline_pos);
            if should_end {
                return;
            }
        }
    }

    // The server may close without a trailing newline after the last object.
    if process_ndjson_bytes(&buffer, tx, stream_id) {
        return;
    }
    let _ = tx.send((StreamMessage::End, stream_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{spawn_mock_server, MockResponse};

    fn drain(rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        while let Ok((message, _)) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    async fn collect_until_end(
        rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        while let Some((message, _)) = rx.recv().await {
            let done = message == StreamMessage::End;
            messages.push(message);
            if done {
                break;
            }
        }
        messages
    }

    fn params(base_url: &str, stream_id: u64) -> StreamParams {
        StreamParams {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            model: "llama3".to_string(),
            api_messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a helpful assistant.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "hi".to_string(),
                },
            ],
            stream_id,
        }
    }

    #[test]
    fn ndjson_lines_forward_content_then_end() {
        let (service, mut rx) = ChatStreamService::new();
        let lines = [
            r#"{"model":"llama3","message":{"role":"assistant","content":"He"},"done":false}"#,
            r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":false}"#,
            r#"{"model":"llama3","message":{"role":"assistant","content":"llo"},"done":false}"#,
        ];
        for line in lines {
            assert!(!process_ndjson_line(line, &service.tx, 7));
        }
        assert!(process_ndjson_line(
            r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#,
            &service.tx,
            7
        ));

        assert_eq!(
            drain(&mut rx),
            vec![
                StreamMessage::Chunk("He".to_string()),
                StreamMessage::Chunk("llo".to_string()),
                StreamMessage::End,
            ]
        );
    }

    #[test]
    fn ndjson_error_line_ends_the_stream() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(process_ndjson_line(
            r#"{"error":"model 'nope' not found"}"#,
            &service.tx,
            3
        ));
        assert_eq!(
            drain(&mut rx),
            vec![
                StreamMessage::Error("Ollama error: model 'nope' not found".to_string()),
                StreamMessage::End,
            ]
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(!process_ndjson_line("", &service.tx, 1));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn invalid_utf8_line_ends_the_stream_with_an_error() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(!process_ndjson_bytes(
            br#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#,
            &service.tx,
            4
        ));
        assert!(process_ndjson_bytes(b"{\"message\":\xff\xfe}", &service.tx, 4));

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], StreamMessage::Chunk("Hi".to_string()));
        match &messages[1] {
            StreamMessage::Error(text) => {
                assert!(text.starts_with("Ollama error: invalid UTF-8 in response"))
            }
            other => panic!("expected an error, got {other:?}"),
        }
        assert_eq!(messages[2], StreamMessage::End);
    }

    #[test]
    fn format_api_error_summarizes_json() {
        assert_eq!(
            format_api_error(r#"{"error":"model   overloaded"}"#),
            "Ollama error: model overloaded"
        );
        assert_eq!(
            format_api_error(r#"{"error":{"message":"bad request"}}"#),
            "Ollama error: bad request"
        );
        assert_eq!(
            format_api_error(r#"{"status":"failed"}"#),
            r#"Ollama error: {"status":"failed"}"#
        );
        assert_eq!(format_api_error("  refused \n"), "Ollama error: refused");
        assert_eq!(format_api_error(""), "Ollama error: <empty response>");
    }

    #[tokio::test]
    async fn streams_fragments_split_across_packets() {
        let server = spawn_mock_server(vec![MockResponse::streamed(
            200,
            vec![
                r#"{"message":{"role":"assistant","content":"He"},"done":false}"#.to_string()
                    + "\n"
                    + r#"{"message":{"role":"assi"#,
                r#"stant","content":"llo"},"done":false}"#.to_string() + "\n",
                r#"{"message":{"role":"assistant","content":""},"done":true}"#.to_string() + "\n",
            ],
        )])
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(&server.base_url, 11));

        assert_eq!(
            collect_until_end(&mut rx).await,
            vec![
                StreamMessage::Chunk("He".to_string()),
                StreamMessage::Chunk("llo".to_string()),
                StreamMessage::End,
            ]
        );

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].request_line.starts_with("POST /api/chat"));
        let body: serde_json::Value =
            serde_json::from_slice(&requests[0].body).expect("json request body");
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn stream_without_done_marker_ends_on_close() {
        let server = spawn_mock_server(vec![MockResponse::streamed(
            200,
            vec![r#"{"message":{"role":"assistant","content":"partial"},"done":false}"#.to_string()],
        )])
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(&server.base_url, 2));

        assert_eq!(
            collect_until_end(&mut rx).await,
            vec![StreamMessage::Chunk("partial".to_string()), StreamMessage::End]
        );
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let server = spawn_mock_server(vec![MockResponse::json(
            404,
            r#"{"error":"model \"llama3\" not found, try pulling it first"}"#,
        )])
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(&server.base_url, 5));

        assert_eq!(
            collect_until_end(&mut rx).await,
            vec![
                StreamMessage::Error(
                    "Ollama error: model \"llama3\" not found, try pulling it first".to_string()
                ),
                StreamMessage::End,
            ]
        );
    }

    #[tokio::test]
    async fn connection_failure_is_reported() {
        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params("http://127.0.0.1:1", 9));

        let messages = collect_until_end(&mut rx).await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], StreamMessage::Error(text) if text.starts_with("Ollama error:")));
        assert_eq!(messages[1], StreamMessage::End);
    }

    #[test]
    fn messages_carry_their_stream_id() {
        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(StreamMessage::Chunk("x".to_string()), 42);
        let (message, id) = rx.try_recv().expect("message");
        assert_eq!(message, StreamMessage::Chunk("x".to_string()));
        assert_eq!(id, 42);
    }
}
