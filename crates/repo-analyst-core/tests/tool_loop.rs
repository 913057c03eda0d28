//! End-to-end tool loop: orchestrator, MCP client and server in one process

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{connect, github_registry, github_session, serve, sleep_registry, FakeSource};
use repo_analyst_core::providers::{MockProvider, MockReply, ProviderModelConfig};
use repo_analyst_core::{
    CancellationToken, ChatMessage, Conversation, ConversationError, ConversationOrchestrator,
    MessageRole, NoOpLogger, Session, ToolCall, ToolResult, ToolStatus, TurnError, TurnState,
};

fn orchestrator(provider: &Arc<MockProvider>, round_limit: usize) -> ConversationOrchestrator {
    ConversationOrchestrator::new(
        provider.clone(),
        ProviderModelConfig::new("mock-model"),
        NoOpLogger::shared(),
    )
    .with_round_limit(round_limit)
}

#[test]
fn malformed_history_is_rejected() {
    let mut conversation = Conversation::with_system_prompt("system");
    conversation.push(ChatMessage::user("hi")).unwrap();

    let orphan = ChatMessage::tool_result(&ToolResult::success("call_1", "{}"));
    assert_eq!(
        conversation.push(orphan),
        Err(ConversationError::OrphanToolResult { index: 2 })
    );

    conversation
        .push(ChatMessage::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("call_1", "get_repo_info", json!({}))],
        ))
        .unwrap();
    let unknown = ChatMessage::tool_result(&ToolResult::success("call_2", "{}"));
    assert!(matches!(
        conversation.push(unknown),
        Err(ConversationError::UnknownToolCall { .. })
    ));
    assert_eq!(conversation.len(), 3);
}

#[tokio::test]
async fn repo_info_is_idempotent() {
    let client = connect(github_registry(Arc::new(FakeSource::default()))).await;
    let call = ToolCall::new(
        "call_1",
        "get_repo_info",
        json!({"owner": "octocat", "repo": "hello-world"}),
    );

    let first = client.invoke(&call).await;
    let second = client.invoke(&call).await;

    assert_eq!(first.status, ToolStatus::Ok);
    assert_eq!(first, second);
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn catalog_is_discovered_at_connect() {
    let client = connect(github_registry(Arc::new(FakeSource::default()))).await;
    let names: Vec<&str> = client.tools().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["get_commit_history", "get_repo_info"]);
    assert_eq!(client.tools()[1].input_schema["additionalProperties"], false);
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn invoke_many_keeps_request_order() {
    let client = connect(sleep_registry()).await;
    let calls = vec![
        ToolCall::new("a", "sleep", json!({"label": "A", "delay_ms": 60})),
        ToolCall::new("b", "sleep", json!({"label": "B", "delay_ms": 30})),
        ToolCall::new("c", "sleep", json!({"label": "C", "delay_ms": 0})),
    ];

    let results = client.invoke_many(&calls).await;

    let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(contents, vec!["A", "B", "C"]);
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn sequential_mode_keeps_request_order() {
    let client = connect(sleep_registry()).await.with_parallel(false);
    let calls = vec![
        ToolCall::new("a", "sleep", json!({"label": "A", "delay_ms": 20})),
        ToolCall::new("b", "sleep", json!({"label": "B", "delay_ms": 0})),
    ];

    let results = client.invoke_many(&calls).await;
    assert_eq!(results[0].content, "A");
    assert_eq!(results[1].content, "B");
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn invalid_arguments_become_error_results() {
    let client = connect(github_registry(Arc::new(FakeSource::default()))).await;

    let unknown_field = ToolCall::new(
        "call_1",
        "get_repo_info",
        json!({"owner": "octocat", "repo": "hello-world", "branch": "main"}),
    );
    let result = client.invoke(&unknown_field).await;
    assert_eq!(result.status, ToolStatus::Error);
    assert!(result.content.contains("unknown field 'branch'"));

    let unknown_tool = ToolCall::new("call_2", "delete_repo", json!({}));
    let result = client.invoke(&unknown_tool).await;
    assert_eq!(result.status, ToolStatus::Error);
    assert_eq!(result.call_id, "call_2");
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn round_limit_stops_a_tool_hungry_model() {
    let source = Arc::new(FakeSource::default());
    let mut session = github_session(Arc::clone(&source)).await;
    let provider = Arc::new(MockProvider::scripted(
        vec![MockReply::tool_calls(vec![ToolCall::new(
            "",
            "get_repo_info",
            json!({"owner": "octocat", "repo": "hello-world"}),
        )])],
        NoOpLogger::shared(),
    ));
    let orch = orchestrator(&provider, 1);

    let err = orch
        .run_turn(&mut session, "Tell me everything", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::RoundLimitExceeded { limit: 1 }));
    assert_eq!(provider.request_count(), 2);
    assert_eq!(source.calls.lock().len(), 1);
    assert_eq!(session.conversation().len(), 1);
    assert_eq!(session.state(), TurnState::AwaitingUserInput);
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn tools_disabled_every_response_is_final() {
    let mut session = Session::without_tools(Some("system".to_string()));
    let provider = Arc::new(MockProvider::scripted(
        vec![MockReply::tool_calls(vec![ToolCall::new(
            "call_1",
            "get_repo_info",
            json!({"owner": "octocat", "repo": "hello-world"}),
        )])],
        NoOpLogger::shared(),
    ));
    let orch = orchestrator(&provider, 5);

    let answer = orch
        .run_turn(&mut session, "What languages?", &CancellationToken::new())
        .await
        .unwrap();

    assert!(session.client().is_none());
    assert!(session.catalog().is_empty());
    assert!(answer.contains("get_repo_info"));
    assert_eq!(provider.request_count(), 1);
    assert!(provider.requests()[0].tools.is_none());
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn languages_question_is_answered_from_repo_info() {
    let source = Arc::new(FakeSource::default());
    let mut session = github_session(Arc::clone(&source)).await;
    let provider = Arc::new(MockProvider::scripted(
        vec![
            MockReply::tool_calls(vec![ToolCall::new(
                "call_1",
                "get_repo_info",
                json!({"owner": "octocat", "repo": "hello-world"}),
            )]),
            MockReply::text("octocat/hello-world is mostly Python (75.0%) with some Shell (25.0%)."),
        ],
        NoOpLogger::shared(),
    ));
    let orch = orchestrator(&provider, 5);

    let answer = orch
        .run_turn(
            &mut session,
            "What languages does octocat/hello-world use?",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(answer.contains("Python") && answer.contains("Shell"));
    assert_eq!(session.state(), TurnState::AwaitingUserInput);

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(2));

    let tool_message = requests[1].messages.last().unwrap();
    assert_eq!(tool_message.role, MessageRole::Tool);
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_message.content.contains("\"Python\""));
    assert!(tool_message.content.contains("\"Shell\""));

    let roles: Vec<MessageRole> = session
        .conversation()
        .messages()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant,
        ]
    );
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_repo_error_reaches_the_model_verbatim() {
    let source = Arc::new(FakeSource::default());
    let mut session = github_session(Arc::clone(&source)).await;
    let provider = Arc::new(MockProvider::scripted(
        vec![
            MockReply::tool_calls(vec![ToolCall::new(
                "call_1",
                "get_commit_history",
                json!({"owner": "octocat", "repo": "missing"}),
            )]),
            MockReply::text("I could not find octocat/missing on GitHub."),
        ],
        NoOpLogger::shared(),
    ));
    let orch = orchestrator(&provider, 5);

    let answer = orch
        .run_turn(&mut session, "Summarize recent commits", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(answer, "I could not find octocat/missing on GitHub.");
    let last = provider.requests()[1].messages.last().cloned().unwrap();
    assert_eq!(last.role, MessageRole::Tool);
    assert_eq!(
        last.content,
        "Failed to fetch commit history: Not Found: /repos/octocat/missing/commits"
    );
    assert_eq!(
        source.calls.lock().as_slice(),
        ["commit_history octocat/missing 5".to_string()]
    );
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn parallel_calls_in_one_round() {
    let mut session = github_session(Arc::new(FakeSource::default())).await;
    let provider = Arc::new(MockProvider::scripted(
        vec![
            MockReply::tool_calls(vec![
                ToolCall::new("", "get_repo_info", json!({"owner": "octocat", "repo": "hello-world"})),
                ToolCall::new(
                    "",
                    "get_commit_history",
                    json!({"owner": "octocat", "repo": "hello-world", "limit": 2}),
                ),
            ]),
            MockReply::text("Done."),
        ],
        NoOpLogger::shared(),
    ));
    let orch = orchestrator(&provider, 5);

    orch.run_turn(&mut session, "Overview please", &CancellationToken::new())
        .await
        .unwrap();

    let messages = &provider.requests()[1].messages;
    let ids: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["call_0_0", "call_0_1"]);
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_tool_batch_shows_raw_response() {
    let mut session = github_session(Arc::new(FakeSource::default())).await;
    let provider = Arc::new(MockProvider::scripted(
        vec![MockReply::tool_calls(vec![
            ToolCall::new("dup", "get_repo_info", json!({"owner": "octocat", "repo": "hello-world"})),
            ToolCall::new("dup", "get_repo_info", json!({"owner": "octocat", "repo": "hello-world"})),
        ])
        .with_text("Let me look that up.")],
        NoOpLogger::shared(),
    ));
    let orch = orchestrator(&provider, 5);

    let answer = orch
        .run_turn(&mut session, "Stars?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(answer, "Let me look that up.");
    assert_eq!(provider.request_count(), 1);
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn server_shutdown_ends_serving_and_closes_the_channel() {
    let (client, server, handle) = serve(sleep_registry()).await;
    let warmup = client
        .invoke(&ToolCall::new("call_1", "sleep", json!({"label": "up", "delay_ms": 0})))
        .await;
    assert_eq!(warmup.status, ToolStatus::Ok);

    server.shutdown();
    let served = tokio::time::timeout(Duration::from_secs(3), handle)
        .await
        .expect("server stops after shutdown")
        .expect("serving task did not panic");
    assert!(served.is_ok());

    let after = tokio::time::timeout(
        Duration::from_secs(3),
        client.invoke(&ToolCall::new("call_2", "sleep", json!({"label": "late", "delay_ms": 0}))),
    )
    .await
    .expect("call on a closed channel fails promptly");
    assert_eq!(after.status, ToolStatus::Error);
    assert_eq!(after.call_id, "call_2");
}

#[tokio::test]
async fn cancel_while_a_tool_runs_rolls_back_the_turn() {
    let client = connect(sleep_registry()).await;
    let mut session = Session::with_tools(Some("system".to_string()), client);
    let provider = Arc::new(MockProvider::scripted(
        vec![
            MockReply::tool_calls(vec![ToolCall::new(
                "call_1",
                "sleep",
                json!({"label": "done", "delay_ms": 5000}),
            )]),
            MockReply::text("unreachable"),
        ],
        NoOpLogger::shared(),
    ));
    let orch = orchestrator(&provider, 5);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(3),
        orch.run_turn(&mut session, "Wait for it", &cancel),
    )
    .await
    .expect("cancellation interrupts the running tool")
    .unwrap_err();

    assert!(matches!(err, TurnError::Cancelled));
    assert_eq!(provider.request_count(), 1);
    // user message and assistant tool-call message are both gone
    assert_eq!(session.conversation().len(), 1);
    assert_eq!(session.state(), TurnState::AwaitingUserInput);

    let result = session
        .client()
        .expect("session keeps its tool client")
        .invoke(&ToolCall::new("again", "sleep", json!({"label": "done", "delay_ms": 0})))
        .await;
    assert_eq!(result.status, ToolStatus::Ok);
    assert_eq!(result.content, "done");
    session.shutdown().await.unwrap();
}
