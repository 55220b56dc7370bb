//! Integration tests for the chat assistant

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clinic_booking::chat::{
    ChatAssistant, CompletionClient, CompletionError, CompletionRequest, RetryPolicy, SendOutcome,
    DEFAULT_SYSTEM_PROMPT, FALLBACK_REPLY,
};
use clinic_booking::config::{AppConfig, ChatConfig};
use clinic_booking::metrics::MetricsCollector;
use clinic_booking::models::{ChatMessage, Sender};
use mockall::mock;
use tokio::time::Instant;

mock! {
    pub Completion {}

    #[async_trait]
    impl CompletionClient for Completion {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
    }
}

fn chat_config() -> ChatConfig {
    AppConfig::default().chat
}

/// Fails with 429 `limited` times, then replies.
fn rate_limited_then_ok(limited: usize, calls: Arc<Mutex<Vec<Instant>>>) -> MockCompletion {
    let mut client = MockCompletion::new();
    client.expect_complete().returning(move |_| {
        let mut calls = calls.lock().unwrap();
        calls.push(Instant::now());
        if calls.len() <= limited {
            Err(CompletionError::RateLimited)
        } else {
            Ok("Please see a cardiologist.".to_string())
        }
    });
    client
}

#[tokio::test(start_paused = true)]
async fn test_rate_limits_are_retried_with_doubling_delays() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let metrics = MetricsCollector::shared();
    let assistant = ChatAssistant::new(rate_limited_then_ok(3, Arc::clone(&calls)), chat_config())
        .with_metrics(Arc::clone(&metrics));

    let outcome = assistant.send("My chest hurts").await;

    let SendOutcome::Replied { reply, fell_back, .. } = outcome else {
        panic!("expected a reply");
    };
    assert_eq!(reply, "Please see a cardiologist.");
    assert!(!fell_back);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 4);
    let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
    assert!(gaps[0] >= Duration::from_secs(1));
    assert!(gaps[1] >= Duration::from_secs(2));
    assert!(gaps[2] >= Duration::from_secs(4));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.chat_retries, 3);
    assert_eq!(snapshot.chat_fallbacks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fall_back() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let assistant = ChatAssistant::new(rate_limited_then_ok(10, Arc::clone(&calls)), chat_config());

    let outcome = assistant.send("hello").await;

    assert!(matches!(outcome, SendOutcome::Replied { ref reply, fell_back: true, .. } if reply == FALLBACK_REPLY));
    assert_eq!(calls.lock().unwrap().len(), 4);
    assert_eq!(assistant.history().last(), Some(&ChatMessage::bot(FALLBACK_REPLY)));
}

#[tokio::test(start_paused = true)]
async fn test_other_failures_are_not_retried() {
    let mut client = MockCompletion::new();
    client.expect_complete().times(1).returning(|_| {
        Err(CompletionError::Status {
            status: 500,
            body: "upstream error".to_string(),
        })
    });
    let metrics = MetricsCollector::shared();
    let assistant = ChatAssistant::new(client, chat_config()).with_metrics(Arc::clone(&metrics));

    let started = Instant::now();
    let outcome = assistant.send("hello").await;

    assert!(matches!(outcome, SendOutcome::Replied { fell_back: true, .. }));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(metrics.snapshot().chat_retries, 0);
    assert_eq!(metrics.snapshot().chat_fallbacks, 1);
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let mut client = MockCompletion::new();
    client.expect_complete().times(0);
    let assistant = ChatAssistant::new(client, chat_config());

    assert_eq!(assistant.send("   \n").await, SendOutcome::Empty);
    assert!(assistant.history().is_empty());
}

#[tokio::test]
async fn test_request_carries_system_prompt_and_last_four_turns() {
    let seen = Arc::new(Mutex::new(Vec::<CompletionRequest>::new()));
    let recorder = Arc::clone(&seen);
    let counter = AtomicUsize::new(0);

    let mut client = MockCompletion::new();
    client.expect_complete().returning(move |request| {
        recorder.lock().unwrap().push(request.clone());
        Ok(format!("reply {}", counter.fetch_add(1, Ordering::SeqCst)))
    });
    let assistant = ChatAssistant::new(client, chat_config());

    for text in ["one", "two", "three"] {
        assistant.send(text).await;
    }

    let requests = seen.lock().unwrap();
    let last = requests.last().unwrap();
    let turns: Vec<(&str, &str)> = last.messages.iter().map(|m| (m.role.as_str(), m.content.as_str())).collect();
    assert_eq!(
        turns,
        vec![
            ("system", DEFAULT_SYSTEM_PROMPT),
            ("user", "one"),
            ("assistant", "reply 0"),
            ("user", "two"),
            ("assistant", "reply 1"),
            ("user", "three"),
        ]
    );
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(last.model, "gpt-3.5-turbo");

    let history = assistant.history();
    assert_eq!(history.len(), 6);
    assert_eq!(history[4].sender, Sender::User);
    assert_eq!(history[5], ChatMessage::bot("reply 2"));
}

#[tokio::test]
async fn test_keyword_suggestion_survives_failed_completion() {
    let mut client = MockCompletion::new();
    client
        .expect_complete()
        .returning(|_| Err(CompletionError::Transport("connection refused".to_string())));
    let assistant = ChatAssistant::new(client, chat_config());

    let outcome = assistant.send("I have a bad Headache").await;
    let SendOutcome::Replied { suggestion, fell_back, .. } = outcome else {
        panic!("expected a reply");
    };
    assert!(fell_back);
    let suggestion = suggestion.expect("headache maps to neurology");
    assert_eq!(suggestion.department.id, "neurology");
    assert_eq!(suggestion.doctor.map(|d| d.name), Some("Dr. Carol Brain"));
    assert_eq!(suggestion.summary(), "You may want our Neurology department");

    // A message without keywords keeps the earlier hint
    assistant.send("what should I do?").await;
    assert_eq!(assistant.active_suggestion().map(|s| s.department.id), Some("neurology"));
}

struct SlowClient;

#[async_trait]
impl CompletionClient for SlowClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok("done".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_message_is_rejected_while_busy() {
    let assistant = Arc::new(ChatAssistant::new(SlowClient, chat_config()));

    let first = tokio::spawn({
        let assistant = Arc::clone(&assistant);
        async move { assistant.send("first").await }
    });
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert!(assistant.is_busy());
    assert_eq!(assistant.send("second").await, SendOutcome::Busy);

    let outcome = first.await.unwrap();
    assert!(matches!(outcome, SendOutcome::Replied { ref reply, .. } if reply == "done"));
    assert!(!assistant.is_busy());

    let texts: Vec<String> = assistant.history().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["first", "done"]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_policy() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let assistant = ChatAssistant::new(rate_limited_then_ok(10, Arc::clone(&calls)), chat_config())
        .with_retry_policy(RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(250),
        });

    assert!(matches!(assistant.send("hi").await, SendOutcome::Replied { fell_back: true, .. }));
    assert_eq!(calls.lock().unwrap().len(), 2);
}
