use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use libris_core::{
    Book, Capability, ChatMessage, Extraction, ExtractionSchema, Intent, Role, Session,
    SessionStorage,
};
use libris_session::MemorySessionStore;
use libris_workflow::{
    ChatService, HandlerKind, TurnError, TurnRequest, WorkflowConfig, WorkflowEngine,
};
use rand::Rng;
use tokio_util::sync::CancellationToken;

const SUMMARY_MARKER: &str = "# Detected intents";

#[derive(Default)]
struct Script {
    /// `None` makes classification fail.
    intents: Option<Vec<Intent>>,
    recommended: Vec<Book>,
    read: Vec<Book>,
    preferences: Vec<String>,
    /// `None` makes the summary call fail.
    summary: Option<String>,
    fail_recommend: bool,
    /// Random per-call delays so handlers finish in arbitrary order.
    jitter: bool,
    /// Delay applied to extraction of read books only.
    slow_read: Option<Duration>,
    summary_prompts: Mutex<Vec<String>>,
}

impl Script {
    fn new() -> Self {
        Self {
            intents: Some(vec![Intent::Talk]),
            summary: Some("Here is your summary.".to_string()),
            ..Self::default()
        }
    }

    async fn pause(&self) {
        if self.jitter {
            let millis = rand::thread_rng().gen_range(0..8u64);
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

#[async_trait]
impl Capability for Script {
    async fn generate(&self, prompt: &str, _context: &[ChatMessage]) -> anyhow::Result<String> {
        self.pause().await;
        if prompt.contains(SUMMARY_MARKER) {
            if let Ok(mut prompts) = self.summary_prompts.lock() {
                prompts.push(prompt.to_string());
            }
            return self
                .summary
                .clone()
                .ok_or_else(|| anyhow::anyhow!("summary model unavailable"));
        }
        if prompt.contains("friendly librarian") {
            return Ok("Happy to chat.".to_string());
        }
        if prompt.contains("books they have read") {
            return Ok("Thanks for sharing what you read.".to_string());
        }
        if prompt.contains("reading preferences") {
            return Ok("Noted your preferences.".to_string());
        }
        if prompt.contains("selected the books") {
            return Ok("Here are some picks.".to_string());
        }
        Ok(String::new())
    }

    async fn classify_intent(&self, _text: &str) -> anyhow::Result<Vec<Intent>> {
        self.intents
            .clone()
            .ok_or_else(|| anyhow::anyhow!("classifier unavailable"))
    }

    async fn extract_structured(
        &self,
        _text: &str,
        schema: ExtractionSchema,
    ) -> anyhow::Result<Option<Extraction>> {
        self.pause().await;
        let extraction = match schema {
            ExtractionSchema::RecommendedBooks => {
                if self.fail_recommend {
                    anyhow::bail!("recommendation backend exploded");
                }
                Extraction::Books(self.recommended.clone())
            }
            ExtractionSchema::ReadBooks => {
                if let Some(delay) = self.slow_read {
                    tokio::time::sleep(delay).await;
                }
                Extraction::Books(self.read.clone())
            }
            ExtractionSchema::Preferences => Extraction::Preferences(self.preferences.clone()),
        };
        Ok((!extraction.is_empty()).then_some(extraction))
    }
}

#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
fn book(name: &str, author: &str) -> Book {
    Book::new(name, author).unwrap()
}

type Fixture = (
    Arc<Script>,
    ChatService<Arc<MemorySessionStore>>,
    Arc<MemorySessionStore>,
);

fn service(script: Script) -> Fixture {
    let script = Arc::new(script);
    let engine = WorkflowEngine::new(script.clone(), WorkflowConfig::default());
    let store = Arc::new(MemorySessionStore::new());
    (script, ChatService::new(Arc::new(engine), store.clone()), store)
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn read_book_statement_is_recorded() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::SaveReadBooks]);
    script.read = vec![book("Dune", "Frank Herbert")];
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();

    let reply = service
        .handle_message(&id, "I loved Dune by Frank Herbert", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.read_books, vec![book("Dune", "Frank Herbert")]);
    assert_eq!(reply.reply, "Here is your summary.");
    let session = service.session(&id).await.unwrap();
    assert_eq!(session.read_books.len(), 1);
    assert_eq!(session.read_books[0].name(), "Dune");
    assert_eq!(session.read_books[0].author(), "Frank Herbert");
    assert_eq!(session.intents, vec![Intent::SaveReadBooks]);
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn mixed_statement_merges_in_dispatch_order() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::SavePreferences, Intent::SaveReadBooks]);
    script.preferences = vec!["science fiction".to_string()];
    script.read = vec![book("Dune", "Frank Herbert")];
    // Read-books finishes well after preferences.
    script.slow_read = Some(Duration::from_millis(30));
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();

    service
        .handle_message(
            &id,
            "I like science fiction and I just finished Dune",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let session = service.session(&id).await.unwrap();
    assert_eq!(session.preferences, vec!["science fiction".to_string()]);
    assert_eq!(session.read_books, vec![book("Dune", "Frank Herbert")]);
    let assistant: Vec<&str> = session
        .messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(
        assistant,
        vec![
            "Noted your preferences.",
            "Thanks for sharing what you read.",
            "Here is your summary.",
        ]
    );
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn failing_handler_does_not_fail_turn() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::Recommend, Intent::SavePreferences]);
    script.preferences = vec!["poetry".to_string()];
    script.fail_recommend = true;
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();

    let reply = service
        .handle_message(&id, "Recommend me something, I like poetry", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.preferences, vec!["poetry".to_string()]);
    assert!(reply.recommended_books.is_empty());
    assert_eq!(reply.failures.len(), 1);
    assert_eq!(reply.failures[0].0, HandlerKind::Recommend);
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn empty_classification_goes_straight_to_summary() {
    let mut script = Script::new();
    script.intents = Some(Vec::new());
    let (script, service, _) = service(script);
    let id = service.create_session().await.unwrap();

    let reply = service
        .handle_message(&id, "bye", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.intents, vec![Intent::End]);
    let session = service.session(&id).await.unwrap();
    assert!(session.recommended_books.is_empty());
    assert!(session.read_books.is_empty());
    assert!(session.preferences.is_empty());
    assert_eq!(
        session.messages,
        vec![
            ChatMessage::user("bye"),
            ChatMessage::assistant("Here is your summary."),
        ]
    );
    assert_eq!(script.summary_prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn classifier_failure_falls_back_to_end() {
    let mut script = Script::new();
    script.intents = None;
    script.recommended = vec![book("Emma", "Jane Austen")];
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();

    let reply = service
        .handle_message(&id, "recommend something", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.intents, vec![Intent::End]);
    assert!(reply.recommended_books.is_empty());
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn summary_failure_persists_nothing() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::SavePreferences]);
    script.preferences = vec!["horror".to_string()];
    script.summary = None;
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();
    let before = service.session(&id).await.unwrap();

    let err = service
        .handle_message(&id, "I like horror", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Summarization(_)));
    assert_eq!(service.session(&id).await.unwrap(), before);
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn empty_summary_is_fatal() {
    let mut script = Script::new();
    script.summary = Some("   ".to_string());
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();

    let err = service
        .handle_message(&id, "hello", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::EmptySummary));
    assert!(service.session(&id).await.unwrap().messages.is_empty());
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let (_, service, _) = service(Script::new());

    let err = service
        .handle_message(&"missing".into(), "hello", &CancellationToken::new())
        .await;

    assert!(matches!(err, Err(TurnError::SessionNotFound(id)) if id.as_str() == "missing"));
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn oversized_message_is_rejected() {
    let (_, service, _) = service(Script::new());
    let id = service.create_session().await.unwrap();

    let err = service
        .handle_message(&id, &"a".repeat(2001), &CancellationToken::new())
        .await;
    assert!(matches!(err, Err(TurnError::InvalidMessage(_))));

    let err = service
        .handle_message(&id, "   ", &CancellationToken::new())
        .await;
    assert!(matches!(err, Err(TurnError::InvalidMessage(_))));
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn cancelled_turn_persists_nothing() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::SavePreferences]);
    script.preferences = vec!["horror".to_string()];
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service.handle_message(&id, "I like horror", &cancel).await;

    assert!(matches!(err, Err(TurnError::Cancelled)));
    assert!(service.session(&id).await.unwrap().preferences.is_empty());
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn recommend_forces_intent_and_keeps_preferences() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::Talk]);
    script.recommended = vec![book("The Hobbit", "J.R.R. Tolkien")];
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();

    let reply = service
        .recommend(&id, vec!["fantasy".to_string(), " ".to_string()], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.intents, vec![Intent::Recommend]);
    assert_eq!(reply.preferences, vec!["fantasy".to_string()]);
    assert_eq!(reply.recommended_books, vec![book("The Hobbit", "J.R.R. Tolkien")]);
    let session = service.session(&id).await.unwrap();
    assert!(session.messages[0].content.contains("fantasy"));
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn accumulators_grow_across_turns() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::SaveReadBooks]);
    script.read = vec![book("Dune", "Frank Herbert")];
    let (_, service, _) = service(script);
    let id = service.create_session().await.unwrap();
    let cancel = CancellationToken::new();

    for message in ["I read Dune", "I read Dune again", "And once more"] {
        service.handle_message(&id, message, &cancel).await.unwrap();
    }

    let session = service.session(&id).await.unwrap();
    assert_eq!(session.read_books.len(), 3);
    // Each turn windows to the opener plus the latest exchange before appending.
    assert_eq!(session.messages[0], ChatMessage::user("I read Dune"));
    assert!(session.messages.len() <= 6);
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn completion_order_never_changes_the_result() {
    let expected_messages = vec![
        "Here are some picks.",
        "Noted your preferences.",
        "Thanks for sharing what you read.",
        "Here is your summary.",
    ];

    for _ in 0..100 {
        let mut script = Script::new();
        script.intents = Some(vec![
            Intent::Recommend,
            Intent::SavePreferences,
            Intent::SaveReadBooks,
        ]);
        script.recommended = vec![book("Emma", "Jane Austen")];
        script.preferences = vec!["classics".to_string()];
        script.read = vec![book("Persuasion", "Jane Austen")];
        script.jitter = true;
        let script = Arc::new(script);
        let engine = WorkflowEngine::new(script, WorkflowConfig::default());

        let outcome = engine
            .run_turn(
                &Session::new("trial".into()),
                TurnRequest::new("Recommend classics, I read Persuasion"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let assistant: Vec<&str> = outcome
            .session
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(assistant, expected_messages);
        assert_eq!(outcome.session.recommended_books, vec![book("Emma", "Jane Austen")]);
        assert_eq!(outcome.session.read_books, vec![book("Persuasion", "Jane Austen")]);
        assert_eq!(outcome.session.preferences, vec!["classics".to_string()]);
    }
}

#[tokio::test]
#[expect(clippy::unwrap_used, reason = "Test failure should panic")]
async fn concurrent_turns_on_one_session_are_serialised() {
    let mut script = Script::new();
    script.intents = Some(vec![Intent::SavePreferences]);
    script.preferences = vec!["mystery".to_string()];
    script.jitter = true;
    let (_, service, store) = service(script);
    let service = Arc::new(service);
    let id = service.create_session().await.unwrap();

    let turns: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            let id = id.clone();
            tokio::spawn(async move {
                service
                    .handle_message(&id, &format!("I like mystery {i}"), &CancellationToken::new())
                    .await
            })
        })
        .collect();
    for turn in turns {
        turn.await.unwrap().unwrap();
    }

    let session = store.load(&id).await.unwrap().unwrap();
    assert_eq!(session.preferences.len(), 8);
}
