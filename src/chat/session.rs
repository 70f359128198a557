//! Core chat session management.
//!
//! This module provides [`SessionState`], the message log and its companions,
//! and [`ChatSession`], which owns the state and runs exchanges with the dream
//! service.  Every change to the state goes through a `SessionState` method and
//! is reported to a [`Renderer`] right away.

use std::time::{Duration, Instant};

use futures::StreamExt;

use crate::chat::config::ChatConfig;
use crate::client::{Backend, DreamClient, EventStream, Reply};
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_EXCHANGES, SESSION_FAILURES, SESSION_IMAGES, STREAM_DURATION, STREAM_EVENTS,
    STREAM_MALFORMED_EVENTS,
};
use crate::types::{DreamRequest, DreamResponse, Message, ResponseStatus, StreamEvent};
use crate::Renderer;

/// Caption of the bot message that carries a one-shot image reply.
pub const IMAGE_CAPTION: &str = "Here's your dream-inspired image:";

/// The bot message appended when an exchange fails for any reason.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error processing your request.";

/// How often a stream that is waiting for data checks for an interrupt.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// The state of one chat session.
///
/// At most one message is streaming at a time, and only while its stream is
/// open.  The log only grows, except that the last message is edited in place
/// while it streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    messages: Vec<Message>,
    pending_input: String,
    is_loading: bool,
    background_image_url: Option<String>,
}

impl SessionState {
    /// Creates the state of a fresh session: the greeting and nothing else.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::bot(greeting)],
            pending_input: String::new(),
            is_loading: false,
            background_image_url: None,
        }
    }

    /// The message log, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The text waiting to be submitted.
    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// True from submission until the exchange settles.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The most recent image URL seen, if any.
    pub fn background_image_url(&self) -> Option<&str> {
        self.background_image_url.as_deref()
    }

    fn set_input(&mut self, input: String) {
        self.pending_input = input;
    }

    fn take_input(&mut self) -> String {
        std::mem::take(&mut self.pending_input)
    }

    fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    fn push_message(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Replaces the text of the last message.  Stream text is cumulative.
    fn replace_last_text(&mut self, text: &str) {
        if let Some(last) = self.messages.last_mut() {
            last.text = text.to_string();
        }
    }

    fn attach_image_to_last(&mut self, image_url: &str) {
        if let Some(last) = self.messages.last_mut() {
            last.image_url = Some(image_url.to_string());
        }
    }

    fn finish_streaming(&mut self) {
        if let Some(last) = self.messages.last_mut() {
            last.is_streaming = false;
        }
    }

    fn set_background(&mut self, image_url: &str) {
        self.background_image_url = Some(image_url.to_string());
    }
}

/// How a call to [`ChatSession::submit`] ended.
///
/// The log reads the same either way; this only tells the caller what happened.
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// Nothing was sent: the input was blank or a request was in flight.
    Skipped,
    /// The reply was applied to the log.
    Completed,
    /// The exchange failed and the generic error reply was appended.
    Failed(Error),
}

impl ExchangeOutcome {
    /// Returns true if nothing was sent.
    pub fn is_skipped(&self) -> bool {
        matches!(self, ExchangeOutcome::Skipped)
    }

    /// Returns true if the reply was applied.
    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed)
    }

    /// Returns the error that ended the exchange, if it failed.
    pub fn error(&self) -> Option<&Error> {
        match self {
            ExchangeOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of messages in the log, greeting included.
    pub message_count: usize,
    /// Exchanges that were sent to the service.
    pub exchanges: u64,
    /// Exchanges that ended with the generic error reply.
    pub failed_exchanges: u64,
    /// Stream events applied to the log.
    pub stream_events: u64,
    /// Stream events skipped because they could not be parsed.
    pub malformed_events: u64,
    /// The current background image, if any.
    pub background_image_url: Option<String>,
}

/// A chat session that manages conversation state and exchanges with the service.
pub struct ChatSession<B: Backend> {
    backend: B,
    config: ChatConfig,
    state: SessionState,
    exchanges: u64,
    failed_exchanges: u64,
    stream_events: u64,
    malformed_events: u64,
}

impl ChatSession<DreamClient> {
    /// Creates a session talking to the service named by the configuration.
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = DreamClient::with_options(config.endpoint.clone(), config.timeout)?;
        Ok(Self::with_backend(client, config))
    }
}

impl<B: Backend> ChatSession<B> {
    /// Creates a new chat session with a custom backend.
    pub fn with_backend(backend: B, config: ChatConfig) -> Self {
        let state = SessionState::new(config.greeting.clone());
        Self {
            backend,
            config,
            state,
            exchanges: 0,
            failed_exchanges: 0,
            stream_events: 0,
            malformed_events: 0,
        }
    }

    /// Returns the session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns the message log, oldest first.
    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    /// Returns the current background image, if any.
    pub fn background_image_url(&self) -> Option<&str> {
        self.state.background_image_url()
    }

    /// Returns true while an exchange is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Returns the backend this session talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replaces the pending input.
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.state.set_input(input.into());
    }

    /// Sets the pending input and submits it.
    pub async fn send(&mut self, input: &str, renderer: &mut dyn Renderer) -> ExchangeOutcome {
        self.set_input(input);
        self.submit(renderer).await
    }

    /// Submits the pending input.
    ///
    /// This method:
    /// 1. Does nothing if the input is blank or a request is in flight
    /// 2. Appends the user message and clears the input
    /// 3. Sends the input to the service
    /// 4. Applies the reply, streamed or one-shot
    /// 5. On any failure, appends the generic error reply
    ///
    /// Failures are never retried and never end the session.
    pub async fn submit(&mut self, renderer: &mut dyn Renderer) -> ExchangeOutcome {
        if self.state.pending_input().trim().is_empty() || self.state.is_loading() {
            return ExchangeOutcome::Skipped;
        }

        let input = self.state.take_input();
        let message = self.state.push_message(Message::user(input.clone()));
        renderer.message_appended(message);
        self.state.set_loading(true);
        renderer.loading_changed(true);
        self.exchanges += 1;
        SESSION_EXCHANGES.click();

        let outcome = match self.exchange(input, renderer).await {
            Ok(()) => ExchangeOutcome::Completed,
            Err(err) => {
                tracing::warn!(error = %err, "exchange failed");
                self.failed_exchanges += 1;
                SESSION_FAILURES.click();
                let message = self.state.push_message(Message::bot(ERROR_REPLY));
                renderer.message_appended(message);
                ExchangeOutcome::Failed(err)
            }
        };

        self.state.set_loading(false);
        renderer.loading_changed(false);
        outcome
    }

    /// Starts over with only the greeting, as a fresh session would.
    pub fn reset(&mut self) {
        self.state = SessionState::new(self.config.greeting.clone());
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.state.messages().len(),
            exchanges: self.exchanges,
            failed_exchanges: self.failed_exchanges,
            stream_events: self.stream_events,
            malformed_events: self.malformed_events,
            background_image_url: self.state.background_image_url.clone(),
        }
    }

    async fn exchange(&mut self, input: String, renderer: &mut dyn Renderer) -> Result<()> {
        match self.backend.submit(DreamRequest::new(input)).await? {
            Reply::Stream(events) => self.consume_stream(events, renderer).await,
            Reply::Json(response) => self.apply_response(response, renderer),
        }
    }

    /// Applies a one-shot reply.
    fn apply_response(&mut self, response: DreamResponse, renderer: &mut dyn Renderer) -> Result<()> {
        if response.is_image() {
            SESSION_IMAGES.click();
            let image_url = response.image_url;
            let message = Message::bot(IMAGE_CAPTION).with_image_url(image_url.clone());
            let message = self.state.push_message(message);
            renderer.message_appended(message);
            if let Some(image_url) = image_url {
                self.state.set_background(&image_url);
                renderer.background_changed(&image_url);
            }
            return Ok(());
        }
        match response.status {
            ResponseStatus::Error => Err(Error::backend(response.message.unwrap_or_default())),
            _ => {
                tracing::debug!(?response, "ignoring reply with nothing to show");
                Ok(())
            }
        }
    }

    /// Consumes a streamed reply into a new bot message.
    ///
    /// However reading ends, the stream is dropped and the message stops
    /// streaming before any error is returned.
    async fn consume_stream(&mut self, mut events: EventStream, renderer: &mut dyn Renderer) -> Result<()> {
        let start = Instant::now();
        let message = self.state.push_message(Message::streaming());
        renderer.message_appended(message);

        let result = self.read_events(&mut events, renderer).await;

        drop(events);
        self.state.finish_streaming();
        if let Some(last) = self.state.last_message() {
            renderer.message_updated(last);
        }
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        result
    }

    async fn read_events(&mut self, events: &mut EventStream, renderer: &mut dyn Renderer) -> Result<()> {
        loop {
            if renderer.should_interrupt() {
                tracing::info!("stream interrupted");
                renderer.print_interrupted();
                return Ok(());
            }
            let next = match tokio::time::timeout(INTERRUPT_POLL, events.next()).await {
                Ok(next) => next,
                Err(_) => continue,
            };
            match next {
                None => return Ok(()),
                Some(Ok(event)) => self.apply_event(event, renderer),
                Some(Err(err)) if err.is_serialization() => {
                    tracing::warn!(error = %err, "skipping malformed stream event");
                    self.malformed_events += 1;
                    STREAM_MALFORMED_EVENTS.click();
                }
                Some(Err(err)) => return Err(err),
            }
        }
    }

    /// Applies one stream event to the streaming message.
    ///
    /// Events without text change nothing, even if they carry an image.
    fn apply_event(&mut self, event: StreamEvent, renderer: &mut dyn Renderer) {
        let Some(text) = event.display_text() else {
            tracing::debug!(?event, "stream event without text");
            return;
        };
        self.stream_events += 1;
        STREAM_EVENTS.click();
        self.state.replace_last_text(text);
        if let Some(image_url) = &event.image_url {
            SESSION_IMAGES.click();
            self.state.attach_image_to_last(image_url);
            self.state.set_background(image_url);
        }
        if let Some(last) = self.state.last_message() {
            renderer.message_updated(last);
        }
        if let Some(image_url) = &event.image_url {
            renderer.background_changed(image_url);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::chat::config::GREETING;
    use crate::sse::process_sse;
    use crate::types::Sender;

    type Journal = Arc<Mutex<Vec<String>>>;

    enum Scripted {
        Sse(Vec<std::result::Result<Bytes, io::Error>>),
        Events(Vec<Result<StreamEvent>>),
        Json(DreamResponse),
        Fail(Error),
    }

    struct ScriptedBackend {
        replies: Mutex<VecDeque<Scripted>>,
        journal: Journal,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Scripted>, journal: Journal) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                journal,
            }
        }
    }

    #[async_trait::async_trait]
    impl Backend for ScriptedBackend {
        async fn submit(&self, request: DreamRequest) -> Result<Reply> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("request: {}", request.dream_input));
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            match reply {
                Scripted::Sse(chunks) => Ok(Reply::Stream(Box::pin(process_sse(stream::iter(
                    chunks,
                ))))),
                Scripted::Events(events) => Ok(Reply::Stream(Box::pin(stream::iter(events)))),
                Scripted::Json(response) => Ok(Reply::Json(response)),
                Scripted::Fail(err) => Err(err),
            }
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        journal: Journal,
        updates: Vec<Message>,
        backgrounds: Vec<String>,
        loading: Vec<bool>,
    }

    impl Renderer for RecordingRenderer {
        fn message_appended(&mut self, message: &Message) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("appended {:?}: {}", message.sender, message.text));
        }

        fn message_updated(&mut self, message: &Message) {
            self.updates.push(message.clone());
        }

        fn background_changed(&mut self, image_url: &str) {
            self.backgrounds.push(image_url.to_string());
        }

        fn loading_changed(&mut self, is_loading: bool) {
            self.loading.push(is_loading);
        }

        fn print_error(&mut self, _: &str) {}

        fn print_info(&mut self, _: &str) {}
    }

    fn session(replies: Vec<Scripted>) -> (ChatSession<ScriptedBackend>, RecordingRenderer) {
        let journal = Journal::default();
        let backend = ScriptedBackend::new(replies, journal.clone());
        let renderer = RecordingRenderer {
            journal,
            ..RecordingRenderer::default()
        };
        (ChatSession::with_backend(backend, ChatConfig::new()), renderer)
    }

    fn sse(lines: &[&'static str]) -> Scripted {
        Scripted::Sse(
            lines
                .iter()
                .map(|line| Ok(Bytes::from_static(line.as_bytes())))
                .collect(),
        )
    }

    fn streaming_count(session: &ChatSession<ScriptedBackend>) -> usize {
        session.messages().iter().filter(|m| m.is_streaming).count()
    }

    #[test]
    fn new_session_has_greeting() {
        let (session, _) = session(vec![]);
        assert_eq!(session.messages(), &[Message::bot(GREETING)]);
        assert!(!session.is_loading());
        assert!(session.background_image_url().is_none());
        assert_eq!(session.state().pending_input(), "");
    }

    #[tokio::test]
    async fn blank_input_is_skipped() {
        let (mut session, mut renderer) = session(vec![]);
        for input in ["", "   ", "\n\t"] {
            let outcome = session.send(input, &mut renderer).await;
            assert!(outcome.is_skipped());
        }
        assert_eq!(session.messages().len(), 1);
        assert!(renderer.journal.lock().unwrap().is_empty());
        assert_eq!(session.stats().exchanges, 0);
    }

    #[tokio::test]
    async fn submission_while_loading_is_skipped() {
        let (mut session, mut renderer) = session(vec![]);
        session.state.set_loading(true);
        let outcome = session.send("I dreamt of flying", &mut renderer).await;
        assert!(outcome.is_skipped());
        assert_eq!(session.messages().len(), 1);
        assert!(renderer.journal.lock().unwrap().is_empty());
        assert_eq!(session.state().pending_input(), "I dreamt of flying");
    }

    #[tokio::test]
    async fn user_message_is_appended_before_the_request() {
        let (mut session, mut renderer) =
            session(vec![Scripted::Json(DreamResponse::image("https://x/1.png"))]);
        session.send("I dreamt of flying", &mut renderer).await;
        let journal = renderer.journal.lock().unwrap().clone();
        assert_eq!(
            journal,
            vec![
                "appended User: I dreamt of flying".to_string(),
                "request: I dreamt of flying".to_string(),
                format!("appended Bot: {IMAGE_CAPTION}"),
            ]
        );
        assert_eq!(renderer.loading, vec![true, false]);
    }

    #[tokio::test]
    async fn input_is_sent_untrimmed_and_cleared() {
        let (mut session, mut renderer) =
            session(vec![Scripted::Json(DreamResponse::image("https://x/1.png"))]);
        session.set_input("  a lighthouse  ");
        session.submit(&mut renderer).await;
        assert_eq!(session.state().pending_input(), "");
        assert_eq!(session.messages()[1].text, "  a lighthouse  ");
        assert!(
            renderer
                .journal
                .lock()
                .unwrap()
                .contains(&"request:   a lighthouse  ".to_string())
        );
    }

    #[tokio::test]
    async fn image_reply_sets_background() {
        let (mut session, mut renderer) =
            session(vec![Scripted::Json(DreamResponse::image("https://x/1.png"))]);
        let outcome = session.send("I dreamt of flying", &mut renderer).await;
        assert!(outcome.is_completed());

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("I dreamt of flying"));
        assert_eq!(messages[2].sender, Sender::Bot);
        assert_eq!(messages[2].text, IMAGE_CAPTION);
        assert_eq!(messages[2].image_url.as_deref(), Some("https://x/1.png"));
        assert_eq!(session.background_image_url(), Some("https://x/1.png"));
        assert_eq!(renderer.backgrounds, vec!["https://x/1.png".to_string()]);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn image_reply_without_url_keeps_background() {
        let mut response = DreamResponse::image("https://x/1.png");
        response.image_url = None;
        let (mut session, mut renderer) = session(vec![
            Scripted::Json(DreamResponse::image("https://x/0.png")),
            Scripted::Json(response),
        ]);
        session.send("first", &mut renderer).await;
        session.send("picture please", &mut renderer).await;
        let last = session.state().last_message().unwrap();
        assert_eq!(last.text, IMAGE_CAPTION);
        assert!(last.image_url.is_none());
        assert_eq!(session.background_image_url(), Some("https://x/0.png"));
    }

    #[tokio::test]
    async fn backend_error_becomes_generic_reply() {
        let (mut session, mut renderer) = session(vec![Scripted::Json(DreamResponse::error(
            "Please share your dream first",
        ))]);
        let outcome = session.send("write a poem", &mut renderer).await;
        assert!(outcome.error().unwrap().is_backend());
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], Message::bot(ERROR_REPLY));
        assert!(!session.is_loading());
        assert_eq!(session.stats().failed_exchanges, 1);
    }

    #[tokio::test]
    async fn reply_with_nothing_to_show_changes_nothing() {
        let mut response = DreamResponse::image("unused");
        response.kind = None;
        let (mut session, mut renderer) = session(vec![Scripted::Json(response)]);
        let outcome = session.send("hello", &mut renderer).await;
        assert!(outcome.is_completed());
        assert_eq!(session.messages().len(), 2);
        assert!(session.background_image_url().is_none());
    }

    #[tokio::test]
    async fn transport_failure_appends_one_error_message() {
        let (mut session, mut renderer) = session(vec![Scripted::Fail(Error::connection(
            "Connection error: refused",
            None,
        ))]);
        let outcome = session.send("tell me a story", &mut renderer).await;
        assert!(outcome.error().unwrap().is_connection());
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("tell me a story"));
        assert_eq!(messages[2], Message::bot(ERROR_REPLY));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn session_recovers_after_failure() {
        let (mut session, mut renderer) = session(vec![
            Scripted::Fail(Error::timeout("Request timed out", None)),
            Scripted::Json(DreamResponse::image("https://x/2.png")),
        ]);
        session.send("first", &mut renderer).await;
        let outcome = session.send("second", &mut renderer).await;
        assert!(outcome.is_completed());
        assert_eq!(session.messages().len(), 5);
        assert_eq!(session.background_image_url(), Some("https://x/2.png"));
    }

    #[tokio::test]
    async fn streamed_story_replaces_text() {
        let (mut session, mut renderer) = session(vec![sse(&[
            "data: {\"text\":\"Once\"}\n\n",
            "data: {\"text\":\"Once upon a time\"}\n\n",
        ])]);
        let outcome = session.send("tell me a story", &mut renderer).await;
        assert!(outcome.is_completed());

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].text, "Once upon a time");
        assert!(!messages[2].is_streaming);
        assert_eq!(streaming_count(&session), 0);
        assert!(!session.is_loading());

        let texts: Vec<_> = renderer.updates.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Once", "Once upon a time", "Once upon a time"]);
        let streaming: Vec<_> = renderer.updates.iter().map(|m| m.is_streaming).collect();
        assert_eq!(streaming, vec![true, true, false]);
    }

    #[tokio::test]
    async fn cumulative_text_is_not_concatenated() {
        let (mut session, mut renderer) = session(vec![sse(&[
            "data: {\"text\":\"a\"}\n",
            "data: {\"text\":\"ab\"}\n",
            "data: {\"text\":\"abc\"}\n",
        ])]);
        session.send("go", &mut renderer).await;
        assert_eq!(session.state().last_message().unwrap().text, "abc");
        assert_eq!(session.stats().stream_events, 3);
    }

    #[tokio::test]
    async fn malformed_event_is_skipped() {
        let (mut session, mut renderer) = session(vec![sse(&[
            "data: {\"text\":\"a\"}\n",
            "data: {\"text\": oops\n",
            "data: {\"text\":\"ab\"}\n",
        ])]);
        let outcome = session.send("go", &mut renderer).await;
        assert!(outcome.is_completed());
        let last = session.state().last_message().unwrap();
        assert_eq!(last.text, "ab");
        assert!(!last.is_streaming);
        let stats = session.stats();
        assert_eq!(stats.stream_events, 2);
        assert_eq!(stats.malformed_events, 1);
    }

    #[tokio::test]
    async fn stream_of_only_malformed_events_still_closes() {
        let (mut session, mut renderer) = session(vec![sse(&["data: nope\n", "data: {]\n"])]);
        let outcome = session.send("go", &mut renderer).await;
        assert!(outcome.is_completed());
        let last = session.state().last_message().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        assert_eq!(last.text, "");
        assert!(!last.is_streaming);
    }

    #[tokio::test]
    async fn streamed_image_sets_sticky_background() {
        let (mut session, mut renderer) = session(vec![
            sse(&["data: {\"text\":\"Themes: flying\",\"type\":\"analysis\",\"image_url\":\"https://x/1.png\"}\n\n"]),
            sse(&["data: {\"text\":\"A story\",\"type\":\"story\"}\n\n"]),
        ]);
        session.send("I dreamt of flying", &mut renderer).await;
        assert_eq!(session.background_image_url(), Some("https://x/1.png"));
        assert_eq!(
            session.messages()[2].image_url.as_deref(),
            Some("https://x/1.png")
        );

        session.send("tell me a story", &mut renderer).await;
        assert_eq!(session.background_image_url(), Some("https://x/1.png"));
        assert!(session.messages()[4].image_url.is_none());
        assert_eq!(renderer.backgrounds, vec!["https://x/1.png".to_string()]);
    }

    #[tokio::test]
    async fn event_without_text_is_ignored() {
        let (mut session, mut renderer) = session(vec![Scripted::Events(vec![
            Ok(StreamEvent::text("dream")),
            Ok(StreamEvent::default().with_image_url("https://x/9.png")),
            Ok(StreamEvent::text("")),
        ])]);
        session.send("go", &mut renderer).await;
        let last = session.state().last_message().unwrap();
        assert_eq!(last.text, "dream");
        assert!(last.image_url.is_none());
        assert!(session.background_image_url().is_none());
    }

    #[tokio::test]
    async fn stream_failure_closes_message_then_reports_error() {
        let (mut session, mut renderer) = session(vec![Scripted::Events(vec![
            Ok(StreamEvent::text("Once")),
            Err(Error::streaming("Error in HTTP stream: reset", None)),
            Ok(StreamEvent::text("Once upon")),
        ])]);
        let outcome = session.send("tell me a story", &mut renderer).await;
        assert!(outcome.error().unwrap().is_transport());

        let messages = session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].text, "Once");
        assert!(!messages[2].is_streaming);
        assert_eq!(messages[3], Message::bot(ERROR_REPLY));
        assert_eq!(streaming_count(&session), 0);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn interrupt_stops_reading() {
        struct InterruptingRenderer {
            inner: RecordingRenderer,
            interrupted: bool,
        }

        impl Renderer for InterruptingRenderer {
            fn message_appended(&mut self, message: &Message) {
                self.inner.message_appended(message);
            }

            fn message_updated(&mut self, message: &Message) {
                self.interrupted = true;
                self.inner.message_updated(message);
            }

            fn background_changed(&mut self, image_url: &str) {
                self.inner.background_changed(image_url);
            }

            fn print_error(&mut self, _: &str) {}

            fn print_info(&mut self, _: &str) {}

            fn should_interrupt(&self) -> bool {
                self.interrupted
            }
        }

        let (mut session, renderer) = session(vec![Scripted::Events(vec![
            Ok(StreamEvent::text("Once")),
            Ok(StreamEvent::text("Once upon a time")),
        ])]);
        let mut renderer = InterruptingRenderer {
            inner: renderer,
            interrupted: false,
        };
        let outcome = session.send("tell me a story", &mut renderer).await;
        assert!(outcome.is_completed());
        let last = session.state().last_message().unwrap();
        assert_eq!(last.text, "Once");
        assert!(!last.is_streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stream_is_awaited() {
        let (mut session, mut renderer) = session(vec![]);
        let events = stream::iter(vec![Ok::<_, Error>(StreamEvent::text("late"))]).then(|event| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            event
        });
        session
            .consume_stream(Box::pin(events), &mut renderer)
            .await
            .unwrap();
        let last = session.state().last_message().unwrap();
        assert_eq!(last.text, "late");
        assert!(!last.is_streaming);
    }

    #[tokio::test]
    async fn reset_restores_fresh_state() {
        let (mut session, mut renderer) =
            session(vec![Scripted::Json(DreamResponse::image("https://x/1.png"))]);
        session.send("I dreamt of flying", &mut renderer).await;
        session.reset();
        assert_eq!(session.state(), &SessionState::new(GREETING));
        assert_eq!(session.stats().exchanges, 1);
    }
}
