//! Conversation runtime — owns one session and paces the bot's replies.
//!
//! Events are handled strictly one at a time. Replies are delivered after
//! their typing pause; events that arrive meanwhile wait in a backlog so a
//! fast user can never overtake the bot. A reset or close drops every pending
//! reply and queued event, so nothing from an old session reaches a new one.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::engine::{DialogEngine, UserEvent};
use super::message::Message;
use super::session::Session;
use crate::error::ChannelError;
use crate::flows::{Pause, Reply};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Requests accepted by the runtime.
#[derive(Debug, Clone)]
pub enum Command {
    Event(UserEvent),
    Reset,
    Close,
}

/// Changes published to renderers.
#[derive(Debug, Clone)]
pub enum Update {
    /// A message was appended to the log.
    Appended(Message),
    /// Options and upload requests on earlier messages were withdrawn.
    PromptsResolved,
    /// The conversation restarted with a new, empty session.
    Reset { session_id: Uuid },
    Closed,
}

/// Cheap, cloneable front end to a running conversation.
#[derive(Clone)]
pub struct ConversationHandle {
    tx: mpsc::UnboundedSender<Command>,
    updates: broadcast::Sender<Update>,
    snapshot: Arc<RwLock<Session>>,
}

impl ConversationHandle {
    pub fn send(&self, event: UserEvent) -> Result<(), ChannelError> {
        self.command(Command::Event(event))
    }

    /// Discard the session and anything still pending, then start over.
    pub fn reset(&self) -> Result<(), ChannelError> {
        self.command(Command::Reset)
    }

    pub fn close(&self) -> Result<(), ChannelError> {
        self.command(Command::Close)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Update> {
        self.updates.subscribe()
    }

    /// Copy of the session as last published.
    pub async fn snapshot(&self) -> Session {
        self.snapshot.read().await.clone()
    }

    fn command(&self, command: Command) -> Result<(), ChannelError> {
        self.tx.send(command).map_err(|_| ChannelError::Closed)
    }
}

/// A reply waiting for its turn.
struct Scheduled {
    due: Instant,
    message: Message,
}

struct Conversation {
    engine: DialogEngine,
    session: Session,
    scheduled: VecDeque<Scheduled>,
    backlog: VecDeque<UserEvent>,
    updates: broadcast::Sender<Update>,
    snapshot: Arc<RwLock<Session>>,
}

/// Start a conversation task with a fresh session.
pub fn spawn_conversation(engine: DialogEngine) -> (ConversationHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (updates, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
    let session = engine.start_session();
    let snapshot = Arc::new(RwLock::new(session.clone()));

    let conversation = Conversation {
        engine,
        session,
        scheduled: VecDeque::new(),
        backlog: VecDeque::new(),
        updates: updates.clone(),
        snapshot: Arc::clone(&snapshot),
    };
    let task = tokio::spawn(conversation.run(rx));

    (
        ConversationHandle {
            tx,
            updates,
            snapshot,
        },
        task,
    )
}

async fn wait_until(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending::<()>().await,
    }
}

impl Conversation {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let due = self.scheduled.front().map(|s| s.due);
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Event(event)) => {
                        if self.scheduled.is_empty() {
                            self.process(event).await;
                        } else {
                            tracing::debug!(
                                session_id = %self.session.id,
                                backlog = self.backlog.len() + 1,
                                "Reply pending, queueing event"
                            );
                            self.backlog.push_back(event);
                        }
                    }
                    Some(Command::Reset) => self.reset().await,
                    Some(Command::Close) | None => {
                        self.scheduled.clear();
                        self.backlog.clear();
                        let _ = self.updates.send(Update::Closed);
                        tracing::info!(session_id = %self.session.id, "Conversation closed");
                        break;
                    }
                },
                _ = wait_until(due) => {
                    self.deliver_due().await;
                    while self.scheduled.is_empty() {
                        let Some(event) = self.backlog.pop_front() else {
                            break;
                        };
                        self.process(event).await;
                    }
                }
            }
        }
    }

    async fn process(&mut self, event: UserEvent) {
        let open_prompt = self
            .session
            .messages
            .iter()
            .rposition(|m| m.options.is_some() || m.expects_file_upload);
        let before = self.session.messages.len();

        let turn = self.engine.handle(&self.session, event);
        self.session = turn.session;

        let resolved = open_prompt
            .and_then(|i| self.session.messages.get(i))
            .is_some_and(|m| m.options.is_none() && !m.expects_file_upload);
        if resolved {
            let _ = self.updates.send(Update::PromptsResolved);
        }
        for message in self.session.messages.iter().skip(before) {
            let _ = self.updates.send(Update::Appended(message.clone()));
        }

        self.schedule(turn.replies);
        self.publish_snapshot().await;
    }

    fn schedule(&mut self, replies: Vec<Reply>) {
        let config = self.engine.config();
        let mut due = self
            .scheduled
            .back()
            .map(|s| s.due)
            .unwrap_or_else(Instant::now);
        for reply in replies {
            due += match reply.pause {
                Pause::Typing => config.typing_delay,
                Pause::FollowUp => config.follow_up_delay,
            };
            self.scheduled.push_back(Scheduled {
                due,
                message: reply.message,
            });
        }
    }

    async fn deliver_due(&mut self) {
        let now = Instant::now();
        let mut delivered = false;
        while self.scheduled.front().is_some_and(|s| s.due <= now) {
            let Some(scheduled) = self.scheduled.pop_front() else {
                break;
            };
            let mut message = scheduled.message;
            message.sent_at = chrono::Utc::now();
            self.session.push(message.clone());
            let _ = self.updates.send(Update::Appended(message));
            delivered = true;
        }
        if delivered {
            self.publish_snapshot().await;
        }
    }

    async fn reset(&mut self) {
        let dropped = self.scheduled.len() + self.backlog.len();
        self.scheduled.clear();
        self.backlog.clear();
        self.session = self.engine.start_session();
        tracing::info!(session_id = %self.session.id, dropped, "Conversation reset");
        let _ = self.updates.send(Update::Reset {
            session_id: self.session.id,
        });
        self.publish_snapshot().await;
    }

    async fn publish_snapshot(&self) {
        *self.snapshot.write().await = self.session.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialogConfig;
    use crate::dialog::session::{ExistingStage, FlowState};
    use std::time::Duration;

    fn spawn() -> (ConversationHandle, JoinHandle<()>) {
        spawn_conversation(DialogEngine::new(DialogConfig::default()))
    }

    async fn next_appended(rx: &mut broadcast::Receiver<Update>) -> Message {
        loop {
            match rx.recv().await.unwrap() {
                Update::Appended(message) => return message,
                _ => continue,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reply_arrives_after_typing_delay() {
        let (handle, _task) = spawn();
        let mut rx = handle.subscribe();
        let started = Instant::now();

        handle.send(UserEvent::Text("I need a CFA loan".into())).unwrap();

        let echo = next_appended(&mut rx).await;
        assert!(!echo.is_bot());
        let greeting = next_appended(&mut rx).await;
        assert!(greeting.is_bot());
        assert!(started.elapsed() >= Duration::from_millis(600));

        let snapshot = handle.snapshot().await;
        assert_eq!(
            snapshot.state,
            FlowState::Education(ExistingStage::CustomerType)
        );
        assert_eq!(snapshot.messages.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn early_events_wait_for_pending_replies() {
        let (handle, _task) = spawn();
        let mut rx = handle.subscribe();

        // The option is sent before the greeting offering it is shown.
        handle.send(UserEvent::Text("wedding".into())).unwrap();
        handle.send(UserEvent::Option("yes".into())).unwrap();

        let mut texts = Vec::new();
        for _ in 0..4 {
            texts.push(next_appended(&mut rx).await.text);
        }
        assert_eq!(texts[0], "wedding");
        assert!(texts[1].contains("Congratulations"));
        assert_eq!(texts[2], "👉 Yes");
        assert!(texts[3].contains("PAN"));

        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.state, FlowState::Wedding(ExistingStage::Pan));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_suppresses_pending_reply() {
        let (handle, _task) = spawn();
        let mut rx = handle.subscribe();

        handle.send(UserEvent::Text("cfa".into())).unwrap();
        handle.reset().unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snapshot = handle.snapshot().await;
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.is_idle());

        let mut saw_reset = false;
        while let Ok(update) = rx.try_recv() {
            match update {
                Update::Appended(message) => assert!(!message.is_bot()),
                Update::Reset { session_id } => {
                    assert_eq!(session_id, snapshot.id);
                    saw_reset = true;
                }
                _ => {}
            }
        }
        assert!(saw_reset);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_drops_queued_events_and_replies() {
        let (handle, _task) = spawn();

        handle.send(UserEvent::Text("cfa".into())).unwrap();
        // Waits behind the greeting, then is discarded by the reset.
        handle.send(UserEvent::Option("yes".into())).unwrap();
        handle.reset().unwrap();
        handle.send(UserEvent::Text("wedding".into())).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snapshot = handle.snapshot().await;
        assert_eq!(
            snapshot.state,
            FlowState::Wedding(ExistingStage::CustomerType)
        );
        let texts: Vec<_> = snapshot.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "wedding");
        assert!(texts[1].contains("Congratulations"));
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_the_task() {
        let (handle, task) = spawn();
        let mut rx = handle.subscribe();
        handle.close().unwrap();
        task.await.unwrap();

        assert!(matches!(rx.recv().await, Ok(Update::Closed)));
        assert!(handle.send(UserEvent::Text("hi".into())).is_err());
    }
}
