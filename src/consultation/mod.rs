//! Conversation session manager
//!
//! Resolves which session an incoming message belongs to, replays the
//! session history to the [`ChatGateway`], and persists the resulting
//! exchange. Sessions are created lazily: an unknown, foreign, or
//! malformed session id on a new message starts a fresh session instead of
//! failing.

use crate::config::{Config, ConsultationConfig};
use crate::error::{CounselError, Result};
use crate::providers::{ChatGateway, Message};
use crate::storage::{
    ConsultationSession, ConsultationStore, Exchange, NewExchange, SqliteStorage,
};
use crate::telemetry::Telemetry;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Consultation operations exposed to the HTTP API and the CLI
pub struct ConsultationService {
    store: Arc<dyn ConsultationStore>,
    gateway: Arc<ChatGateway>,
    telemetry: Arc<dyn Telemetry>,
    max_message_chars: usize,
}

/// Project stored exchanges into alternating user/assistant messages
pub fn history_messages(exchanges: &[Exchange]) -> Vec<Message> {
    exchanges
        .iter()
        .flat_map(|e| {
            [
                Message::user(e.message.clone()),
                Message::assistant(e.response.clone()),
            ]
        })
        .collect()
}

fn parse_session_id(session_id: &str) -> Option<Uuid> {
    Uuid::parse_str(session_id.trim()).ok()
}

impl ConsultationService {
    /// Create a new consultation service
    pub fn new(
        store: Arc<dyn ConsultationStore>,
        gateway: Arc<ChatGateway>,
        telemetry: Arc<dyn Telemetry>,
        config: &ConsultationConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            telemetry,
            max_message_chars: config.max_message_chars,
        }
    }

    /// Wire up SQLite storage and the chat gateway from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or the HTTP client
    /// cannot be built. A missing API key is not an error here.
    pub fn from_config(config: &Config, telemetry: Arc<dyn Telemetry>) -> Result<Self> {
        let storage = SqliteStorage::from_config(&config.storage)?;
        tracing::info!("Consultation history stored at {}", storage.db_path().display());
        let gateway = ChatGateway::new(&config.llm, telemetry.clone())?;
        Ok(Self::new(
            Arc::new(storage),
            Arc::new(gateway),
            telemetry,
            &config.consultation,
        ))
    }

    /// The gateway replies are requested from
    pub fn gateway(&self) -> &ChatGateway {
        &self.gateway
    }

    fn fail(&self, operation: &'static str, err: anyhow::Error) -> anyhow::Error {
        self.telemetry.record_error(operation, &err);
        err
    }

    fn check_user(&self, operation: &'static str, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(self.fail(
                operation,
                CounselError::InvalidInput("user id is required".to_string()).into(),
            ));
        }
        Ok(())
    }

    /// Reject messages that are blank or longer than the configured cap
    ///
    /// # Errors
    ///
    /// Returns [`CounselError::InvalidInput`] describing the problem
    pub fn validate_message(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(self.fail(
                "validate_message",
                CounselError::InvalidInput("message cannot be empty".to_string()).into(),
            ));
        }

        let chars = text.chars().count();
        if chars > self.max_message_chars {
            return Err(self.fail(
                "validate_message",
                CounselError::InvalidInput(format!(
                    "message is {} characters long; the limit is {}",
                    chars, self.max_message_chars
                ))
                .into(),
            ));
        }

        Ok(())
    }

    /// Create a new session owned by `user_id`
    pub async fn start_session(&self, user_id: &str) -> Result<ConsultationSession> {
        let span = self.telemetry.start_span("start_session");
        async {
            self.check_user("start_session", user_id)?;
            let session = self
                .store
                .create_session(user_id)
                .await
                .map_err(|e| self.fail("start_session", e))?;
            tracing::info!(session_id = %session.id, "Started consultation session");
            Ok::<_, anyhow::Error>(session)
        }
        .instrument(span)
        .await
    }

    /// Resolve the session a message belongs to, creating one if needed
    ///
    /// A candidate id that is not a UUID, does not exist, or belongs to
    /// another user behaves as if no id was supplied.
    pub async fn get_or_create_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<ConsultationSession> {
        self.check_user("get_or_create_session", user_id)?;

        let candidate = session_id.map(str::trim).filter(|s| !s.is_empty());
        if let Some(candidate) = candidate {
            match parse_session_id(candidate) {
                Some(id) => {
                    let found = self
                        .store
                        .find_session(&id.to_string(), user_id)
                        .await
                        .map_err(|e| self.fail("get_or_create_session", e))?;
                    if let Some(session) = found {
                        return Ok(session);
                    }
                    tracing::debug!("Session {} not found for caller, creating a new one", id);
                }
                None => {
                    tracing::debug!("Ignoring malformed session id, creating a new session");
                }
            }
        }

        let session = self
            .store
            .create_session(user_id)
            .await
            .map_err(|e| self.fail("get_or_create_session", e))?;
        tracing::info!(session_id = %session.id, "Started consultation session");
        Ok(session)
    }

    /// Send a message within an already resolved session
    ///
    /// Replays the session history to the gateway and persists the exchange
    /// only after a successful reply.
    ///
    /// # Errors
    ///
    /// Gateway errors are returned unchanged; nothing is persisted for them
    pub async fn send_in_session(
        &self,
        session: &ConsultationSession,
        text: &str,
    ) -> Result<Exchange> {
        let span = self.telemetry.start_span("send_message");
        async {
            self.validate_message(text)?;

            let prior = self
                .store
                .list_exchanges(&session.id)
                .await
                .map_err(|e| self.fail("send_message", e))?;
            let history = history_messages(&prior);

            let reply = self.gateway.send_chat(&history, text).await?;

            let exchange = self
                .store
                .append_exchange(NewExchange {
                    session_id: session.id.clone(),
                    user_id: session.user_id.clone(),
                    message: text.to_string(),
                    response: reply,
                })
                .await
                .map_err(|e| self.fail("send_message", e))?;

            self.telemetry.record_exchange();
            tracing::info!(
                session_id = %session.id,
                exchanges = prior.len() + 1,
                "Recorded consultation exchange"
            );
            Ok::<_, anyhow::Error>(exchange)
        }
        .instrument(span)
        .await
    }

    /// Send a message, resolving or creating the session first
    ///
    /// Input is validated before any session is created.
    pub async fn send_message(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<Exchange> {
        self.validate_message(text)?;
        let session = self.get_or_create_session(user_id, session_id).await?;
        self.send_in_session(&session, text).await
    }

    /// Exchanges of a session owned by `user_id`, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`CounselError::InvalidInput`] for a malformed id and
    /// [`CounselError::SessionNotFound`] when the session does not exist or
    /// belongs to someone else
    pub async fn get_history(&self, user_id: &str, session_id: &str) -> Result<Vec<Exchange>> {
        let span = self.telemetry.start_span("get_history");
        async {
            self.check_user("get_history", user_id)?;

            let id = parse_session_id(session_id).ok_or_else(|| {
                self.fail(
                    "get_history",
                    CounselError::InvalidInput(format!("invalid session id: {}", session_id))
                        .into(),
                )
            })?;
            let id = id.to_string();

            let session = self
                .store
                .find_session(&id, user_id)
                .await
                .map_err(|e| self.fail("get_history", e))?;
            if session.is_none() {
                return Err(self.fail("get_history", CounselError::SessionNotFound(id).into()));
            }

            self.store
                .list_exchanges(&id)
                .await
                .map_err(|e| self.fail("get_history", e))
        }
        .instrument(span)
        .await
    }

    /// Sessions owned by `user_id`, most recently updated first
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<ConsultationSession>> {
        self.check_user("list_sessions", user_id)?;
        self.store
            .list_sessions(user_id)
            .await
            .map_err(|e| self.fail("list_sessions", e))
    }
}
