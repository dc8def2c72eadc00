use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A consultation session owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationSession {
    /// Unique identifier for the session (UUID v4)
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the last exchange was recorded
    pub updated_at: DateTime<Utc>,
}

/// One persisted user message and its reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Unique identifier for the exchange (UUID v4)
    pub id: String,
    /// Session the exchange belongs to
    pub session_id: String,
    /// User who sent the message
    pub user_id: String,
    /// The user's message
    pub message: String,
    /// The generated reply
    pub response: String,
    /// When the exchange was recorded
    pub created_at: DateTime<Utc>,
}

/// Exchange contents handed to the store; id and timestamp are assigned there
#[derive(Debug, Clone)]
pub struct NewExchange {
    /// Session the exchange belongs to
    pub session_id: String,
    /// User who sent the message
    pub user_id: String,
    /// The user's message
    pub message: String,
    /// The generated reply
    pub response: String,
}
