//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ProgressSummary, UserProgress};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    RegisterUser {
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
    GetProgress {
        #[serde(rename = "userId")]
        user_id: String,
    },
    SubmitResult {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "assessmentId")]
        assessment_id: Option<String>,
        score: i64,
        total: i64,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Registered {
        #[serde(rename = "userId")]
        user_id: String,
        progress: UserProgress,
        created: bool,
    },
    Progress {
        #[serde(rename = "userId")]
        user_id: String,
        progress: UserProgress,
    },
    ResultRecorded {
        #[serde(rename = "userId")]
        user_id: String,
        progress: UserProgress,
        summary: ProgressSummary,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterOut {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub progress: UserProgress,
    pub created: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Serialize)]
pub struct ProgressOut {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub progress: UserProgress,
}

#[derive(Debug, Deserialize)]
pub struct ResultIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Opaque id of the completed assessment; logged for audit only.
    #[serde(rename = "assessmentId")]
    pub assessment_id: Option<String>,
    pub score: i64,
    pub total: i64,
}

#[derive(Serialize)]
pub struct ResultOut {
    pub progress: UserProgress,
    pub summary: ProgressSummary,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
