//! Collaborator contract for the CRM backend.
//!
//! `CrmApi` mirrors the REST endpoints the board consumes. Every call is a
//! single attempt: there is no retry, and a failure is reported back to the
//! caller so the board can roll its optimistic state back.

pub mod local;

pub use local::LocalApi;

use crate::models::{Lead, LeadNote, NewLead, NewStage, Stage, StagePosition, StageUpdate};
use thiserror::Error;

/// Server message that marks a permission failure
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to perform this action.";

/// Fallback shown when a failure carries no server message
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors returned by a `CrmApi` call
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or validation failure, with the server message when one was sent
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    Failed { message: Option<String> },

    /// The caller lacks permission; not recoverable from the board
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// Underlying storage failure; details stay in the source chain
    #[error("{}", GENERIC_FAILURE_MESSAGE)]
    Storage(#[source] anyhow::Error),
}

impl ApiError {
    /// Classify a raw server message
    pub fn from_server_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message == PERMISSION_DENIED_MESSAGE {
            ApiError::PermissionDenied(message)
        } else {
            ApiError::Failed { message: Some(message) }
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ApiError::Failed { message: Some(message.into()) }
    }

    /// Failure without any server-provided message (e.g. a dropped connection)
    pub fn network() -> Self {
        ApiError::Failed { message: None }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ApiError::PermissionDenied(_))
    }

    /// The server-provided message, if there is one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Failed { message } => message.as_deref(),
            ApiError::PermissionDenied(message) => Some(message),
            ApiError::NotFound { .. } | ApiError::Storage(_) => None,
        }
    }

    /// Text for a user-visible notification
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound { .. } => self.to_string(),
            _ => self
                .server_message()
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
        }
    }
}

/// The backend endpoints used by the board
pub trait CrmApi {
    /// `GET leads`
    fn list_leads(&mut self) -> Result<Vec<Lead>, ApiError>;

    /// `GET stages`
    fn list_stages(&mut self) -> Result<Vec<Stage>, ApiError>;

    /// `PATCH lead stage`, optionally recording an activity note
    fn update_lead_stage(&mut self, id: i64, stage: &str, note: Option<&str>) -> Result<Lead, ApiError>;

    /// `PATCH stage positions` (bulk)
    fn update_stage_positions(&mut self, positions: &[StagePosition]) -> Result<(), ApiError>;

    fn create_stage(&mut self, stage: &NewStage) -> Result<Stage, ApiError>;

    fn update_stage(&mut self, id: i64, update: &StageUpdate) -> Result<Stage, ApiError>;

    fn delete_stage(&mut self, id: i64) -> Result<(), ApiError>;

    fn create_lead(&mut self, lead: &NewLead) -> Result<Lead, ApiError>;

    fn delete_lead(&mut self, id: i64) -> Result<(), ApiError>;

    /// Activity notes for a lead, oldest first
    fn lead_notes(&mut self, id: i64) -> Result<Vec<LeadNote>, ApiError>;
}
