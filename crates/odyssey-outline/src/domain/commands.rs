//! Commands for the Outline Orchestration context.

use uuid::Uuid;

use super::parameters::CampaignRequest;
use super::stages::StageKind;

/// Command to run the pipeline for a session, starting with parameter
/// validation.
#[derive(Debug, Clone)]
pub struct GenerateCampaign {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Existing session to continue; a new session is started when `None`
    /// or when the ID is unknown.
    pub session_id: Option<Uuid>,
    /// The submitted form fields.
    pub request: CampaignRequest,
}

/// Command to regenerate one stage on user request.
#[derive(Debug, Clone)]
pub struct RetryStage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to retry in.
    pub session_id: Uuid,
    /// The stage to regenerate.
    pub stage: StageKind,
}

/// Command to dismiss the failure notice.
#[derive(Debug, Clone)]
pub struct DismissFailure {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session the notice belongs to.
    pub session_id: Uuid,
}

/// Command to discard a session and everything it generated.
#[derive(Debug, Clone)]
pub struct ClearSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to discard.
    pub session_id: Uuid,
}
