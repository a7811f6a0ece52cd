//! Command handlers for the Outline Orchestration context.
//!
//! Each handler loads the session, drives the orchestrator through the
//! stages that still need to run, and saves the session after every stage so
//! completed output survives a later failure.

use odyssey_core::clock::Clock;
use odyssey_core::error::DomainError;
use odyssey_core::repository::SessionRepository;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::orchestrator::Orchestrator;
use crate::domain::commands::{ClearSession, DismissFailure, GenerateCampaign, RetryStage};
use crate::domain::parameters::CampaignParameters;
use crate::domain::session::CampaignSession;
use crate::domain::stages::{FailureNotice, StageFailure, StageKind};

/// Result of running the pipeline for a session.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The session after the run, as saved.
    pub session: CampaignSession,
    /// Stages that called the provider during this run, in order.
    pub generated: Vec<StageKind>,
    /// The failure that stopped the run, if any.
    pub failure: Option<StageFailure>,
}

/// Loads and rebuilds a session.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if no snapshot exists and
/// `DomainError::Infrastructure` if loading or deserialization fails.
pub(crate) async fn load_session(
    repo: &dyn SessionRepository,
    session_id: Uuid,
) -> Result<CampaignSession, DomainError> {
    let stored = repo
        .load_session(session_id)
        .await?
        .ok_or(DomainError::SessionNotFound(session_id))?;
    CampaignSession::from_snapshot(&stored)
}

async fn save_session(
    repo: &dyn SessionRepository,
    session: &CampaignSession,
) -> Result<(), DomainError> {
    repo.save_session(session.to_snapshot()?).await
}

/// Runs `first` and then every later stage that is still missing, saving
/// after each one. Stops at the first failure, which is recorded on the
/// session and returned in the outcome.
async fn run_pipeline_from(
    mut session: CampaignSession,
    first: Option<StageKind>,
    orchestrator: &Orchestrator,
    clock: &dyn Clock,
    repo: &dyn SessionRepository,
) -> Result<PipelineOutcome, DomainError> {
    let mut generated = Vec::new();
    let mut next = first;

    while let Some(kind) = next {
        let result = {
            let params = session.ensure_ready_for(kind)?;
            orchestrator
                .run_stage(kind, params, session.prior_stages(kind), clock)
                .await
        };

        match result {
            Ok(stage) => {
                session.record_stage(stage, clock.now())?;
                save_session(repo, &session).await?;
                generated.push(kind);
                next = session.next_pending_stage();
            }
            Err(failure) => {
                warn!(session_id = %session.id, stage = %kind, error = %failure.error, "stage failed");
                session.record_failure(FailureNotice::new(&failure, clock.now()));
                save_session(repo, &session).await?;
                return Ok(PipelineOutcome {
                    session,
                    generated,
                    failure: Some(failure),
                });
            }
        }
    }

    Ok(PipelineOutcome {
        session,
        generated,
        failure: None,
    })
}

/// Handles the `GenerateCampaign` command: validates the request, loads or
/// starts the session, and runs every stage that has not completed for these
/// parameters.
///
/// # Errors
///
/// Returns `DomainError::Validation` before any provider call or session
/// write if the request is invalid, and `DomainError::Infrastructure` if the
/// session cannot be loaded or saved. Stage failures are not errors; they
/// come back in [`PipelineOutcome::failure`].
#[instrument(skip_all, fields(correlation_id = %command.correlation_id))]
pub async fn handle_generate_campaign(
    command: &GenerateCampaign,
    orchestrator: &Orchestrator,
    clock: &dyn Clock,
    repo: &dyn SessionRepository,
) -> Result<PipelineOutcome, DomainError> {
    let params = CampaignParameters::try_from(command.request.clone())?;
    let now = clock.now();

    let existing = match command.session_id {
        Some(id) => match load_session(repo, id).await {
            Ok(session) => Some(session),
            Err(DomainError::SessionNotFound(_)) => None,
            Err(err) => return Err(err),
        },
        None => None,
    };
    let mut session = existing.unwrap_or_else(|| CampaignSession::new(Uuid::new_v4(), now));

    if session.submit_parameters(params, now) {
        info!(session_id = %session.id, "new campaign parameters; generating from scratch");
        save_session(repo, &session).await?;
    } else {
        info!(
            session_id = %session.id,
            completed = session.stages().len(),
            "parameters unchanged; reusing completed stages"
        );
    }

    let first = session.next_pending_stage();
    run_pipeline_from(session, first, orchestrator, clock, repo).await
}

/// Handles the `RetryStage` command: regenerates the requested stage, then
/// any later stages it invalidated. The previous output of the stage stays
/// in place if the retry fails.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` for an unknown session,
/// `DomainError::MissingPriorStage` if an earlier stage has not completed,
/// and `DomainError::Infrastructure` on storage failures.
#[instrument(skip_all, fields(
    correlation_id = %command.correlation_id,
    session_id = %command.session_id,
    stage = %command.stage
))]
pub async fn handle_retry_stage(
    command: &RetryStage,
    orchestrator: &Orchestrator,
    clock: &dyn Clock,
    repo: &dyn SessionRepository,
) -> Result<PipelineOutcome, DomainError> {
    let session = load_session(repo, command.session_id).await?;
    session.ensure_ready_for(command.stage)?;

    info!("retrying stage");
    run_pipeline_from(session, Some(command.stage), orchestrator, clock, repo).await
}

/// Handles the `DismissFailure` command.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` for an unknown session and
/// `DomainError::Infrastructure` on storage failures.
pub async fn handle_dismiss_failure(
    command: &DismissFailure,
    clock: &dyn Clock,
    repo: &dyn SessionRepository,
) -> Result<CampaignSession, DomainError> {
    let mut session = load_session(repo, command.session_id).await?;
    session.dismiss_failure(clock.now());
    save_session(repo, &session).await?;
    Ok(session)
}

/// Handles the `ClearSession` command: discards the session and its output.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if there was nothing to clear.
pub async fn handle_clear_session(
    command: &ClearSession,
    repo: &dyn SessionRepository,
) -> Result<(), DomainError> {
    if repo.delete_session(command.session_id).await? {
        info!(session_id = %command.session_id, correlation_id = %command.correlation_id, "session cleared");
        Ok(())
    } else {
        Err(DomainError::SessionNotFound(command.session_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::orchestrator::StageSettings;
    use crate::domain::parameters::CampaignRequest;
    use crate::domain::stages::StageOutput;
    use odyssey_core::provider::{ProviderError, ProviderErrorKind};
    use odyssey_session_store::InMemorySessionRepository;
    use odyssey_test_support::{FailingSessionRepository, FixedClock, StubProvider};

    const STORY: &str = "# The Drowned Lamp\nThe keeper lies about the storm.";
    const SCENES: &str = "S1: arrival (non-combat, social, easy)\nS2: the drowned crew (combat, medium)";
    const LEVELS: &str = "Level 1 at S1\nLevel 2 at S2\nLevel 3 at S3";

    fn lighthouse() -> CampaignRequest {
        CampaignRequest::new("haunted lighthouse", 4, (1, 3))
    }

    fn generate(request: CampaignRequest, session_id: Option<Uuid>) -> GenerateCampaign {
        GenerateCampaign {
            correlation_id: Uuid::new_v4(),
            session_id,
            request,
        }
    }

    fn orchestrator(provider: &Arc<StubProvider>) -> Orchestrator {
        Orchestrator::new(provider.clone(), StageSettings::default())
    }

    #[tokio::test]
    async fn test_generate_runs_three_stages_in_order() {
        // Arrange
        let provider = Arc::new(StubProvider::new([STORY, SCENES, LEVELS]));
        let repo = InMemorySessionRepository::new();

        // Act
        let outcome = handle_generate_campaign(
            &generate(lighthouse(), None),
            &orchestrator(&provider),
            &FixedClock::default(),
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.generated, StageKind::ALL.to_vec());
        let stages = outcome.session.stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].text(), STORY);
        assert_eq!(stages[1].text(), SCENES);
        assert_eq!(stages[2].text(), LEVELS);
        assert!(matches!(stages[2].output, StageOutput::Progression(_)));

        let requests = provider.requests();
        assert!(requests[1].prompt.contains(STORY));
        assert!(requests[2].prompt.contains(SCENES));
        assert!(repo.load_session(outcome.session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_request_never_calls_provider() {
        // Arrange
        let provider = Arc::new(StubProvider::new([STORY]));
        let repo = InMemorySessionRepository::new();
        let request = CampaignRequest::new("haunted lighthouse", 0, (5, 2));

        // Act
        let err = handle_generate_campaign(
            &generate(request, None),
            &orchestrator(&provider),
            &FixedClock::default(),
            &repo,
        )
        .await
        .unwrap_err();

        // Assert
        match err {
            DomainError::Validation(violations) => {
                let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
                assert!(fields.contains(&"party_size"));
                assert!(fields.contains(&"level_range"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 0);
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_scene_failure_keeps_story_and_skips_levels() {
        // Arrange
        let provider = Arc::new(StubProvider::with_results([
            Ok(STORY.to_owned()),
            Err(ProviderError::new(ProviderErrorKind::Network, "connection reset")),
            Ok(LEVELS.to_owned()),
        ]));
        let repo = InMemorySessionRepository::new();

        // Act
        let outcome = handle_generate_campaign(
            &generate(lighthouse(), None),
            &orchestrator(&provider),
            &FixedClock::default(),
            &repo,
        )
        .await
        .unwrap();

        // Assert
        let failure = outcome.failure.expect("scene stage should fail");
        assert_eq!(failure.stage, StageKind::SceneOutline);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(outcome.generated, vec![StageKind::StoryOutline]);

        let saved = load_session(&repo, outcome.session.id).await.unwrap();
        assert_eq!(saved.stages().len(), 1);
        assert_eq!(saved.stage(StageKind::StoryOutline).unwrap().text(), STORY);
        assert_eq!(saved.failure().unwrap().stage, StageKind::SceneOutline);
    }

    #[tokio::test]
    async fn test_resubmitting_same_parameters_reuses_completed_stages() {
        // Arrange
        let provider = Arc::new(StubProvider::new([STORY, SCENES, LEVELS]));
        let repo = InMemorySessionRepository::new();
        let orchestrator = orchestrator(&provider);
        let clock = FixedClock::default();
        let first = handle_generate_campaign(&generate(lighthouse(), None), &orchestrator, &clock, &repo)
            .await
            .unwrap();

        // Act
        let second = handle_generate_campaign(
            &generate(lighthouse(), Some(first.session.id)),
            &orchestrator,
            &clock,
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(provider.call_count(), 3);
        assert!(second.generated.is_empty());
        assert_eq!(second.session.id, first.session.id);
        assert!(second.session.is_complete());
    }

    #[tokio::test]
    async fn test_resubmitting_after_failure_resumes_at_failed_stage() {
        // Arrange
        let provider = Arc::new(StubProvider::with_results([
            Ok(STORY.to_owned()),
            Err(ProviderError::new(ProviderErrorKind::Timeout, "no response within 120s")),
            Ok(SCENES.to_owned()),
            Ok(LEVELS.to_owned()),
        ]));
        let repo = InMemorySessionRepository::new();
        let orchestrator = orchestrator(&provider);
        let clock = FixedClock::default();
        let first = handle_generate_campaign(&generate(lighthouse(), None), &orchestrator, &clock, &repo)
            .await
            .unwrap();

        // Act
        let second = handle_generate_campaign(
            &generate(lighthouse(), Some(first.session.id)),
            &orchestrator,
            &clock,
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(
            second.generated,
            vec![StageKind::SceneOutline, StageKind::LevelProgression]
        );
        assert!(second.session.failure().is_none());
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_changed_parameters_regenerate_everything() {
        let provider = Arc::new(StubProvider::new([STORY, SCENES, LEVELS, "new story", "new scenes", "Level 2 at S1"]));
        let repo = InMemorySessionRepository::new();
        let orchestrator = orchestrator(&provider);
        let clock = FixedClock::default();
        let first = handle_generate_campaign(&generate(lighthouse(), None), &orchestrator, &clock, &repo)
            .await
            .unwrap();

        let second = handle_generate_campaign(
            &generate(CampaignRequest::new("sunken abbey", 4, (2, 3)), Some(first.session.id)),
            &orchestrator,
            &clock,
            &repo,
        )
        .await
        .unwrap();

        assert_eq!(second.generated.len(), 3);
        assert_eq!(second.session.stage(StageKind::StoryOutline).unwrap().text(), "new story");
    }

    #[tokio::test]
    async fn test_retry_regenerates_stage_and_later_stages() {
        // Arrange
        let provider = Arc::new(StubProvider::new([STORY, SCENES, LEVELS, "better scenes", LEVELS]));
        let repo = InMemorySessionRepository::new();
        let orchestrator = orchestrator(&provider);
        let clock = FixedClock::default();
        let first = handle_generate_campaign(&generate(lighthouse(), None), &orchestrator, &clock, &repo)
            .await
            .unwrap();
        let command = RetryStage {
            correlation_id: Uuid::new_v4(),
            session_id: first.session.id,
            stage: StageKind::SceneOutline,
        };

        // Act
        let outcome = handle_retry_stage(&command, &orchestrator, &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            outcome.generated,
            vec![StageKind::SceneOutline, StageKind::LevelProgression]
        );
        assert_eq!(outcome.session.stage(StageKind::StoryOutline).unwrap().text(), STORY);
        assert_eq!(
            outcome.session.stage(StageKind::SceneOutline).unwrap().text(),
            "better scenes"
        );
        assert!(outcome.session.is_complete());
    }

    #[tokio::test]
    async fn test_failed_retry_keeps_previous_output() {
        let provider = Arc::new(StubProvider::with_results([
            Ok(STORY.to_owned()),
            Ok(SCENES.to_owned()),
            Ok(LEVELS.to_owned()),
            Err(ProviderError::new(ProviderErrorKind::RateLimited, "slow down").with_retry_after(30)),
        ]));
        let repo = InMemorySessionRepository::new();
        let orchestrator = orchestrator(&provider);
        let clock = FixedClock::default();
        let first = handle_generate_campaign(&generate(lighthouse(), None), &orchestrator, &clock, &repo)
            .await
            .unwrap();
        let command = RetryStage {
            correlation_id: Uuid::new_v4(),
            session_id: first.session.id,
            stage: StageKind::StoryOutline,
        };

        let outcome = handle_retry_stage(&command, &orchestrator, &clock, &repo)
            .await
            .unwrap();

        assert!(outcome.failure.is_some());
        assert!(outcome.session.is_complete());
        assert_eq!(outcome.session.stage(StageKind::StoryOutline).unwrap().text(), STORY);
        assert_eq!(outcome.session.failure().unwrap().stage, StageKind::StoryOutline);
    }

    #[tokio::test]
    async fn test_retry_without_prior_stage_is_rejected() {
        // Arrange
        let provider = Arc::new(StubProvider::with_results([
            Ok(STORY.to_owned()),
            Err(ProviderError::new(ProviderErrorKind::Api, "status 500")),
        ]));
        let repo = InMemorySessionRepository::new();
        let orchestrator = orchestrator(&provider);
        let clock = FixedClock::default();
        let first = handle_generate_campaign(&generate(lighthouse(), None), &orchestrator, &clock, &repo)
            .await
            .unwrap();
        let command = RetryStage {
            correlation_id: Uuid::new_v4(),
            session_id: first.session.id,
            stage: StageKind::LevelProgression,
        };

        // Act
        let err = handle_retry_stage(&command, &orchestrator, &clock, &repo)
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, DomainError::MissingPriorStage { .. }));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_unknown_session_is_not_found() {
        let provider = Arc::new(StubProvider::new([STORY]));
        let command = RetryStage {
            correlation_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            stage: StageKind::StoryOutline,
        };

        let err = handle_retry_stage(
            &command,
            &orchestrator(&provider),
            &FixedClock::default(),
            &InMemorySessionRepository::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::SessionNotFound(id) if id == command.session_id));
    }

    #[tokio::test]
    async fn test_dismiss_failure_clears_notice() {
        // Arrange
        let provider = Arc::new(StubProvider::new(["   "]));
        let repo = InMemorySessionRepository::new();
        let clock = FixedClock::default();
        let first = handle_generate_campaign(&generate(lighthouse(), None), &orchestrator(&provider), &clock, &repo)
            .await
            .unwrap();
        assert!(first.session.failure().is_some());

        // Act
        let session = handle_dismiss_failure(
            &DismissFailure {
                correlation_id: Uuid::new_v4(),
                session_id: first.session.id,
            },
            &clock,
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert!(session.failure().is_none());
        let saved = load_session(&repo, session.id).await.unwrap();
        assert!(saved.failure().is_none());
    }

    #[tokio::test]
    async fn test_clear_session_removes_it() {
        let provider = Arc::new(StubProvider::new([STORY, SCENES, LEVELS]));
        let repo = InMemorySessionRepository::new();
        let first = handle_generate_campaign(
            &generate(lighthouse(), None),
            &orchestrator(&provider),
            &FixedClock::default(),
            &repo,
        )
        .await
        .unwrap();
        let command = ClearSession {
            correlation_id: Uuid::new_v4(),
            session_id: first.session.id,
        };

        handle_clear_session(&command, &repo).await.unwrap();

        assert!(repo.is_empty().await);
        assert!(matches!(
            handle_clear_session(&command, &repo).await,
            Err(DomainError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_is_an_infrastructure_error() {
        let provider = Arc::new(StubProvider::new([STORY]));

        let err = handle_generate_campaign(
            &generate(lighthouse(), Some(Uuid::new_v4())),
            &orchestrator(&provider),
            &FixedClock::default(),
            &FailingSessionRepository,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::Infrastructure(_)));
        assert_eq!(provider.call_count(), 0);
    }
}
