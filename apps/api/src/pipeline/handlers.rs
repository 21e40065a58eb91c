use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::intake::{extract_text_blocking, UPLOAD_BODY_LIMIT};
use crate::pipeline::SessionInput;
use crate::session::confirmation::ConfirmationReply;
use crate::session::models::{Session, SessionPhase, SessionView};
use crate::state::AppState;

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(input): Json<SessionInput>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let session = input.into_session()?;
    start_session(&state, session).await
}

/// POST /api/v1/sessions/upload
///
/// Multipart form. Each of the résumé and job description may come as a text
/// field or as a file (PDF or plain text); the company name is a text field.
pub async fn handle_upload_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let mut resume = None;
    let mut job_description = None;
    let mut company_name = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => resume = Some(read_text_field(field).await?),
            "resume_file" => resume = Some(read_file_field(field).await?),
            "job_description" => job_description = Some(read_text_field(field).await?),
            "job_description_file" => job_description = Some(read_file_field(field).await?),
            "company_name" => company_name = Some(read_text_field(field).await?),
            other => {
                return Err(AppError::Validation(format!(
                    "Unexpected upload field '{other}'"
                )))
            }
        }
    }

    let session = SessionInput {
        resume: resume.unwrap_or_default(),
        job_description: job_description.unwrap_or_default(),
        company_name: company_name.unwrap_or_default(),
    }
    .into_session()?;
    start_session(&state, session).await
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = load_session(&state, id).await?;
    Ok(Json(SessionView::from(&session)))
}

/// POST /api/v1/sessions/:id/confirm
///
/// Body is the reply object, e.g. `{"user_response": "..."}`. Only one reply
/// per outstanding question is processed; a concurrent second reply gets 409.
pub async fn handle_confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(reply): Json<ConfirmationReply>,
) -> Result<Json<SessionView>, AppError> {
    load_session(&state, id).await?;
    if !state.sessions.try_claim(id).await? {
        return Err(AppError::Conflict(format!(
            "Session {id} is already processing a reply"
        )));
    }

    // Detached so a dropped connection cannot strand the claim mid-run.
    let session = tokio::spawn(confirm_claimed(state.clone(), id, reply))
        .await
        .map_err(join_error)??;
    Ok(Json(SessionView::from(&session)))
}

async fn start_session(
    state: &AppState,
    session: Session,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    info!(session_id = %session.id, "session created");
    state.sessions.save(&session).await?;

    let session = tokio::spawn(run_start(state.clone(), session))
        .await
        .map_err(join_error)??;
    Ok((StatusCode::CREATED, Json(SessionView::from(&session))))
}

async fn run_start(state: AppState, mut session: Session) -> Result<Session, AppError> {
    let outcome = state.pipeline().start(&mut session).await;
    state.sessions.save(&session).await?;
    outcome.map(|()| session)
}

/// Resumes a claimed session and always gives the claim back.
async fn confirm_claimed(
    state: AppState,
    id: Uuid,
    reply: ConfirmationReply,
) -> Result<Session, AppError> {
    let outcome = resume_session(&state, id, reply).await;
    if let Err(e) = state.sessions.release(id).await {
        error!(session_id = %id, "failed to release session claim: {e}");
    }
    outcome
}

async fn resume_session(
    state: &AppState,
    id: Uuid,
    reply: ConfirmationReply,
) -> Result<Session, AppError> {
    let mut session = load_session(state, id).await?;
    if session.phase != SessionPhase::AwaitingUserInput {
        return Err(AppError::Conflict(format!(
            "Session {id} is not waiting for input"
        )));
    }

    // Readers see `running` while the reply is being processed.
    let mut claimed = session.clone();
    claimed.phase = SessionPhase::Running;
    claimed.pending = None;
    claimed.touch();
    state.sessions.save(&claimed).await?;

    let outcome = state.pipeline().resume(&mut session, reply).await;
    state.sessions.save(&session).await?;
    outcome.map(|()| session)
}

async fn load_session(state: &AppState, id: Uuid) -> Result<Session, AppError> {
    state
        .sessions
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError::Internal(anyhow::anyhow!("pipeline task failed: {e}"))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "Upload exceeds the {} MB request limit",
            UPLOAD_BODY_LIMIT / (1024 * 1024)
        ))
    } else {
        AppError::Validation(format!("Malformed upload: {}", e.body_text()))
    }
}

async fn read_text_field(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

async fn read_file_field(field: Field<'_>) -> Result<String, AppError> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await.map_err(multipart_error)?;
    extract_text_blocking(filename, content_type, data).await
}
