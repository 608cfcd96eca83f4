use super::{ApiError, AppState, ClientContext};
use crate::error::ErrorKind;
use crate::scripts::{ExecutionRecord, ScriptDefinition, ScriptUpload};
use crate::security::EndpointClass;
use crate::toolbox::{ExecutionResult, StoredUpload};
use axum::{
    body::Bytes,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;

type HandlerResult<T> = Result<T, ApiError>;

/// Rate-limit gate shared by every route.
fn admit(
    state: &AppState,
    ctx: &ClientContext,
    endpoint: &str,
    class: EndpointClass,
) -> HandlerResult<()> {
    state
        .toolbox
        .admit(&ctx.client, endpoint, class)
        .map_err(|err| ApiError::from_toolbox(state, ctx, err))
}

fn multipart_error(ctx: &ClientContext, err: &MultipartError) -> ApiError {
    let kind = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorKind::SizeLimitExceeded
    } else {
        ErrorKind::InvalidInput
    };
    tracing::warn!(
        client = %ctx.client,
        request_id = %ctx.request_id,
        kind = %kind,
        "multipart.rejected: {}",
        err.body_text()
    );
    ApiError::new(kind, ctx)
}

fn open_multipart(
    ctx: &ClientContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> HandlerResult<Multipart> {
    multipart.map_err(|rejection| {
        tracing::warn!(
            client = %ctx.client,
            request_id = %ctx.request_id,
            "multipart.malformed: {}",
            rejection.body_text()
        );
        ApiError::new(ErrorKind::InvalidInput, ctx)
    })
}

async fn field_bytes(ctx: &ClientContext, field: Field<'_>) -> HandlerResult<Bytes> {
    field.bytes().await.map_err(|e| multipart_error(ctx, &e))
}

async fn field_text(ctx: &ClientContext, field: Field<'_>) -> HandlerResult<String> {
    field.text().await.map_err(|e| multipart_error(ctx, &e))
}

/// GET /health
pub(super) async fn handle_health(
    State(state): State<AppState>,
    ctx: ClientContext,
) -> HandlerResult<impl IntoResponse> {
    admit(&state, &ctx, "health", EndpointClass::Read)?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

/// POST /files: multipart upload, field `file`
pub(super) async fn handle_upload(
    State(state): State<AppState>,
    ctx: ClientContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> HandlerResult<Json<StoredUpload>> {
    admit(&state, &ctx, "upload", EndpointClass::Upload)?;
    let mut multipart = open_multipart(&ctx, multipart)?;

    let mut upload: Option<(Option<String>, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&ctx, &e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(ToOwned::to_owned);
        upload = Some((filename, field_bytes(&ctx, field).await?));
    }

    let Some((Some(filename), data)) = upload else {
        tracing::warn!(client = %ctx.client, request_id = %ctx.request_id, "upload.missing_file");
        return Err(ApiError::new(ErrorKind::InvalidInput, &ctx));
    };

    state
        .toolbox
        .upload(&ctx.client, &filename, &data)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_toolbox(&state, &ctx, err))
}

/// GET /scripts
pub(super) async fn handle_list_scripts(
    State(state): State<AppState>,
    ctx: ClientContext,
) -> HandlerResult<Json<Vec<ScriptDefinition>>> {
    admit(&state, &ctx, "scripts.list", EndpointClass::Read)?;
    state
        .toolbox
        .list_scripts(&ctx.client)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_toolbox(&state, &ctx, err))
}

/// POST /scripts: multipart `name`, `description`, `command`, `artifact`
pub(super) async fn handle_register_script(
    State(state): State<AppState>,
    ctx: ClientContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> HandlerResult<(StatusCode, Json<ScriptDefinition>)> {
    admit(&state, &ctx, "scripts.register", EndpointClass::Mutation)?;
    let mut multipart = open_multipart(&ctx, multipart)?;

    let mut name = None;
    let mut description = String::new();
    let mut command = None;
    let mut artifact = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&ctx, &e))?
    {
        match field.name() {
            Some("name") => name = Some(field_text(&ctx, field).await?),
            Some("description") => description = field_text(&ctx, field).await?,
            Some("command") => command = Some(field_text(&ctx, field).await?),
            Some("artifact") => {
                let filename = field.file_name().map(ToOwned::to_owned);
                artifact = Some((filename, field_bytes(&ctx, field).await?));
            }
            _ => {}
        }
    }

    let (Some(name), Some(command), Some((Some(artifact_filename), artifact))) =
        (name, command, artifact)
    else {
        tracing::warn!(
            client = %ctx.client,
            request_id = %ctx.request_id,
            "scripts.register.incomplete"
        );
        return Err(ApiError::new(ErrorKind::InvalidInput, &ctx));
    };

    let upload = ScriptUpload {
        name: name.trim().to_string(),
        description,
        command,
        artifact_filename,
        artifact: artifact.to_vec(),
    };
    state
        .toolbox
        .register_script(&ctx.client, upload)
        .await
        .map(|script| (StatusCode::CREATED, Json(script)))
        .map_err(|err| ApiError::from_toolbox(&state, &ctx, err))
}

/// POST /scripts/{name}/execute
///
/// A timeout or non-zero exit is still a 200 carrying the result.
pub(super) async fn handle_execute_script(
    State(state): State<AppState>,
    ctx: ClientContext,
    Path(name): Path<String>,
) -> HandlerResult<Json<ExecutionResult>> {
    admit(&state, &ctx, "scripts.execute", EndpointClass::Execute)?;
    state
        .toolbox
        .execute_script(&ctx.client, &name)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_toolbox(&state, &ctx, err))
}

/// DELETE /scripts/{name}
pub(super) async fn handle_delete_script(
    State(state): State<AppState>,
    ctx: ClientContext,
    Path(name): Path<String>,
) -> HandlerResult<StatusCode> {
    admit(&state, &ctx, "scripts.delete", EndpointClass::Mutation)?;
    state
        .toolbox
        .delete_script(&ctx.client, &name)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|err| ApiError::from_toolbox(&state, &ctx, err))
}

/// Any unrouted path
pub(super) async fn handle_not_found(ctx: ClientContext) -> ApiError {
    ApiError::new(ErrorKind::NotFound, &ctx)
}

/// GET /scripts/{name}/history
pub(super) async fn handle_script_history(
    State(state): State<AppState>,
    ctx: ClientContext,
    Path(name): Path<String>,
) -> HandlerResult<Json<Vec<ExecutionRecord>>> {
    admit(&state, &ctx, "scripts.history", EndpointClass::Read)?;
    state
        .toolbox
        .history(&name)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_toolbox(&state, &ctx, err))
}
