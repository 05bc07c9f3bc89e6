use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use axum_macros::debug_handler;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{DraftResponse, DraftText, ImageStatus, NoteResponse, SelectImageQuery},
    models::{ImageFile, Note},
    repository::ClientError,
    service::{BoardError, NoteBoard},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        get_notes,
        refresh_notes,
        create_note,
        delete_note,
        get_draft,
        edit_draft,
        select_image,
        remove_image,
        sign_out
    ),
    components(schemas(NoteResponse, DraftText, DraftResponse, ImageStatus)),
    tags(
        (name = "notes", description = "Notes on the board"),
        (name = "draft", description = "Draft form and image attachment"),
        (name = "session", description = "Session management")
    )
)]
pub struct ApiDoc;

/// REST routes over `board`. Image bodies up to `max_upload_bytes` are
/// accepted, other routes keep axum's default limit.
pub fn router(board: Arc<NoteBoard>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/notes", get(get_notes).post(create_note))
        .route("/notes/refresh", post(refresh_notes))
        .route("/notes/{id}", delete(delete_note))
        .route("/draft", get(get_draft).put(edit_draft))
        .route(
            "/draft/image",
            put(select_image)
                .delete(remove_image)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/session/sign-out", post(sign_out))
        .with_state(board)
}

fn error_response(e: &BoardError, action: &str) -> Response {
    tracing::error!("failed to {}: {}", action, e);
    match e {
        BoardError::NoteNotFound(_) => (StatusCode::NOT_FOUND, "Note not found").into_response(),
        BoardError::Client(ClientError::Unauthenticated) => {
            (StatusCode::UNAUTHORIZED, "Not signed in").into_response()
        }
        BoardError::Client(_) => {
            (StatusCode::BAD_GATEWAY, format!("Failed to {action}")).into_response()
        }
    }
}

fn note_list(notes: Vec<Note>) -> Vec<NoteResponse> {
    notes.into_iter().map(NoteResponse::from).collect()
}

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "Notes currently on the board", body = Vec<NoteResponse>)
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_notes(State(board): State<Arc<NoteBoard>>) -> Response {
    (StatusCode::OK, Json(note_list(board.notes().await))).into_response()
}

#[utoipa::path(
    post,
    path = "/notes/refresh",
    responses(
        (status = 200, description = "Notes fetched from the backend", body = Vec<NoteResponse>),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "Backend error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn refresh_notes(State(board): State<Arc<NoteBoard>>) -> Response {
    match board.list_notes().await {
        Ok(notes) => (StatusCode::OK, Json(note_list(notes))).into_response(),
        Err(e) => error_response(&e, "list notes"),
    }
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = DraftText,
    responses(
        (status = 201, description = "Note created successfully", body = NoteResponse),
        (status = 204, description = "Nothing to create, title and description are empty"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "Backend error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(board): State<Arc<NoteBoard>>,
    Json(payload): Json<DraftText>,
) -> Response {
    match board.create_note(payload).await {
        Ok(Some(note)) => (StatusCode::CREATED, Json(NoteResponse::from(note))).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, "create note"),
    }
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    responses(
        (status = 204, description = "Note deleted successfully"),
        (status = 404, description = "Note not found"),
        (status = 502, description = "Backend error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(State(board): State<Arc<NoteBoard>>, Path(id): Path<String>) -> Response {
    let Some(note) = board.find_note(&id).await else {
        return error_response(&BoardError::NoteNotFound(id), "delete note");
    };

    match board.delete_note(&note).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, "delete note"),
    }
}

#[utoipa::path(
    get,
    path = "/draft",
    responses(
        (status = 200, description = "Current draft", body = DraftResponse)
    ),
    tag = "draft"
)]
#[debug_handler]
pub async fn get_draft(State(board): State<Arc<NoteBoard>>) -> Response {
    let draft = board.draft().await;
    (StatusCode::OK, Json(DraftResponse::from(&draft))).into_response()
}

#[utoipa::path(
    put,
    path = "/draft",
    request_body = DraftText,
    responses(
        (status = 200, description = "Draft updated", body = DraftResponse)
    ),
    tag = "draft"
)]
#[debug_handler]
pub async fn edit_draft(
    State(board): State<Arc<NoteBoard>>,
    Json(payload): Json<DraftText>,
) -> Response {
    let draft = board.edit_draft(payload).await;
    (StatusCode::OK, Json(DraftResponse::from(&draft))).into_response()
}

#[utoipa::path(
    put,
    path = "/draft/image",
    params(SelectImageQuery),
    request_body(
        content = String,
        description = "Raw file bytes, an empty body clears the selection",
        content_type = "application/octet-stream"
    ),
    responses(
        (status = 200, description = "Image uploaded or selection cleared", body = DraftResponse),
        (status = 400, description = "File name missing"),
        (status = 502, description = "Upload failed, draft image discarded")
    ),
    tag = "draft"
)]
#[debug_handler]
pub async fn select_image(
    State(board): State<Arc<NoteBoard>>,
    Query(query): Query<SelectImageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let file = if body.is_empty() {
        None
    } else {
        let Some(name) = query.file_name.filter(|name| !name.is_empty()) else {
            return (StatusCode::BAD_REQUEST, "file_name is required").into_response();
        };
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        Some(ImageFile {
            name,
            content_type,
            bytes: body.to_vec(),
        })
    };

    match board.select_image(file).await {
        Ok(draft) => (StatusCode::OK, Json(DraftResponse::from(&draft))).into_response(),
        Err(e) => error_response(&e, "upload image"),
    }
}

#[utoipa::path(
    delete,
    path = "/draft/image",
    responses(
        (status = 200, description = "Image removed from the draft", body = DraftResponse)
    ),
    tag = "draft"
)]
#[debug_handler]
pub async fn remove_image(State(board): State<Arc<NoteBoard>>) -> Response {
    let draft = board.remove_image().await;
    (StatusCode::OK, Json(DraftResponse::from(&draft))).into_response()
}

#[utoipa::path(
    post,
    path = "/session/sign-out",
    responses(
        (status = 204, description = "Sign-out requested")
    ),
    tag = "session"
)]
#[debug_handler]
pub async fn sign_out(State(board): State<Arc<NoteBoard>>) -> Response {
    board.sign_out().await;
    StatusCode::NO_CONTENT.into_response()
}
