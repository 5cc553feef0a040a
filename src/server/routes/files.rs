//! File tree and editor file endpoints
//!
//! Every path is a client path (`data/...`) resolved through the shared
//! sandbox, so these handlers and the agent tool see the same files.

use std::path::{Path, PathBuf};

use axum::{
    extract::{Path as UrlPath, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs;

use crate::server::{AppError, AppState};
use crate::tools::sandbox::CLIENT_ROOT;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", get(get_tree).post(create_entry))
        .route("/files/restore", post(restore_file))
        .route(
            "/files/*path",
            get(read_file)
                .put(write_file)
                .delete(delete_entry)
                .patch(rename_entry),
        )
        .route("/lines/*path", get(read_line).put(edit_line))
}

#[derive(Debug, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBody {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LineQuery {
    #[serde(default)]
    pub line: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineResponse {
    pub content: String,
    pub line_number: usize,
    pub total_lines: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEditResponse {
    pub success: bool,
    pub line_number: usize,
    pub old_content: String,
    pub new_content: String,
    pub total_lines: usize,
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Full tree of the data directory, folders first
async fn get_tree(State(state): State<AppState>) -> Result<Json<Vec<TreeNode>>, AppError> {
    let root = state.sandbox().root().to_path_buf();
    let tree = build_tree(&root, CLIENT_ROOT).await?;
    Ok(Json(tree))
}

async fn build_tree(dir: &Path, rel: &str) -> Result<Vec<TreeNode>, AppError> {
    let mut nodes = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = format!("{}/{}", rel, name);

        if entry.file_type().await?.is_dir() {
            let children = Box::pin(build_tree(&entry.path(), &path)).await?;
            nodes.push(TreeNode {
                name,
                kind: "folder",
                path,
                children: Some(children),
            });
        } else {
            nodes.push(TreeNode {
                name,
                kind: "file",
                path,
                children: None,
            });
        }
    }

    nodes.sort_by(|a, b| match (a.children.is_some(), b.children.is_some()) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });

    Ok(nodes)
}

async fn read_file(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
) -> Result<Json<Value>, AppError> {
    let full = state.sandbox().resolve_client(&path)?;
    let content = fs::read_to_string(&full).await?;
    Ok(Json(json!({ "content": content })))
}

async fn write_file(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    Json(body): Json<ContentBody>,
) -> Result<Json<Value>, AppError> {
    let full = state.sandbox().resolve_client(&path)?;
    write_with_parents(&full, body.content.as_deref().unwrap_or_default()).await?;
    Ok(success())
}

async fn create_entry(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<Value>, AppError> {
    let target = format!("{}/{}", req.path.trim_end_matches('/'), req.name);
    let full = state.sandbox().resolve_client(&target)?;

    if fs::try_exists(&full).await? {
        return Err(AppError::Conflict(
            "File or folder already exists".to_string(),
        ));
    }

    if req.kind == "folder" {
        fs::create_dir_all(&full).await?;
    } else {
        write_with_parents(&full, "").await?;
    }

    tracing::debug!(path = %target, kind = %req.kind, "Created entry");
    Ok(success())
}

async fn delete_entry(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
) -> Result<Json<Value>, AppError> {
    let full = resolve_below_root(&state, &path)?;

    if fs::metadata(&full).await?.is_dir() {
        fs::remove_dir_all(&full).await?;
    } else {
        fs::remove_file(&full).await?;
    }

    Ok(success())
}

async fn rename_entry(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<Value>, AppError> {
    let sandbox = state.sandbox();
    let from = resolve_below_root(&state, &path)?;
    let parent = from.parent().unwrap_or(sandbox.root());
    let target = format!("{}/{}", sandbox.client_key(parent), req.new_name);
    let to = resolve_below_root(&state, &target)?;

    if fs::try_exists(&to).await? {
        return Err(AppError::Conflict("Target already exists".to_string()));
    }

    fs::rename(&from, &to).await?;
    Ok(success())
}

/// Overwrite a file with a snapshot taken before an agent edit
async fn restore_file(
    State(state): State<AppState>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<Value>, AppError> {
    let path = req
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing path".to_string()))?;
    let full = state.sandbox().resolve_client(&path)?;

    fs::write(&full, req.content.unwrap_or_default()).await?;
    tracing::info!(path = %path, "Restored file");
    Ok(Json(json!({ "ok": true })))
}

async fn read_line(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    Query(query): Query<LineQuery>,
) -> Result<Json<LineResponse>, AppError> {
    let line_number = parse_line_number(query.line.as_deref())?;
    let full = state.sandbox().resolve_client(&path)?;
    let content = fs::read_to_string(&full).await?;
    let lines: Vec<&str> = content.split('\n').collect();
    check_line_range(line_number, lines.len())?;

    Ok(Json(LineResponse {
        content: lines[line_number - 1].to_string(),
        line_number,
        total_lines: lines.len(),
    }))
}

async fn edit_line(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    Query(query): Query<LineQuery>,
    Json(body): Json<ContentBody>,
) -> Result<Json<LineEditResponse>, AppError> {
    let line_number = parse_line_number(query.line.as_deref())?;
    let full = state.sandbox().resolve_client(&path)?;
    let content = fs::read_to_string(&full).await?;
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    check_line_range(line_number, lines.len())?;

    let new_line = body.content.unwrap_or_default();
    let old_line = std::mem::replace(&mut lines[line_number - 1], new_line.clone());
    fs::write(&full, lines.join("\n")).await?;

    Ok(Json(LineEditResponse {
        success: true,
        line_number,
        old_content: old_line,
        new_content: new_line,
        total_lines: lines.len(),
    }))
}

fn parse_line_number(raw: Option<&str>) -> Result<usize, AppError> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| AppError::BadRequest("Invalid line number".to_string()))
}

fn check_line_range(line_number: usize, total: usize) -> Result<(), AppError> {
    if line_number > total {
        return Err(AppError::BadRequest(format!(
            "Line number {} exceeds file length ({} lines)",
            line_number, total
        )));
    }
    Ok(())
}

/// Resolve a path that must not be the data root itself
fn resolve_below_root(state: &AppState, path: &str) -> Result<PathBuf, AppError> {
    let full = state.sandbox().resolve_client(path)?;
    if full == state.sandbox().root() {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(full)
}

async fn write_with_parents(path: &Path, content: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    Ok(())
}
