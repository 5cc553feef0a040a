//! Tool executor - runs `manage_novel_files` calls inside the sandbox
//!
//! Every failure becomes a `ToolResult { ok: false }`; nothing escapes
//! `execute` as an error.

use std::path::Path;

use serde_json::{json, Value};
use tokio::fs;

use crate::core::Result;
use crate::tools::change_set::ChangeSet;
use crate::tools::directive::{ActionKind, ToolCallDirective};
use crate::tools::result::ToolResult;
use crate::tools::sandbox::Sandbox;

/// Executes file tool calls against one sandbox root
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    sandbox: Sandbox,
}

impl ToolExecutor {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Execute one tool call, recording writes into `changes`
    pub async fn execute(&self, directive: &ToolCallDirective, changes: &mut ChangeSet) -> ToolResult {
        let Some(action) = &directive.action else {
            return ToolResult::failure("Missing action");
        };

        tracing::debug!(action = %action, path = %directive.path, "Executing tool call");

        match self.dispatch(action, directive, changes).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(action = %action, error = %e, "Tool call failed");
                ToolResult::failure(e.to_string())
            }
        }
    }

    async fn dispatch(
        &self,
        action: &ActionKind,
        d: &ToolCallDirective,
        changes: &mut ChangeSet,
    ) -> Result<ToolResult> {
        match action {
            ActionKind::List => self.list(&d.path).await,
            ActionKind::Read => self.read(&d.path).await,
            ActionKind::ReadLine => self.read_line(&d.path, d.line_number).await,
            ActionKind::EditLine => {
                let line = d.line_content.as_deref().unwrap_or("");
                self.edit_line(&d.path, d.line_number, line, changes).await
            }
            ActionKind::CreateDir => self.create_dir(&d.path).await,
            ActionKind::CreateFile => {
                let content = d.content.as_deref().unwrap_or("");
                self.create_file(&d.path, content, changes).await
            }
            ActionKind::Update => {
                let content = d.content.as_deref().unwrap_or("");
                self.update(&d.path, content, changes).await
            }
            ActionKind::Rename => match d.new_path.as_deref() {
                Some(new_path) => self.rename(&d.path, new_path, changes).await,
                None => Ok(ToolResult::failure("Missing new_path")),
            },
            ActionKind::Delete => self.delete(&d.path, d.recursive, changes).await,
            ActionKind::Other(_) => Ok(ToolResult::failure("Unsupported action")),
        }
    }

    async fn list(&self, rel: &str) -> Result<ToolResult> {
        let dir = self.sandbox.resolve(rel)?;
        let Some(meta) = metadata(&dir).await else {
            return Ok(ToolResult::failure("Path not found"));
        };
        if !meta.is_dir() {
            return Ok(ToolResult::failure("Path is not a directory"));
        }

        let mut entries = Vec::new();
        let mut reader = fs::read_dir(&dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            let kind = if entry.file_type().await?.is_dir() {
                "folder"
            } else {
                "file"
            };
            entries.push((entry.file_name().to_string_lossy().into_owned(), kind));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let data: Vec<Value> = entries
            .into_iter()
            .map(|(name, kind)| json!({"name": name, "type": kind}))
            .collect();
        Ok(ToolResult::success_with_data(Value::Array(data)))
    }

    async fn read(&self, rel: &str) -> Result<ToolResult> {
        let path = self.sandbox.resolve(rel)?;
        match read_existing(&path).await? {
            Some(text) => Ok(ToolResult::success_with_data(Value::String(text))),
            None => Ok(ToolResult::failure("Path not found")),
        }
    }

    async fn read_line(&self, rel: &str, line_number: Option<i64>) -> Result<ToolResult> {
        let path = self.sandbox.resolve(rel)?;
        let Some(text) = read_existing(&path).await? else {
            return Ok(ToolResult::failure("Path not found"));
        };

        let lines: Vec<&str> = text.split('\n').collect();
        let Some(index) = line_index(line_number, lines.len()) else {
            return Ok(invalid_line(lines.len()));
        };

        Ok(ToolResult {
            ok: true,
            data: Some(Value::String(lines[index].to_string())),
            line_number: Some(index + 1),
            total_lines: Some(lines.len()),
            ..Default::default()
        })
    }

    async fn edit_line(
        &self,
        rel: &str,
        line_number: Option<i64>,
        line_content: &str,
        changes: &mut ChangeSet,
    ) -> Result<ToolResult> {
        let path = self.sandbox.resolve(rel)?;
        let Some(old) = read_existing(&path).await? else {
            return Ok(ToolResult::failure("Path not found"));
        };

        let mut lines: Vec<&str> = old.split('\n').collect();
        let Some(index) = line_index(line_number, lines.len()) else {
            return Ok(invalid_line(lines.len()));
        };

        let old_line = lines[index].to_string();
        lines[index] = line_content;
        let new = lines.join("\n");

        fs::write(&path, &new).await?;
        let modified = changes.record_write(self.sandbox.client_key(&path), &old, &new);

        Ok(ToolResult {
            ok: true,
            modified_lines: Some(modified),
            old_content: Some(old),
            new_content: Some(new),
            line_number: Some(index + 1),
            old_line_content: Some(old_line),
            new_line_content: Some(line_content.to_string()),
            ..Default::default()
        })
    }

    async fn create_dir(&self, rel: &str) -> Result<ToolResult> {
        let dir = self.sandbox.resolve(rel)?;
        if metadata(&dir).await.is_some() {
            return Ok(ToolResult::failure("Directory already exists"));
        }
        fs::create_dir_all(&dir).await?;
        Ok(ToolResult::success("Directory created"))
    }

    async fn create_file(
        &self,
        rel: &str,
        content: &str,
        changes: &mut ChangeSet,
    ) -> Result<ToolResult> {
        let path = self.sandbox.resolve(rel)?;
        if metadata(&path).await.is_some() {
            return Ok(ToolResult::failure("File already exists"));
        }
        ensure_parent(&path).await?;
        fs::write(&path, content).await?;

        let modified = changes.record_write(self.sandbox.client_key(&path), "", content);
        Ok(ToolResult::success("File created").with_lines(modified))
    }

    async fn update(&self, rel: &str, content: &str, changes: &mut ChangeSet) -> Result<ToolResult> {
        let path = self.sandbox.resolve(rel)?;
        let old = read_existing(&path).await?.unwrap_or_default();

        ensure_parent(&path).await?;
        fs::write(&path, content).await?;
        let modified = changes.record_write(self.sandbox.client_key(&path), &old, content);

        Ok(ToolResult {
            ok: true,
            modified_lines: Some(modified),
            old_content: Some(old),
            new_content: Some(content.to_string()),
            ..Default::default()
        })
    }

    async fn rename(&self, rel: &str, new_rel: &str, changes: &mut ChangeSet) -> Result<ToolResult> {
        let from = self.sandbox.resolve_entry(rel)?;
        let to = self.sandbox.resolve_entry(new_rel)?;
        if metadata(&from).await.is_none() {
            return Ok(ToolResult::failure("Path not found"));
        }

        ensure_parent(&to).await?;
        fs::rename(&from, &to).await?;
        changes.touch(self.sandbox.client_key(&from));
        changes.touch(self.sandbox.client_key(&to));
        Ok(ToolResult::success("Renamed"))
    }

    async fn delete(&self, rel: &str, recursive: bool, changes: &mut ChangeSet) -> Result<ToolResult> {
        let path = self.sandbox.resolve_entry(rel)?;
        let Some(meta) = metadata(&path).await else {
            return Ok(ToolResult::failure("Path not found"));
        };

        if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&path).await?;
            } else {
                fs::remove_dir(&path).await?;
            }
        } else {
            fs::remove_file(&path).await?;
        }

        changes.touch(self.sandbox.client_key(&path));
        Ok(ToolResult::success("Deleted"))
    }
}

async fn metadata(path: &Path) -> Option<std::fs::Metadata> {
    fs::metadata(path).await.ok()
}

/// Read a file, mapping "not found" to `None`
async fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Zero-based index for a 1-based line number within `total` lines
fn line_index(line_number: Option<i64>, total: usize) -> Option<usize> {
    let n = usize::try_from(line_number?).ok()?;
    (1..=total).contains(&n).then(|| n - 1)
}

fn invalid_line(total: usize) -> ToolResult {
    ToolResult::failure(format!("Invalid line number. File has {} lines.", total))
}
