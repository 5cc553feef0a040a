//! Sandbox path resolution
//!
//! Every file the tool touches lives beneath one root. Containment is
//! checked on the joined and lexically normalized path.

use std::path::{Component, Path, PathBuf};

use crate::core::{QuillError, Result};

/// Prefix used for change-set keys and client paths (`data/<rel>`)
pub const CLIENT_ROOT: &str = "data";

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Open a sandbox, creating the root directory if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path relative to the root, rejecting escapes.
    ///
    /// Leading separators are ignored, so `/x.md` means `<root>/x.md`.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let rel = rel.trim_start_matches(['/', '\\']);
        let joined = normalize(&self.root.join(rel));

        if !joined.starts_with(&self.root) {
            tracing::warn!(path = rel, "Rejected path outside sandbox");
            return Err(QuillError::AccessDenied);
        }

        Ok(joined)
    }

    /// Resolve a path that must name an entry below the root, not the root itself
    pub fn resolve_entry(&self, rel: &str) -> Result<PathBuf> {
        let path = self.resolve(rel)?;
        if path == self.root {
            tracing::warn!(path = rel, "Rejected operation on sandbox root");
            return Err(QuillError::AccessDenied);
        }
        Ok(path)
    }

    /// Resolve a client path such as `data/chapters/1.md`
    pub fn resolve_client(&self, client_path: &str) -> Result<PathBuf> {
        let trimmed = client_path.trim_start_matches(['/', '\\']);
        let rel = match trimmed.strip_prefix(CLIENT_ROOT) {
            Some("") => "",
            Some(rest) if rest.starts_with('/') => &rest[1..],
            _ => trimmed,
        };
        self.resolve(rel)
    }

    /// Client-facing key for a resolved path, e.g. `data/chapters/1.md`
    pub fn client_key(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        if parts.is_empty() {
            CLIENT_ROOT.to_string()
        } else {
            format!("{}/{}", CLIENT_ROOT, parts.join("/"))
        }
    }
}

/// Collapse `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
