use std::path::{Component, Path, PathBuf};

/// Local file store standing in for a storage bucket service.
///
/// Files land in `{root}/{bucket}/{path}` and are served by the app under
/// `/files/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    public_base_url: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        FileStore {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Write `bytes` and return the public URL. Rejects bucket or path values
    /// that would escape the root.
    pub async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, String> {
        let bucket = safe_relative(bucket).ok_or_else(|| format!("invalid bucket '{bucket}'"))?;
        let rel = safe_relative(path).ok_or_else(|| format!("invalid path '{path}'"))?;

        let target = self.root.join(&bucket).join(&rel);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| format!("failed to write {}: {e}", target.display()))?;

        log::info!("Stored {} bytes at {}", bytes.len(), target.display());
        Ok(format!("{}/files/{}/{}", self.public_base_url, to_url_path(&bucket), to_url_path(&rel)))
    }
}

/// Normal path components only: no root, no `..`, not empty.
fn safe_relative(raw: &str) -> Option<PathBuf> {
    let path = Path::new(raw.trim_start_matches('/'));
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() { None } else { Some(out) }
}

fn to_url_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_traversal() {
        assert!(safe_relative("../etc/passwd").is_none());
        assert!(safe_relative("slides/../../x").is_none());
        assert!(safe_relative("").is_none());
    }

    #[test]
    fn strips_leading_slash() {
        assert_eq!(safe_relative("/deck/main.pdf"), Some(PathBuf::from("deck/main.pdf")));
    }
}
