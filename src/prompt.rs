// Prompt loading: built-in defaults and operator-provided `*.prompt` files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PromptError;

const PROMPT_EXTENSION: &str = "prompt";

/// Built-in prompt files, embedded at compile time
const EMBEDDED_PROMPTS: &[(&str, &str)] = &[
    (
        "explain_tcp.prompt",
        include_str!("../prompts/explain_tcp.prompt"),
    ),
    (
        "list_rivers.prompt",
        include_str!("../prompts/list_rivers.prompt"),
    ),
    (
        "summarize_story.prompt",
        include_str!("../prompts/summarize_story.prompt"),
    ),
];

/// Where a prompt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    User,
    Default,
}

/// One prompt used for a latency sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    /// Free-form description
    pub description: String,
    pub content: String,
}

impl Prompt {
    pub fn new(kind: PromptKind, description: &str, content: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
            content: content.to_string(),
        }
    }
}

/// Supplier of the prompt pool for an evaluation
#[async_trait]
pub trait PromptSource: Send + Sync {
    /// Ordered, non-empty prompt pool
    async fn prompts(&self) -> Result<Arc<[Prompt]>, PromptError>;
}

/// The built-in prompt set
#[derive(Debug, Clone)]
pub struct DefaultPrompts(Arc<[Prompt]>);

impl DefaultPrompts {
    /// Build the embedded set; called once at startup
    pub fn load() -> Self {
        let prompts: Vec<Prompt> = EMBEDDED_PROMPTS
            .iter()
            .map(|(file, content)| {
                Prompt::new(
                    PromptKind::Default,
                    &format!("Default prompt {}", file),
                    content.trim(),
                )
            })
            .collect();

        Self(prompts.into())
    }

    pub fn get(&self) -> Arc<[Prompt]> {
        Arc::clone(&self.0)
    }
}

#[async_trait]
impl PromptSource for DefaultPrompts {
    async fn prompts(&self) -> Result<Arc<[Prompt]>, PromptError> {
        if self.0.is_empty() {
            return Err(PromptError::Empty);
        }
        Ok(self.get())
    }
}

/// Reads `*.prompt` files from a directory, falling back to the defaults
#[derive(Debug, Clone)]
pub struct DirPromptSource {
    dir: PathBuf,
    defaults: DefaultPrompts,
}

impl DirPromptSource {
    pub fn new(dir: PathBuf, defaults: DefaultPrompts) -> Self {
        Self { dir, defaults }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PromptSource for DirPromptSource {
    async fn prompts(&self) -> Result<Arc<[Prompt]>, PromptError> {
        match load_user_prompts(&self.dir).await {
            Ok(prompts) if !prompts.is_empty() => Ok(prompts.into()),
            Ok(_) => self.defaults.prompts().await,
            Err(e) => {
                tracing::debug!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to read user prompts, using defaults"
                );
                self.defaults.prompts().await
            }
        }
    }
}

/// Load every `*.prompt` file in `dir`, sorted by file name.
/// A missing directory yields an empty list.
async fn load_user_prompts(dir: &Path) -> Result<Vec<Prompt>, PromptError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        let is_prompt = path.extension().and_then(|e| e.to_str()) == Some(PROMPT_EXTENSION);
        if is_file && is_prompt {
            files.push(path);
        }
    }
    files.sort();

    let mut prompts = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => prompts.push(Prompt::new(
                PromptKind::User,
                &format!("User prompt {}", name),
                &content,
            )),
            Err(e) => {
                tracing::debug!(file = %name, error = %e, "Skipping unreadable prompt file");
            }
        }
    }

    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let defaults = DefaultPrompts::load().get();
        assert_eq!(defaults.len(), 3);
        assert!(defaults.iter().all(|p| !p.content.is_empty()));
        assert!(defaults.iter().all(|p| p.kind == PromptKind::Default));
        assert_eq!(defaults[0].description, "Default prompt explain_tcp.prompt");
    }

    #[tokio::test]
    async fn test_missing_dir_falls_back_to_defaults() {
        let source = DirPromptSource::new(
            PathBuf::from("/nonexistent/latbench/prompts"),
            DefaultPrompts::load(),
        );

        let prompts = source.prompts().await.unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p.kind == PromptKind::Default));
    }

    #[tokio::test]
    async fn test_user_prompts_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.prompt"), "second").unwrap();
        std::fs::write(dir.path().join("a.prompt"), "first").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested.prompt")).unwrap();

        let source = DirPromptSource::new(dir.path().to_path_buf(), DefaultPrompts::load());
        let prompts = source.prompts().await.unwrap();

        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].content, "first");
        assert_eq!(prompts[0].description, "User prompt a.prompt");
        assert_eq!(prompts[1].content, "second");
        assert!(prompts.iter().all(|p| p.kind == PromptKind::User));
    }

    #[tokio::test]
    async fn test_empty_dir_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), "not a prompt").unwrap();

        let source = DirPromptSource::new(dir.path().to_path_buf(), DefaultPrompts::load());
        let prompts = source.prompts().await.unwrap();

        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0].kind, PromptKind::Default);
    }

    #[tokio::test]
    async fn test_empty_defaults_is_an_error() {
        let empty = DefaultPrompts(Vec::new().into());
        let err = empty.prompts().await.unwrap_err();
        assert!(matches!(err, PromptError::Empty));
    }
}
