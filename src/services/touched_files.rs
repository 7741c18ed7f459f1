//! Detection of the source files a session changed.
//!
//! Git is asked first (tracked changes against HEAD plus untracked files).
//! Without a usable repository the workspace is compared against the
//! pre-session snapshot instead.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::EvalError;
use crate::domain::models::FileSnapshot;
use crate::domain::ports::CommandRunner;

/// Extensions the complexity metric treats as source code
const CODE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "vue", "svelte", "py", "rb", "go", "rs", "java",
    "kt", "kts", "swift", "c", "h", "cc", "cpp", "hpp", "cs", "php", "scala", "sh",
];

/// Directories never walked during snapshot comparison
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    "__pycache__",
];

/// How touched files were found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Git,
    Snapshot,
    None,
}

impl Detection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Snapshot => "snapshot",
            Self::None => "none",
        }
    }
}

/// A changed source file with its content before and after the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchedFile {
    /// Workspace-relative path with `/` separators
    pub path: String,
    /// None for files the session created
    pub before: Option<String>,
    pub after: String,
}

impl TouchedFile {
    pub fn extension(&self) -> &str {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }
}

pub fn is_code_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CODE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Single-quote a path for `sh -c`.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Read a workspace file, treating missing or non-UTF-8 files as absent.
async fn read_source(path: &Path) -> Result<Option<String>, EvalError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidData
            ) =>
        {
            Ok(None)
        }
        Err(source) => Err(EvalError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Run a git probe; None when git is missing or the command fails.
async fn git_lines(
    runner: &dyn CommandRunner,
    command: &str,
    workspace: &Path,
    timeout: Duration,
) -> Option<Vec<String>> {
    match runner.run(command, workspace, timeout).await {
        Ok(output) if output.success() => Some(
            output
                .combined
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Ok(output) => {
            debug!(command, exit_code = ?output.exit_code, "git probe failed");
            None
        }
        Err(e) => {
            debug!(command, error = %e, "git unavailable");
            None
        }
    }
}

async fn detect_with_git(
    runner: &dyn CommandRunner,
    workspace: &Path,
    timeout: Duration,
) -> Result<Option<Vec<TouchedFile>>, EvalError> {
    let Some(mut paths) = git_lines(runner, "git diff --name-only HEAD", workspace, timeout).await
    else {
        return Ok(None);
    };
    if let Some(untracked) = git_lines(
        runner,
        "git ls-files --others --exclude-standard",
        workspace,
        timeout,
    )
    .await
    {
        paths.extend(untracked);
    }
    paths.sort();
    paths.dedup();

    let mut files = Vec::new();
    for path in paths.into_iter().filter(|p| is_code_file(Path::new(p))) {
        let Some(after) = read_source(&workspace.join(&path)).await? else {
            continue;
        };
        let show = format!("git show {}", shell_quote(&format!("HEAD:{path}")));
        let before = match runner.run(&show, workspace, timeout).await {
            Ok(output) if output.success() => Some(output.combined),
            _ => None,
        };
        files.push(TouchedFile { path, before, after });
    }
    Ok(Some(files))
}

/// Recursively list code files under `root`, relative to it.
async fn list_code_files(root: &Path) -> Result<Vec<PathBuf>, EvalError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| EvalError::Io { path, source }
    };

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err(&dir))?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err(&dir))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(io_err(&path))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if file_type.is_dir() {
                if !SKIPPED_DIRS.contains(&name.as_ref()) {
                    pending.push(path);
                }
            } else if file_type.is_file() && is_code_file(&path) {
                if let Ok(relative) = path.strip_prefix(root) {
                    found.push(relative.to_path_buf());
                }
            }
        }
    }
    found.sort();
    Ok(found)
}

async fn detect_with_snapshot(
    workspace: &Path,
    snapshot: &FileSnapshot,
) -> Result<Vec<TouchedFile>, EvalError> {
    let mut files = Vec::new();
    for relative in list_code_files(workspace).await? {
        let Some(after) = read_source(&workspace.join(&relative)).await? else {
            continue;
        };
        let before = snapshot.get(&relative);
        if before == Some(after.as_str()) {
            continue;
        }
        files.push(TouchedFile {
            path: relative.to_string_lossy().replace('\\', "/"),
            before: before.map(str::to_string),
            after,
        });
    }
    Ok(files)
}

/// Find the source files the session created or modified.
pub async fn detect_touched_files(
    runner: &dyn CommandRunner,
    workspace: &Path,
    snapshot: Option<&FileSnapshot>,
    git_timeout: Duration,
) -> Result<(Detection, Vec<TouchedFile>), EvalError> {
    if let Some(files) = detect_with_git(runner, workspace, git_timeout).await? {
        return Ok((Detection::Git, files));
    }
    match snapshot {
        Some(snapshot) => Ok((
            Detection::Snapshot,
            detect_with_snapshot(workspace, snapshot).await?,
        )),
        None => Ok((Detection::None, Vec::new())),
    }
}
