use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::ExecutorError;
use crate::output::{text, Scope};

const RUN_DIRECTORY_PREFIX: &str = "tasker-";

/// Per-batch directory holding the task log files.
///
/// On drop the directory is removed when `scope` finished successfully or nothing was written
/// into it. Otherwise it is kept for inspection and its location is reported through `scope`.
pub struct RunDirectory<'s> {
    dir: Option<TempDir>,
    path: PathBuf,
    scope: &'s Scope,
}

impl<'s> RunDirectory<'s> {
    pub fn create(scope: &'s Scope) -> Result<Self, ExecutorError> {
        let dir = tempfile::Builder::new()
            .prefix(RUN_DIRECTORY_PREFIX)
            .tempdir()?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "created run directory");

        Ok(Self {
            dir: Some(dir),
            path,
            scope,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<run dir>/<slot:06>.log`
    pub fn log_path(&self, slot: usize) -> PathBuf {
        self.path.join(format!("{slot:06}.log"))
    }

    fn is_empty(&self) -> bool {
        std::fs::read_dir(&self.path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

impl Drop for RunDirectory<'_> {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        if self.scope.result() == 0 || self.is_empty() {
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "failed to remove run directory");
            }
            return;
        }

        let path = dir.keep();
        warn!(path = %path.display(), "preserving run directory");

        if self.scope.capabilities().is_headless {
            self.scope.write_info(&format!(
                "\nThe temporary directory '{}' was preserved due to errors encountered while executing tasks.",
                path.display()
            ));
        } else {
            self.scope.write_info(&format!(
                "\nThe {} was preserved due to errors encountered while executing tasks.",
                text::ansi_hyperlink(&text::file_url(&path), "temporary working directory")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{BufferSink, ScopeFlags};
    use std::sync::Arc;

    #[test]
    fn test_removed_on_success() {
        let scope = Scope::create(Arc::new(BufferSink::new()), "Run", ScopeFlags::default());
        let run_dir = RunDirectory::create(&scope).unwrap();
        let path = run_dir.path().to_path_buf();
        std::fs::write(run_dir.log_path(0), "log").unwrap();
        assert!(path.join("000000.log").is_file());

        drop(run_dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_removed_when_empty_even_on_failure() {
        let scope = Scope::create(Arc::new(BufferSink::new()), "Run", ScopeFlags::default());
        scope.set_result(-1);
        let run_dir = RunDirectory::create(&scope).unwrap();
        let path = run_dir.path().to_path_buf();

        drop(run_dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_preserved_and_reported_on_failure() {
        let sink = BufferSink::new();
        let scope = Scope::create(Arc::new(sink.clone()), "Run", ScopeFlags::default());
        scope.set_result(-1);
        let run_dir = RunDirectory::create(&scope).unwrap();
        let path = run_dir.path().to_path_buf();
        std::fs::write(run_dir.log_path(3), "log").unwrap();

        drop(run_dir);
        assert!(path.join("000003.log").is_file());
        assert!(sink.contents().contains(&format!(
            "INFO: The temporary directory '{}' was preserved",
            path.display()
        )));

        std::fs::remove_dir_all(path).unwrap();
    }
}
