use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

use super::project::{IGNORED_DIRS, allowed_extensions, is_ignored_dir, priority_files};
use crate::config::ProjectType;
use crate::constants::analysis::{DEFAULT_MAX_FILES, MAX_FILE_SIZE};
use crate::types::{DocGateError, Result, SourceFile};

/// Discovers the files handed to the pipeline.
///
/// Priority files (manifests, entry points, READMEs) come first, followed by
/// source files in path order; the combined list is capped at `max_files`.
pub struct FileScanner {
    root: PathBuf,
    project_type: ProjectType,
    exclude: Vec<glob::Pattern>,
    max_file_size: u64,
    max_files: usize,
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated
    pub relative: String,
    pub size: u64,
    pub priority: bool,
}

impl FileScanner {
    /// `project_type` must already be resolved; `Auto` scans every supported extension
    pub fn new<P: AsRef<Path>>(root: P, project_type: ProjectType) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            project_type,
            exclude: Vec::new(),
            max_file_size: MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
        }
    }

    /// Extra glob patterns matched against relative paths; invalid ones are skipped
    pub fn with_exclude(mut self, patterns: &[String]) -> Self {
        self.exclude = patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            return Err(DocGateError::analysis(
                self.root.display().to_string(),
                "not a directory",
            ));
        }

        let extensions = allowed_extensions(self.project_type);
        let priority_names = priority_files(self.project_type);

        let mut priority = Vec::new();
        let mut regular = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .filter_entry(|entry| {
                !(entry.file_type().is_some_and(|t| t.is_dir())
                    && entry.depth() > 0
                    && is_ignored_dir(&entry.file_name().to_string_lossy()))
            })
            .build();

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let Some(relative) = self.relative(path) else {
                continue;
            };
            if self.exclude.iter().any(|p| p.matches(&relative)) {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let is_priority = priority_names.iter().any(|p| *p == name);
            let has_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.contains(&ext.to_lowercase().as_str()));
            if !is_priority && !has_extension {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.len() > self.max_file_size {
                debug!(path = %relative, size = metadata.len(), "Skipping oversized file");
                continue;
            }

            let scanned = ScannedFile {
                path: path.to_path_buf(),
                relative,
                size: metadata.len(),
                priority: is_priority,
            };
            if is_priority {
                priority.push(scanned);
            } else {
                regular.push(scanned);
            }
        }

        // Shallow manifests before nested ones
        priority.sort_by(|a, b| {
            depth(&a.relative)
                .cmp(&depth(&b.relative))
                .then_with(|| a.relative.cmp(&b.relative))
        });
        regular.sort_by(|a, b| a.relative.cmp(&b.relative));

        let mut files = priority;
        files.extend(regular);
        files.truncate(self.max_files);

        debug!(
            root = %self.root.display(),
            files = files.len(),
            ignored_dirs = IGNORED_DIRS.len(),
            "Scan complete"
        );
        Ok(files)
    }

    /// Scan and read every file; unreadable files are logged and skipped
    pub fn read_sources(&self) -> Result<Vec<SourceFile>> {
        let files = self.scan()?;
        Ok(files
            .into_iter()
            .filter_map(|file| match std::fs::read(&file.path) {
                Ok(bytes) => Some(SourceFile::new(
                    file.relative,
                    String::from_utf8_lossy(&bytes).into_owned(),
                )),
                Err(e) => {
                    warn!(path = %file.relative, error = %e, "Could not read file");
                    None
                }
            })
            .collect())
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}

fn depth(relative: &str) -> usize {
    relative.matches('/').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "package.json", "{}");
        write(root, "README.md", "# Shop");
        write(root, "src/App.tsx", "export default function App() {}");
        write(root, "src/api/client.ts", "export const get = () => 1;");
        write(root, "server/app.py", "def main(): pass");
        write(root, "node_modules/react/index.js", "module.exports = {}");
        write(root, "docs/guide.html", "<p>guide</p>");
        write(root, "notes.txt", "todo");
        dir
    }

    fn relatives(files: &[ScannedFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative.as_str()).collect()
    }

    #[test]
    fn test_priority_files_first() {
        let dir = project();
        let files = FileScanner::new(dir.path(), ProjectType::Mixed).scan().unwrap();

        assert_eq!(
            relatives(&files),
            vec![
                "README.md",
                "package.json",
                "src/App.tsx",
                "server/app.py",
                "src/api/client.ts",
            ]
        );
        assert!(files[0].priority);
        // App.tsx is a priority file deeper in the tree
        assert!(files[2].priority);
    }

    #[test]
    fn test_project_type_filters_extensions() {
        let dir = project();
        let files = FileScanner::new(dir.path(), ProjectType::Backend).scan().unwrap();
        let names = relatives(&files);
        assert!(names.contains(&"server/app.py"));
        assert!(!names.contains(&"src/api/client.ts"));
        assert!(!names.contains(&"package.json"));
    }

    #[test]
    fn test_max_files_and_exclude() {
        let dir = project();
        let files = FileScanner::new(dir.path(), ProjectType::Mixed)
            .with_max_files(2)
            .scan()
            .unwrap();
        assert_eq!(files.len(), 2);

        let files = FileScanner::new(dir.path(), ProjectType::Mixed)
            .with_exclude(&["server/**".to_string(), "[".to_string()])
            .scan()
            .unwrap();
        assert!(!relatives(&files).contains(&"server/app.py"));
    }

    #[test]
    fn test_read_sources() {
        let dir = project();
        let sources = FileScanner::new(dir.path(), ProjectType::Frontend)
            .read_sources()
            .unwrap();
        let app = sources.iter().find(|s| s.path == "src/App.tsx").unwrap();
        assert!(app.content.contains("function App"));
        assert_eq!(app.language, crate::analyzer::language::Language::Tsx);
    }

    #[test]
    fn test_missing_root() {
        let result = FileScanner::new("/nonexistent/docgate/root", ProjectType::Mixed).scan();
        assert!(matches!(result, Err(DocGateError::Analysis { .. })));
    }
}
