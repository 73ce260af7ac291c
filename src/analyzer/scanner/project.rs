//! Project-type detection and the per-type file tables used by the scanner

use std::path::Path;

use ignore::WalkBuilder;
use tracing::debug;

use crate::config::ProjectType;

pub(crate) const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".vscode",
    ".idea",
    "__pycache__",
    "dist",
    "build",
    "target",
    "out",
    "bin",
    "obj",
    "vendor",
    "tmp",
    "temp",
    ".next",
    "docs",
    "coverage",
    ".pytest_cache",
];

const FRONTEND_EXTENSIONS: &[&str] = &[
    "js", "ts", "tsx", "jsx", "vue", "svelte", "html", "css", "scss",
];

const BACKEND_EXTENSIONS: &[&str] = &[
    "py", "java", "cs", "go", "php", "rb", "rs", "c", "cpp", "h", "hpp", "kt", "swift", "sql",
];

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "java", "cs", "go", "php", "rb", "rs", "c", "cpp", "h", "hpp",
    "html", "css", "scss", "sql", "sh", "kt", "swift", "vue", "svelte", "xml", "gradle",
];

const FRONTEND_PRIORITY: &[&str] = &[
    "package.json",
    "README.md",
    "index.html",
    "App.tsx",
    "App.jsx",
    "main.tsx",
    "main.jsx",
    "vite.config.ts",
    "tailwind.config.ts",
    "tsconfig.json",
    "webpack.config.js",
    "next.config.js",
    "nuxt.config.js",
];

const BACKEND_PRIORITY: &[&str] = &[
    "pom.xml",
    "build.gradle",
    "settings.gradle",
    "application.properties",
    "application.yml",
    "setup.py",
    "requirements.txt",
    "go.mod",
    "Cargo.toml",
    "composer.json",
    "Program.cs",
    "Startup.cs",
    "README.md",
    "Gemfile",
];

const FRONTEND_INDICATORS: &[&str] = &["package.json", "yarn.lock", "pnpm-lock.yaml"];

const BACKEND_INDICATORS: &[&str] = &[
    "pom.xml",
    "build.gradle",
    "go.mod",
    "Cargo.toml",
    "requirements.txt",
    "Gemfile",
];

pub(crate) fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

pub(crate) fn allowed_extensions(project_type: ProjectType) -> &'static [&'static str] {
    match project_type {
        ProjectType::Frontend => FRONTEND_EXTENSIONS,
        ProjectType::Backend => BACKEND_EXTENSIONS,
        ProjectType::Mixed | ProjectType::Auto => SUPPORTED_EXTENSIONS,
    }
}

pub(crate) fn priority_files(project_type: ProjectType) -> Vec<&'static str> {
    match project_type {
        ProjectType::Frontend => FRONTEND_PRIORITY.to_vec(),
        ProjectType::Backend => BACKEND_PRIORITY.to_vec(),
        ProjectType::Mixed | ProjectType::Auto => {
            let mut names = FRONTEND_PRIORITY.to_vec();
            names.extend(BACKEND_PRIORITY.iter().filter(|n| !FRONTEND_PRIORITY.contains(*n)));
            names
        }
    }
}

/// Detect the project type from manifest files anywhere under `root`.
///
/// Frontend and backend indicators together (or neither) mean `Mixed`.
pub fn detect_project_type<P: AsRef<Path>>(root: P) -> ProjectType {
    let mut frontend = false;
    let mut backend = false;

    let walker = WalkBuilder::new(root.as_ref())
        .hidden(false)
        .follow_links(false)
        .filter_entry(|entry| {
            !(entry.file_type().is_some_and(|t| t.is_dir())
                && entry.depth() > 0
                && is_ignored_dir(&entry.file_name().to_string_lossy()))
        })
        .build();

    for entry in walker.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy();
        frontend |= FRONTEND_INDICATORS.iter().any(|i| *i == name);
        backend |= BACKEND_INDICATORS.iter().any(|i| *i == name);
        if frontend && backend {
            break;
        }
    }

    let detected = match (frontend, backend) {
        (true, false) => ProjectType::Frontend,
        (false, true) => ProjectType::Backend,
        _ => ProjectType::Mixed,
    };
    debug!(root = %root.as_ref().display(), project_type = %detected, "Detected project type");
    detected
}

/// Resolve `Auto` by inspecting the project; explicit types pass through
pub fn resolve_project_type<P: AsRef<Path>>(configured: ProjectType, root: P) -> ProjectType {
    match configured {
        ProjectType::Auto => detect_project_type(root),
        explicit => explicit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        dir
    }

    #[test]
    fn test_detect_frontend_and_backend() {
        assert_eq!(
            detect_project_type(project(&["package.json", "src/index.ts"]).path()),
            ProjectType::Frontend
        );
        assert_eq!(
            detect_project_type(project(&["services/api/go.mod"]).path()),
            ProjectType::Backend
        );
    }

    #[test]
    fn test_detect_mixed() {
        assert_eq!(
            detect_project_type(project(&["web/package.json", "api/requirements.txt"]).path()),
            ProjectType::Mixed
        );
        assert_eq!(
            detect_project_type(project(&["main.c"]).path()),
            ProjectType::Mixed
        );
    }

    #[test]
    fn test_ignored_dirs_do_not_count() {
        let dir = project(&["requirements.txt", "node_modules/left-pad/package.json"]);
        assert_eq!(detect_project_type(dir.path()), ProjectType::Backend);
    }

    #[test]
    fn test_resolve_keeps_explicit_type() {
        let dir = project(&["package.json"]);
        assert_eq!(
            resolve_project_type(ProjectType::Backend, dir.path()),
            ProjectType::Backend
        );
        assert_eq!(
            resolve_project_type(ProjectType::Auto, dir.path()),
            ProjectType::Frontend
        );
    }

    #[test]
    fn test_mixed_priority_has_no_duplicates() {
        let names = priority_files(ProjectType::Mixed);
        assert_eq!(names.iter().filter(|n| **n == "README.md").count(), 1);
        assert!(names.contains(&"Cargo.toml"));
    }
}
