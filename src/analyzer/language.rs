//! Language Detection
//!
//! Single source of truth for mapping file paths to languages and for
//! choosing the extraction strategy used on each language.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Language Metadata Table
// =============================================================================

struct LanguageMeta {
    display_name: &'static str,
    /// Identifier for fenced code blocks
    highlight_str: &'static str,
    extensions: &'static [&'static str],
    aliases: &'static [&'static str],
    strategy: ExtractionStrategy,
    /// Side of the stack this language usually lives on
    side: StackSide,
}

macro_rules! lang_meta {
    ($display:literal, $highlight:literal, [$($ext:literal),*], [$($alias:literal),*], $strategy:ident, $side:ident) => {
        LanguageMeta {
            display_name: $display,
            highlight_str: $highlight,
            extensions: &[$($ext),*],
            aliases: &[$($alias),*],
            strategy: ExtractionStrategy::$strategy,
            side: StackSide::$side,
        }
    };
}

/// How code elements are pulled out of a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// tree-sitter Python grammar
    Python,
    /// tree-sitter TypeScript/TSX grammar (also used for JavaScript)
    TypeScript,
    /// Line-oriented declaration patterns
    Regex,
    /// Markup, styles and data files: nothing to extract
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSide {
    Frontend,
    Backend,
    Either,
}

impl Language {
    fn meta(&self) -> LanguageMeta {
        match self {
            Language::Python => lang_meta!("Python", "python", ["py", "pyi", "pyw"], ["python", "py"], Python, Backend),
            Language::TypeScript => lang_meta!("TypeScript", "typescript", ["ts", "mts", "cts"], ["typescript", "ts"], TypeScript, Frontend),
            Language::Tsx => lang_meta!("TSX", "tsx", ["tsx"], ["tsx"], TypeScript, Frontend),
            Language::JavaScript => lang_meta!("JavaScript", "javascript", ["js", "mjs", "cjs"], ["javascript", "js"], TypeScript, Frontend),
            Language::Jsx => lang_meta!("JSX", "jsx", ["jsx"], ["jsx"], TypeScript, Frontend),

            Language::Rust => lang_meta!("Rust", "rust", ["rs"], ["rust"], Regex, Backend),
            Language::Go => lang_meta!("Go", "go", ["go"], ["go", "golang"], Regex, Backend),
            Language::Java => lang_meta!("Java", "java", ["java"], ["java"], Regex, Backend),
            Language::Kotlin => lang_meta!("Kotlin", "kotlin", ["kt", "kts"], ["kotlin", "kt"], Regex, Backend),
            Language::CSharp => lang_meta!("C#", "csharp", ["cs"], ["csharp", "c#", "cs"], Regex, Backend),
            Language::Php => lang_meta!("PHP", "php", ["php"], ["php"], Regex, Backend),
            Language::Ruby => lang_meta!("Ruby", "ruby", ["rb"], ["ruby", "rb"], Regex, Backend),
            Language::Swift => lang_meta!("Swift", "swift", ["swift"], ["swift"], Regex, Backend),
            Language::C => lang_meta!("C", "c", ["c", "h"], ["c"], Regex, Backend),
            Language::Cpp => lang_meta!("C++", "cpp", ["cpp", "cc", "cxx", "hpp"], ["cpp", "c++"], Regex, Backend),
            Language::Bash => lang_meta!("Bash", "bash", ["sh"], ["bash", "sh"], Regex, Either),

            Language::Vue => lang_meta!("Vue", "vue", ["vue"], ["vue"], None, Frontend),
            Language::Svelte => lang_meta!("Svelte", "svelte", ["svelte"], ["svelte"], None, Frontend),
            Language::Html => lang_meta!("HTML", "html", ["html", "htm"], ["html"], None, Frontend),
            Language::Css => lang_meta!("CSS", "css", ["css", "scss"], ["css", "scss"], None, Frontend),
            Language::Sql => lang_meta!("SQL", "sql", ["sql"], ["sql"], None, Backend),
            Language::Xml => lang_meta!("XML", "xml", ["xml"], ["xml"], None, Either),
            Language::Gradle => lang_meta!("Gradle", "groovy", ["gradle"], ["gradle"], None, Backend),

            Language::Unknown => lang_meta!("Unknown", "text", [], ["unknown", "text"], None, Either),
        }
    }
}

// =============================================================================
// Language Enum
// =============================================================================

/// Languages recognised by file discovery and extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    Python,
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Rust,
    Go,
    Java,
    Kotlin,
    CSharp,
    Php,
    Ruby,
    Swift,
    C,
    Cpp,
    Bash,
    Vue,
    Svelte,
    Html,
    Css,
    Sql,
    Xml,
    Gradle,
    #[default]
    Unknown,
}

const ALL_VARIANTS: &[Language] = &[
    Language::Python, Language::TypeScript, Language::Tsx, Language::JavaScript,
    Language::Jsx, Language::Rust, Language::Go, Language::Java, Language::Kotlin,
    Language::CSharp, Language::Php, Language::Ruby, Language::Swift, Language::C,
    Language::Cpp, Language::Bash, Language::Vue, Language::Svelte, Language::Html,
    Language::Css, Language::Sql, Language::Xml, Language::Gradle,
];

impl Language {
    pub fn as_str(&self) -> &'static str {
        self.meta().display_name
    }

    pub fn highlight_str(&self) -> &'static str {
        self.meta().highlight_str
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        self.meta().strategy
    }

    pub fn side(&self) -> StackSide {
        self.meta().side
    }

    pub fn from_extension(ext: &str) -> Self {
        let ext_lower = ext.to_lowercase();
        ALL_VARIANTS
            .iter()
            .find(|lang| lang.meta().extensions.contains(&ext_lower.as_str()))
            .copied()
            .unwrap_or(Language::Unknown)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Unknown)
    }

    /// True when the extractor can recover elements from this language
    pub fn is_extractable(&self) -> bool {
        self.strategy() != ExtractionStrategy::None
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s_lower = s.to_lowercase();
        if s_lower.is_empty() || s_lower == "unknown" || s_lower == "text" {
            return Ok(Language::Unknown);
        }
        ALL_VARIANTS
            .iter()
            .find(|lang| lang.meta().aliases.contains(&s_lower.as_str()))
            .copied()
            .ok_or(())
    }
}

/// Syntax highlighting identifier for a path, `None` when unrecognised
pub fn detect_language<P: AsRef<Path>>(path: P) -> Option<&'static str> {
    let lang = Language::from_path(path);
    lang.is_known().then(|| lang.highlight_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("app/services/payment.py"), Language::Python);
        assert_eq!(Language::from_path("src/App.TSX"), Language::Tsx);
        assert_eq!(Language::from_path("build.gradle"), Language::Gradle);
        assert_eq!(Language::from_path("README"), Language::Unknown);
    }

    #[test]
    fn test_strategy() {
        assert_eq!(Language::JavaScript.strategy(), ExtractionStrategy::TypeScript);
        assert_eq!(Language::Go.strategy(), ExtractionStrategy::Regex);
        assert!(!Language::Css.is_extractable());
        assert!(!Language::Unknown.is_extractable());
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("main.rs"), Some("rust"));
        assert_eq!(detect_language("styles.scss"), Some("css"));
        assert_eq!(detect_language("notes.xyz"), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("golang".parse::<Language>(), Ok(Language::Go));
        assert_eq!("C#".parse::<Language>(), Ok(Language::CSharp));
        assert_eq!("cobol".parse::<Language>(), Err(()));
    }

    #[test]
    fn test_metadata_consistency() {
        for lang in ALL_VARIANTS {
            let meta = lang.meta();
            assert!(!meta.extensions.is_empty(), "No extensions for {:?}", lang);
            assert_eq!(Language::from_extension(meta.extensions[0]), *lang);
        }
    }
}
