//! Code Element Extractor
//!
//! Turns each [`SourceFile`] into a flat list of functions, classes and
//! imports plus the call sites observed in the file.
//!
//! - Python and TypeScript/JavaScript go through tree-sitter
//! - Other recognised languages use line-oriented declaration patterns
//! - Markup and data files yield nothing
//!
//! Extraction never fails the run: a file that cannot be processed is
//! logged as an analysis error and contributes zero elements.

mod fallback;
mod python;
mod typescript;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::analyzer::language::{ExtractionStrategy, Language};
use crate::types::{DocGateError, FileExtraction, Parameter, Result, SourceFile};

pub use fallback::RegexExtractor;
pub use python::PythonExtractor;
pub use typescript::TypeScriptExtractor;

/// Language-specific extraction backend
pub trait ElementExtractor: Send + Sync {
    fn extract(&self, file: &SourceFile) -> Result<FileExtraction>;
}

/// Extract one file, absorbing failures into an empty result
pub fn extract(file: &SourceFile) -> FileExtraction {
    match try_extract(file) {
        Ok(extraction) => {
            debug!(
                path = %file.path,
                elements = extraction.elements.len(),
                calls = extraction.calls.len(),
                "Extracted"
            );
            extraction
        }
        Err(e) => {
            warn!(path = %file.path, error = %e, "Skipping file");
            FileExtraction::empty(&file.path)
        }
    }
}

/// Extract every file in parallel; output order matches input order
pub fn extract_all(files: &[SourceFile]) -> Vec<FileExtraction> {
    files.par_iter().map(extract).collect()
}

fn try_extract(file: &SourceFile) -> Result<FileExtraction> {
    if file.content.contains('\0') {
        return Err(DocGateError::analysis(&file.path, "binary content"));
    }

    match file.language.strategy() {
        ExtractionStrategy::Python => PythonExtractor.extract(file),
        ExtractionStrategy::TypeScript => TypeScriptExtractor.extract(file),
        ExtractionStrategy::Regex => RegexExtractor.extract(file),
        ExtractionStrategy::None if file.language == Language::Unknown => Err(
            DocGateError::analysis(&file.path, "unsupported language"),
        ),
        ExtractionStrategy::None => Ok(FileExtraction::empty(&file.path)),
    }
}

// =============================================================================
// tree-sitter Helpers
// =============================================================================

pub(crate) fn create_ts_parser<L: Into<tree_sitter::Language>>(
    language: L,
    path: &str,
) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.into())
        .map_err(|e| DocGateError::analysis(path, format!("grammar unavailable: {}", e)))?;
    Ok(parser)
}

#[inline]
pub(crate) fn node_text<'a>(node: tree_sitter::Node, content: &'a [u8]) -> &'a str {
    node.utf8_text(content).unwrap_or_else(|e| {
        debug!(
            row = node.start_position().row + 1,
            error = %e,
            "UTF-8 extraction failed"
        );
        ""
    })
}

#[inline]
pub(crate) fn node_line(node: tree_sitter::Node) -> u32 {
    node.start_position().row as u32 + 1
}

// =============================================================================
// Parameter Lists
// =============================================================================

/// How a language orders the name and type inside one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamStyle {
    /// `name: Type = default` (Python, TypeScript, Rust, Kotlin, Swift)
    NameColonType,
    /// `name Type` (Go)
    NameSpaceType,
    /// `Type name = default` (Java, C#, C, C++)
    TypeThenName,
    /// `Type $name = default` (PHP)
    DollarName,
    /// `name = default` (Ruby)
    Bare,
}

/// Split `(a, b: Dict[str, int] = {}, *rest)` into normalised parameters.
///
/// Receivers (`self`, `cls`, `this`), splat markers, type annotations and
/// default values are stripped from names.
pub(crate) fn parse_parameter_list(text: &str, style: ParamStyle) -> Vec<Parameter> {
    let inner = text.trim();
    let inner = inner.strip_prefix('(').unwrap_or(inner);
    let inner = inner.strip_suffix(')').unwrap_or(inner);

    split_top_level(inner)
        .into_iter()
        .filter_map(|raw| parse_parameter(raw, style))
        .collect()
}

fn parse_parameter(raw: &str, style: ParamStyle) -> Option<Parameter> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" || raw == "/" || raw == "..." {
        return None;
    }

    let without_default = split_once_top_level(raw, '=').0.trim();

    let (name, type_annotation) = match style {
        ParamStyle::NameColonType => {
            let (name, ty) = split_once_top_level(without_default, ':');
            (name, ty.map(str::trim))
        }
        ParamStyle::NameSpaceType => match without_default.split_once(char::is_whitespace) {
            Some((name, ty)) => (name, Some(ty.trim())),
            None => (without_default, None),
        },
        ParamStyle::TypeThenName | ParamStyle::DollarName => {
            match without_default.rsplit_once(char::is_whitespace) {
                Some((ty, name)) => (name, Some(ty.trim())),
                None => (without_default, None),
            }
        }
        ParamStyle::Bare => (split_once_top_level(without_default, ':').0, None),
    };

    // Destructured patterns keep their source text: `{ title }`
    let name = if name.trim_start().starts_with(['{', '[']) {
        name.trim()
    } else {
        clean_parameter_name(name)
    };
    if name.is_empty() || matches!(name, "self" | "cls" | "this") {
        return None;
    }

    Some(Parameter {
        name: name.to_string(),
        type_annotation: type_annotation
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    })
}

fn clean_parameter_name(name: &str) -> &str {
    // Modifiers come first: `mut x`, `private readonly repo`, `val id`
    let name = name.split_whitespace().last().unwrap_or("");
    let name = name.strip_prefix("...").unwrap_or(name);
    name.trim_start_matches(['*', '&', '$'])
        .trim_end_matches(['?', '!'])
}

/// Split on commas that are not nested inside brackets or strings
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'' | '`') => quote = Some(ch),
            (None, '(' | '[' | '{' | '<') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, '>') if depth > 0 && !text[..idx].ends_with('=') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split at the first `sep` outside brackets
fn split_once_top_level(text: &str, sep: char) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            c if c == sep && depth == 0 => {
                return (&text[..idx], Some(&text[idx + ch.len_utf8()..]));
            }
            _ => {}
        }
    }
    (text, None)
}

/// Strip comment markers from a block of doc-comment lines
pub(crate) fn clean_doc_comment(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches("/**")
                .trim_start_matches("/*")
                .trim_end_matches("*/")
                .trim_start_matches("///")
                .trim_start_matches("//")
                .trim_start_matches('#')
                .trim_start_matches('*')
                .trim()
        })
        .filter(|line| !line.is_empty())
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(params: &[Parameter]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_python_parameters() {
        let params = parse_parameter_list(
            "(self, amount: float, currency: str = \"USD\", *args, **kwargs)",
            ParamStyle::NameColonType,
        );
        assert_eq!(names(&params), vec!["amount", "currency", "args", "kwargs"]);
        assert_eq!(params[0].type_annotation.as_deref(), Some("float"));
    }

    #[test]
    fn test_nested_generic_types() {
        let params = parse_parameter_list(
            "(data: Dict[str, int], cb: Callable[[int, str], None])",
            ParamStyle::NameColonType,
        );
        assert_eq!(names(&params), vec!["data", "cb"]);
        assert_eq!(params[0].type_annotation.as_deref(), Some("Dict[str, int]"));
    }

    #[test]
    fn test_typescript_parameters() {
        let params = parse_parameter_list(
            "(private readonly repo: Repo<User, number>, id?: string, ...rest: number[])",
            ParamStyle::NameColonType,
        );
        assert_eq!(names(&params), vec!["repo", "id", "rest"]);
    }

    #[test]
    fn test_rust_parameters() {
        let params = parse_parameter_list(
            "(&mut self, mut count: usize, map: HashMap<String, Vec<u8>>)",
            ParamStyle::NameColonType,
        );
        assert_eq!(names(&params), vec!["count", "map"]);
    }

    #[test]
    fn test_type_first_parameters() {
        let params = parse_parameter_list(
            "(final Map<String, Integer> totals, int count)",
            ParamStyle::TypeThenName,
        );
        assert_eq!(names(&params), vec!["totals", "count"]);
        assert_eq!(params[1].type_annotation.as_deref(), Some("int"));
    }

    #[test]
    fn test_go_and_php_parameters() {
        let go = parse_parameter_list("(ctx context.Context, id int64)", ParamStyle::NameSpaceType);
        assert_eq!(names(&go), vec!["ctx", "id"]);

        let php = parse_parameter_list("(int $amount, ?string $note = null)", ParamStyle::DollarName);
        assert_eq!(names(&php), vec!["amount", "note"]);
    }

    #[test]
    fn test_empty_parameter_list() {
        assert!(parse_parameter_list("()", ParamStyle::NameColonType).is_empty());
        assert!(parse_parameter_list("(self)", ParamStyle::NameColonType).is_empty());
    }

    #[test]
    fn test_clean_doc_comment() {
        let doc = clean_doc_comment("/**\n * Charges a card.\n * @param amount value\n */");
        assert_eq!(doc.as_deref(), Some("Charges a card.\n@param amount value"));
        assert_eq!(clean_doc_comment("///\n///"), None);
    }

    #[test]
    fn test_binary_content_yields_nothing() {
        let file = SourceFile::new("blob.py", "def f():\0\0");
        let extraction = extract(&file);
        assert!(extraction.elements.is_empty());
        assert_eq!(extraction.path, "blob.py");
    }

    #[test]
    fn test_unknown_language_yields_nothing() {
        let file = SourceFile::new("notes.xyz", "def looks_like_python(): pass");
        assert!(extract(&file).elements.is_empty());
    }

    #[test]
    fn test_extract_all_preserves_order() {
        let files: Vec<SourceFile> = (0..16)
            .map(|i| SourceFile::new(format!("m{i}.py"), format!("def f{i}(x):\n    pass\n")))
            .collect();

        let extractions = extract_all(&files);
        for (i, extraction) in extractions.iter().enumerate() {
            assert_eq!(extraction.path, format!("m{i}.py"));
            assert_eq!(extraction.elements[0].name, format!("f{i}"));
        }
    }
}
