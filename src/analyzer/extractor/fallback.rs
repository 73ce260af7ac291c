//! Line-oriented extraction for languages without a bundled grammar.
//!
//! Each language registers declaration patterns; parameter lists are
//! recovered by scanning balanced parentheses from the declaration, and
//! doc comments are the contiguous comment lines directly above it.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::{ElementExtractor, ParamStyle, clean_doc_comment, parse_parameter_list};
use crate::analyzer::language::Language;
use crate::types::{
    CallSite, CodeElement, DocGateError, ElementKind, FileExtraction, Result, SourceFile,
    Visibility,
};

/// How a language marks private declarations
#[derive(Debug, Clone, Copy)]
enum PrivacyRule {
    /// Public only with an explicit `pub` (Rust)
    PubKeyword,
    /// Exported identifiers start with an uppercase letter (Go)
    Capitalized,
    /// Private when the line carries `private`/`fileprivate`/`internal`
    PrivateKeyword,
    /// Leading underscore
    Underscore,
}

struct LanguageRules {
    functions: Vec<Regex>,
    classes: Vec<Regex>,
    imports: Vec<Regex>,
    comment_prefixes: &'static [&'static str],
    params: ParamStyle,
    privacy: PrivacyRule,
}

/// Compile declaration patterns, dropping (and logging) any the engine rejects
fn patterns(raw: &[&str]) -> Vec<Regex> {
    raw.iter()
        .filter_map(|pattern| {
            Regex::new(pattern)
                .map_err(|e| warn!(pattern, error = %e, "Invalid declaration pattern"))
                .ok()
        })
        .collect()
}

static RUST_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?fn\s+([A-Za-z_]\w*)",
    ]),
    classes: patterns(&[
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+([A-Za-z_]\w*)",
    ]),
    imports: patterns(&[
        r"^\s*(?:pub\s+)?use\s+([\w:]+)",
        r"^\s*(?:pub\s+)?mod\s+([A-Za-z_]\w*)\s*;",
    ]),
    comment_prefixes: &["///", "//!"],
    params: ParamStyle::NameColonType,
    privacy: PrivacyRule::PubKeyword,
});

static GO_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[r"^func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)"]),
    classes: patterns(&[r"^type\s+([A-Za-z_]\w*)\s+(?:struct|interface)\b"]),
    imports: patterns(&[
        r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#,
        r#"^\s+(?:[\w.]+\s+)?"([^"]+)"\s*$"#,
    ]),
    comment_prefixes: &["//"],
    params: ParamStyle::NameSpaceType,
    privacy: PrivacyRule::Capitalized,
});

static JAVA_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[
        r"^\s*(?:@\w+\s+)*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default)\s+)+(?:<[^>]+>\s+)?[\w<>\[\],.?\s]+?\s+([A-Za-z_]\w*)\s*\(",
    ]),
    classes: patterns(&[
        r"^\s*(?:(?:public|private|protected|static|final|abstract|sealed)\s+)*(?:class|interface|enum|record)\s+([A-Za-z_]\w*)",
    ]),
    imports: patterns(&[r"^\s*import\s+(?:static\s+)?([\w.]+)"]),
    comment_prefixes: &["/**", "*", "*/", "//"],
    params: ParamStyle::TypeThenName,
    privacy: PrivacyRule::PrivateKeyword,
});

static CSHARP_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[
        r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static|virtual|override|abstract|async|sealed)\s+)+[\w<>\[\],.?\s]+?\s+([A-Za-z_]\w*)\s*\(",
    ]),
    classes: patterns(&[
        r"^\s*(?:(?:public|private|protected|internal|static|sealed|abstract|partial)\s+)*(?:class|interface|enum|struct|record)\s+([A-Za-z_]\w*)",
    ]),
    imports: patterns(&[r"^\s*using\s+([\w.]+)\s*;"]),
    comment_prefixes: &["///", "//"],
    params: ParamStyle::TypeThenName,
    privacy: PrivacyRule::PrivateKeyword,
});

static KOTLIN_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[
        r"^\s*(?:(?:public|private|protected|internal|override|open|suspend|inline|operator|abstract)\s+)*fun\s+(?:<[^>]+>\s*)?(?:[\w.]+\.)?([A-Za-z_]\w*)\s*\(",
    ]),
    classes: patterns(&[
        r"^\s*(?:(?:public|private|protected|internal|open|abstract|sealed|data|enum|inner)\s+)*(?:class|interface|object)\s+([A-Za-z_]\w*)",
    ]),
    imports: patterns(&[r"^\s*import\s+([\w.]+)"]),
    comment_prefixes: &["/**", "*", "*/", "//"],
    params: ParamStyle::NameColonType,
    privacy: PrivacyRule::PrivateKeyword,
});

static SWIFT_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[
        r"^\s*(?:@\w+\s+)*(?:(?:public|private|fileprivate|internal|open|static|class|override|mutating)\s+)*func\s+([A-Za-z_]\w*)",
    ]),
    classes: patterns(&[
        r"^\s*(?:(?:public|private|fileprivate|internal|open|final)\s+)*(?:class|struct|protocol|enum|actor)\s+([A-Za-z_]\w*)",
    ]),
    imports: patterns(&[r"^\s*import\s+(\w+)"]),
    comment_prefixes: &["///", "//"],
    params: ParamStyle::NameColonType,
    privacy: PrivacyRule::PrivateKeyword,
});

static PHP_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[
        r"^\s*(?:(?:public|private|protected|static|final|abstract)\s+)*function\s+&?([A-Za-z_]\w*)\s*\(",
    ]),
    classes: patterns(&[
        r"^\s*(?:(?:abstract|final|readonly)\s+)*(?:class|interface|trait|enum)\s+([A-Za-z_]\w*)",
    ]),
    imports: patterns(&[
        r"^\s*use\s+([\w\\]+)",
        r#"^\s*(?:require|include)(?:_once)?\s*\(?\s*['"]([^'"]+)['"]"#,
    ]),
    comment_prefixes: &["/**", "*", "*/", "//", "#"],
    params: ParamStyle::DollarName,
    privacy: PrivacyRule::PrivateKeyword,
});

static RUBY_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[r"^\s*def\s+(?:self\.)?([A-Za-z_]\w*[?!=]?)"]),
    classes: patterns(&[r"^\s*(?:class|module)\s+([A-Z]\w*)(?:\s*<\s*([\w:]+))?"]),
    imports: patterns(&[r#"^\s*require(?:_relative)?\s*\(?\s*['"]([^'"]+)['"]"#]),
    comment_prefixes: &["#"],
    params: ParamStyle::Bare,
    privacy: PrivacyRule::Underscore,
});

static C_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    // Definitions start at column 0: `static int parse_header(const char *buf, size_t len)`
    functions: patterns(&[
        r"^(?:static\s+|inline\s+|extern\s+|virtual\s+|const\s+|unsigned\s+|struct\s+)*[A-Za-z_][\w:<>]*[\s*&]+\**([A-Za-z_][\w:~]*)\s*\([^;]*$",
    ]),
    classes: patterns(&[r"^\s*(?:typedef\s+)?(?:class|struct)\s+([A-Za-z_]\w*)\s*(?:[:{]|$)"]),
    imports: patterns(&[r#"^\s*#\s*include\s+"([^"]+)""#]),
    comment_prefixes: &["/**", "*", "*/", "///", "//"],
    params: ParamStyle::TypeThenName,
    privacy: PrivacyRule::Underscore,
});

static BASH_RULES: LazyLock<LanguageRules> = LazyLock::new(|| LanguageRules {
    functions: patterns(&[
        r"^\s*function\s+([A-Za-z_][\w-]*)",
        r"^\s*([A-Za-z_][\w-]*)\s*\(\)\s*\{?",
    ]),
    classes: Vec::new(),
    imports: patterns(&[r#"^\s*(?:source|\.)\s+['"]?([^'"\s]+)"#]),
    comment_prefixes: &["#"],
    params: ParamStyle::Bare,
    privacy: PrivacyRule::Underscore,
});

static LANGUAGE_RULES: LazyLock<HashMap<Language, &'static LanguageRules>> =
    LazyLock::new(|| {
        let mut rules: HashMap<Language, &'static LanguageRules> = HashMap::new();
        rules.insert(Language::Rust, &RUST_RULES);
        rules.insert(Language::Go, &GO_RULES);
        rules.insert(Language::Java, &JAVA_RULES);
        rules.insert(Language::CSharp, &CSHARP_RULES);
        rules.insert(Language::Kotlin, &KOTLIN_RULES);
        rules.insert(Language::Swift, &SWIFT_RULES);
        rules.insert(Language::Php, &PHP_RULES);
        rules.insert(Language::Ruby, &RUBY_RULES);
        rules.insert(Language::C, &C_RULES);
        rules.insert(Language::Cpp, &C_RULES);
        rules.insert(Language::Bash, &BASH_RULES);
        rules
    });

static CALL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    patterns(&[r"(?:\bnew\s+([A-Z]\w*)|\b([A-Za-z_]\w*)\s*!?\()"])
        .into_iter()
        .next()
});

/// Words followed by `(` that are control flow or declarations, not calls
const NON_CALL_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "match", "return", "catch", "fn", "func", "fun", "def",
    "function", "import", "sizeof", "typeof", "elif", "when", "unless", "until", "defined", "super", "self",
    "this", "assert", "println", "print", "format", "vec", "Some", "Ok", "Err",
];

pub struct RegexExtractor;

impl ElementExtractor for RegexExtractor {
    fn extract(&self, file: &SourceFile) -> Result<FileExtraction> {
        let rules = LANGUAGE_RULES.get(&file.language).copied().ok_or_else(|| {
            DocGateError::analysis(
                &file.path,
                format!("no declaration patterns for {}", file.language),
            )
        })?;

        let lines = SourceLines::new(&file.content);
        let mut result = FileExtraction::empty(&file.path);

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx as u32 + 1;

            if let Some(specifier) = first_capture(&rules.imports, line) {
                result
                    .elements
                    .push(CodeElement::import(specifier, &file.path).with_line(line_no));
                continue;
            }

            if let Some(caps) = rules.classes.iter().find_map(|r| r.captures(line))
                && let Some(name) = caps.get(1)
            {
                let mut class = CodeElement::class(name.as_str(), &file.path)
                    .with_line(line_no)
                    .with_visibility(visibility(rules.privacy, name.as_str(), line));
                class.bases = caps
                    .get(2)
                    .map(|b| vec![b.as_str().rsplit("::").next().unwrap_or(b.as_str()).to_string()])
                    .unwrap_or_default();
                class.doc = lines.doc_above(idx, rules.comment_prefixes);
                result.elements.push(class);
                continue;
            }

            if let Some(caps) = rules.functions.iter().find_map(|r| r.captures(line))
                && let Some(name) = caps.get(1)
                && !NON_CALL_WORDS.contains(&name.as_str())
            {
                let offset = lines.offset(idx) + name.end();
                let mut function = qualified_function(name.as_str(), &file.path)
                    .with_line(line_no)
                    .with_visibility(visibility(rules.privacy, name.as_str(), line));
                if let Some(params) = balanced_parens(&file.content, offset) {
                    function.parameters = parse_parameter_list(params, rules.params);
                }
                function.doc = lines.doc_above(idx, rules.comment_prefixes);
                result.elements.push(function);
                continue;
            }

            if !is_comment(line, rules.comment_prefixes) {
                collect_calls(line, line_no, &mut result.calls);
            }
        }

        // Ruby closes scopes with `end`, so owners can be tracked without a grammar
        if file.language == Language::Ruby {
            assign_ruby_owners(&mut result.elements, &lines);
        }

        Ok(result)
    }
}

fn first_capture(patterns: &[Regex], line: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|r| r.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn visibility(rule: PrivacyRule, name: &str, line: &str) -> Visibility {
    let private = match rule {
        PrivacyRule::PubKeyword => !line.trim_start().starts_with("pub"),
        PrivacyRule::Capitalized => !name.starts_with(|c: char| c.is_ascii_uppercase()),
        PrivacyRule::PrivateKeyword => line
            .split_whitespace()
            .any(|w| matches!(w, "private" | "fileprivate" | "internal")),
        PrivacyRule::Underscore => name.starts_with('_'),
    };
    if private {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn is_comment(line: &str, prefixes: &[&str]) -> bool {
    let trimmed = line.trim_start();
    prefixes.iter().any(|p| trimmed.starts_with(p))
}

fn collect_calls(line: &str, line_no: u32, calls: &mut Vec<CallSite>) {
    let Some(pattern) = CALL_PATTERN.as_ref() else {
        return;
    };
    for caps in pattern.captures_iter(line) {
        let Some(callee) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        if !NON_CALL_WORDS.contains(&callee.as_str()) {
            calls.push(CallSite {
                callee: callee.as_str().to_string(),
                line: line_no,
            });
        }
    }
}

/// `Foo::bar` (C++ out-of-line method) becomes `bar` owned by `Foo`
fn qualified_function(name: &str, path: &str) -> CodeElement {
    match name.rsplit_once("::") {
        Some((owner, method)) => CodeElement::function(method, path).with_owner(owner),
        None => CodeElement::function(name, path),
    }
}

/// Parenthesised list following a declaration name, parentheses included
fn balanced_parens(content: &str, from: usize) -> Option<&str> {
    let rest = content.get(from..)?;
    let open = rest.find('(')?;
    // Only generics may sit between the name and the list
    if rest[..open].contains(['{', ';', '\n']) {
        return None;
    }

    let mut depth = 0usize;
    for (idx, ch) in rest[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&rest[open..open + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Track `class`/`module` ... `end` nesting to qualify Ruby methods
fn assign_ruby_owners(elements: &mut [CodeElement], lines: &SourceLines) {
    let mut owners: Vec<(String, usize)> = Vec::new();
    let class_lines: HashMap<u32, String> = elements
        .iter()
        .filter(|e| e.kind == ElementKind::Class)
        .map(|e| (e.line, e.name.clone()))
        .collect();

    let mut owner_by_line: HashMap<u32, String> = HashMap::new();
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx as u32 + 1;
        let indent = line.len() - line.trim_start().len();
        if let Some(name) = class_lines.get(&line_no) {
            owners.push((name.clone(), indent));
            continue;
        }
        if line.trim() == "end"
            && let Some((_, owner_indent)) = owners.last()
            && *owner_indent == indent
        {
            owners.pop();
            continue;
        }
        if let Some((owner, _)) = owners.last() {
            owner_by_line.insert(line_no, owner.clone());
        }
    }

    for element in elements
        .iter_mut()
        .filter(|e| e.kind == ElementKind::Function)
    {
        if let Some(owner) = owner_by_line.get(&element.line) {
            element.qualified_name = format!("{}.{}", owner, element.name);
        }
    }
}

/// Line view over file content with byte offsets
struct SourceLines<'a> {
    lines: Vec<&'a str>,
    offsets: Vec<usize>,
}

impl<'a> SourceLines<'a> {
    fn new(content: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut offsets = Vec::new();
        let mut start = 0;
        for line in content.split_inclusive('\n') {
            offsets.push(start);
            lines.push(line.trim_end_matches(['\n', '\r']));
            start += line.len();
        }
        Self { lines, offsets }
    }

    fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.lines.iter().copied()
    }

    fn offset(&self, idx: usize) -> usize {
        self.offsets.get(idx).copied().unwrap_or(0)
    }

    /// Contiguous comment lines immediately above line `idx`
    fn doc_above(&self, idx: usize, prefixes: &[&str]) -> Option<String> {
        let mut start = idx;
        while start > 0 {
            let prev = self.lines[start - 1].trim_start();
            // Attributes and annotations sit between docs and the declaration
            let is_attribute = prev.starts_with("#[") || prev.starts_with('@');
            if is_attribute || (is_comment(prev, prefixes) && !prev.starts_with("#[")) {
                start -= 1;
            } else {
                break;
            }
        }

        let block: Vec<&str> = self.lines[start..idx]
            .iter()
            .copied()
            .filter(|l| {
                let t = l.trim_start();
                !(t.starts_with("#[") || t.starts_with('@'))
            })
            .collect();
        if block.is_empty() {
            return None;
        }
        clean_doc_comment(&block.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(path: &str, content: &str) -> FileExtraction {
        RegexExtractor
            .extract(&SourceFile::new(path, content))
            .unwrap()
    }

    fn find<'a>(result: &'a FileExtraction, name: &str) -> &'a CodeElement {
        result
            .elements
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("{name} not extracted"))
    }

    #[test]
    fn test_all_patterns_compile() {
        for (language, rules) in LANGUAGE_RULES.iter() {
            assert!(!rules.functions.is_empty(), "{language}: functions");
            assert!(!rules.imports.is_empty(), "{language}: imports");
        }
        assert!(CALL_PATTERN.is_some());
    }

    #[test]
    fn test_rust_declarations() {
        let result = extract(
            "src/billing/invoice.rs",
            r#"use crate::models::customer;

/// Builds an invoice.
#[must_use]
pub fn build_invoice(&self, customer: &Customer, lines: Vec<Line>) -> Invoice {
    let total = compute_total(&lines);
    Invoice::new(customer, total)
}

fn compute_total(lines: &[Line]) -> u64 { 0 }

pub struct Invoice {
    total: u64,
}
"#,
        );

        let build = find(&result, "build_invoice");
        assert_eq!(build.parameter_names(), vec!["customer", "lines"]);
        assert_eq!(build.doc.as_deref(), Some("Builds an invoice."));
        assert!(build.is_public());
        assert!(!find(&result, "compute_total").is_public());
        assert_eq!(find(&result, "Invoice").kind, ElementKind::Class);

        let imports: Vec<_> = result.imports().map(|e| e.name.as_str()).collect();
        assert_eq!(imports, vec!["crate::models::customer"]);
        assert!(result.calls.iter().any(|c| c.callee == "compute_total"));
    }

    #[test]
    fn test_go_declarations() {
        let result = extract(
            "internal/store/users.go",
            r#"package store

import (
	"context"
	"example.com/app/internal/models"
)

// FindUser loads a user by id.
func (s *Store) FindUser(ctx context.Context, id int64) (*models.User, error) {
	return s.query(ctx, id)
}

func helper() {}

type Store struct {}
"#,
        );

        let find_user = find(&result, "FindUser");
        assert_eq!(find_user.parameter_names(), vec!["ctx", "id"]);
        assert_eq!(find_user.doc.as_deref(), Some("FindUser loads a user by id."));
        assert!(!find(&result, "helper").is_public());

        let imports: Vec<_> = result.imports().map(|e| e.name.as_str()).collect();
        assert_eq!(imports, vec!["context", "example.com/app/internal/models"]);
    }

    #[test]
    fn test_java_declarations() {
        let result = extract(
            "src/main/java/com/shop/OrderController.java",
            r#"package com.shop;

import com.shop.service.OrderService;

/**
 * REST entry point for orders.
 */
public class OrderController extends BaseController {
    private final OrderService service;

    public Order placeOrder(String customerId, List<Item> items) {
        return service.place(customerId, items);
    }

    private void log(String message) {}
}
"#,
        );

        let controller = find(&result, "OrderController");
        assert_eq!(controller.doc.as_deref(), Some("REST entry point for orders."));

        let place = find(&result, "placeOrder");
        assert_eq!(place.parameter_names(), vec!["customerId", "items"]);
        assert!(!find(&result, "log").is_public());

        let imports: Vec<_> = result.imports().map(|e| e.name.as_str()).collect();
        assert_eq!(imports, vec!["com.shop.service.OrderService"]);
    }

    #[test]
    fn test_ruby_methods_are_qualified() {
        let result = extract(
            "app/models/user.rb",
            "require 'app/models/base'\n\nclass User < ApplicationRecord\n  def full_name(separator = ' ')\n    first + separator + last\n  end\nend\n\ndef top_level\nend\n",
        );

        let user = find(&result, "User");
        assert_eq!(user.bases, vec!["ApplicationRecord"]);

        let full_name = find(&result, "full_name");
        assert_eq!(full_name.qualified_name, "User.full_name");
        assert_eq!(full_name.parameter_names(), vec!["separator"]);
        assert_eq!(find(&result, "top_level").qualified_name, "top_level");
    }

    #[test]
    fn test_balanced_parens_spans_lines() {
        let content = "fn long(\n    a: u8,\n    b: (u8, u8),\n) {}";
        assert_eq!(
            balanced_parens(content, 7),
            Some("(\n    a: u8,\n    b: (u8, u8),\n)")
        );
    }
}
