//! Documentation Validator
//!
//! Cross-references claims made by a documentation draft against the code
//! elements extracted from source:
//!
//! - `name(params)` markers in headings and inline code spans must name an
//!   existing element with the same parameter list
//! - every public element must be mentioned somewhere in the text
//! - confidently detected architecture patterns should be named
//! - `X uses Y` style claims need a supporting dependency edge
//!
//! Findings are data, never errors: validation always completes and only
//! appends to the returned issue list.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::analyzer::extractor::{ParamStyle, parse_parameter_list};
use crate::analyzer::{ArchitecturePattern, DependencyGraph, ProjectAnalysis};
use crate::config::AnalysisConfig;
use crate::constants::patterns::DOCUMENTATION_THRESHOLD;
use crate::types::{CodeElement, ElementKind, ValidationIssue, compile_regex};

/// `## name(params)` or ``### `Owner.name(params)` `` at the start of a line
static HEADING_CLAIM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_regex(r"(?m)^#{1,6}[ \t]+`?([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)[ \t]*\(([^)\n]*)\)")
});

/// `` `name(params)` `` inline code span
static INLINE_CLAIM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_regex(r"`([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)[ \t]*\(([^)`\n]*)\)`")
});

static IDENTIFIER: LazyLock<Option<Regex>> = LazyLock::new(|| compile_regex(r"[A-Za-z_$][\w$]*"));

/// `X uses Y`, `` `X` extends `Y` ``, `X depends on Y`
static RELATIONSHIP_CLAIM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_regex(
        r"(?i)`?\b([A-Za-z_]\w*)`?\s+(imports|uses|calls|extends|implements|inherits from|depends on)\s+(?:the\s+)?`?([A-Za-z_]\w*)`?",
    )
});

/// Library and language calls that documentation mentions without them being project code
const EXTERNAL_CALLS: &[&str] = &[
    "print", "len", "range", "open", "super", "isinstance", "str", "int", "dict", "list",
    "require", "import", "fetch", "setTimeout", "setInterval", "useState", "useEffect",
    "console.log", "JSON.parse", "JSON.stringify", "println", "format", "main",
];

/// Members documentation never needs to mention
const IMPLICIT_MEMBERS: &[&str] = &["constructor"];

/// Which supplemental checks run besides claims and coverage
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions {
    pub check_patterns: bool,
    pub check_relationships: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_patterns: true,
            check_relationships: true,
        }
    }
}

impl From<&AnalysisConfig> for ValidationOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            check_patterns: config.check_patterns,
            check_relationships: config.check_relationships,
        }
    }
}

/// A `name(params)` reference found in documentation
#[derive(Debug, Clone, PartialEq, Eq)]
struct Claim {
    /// As written, possibly `Owner.name`
    path: String,
    params: Vec<String>,
}

impl Claim {
    fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    fn signature(&self) -> String {
        format!("{}({})", self.path, self.params.join(", "))
    }
}

pub struct DocumentationValidator<'a> {
    elements: Vec<&'a CodeElement>,
    by_name: HashMap<&'a str, Vec<&'a CodeElement>>,
    by_qualified: HashMap<&'a str, Vec<&'a CodeElement>>,
    by_lower: HashMap<String, Vec<&'a CodeElement>>,
    graph: Option<&'a DependencyGraph>,
    patterns: &'a [ArchitecturePattern],
    options: ValidationOptions,
}

impl<'a> DocumentationValidator<'a> {
    /// Validator over `known_elements`; imports are ignored
    pub fn new(known_elements: impl IntoIterator<Item = &'a CodeElement>) -> Self {
        let elements: Vec<&CodeElement> = known_elements
            .into_iter()
            .filter(|e| e.kind != ElementKind::Import)
            .collect();

        let mut by_name: HashMap<&str, Vec<&CodeElement>> = HashMap::new();
        let mut by_qualified: HashMap<&str, Vec<&CodeElement>> = HashMap::new();
        let mut by_lower: HashMap<String, Vec<&CodeElement>> = HashMap::new();
        for &element in &elements {
            by_name.entry(element.name.as_str()).or_default().push(element);
            by_qualified
                .entry(element.qualified_name.as_str())
                .or_default()
                .push(element);
            by_lower
                .entry(element.name.to_lowercase())
                .or_default()
                .push(element);
        }

        Self {
            elements,
            by_name,
            by_qualified,
            by_lower,
            graph: None,
            patterns: &[],
            options: ValidationOptions::default(),
        }
    }

    /// Validator over every element of an analysed project, with graph and patterns attached
    pub fn for_project(analysis: &'a ProjectAnalysis) -> Self {
        Self::new(analysis.extractions.iter().flat_map(|e| e.definitions()))
            .with_graph(&analysis.graph)
            .with_patterns(&analysis.patterns)
    }

    pub fn with_graph(mut self, graph: &'a DependencyGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_patterns(mut self, patterns: &'a [ArchitecturePattern]) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every check; issues come out in a stable order
    pub fn validate(&self, documentation: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for claim in extract_claims(documentation) {
            self.check_claim(&claim, &mut issues);
        }
        self.check_coverage(documentation, &mut issues);

        if self.options.check_patterns {
            self.check_patterns(documentation, &mut issues);
        }
        if self.options.check_relationships {
            self.check_relationships(documentation, &mut issues);
        }

        debug!(
            elements = self.elements.len(),
            issues = issues.len(),
            "Validated documentation"
        );
        issues
    }

    fn check_claim(&self, claim: &Claim, issues: &mut Vec<ValidationIssue>) {
        if let Some(candidates) = self.exact_candidates(claim) {
            if let Some(issue) = signature_issue(claim, candidates) {
                issues.push(issue);
            }
            return;
        }

        let Some(candidates) = self.by_lower.get(&claim.name().to_lowercase()) else {
            // Only names the project does not define fall back to the library allowlist
            if is_external_call(&claim.path) {
                return;
            }
            issues.push(
                ValidationIssue::error(claim.name(), "element does not exist in source")
                    .with_suggestion(format!(
                        "Remove the reference to `{}` or document an element that exists",
                        claim.signature()
                    )),
            );
            return;
        };

        let actual = &candidates[0].name;
        issues.push(
            ValidationIssue::warning(
                claim.name(),
                format!(
                    "naming inconsistency: documented as `{}`, source spells it `{}`",
                    claim.name(),
                    actual
                ),
            )
            .with_suggestion(format!("Use consistent casing: `{}`", actual)),
        );
        if let Some(issue) = signature_issue(claim, candidates) {
            issues.push(issue);
        }
    }

    /// Exact-case candidates, preferring the qualified `Owner.name` form
    fn exact_candidates(&self, claim: &Claim) -> Option<&Vec<&'a CodeElement>> {
        if claim.path.contains('.')
            && let Some(found) = self.by_qualified.get(claim.path.as_str())
        {
            return Some(found);
        }
        self.by_name.get(claim.name())
    }

    fn check_coverage(&self, documentation: &str, issues: &mut Vec<ValidationIssue>) {
        let mentioned: HashSet<&str> = IDENTIFIER
            .iter()
            .flat_map(|re| re.find_iter(documentation))
            .map(|m| m.as_str())
            .collect();

        for element in &self.elements {
            if !element.is_public()
                || IMPLICIT_MEMBERS.contains(&element.name.as_str())
                || mentioned.contains(element.name.as_str())
            {
                continue;
            }
            issues.push(
                ValidationIssue::missing(
                    element.qualified_name.as_str(),
                    format!(
                        "undocumented public element: {} `{}` in {}",
                        element.kind,
                        element.signature(),
                        element.file
                    ),
                )
                .with_suggestion(format!("Document {} `{}`", element.kind, element.name)),
            );
        }
    }

    fn check_patterns(&self, documentation: &str, issues: &mut Vec<ValidationIssue>) {
        let lower = documentation.to_lowercase();
        for pattern in self.patterns {
            if pattern.confidence <= DOCUMENTATION_THRESHOLD {
                continue;
            }
            if pattern.kind.keywords().iter().any(|k| mentions(&lower, k)) {
                continue;
            }
            issues.push(
                ValidationIssue::warning(
                    pattern.kind.display_name(),
                    format!(
                        "architecture pattern not documented (confidence {:.2})",
                        pattern.confidence
                    ),
                )
                .with_suggestion(format!(
                    "Describe the {} in the architecture section: {}",
                    pattern.kind.display_name(),
                    pattern.description
                )),
            );
        }
    }

    fn check_relationships(&self, documentation: &str, issues: &mut Vec<ValidationIssue>) {
        let (Some(graph), Some(pattern)) = (self.graph, RELATIONSHIP_CLAIM.as_ref()) else {
            return;
        };

        let mut seen = HashSet::new();
        for caps in pattern.captures_iter(documentation) {
            let (Some(source), Some(verb), Some(target)) = (caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            let (source, target) = (source.as_str(), target.as_str());
            if !seen.insert((source, target)) {
                continue;
            }

            let (Some(source_file), Some(target_file)) =
                (self.defining_file(source), self.defining_file(target))
            else {
                continue;
            };
            if source_file == target_file
                || graph.has_edge(source_file, target_file)
                || graph.has_edge(target_file, source_file)
            {
                continue;
            }

            issues.push(
                ValidationIssue::warning(
                    source,
                    format!(
                        "unsupported relationship claim: `{} {} {}` but {} and {} are not linked",
                        source,
                        verb.as_str().to_lowercase(),
                        target,
                        source_file,
                        target_file
                    ),
                )
                .with_suggestion("Remove the claim or describe the actual dependency"),
            );
        }
    }

    /// File defining `name`, when exactly one file does
    fn defining_file(&self, name: &str) -> Option<&'a str> {
        let files: BTreeSet<&str> = self
            .by_name
            .get(name)?
            .iter()
            .map(|e| e.file.as_str())
            .collect();
        match files.len() {
            1 => files.into_iter().next(),
            _ => None,
        }
    }
}

/// Validate `documentation` against `known_elements` with claim and coverage checks only
pub fn validate(documentation: &str, known_elements: &[CodeElement]) -> Vec<ValidationIssue> {
    DocumentationValidator::new(known_elements).validate(documentation)
}

/// Distinct claims in document order
fn extract_claims(documentation: &str) -> Vec<Claim> {
    let mut found: Vec<(usize, Claim)> = HEADING_CLAIM
        .iter()
        .chain(INLINE_CLAIM.iter())
        .flat_map(|re| re.captures_iter(documentation))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let path = caps.get(1)?.as_str().to_string();
            let params = parse_parameter_list(caps.get(2)?.as_str(), ParamStyle::NameColonType)
                .into_iter()
                .map(|p| p.name)
                .collect();
            Some((whole.start(), Claim { path, params }))
        })
        .collect();
    found.sort_by_key(|(start, _)| *start);

    let mut claims: Vec<Claim> = Vec::new();
    for (_, claim) in found {
        if !claims.contains(&claim) {
            claims.push(claim);
        }
    }
    claims
}

/// `phrase` occurs in `text` with no word character on either side
fn mentions(text: &str, phrase: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(phrase).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + phrase.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

fn is_external_call(path: &str) -> bool {
    path.chars().count() <= 2 || EXTERNAL_CALLS.contains(&path)
}

/// `None` when a class is claimed or any candidate matches the documented parameters
fn signature_issue(claim: &Claim, candidates: &[&CodeElement]) -> Option<ValidationIssue> {
    if candidates.iter().any(|c| c.kind == ElementKind::Class) {
        return None;
    }

    let documented: Vec<&str> = claim.params.iter().map(String::as_str).collect();
    if candidates.iter().any(|c| same_parameters(&documented, c)) {
        return None;
    }

    let actual = candidates[0];
    let actual_params = actual.parameter_names();
    let source_signature = format!("{}({})", claim.path, actual_params.join(", "));

    let extra: Vec<&str> = documented
        .iter()
        .filter(|p| !actual_params.contains(*p))
        .copied()
        .collect();
    let absent: Vec<&str> = actual_params
        .iter()
        .filter(|p| !documented.contains(*p))
        .copied()
        .collect();

    let mut description = if documented.len() != actual_params.len() {
        format!(
            "signature mismatch: parameter count differs ({} documented, {} in source); documented `{}`, source `{}`",
            documented.len(),
            actual_params.len(),
            claim.signature(),
            source_signature
        )
    } else {
        format!(
            "signature mismatch: parameter names differ; documented `{}`, source `{}`",
            claim.signature(),
            source_signature
        )
    };
    if !extra.is_empty() {
        description.push_str(&format!("; extra parameter: {}", extra.join(", ")));
    }
    if !absent.is_empty() {
        description.push_str(&format!("; missing parameter: {}", absent.join(", ")));
    }

    Some(
        ValidationIssue::error(claim.name(), description)
            .with_suggestion(format!("Document it as `{}`", source_signature)),
    )
}

/// Same count and same name set
fn same_parameters(documented: &[&str], element: &CodeElement) -> bool {
    let actual = element.parameter_names();
    if documented.len() != actual.len() {
        return false;
    }
    let documented: BTreeSet<&str> = documented.iter().copied().collect();
    let actual: BTreeSet<&str> = actual.into_iter().collect();
    documented == actual
}
