//! Dependency Graph Builder
//!
//! Aggregates per-file extractions into a directed, weighted file graph.
//! Edges are keyed by `(source, target, kind)`: a repeated reference bumps
//! the weight of the existing edge instead of adding a parallel one.
//!
//! Resolution is best-effort. Imports are matched against project paths,
//! calls against a project-wide symbol table, and base classes against
//! class definitions. Anything that does not resolve to exactly one other
//! file is dropped.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ElementKind, FileExtraction};

// =============================================================================
// Edges
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Import,
    Call,
    Inherit,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Import => write!(f, "import"),
            EdgeKind::Call => write!(f, "call"),
            EdgeKind::Inherit => write!(f, "inherit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeData {
    kind: EdgeKind,
    weight: u32,
}

/// Flattened view of one aggregated edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub weight: u32,
    pub kind: EdgeKind,
}

// =============================================================================
// Graph
// =============================================================================

/// File-level dependency graph
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, EdgeData>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, returning the existing index when already present
    pub fn add_node(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.index.insert(path.to_string(), idx);
        idx
    }

    /// Record one reference from `source` to `target`.
    ///
    /// Returns `false` for self-references, which are not edges.
    pub fn add_reference(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        if source == target {
            return false;
        }
        let from = self.add_node(source);
        let to = self.add_node(target);

        let existing = self
            .graph
            .edges_connecting(from, to)
            .find(|e| e.weight().kind == kind)
            .map(|e| e.id());

        match existing {
            Some(edge) => {
                if let Some(data) = self.graph.edge_weight_mut(edge) {
                    data.weight += 1;
                }
            }
            None => {
                self.graph.add_edge(from, to, EdgeData { kind, weight: 1 });
            }
        }
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Node identifiers sorted ascending
    pub fn nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = self.graph.node_weights().map(String::as_str).collect();
        nodes.sort_unstable();
        nodes
    }

    /// All edges, sorted by source, target, kind
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edge_references()
            .map(|e| DependencyEdge {
                source: self.graph[e.source()].clone(),
                target: self.graph[e.target()].clone(),
                weight: e.weight().weight,
                kind: e.weight().kind,
            })
            .collect();
        edges.sort_by(|a, b| {
            (&a.source, &a.target, a.kind).cmp(&(&b.source, &b.target, b.kind))
        });
        edges
    }

    pub fn edge_weight(&self, source: &str, target: &str, kind: EdgeKind) -> Option<u32> {
        let from = *self.index.get(source)?;
        let to = *self.index.get(target)?;
        self.graph
            .edges_connecting(from, to)
            .find(|e| e.weight().kind == kind)
            .map(|e| e.weight().weight)
    }

    /// True when any edge of any kind runs from `source` to `target`
    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    /// Distinct files referencing `path`
    pub fn dependents(&self, path: &str) -> BTreeSet<&str> {
        self.neighbors(path, Direction::Incoming)
    }

    /// Distinct files referenced by `path`
    pub fn dependencies(&self, path: &str) -> BTreeSet<&str> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Sum of edge weights in one direction
    pub fn total_weight(&self, path: &str, direction: Direction) -> u32 {
        self.index.get(path).map_or(0, |&idx| {
            self.graph
                .edges_directed(idx, direction)
                .map(|e| e.weight().weight)
                .sum()
        })
    }

    fn neighbors(&self, path: &str, direction: Direction) -> BTreeSet<&str> {
        self.index.get(path).map_or_else(BTreeSet::new, |&idx| {
            self.graph
                .neighbors_directed(idx, direction)
                .map(|n| self.graph[n].as_str())
                .collect()
        })
    }

    /// Dependency cycles: strongly connected components spanning more than one file.
    ///
    /// Each cycle is sorted, and the list is sorted by its first member.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut members: Vec<String> =
                    component.into_iter().map(|n| self.graph[n].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct GraphBuilder;

impl GraphBuilder {
    /// Build the file graph from a complete set of extractions.
    ///
    /// The result does not depend on the order of `extractions`.
    pub fn build(extractions: &[FileExtraction]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        let mut paths: Vec<&str> = extractions.iter().map(|e| e.path.as_str()).collect();
        paths.sort_unstable();
        for path in &paths {
            graph.add_node(path);
        }

        let resolver = ImportResolver::new(&paths);
        let symbols = SymbolTable::new(extractions);

        let mut ordered: Vec<&FileExtraction> = extractions.iter().collect();
        ordered.sort_by(|a, b| a.path.cmp(&b.path));

        for extraction in ordered {
            let importer = extraction.path.as_str();

            for import in extraction.imports() {
                if let Some(target) = resolver.resolve(importer, &import.name) {
                    graph.add_reference(importer, target, EdgeKind::Import);
                }
            }

            for call in &extraction.calls {
                if let Some(target) = symbols.resolve_call(importer, &call.callee) {
                    graph.add_reference(importer, target, EdgeKind::Call);
                }
            }

            for class in extraction
                .elements
                .iter()
                .filter(|e| e.kind == ElementKind::Class)
            {
                for base in &class.bases {
                    if let Some(target) = symbols.resolve_class(importer, base) {
                        graph.add_reference(importer, target, EdgeKind::Inherit);
                    }
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Dependency graph built"
        );
        graph
    }
}

// =============================================================================
// Symbol Resolution
// =============================================================================

#[derive(Default)]
struct SymbolTable<'a> {
    /// Function and class names -> defining files
    callables: HashMap<&'a str, BTreeSet<&'a str>>,
    classes: HashMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> SymbolTable<'a> {
    fn new(extractions: &'a [FileExtraction]) -> Self {
        let mut table = Self::default();
        for extraction in extractions {
            for element in extraction.definitions() {
                let file = extraction.path.as_str();
                table
                    .callables
                    .entry(element.name.as_str())
                    .or_default()
                    .insert(file);
                if element.kind == ElementKind::Class {
                    table
                        .classes
                        .entry(element.name.as_str())
                        .or_default()
                        .insert(file);
                }
            }
        }
        table
    }

    fn resolve_call(&self, caller: &str, callee: &str) -> Option<&'a str> {
        Self::unique_other(self.callables.get(callee)?, caller)
    }

    fn resolve_class(&self, caller: &str, base: &str) -> Option<&'a str> {
        Self::unique_other(self.classes.get(base)?, caller)
    }

    /// Locally defined names shadow everything else; otherwise exactly one
    /// other defining file is required.
    fn unique_other(files: &BTreeSet<&'a str>, caller: &str) -> Option<&'a str> {
        if files.contains(caller) {
            return None;
        }
        let mut iter = files.iter();
        match (iter.next(), iter.next()) {
            (Some(&only), None) => Some(only),
            _ => None,
        }
    }
}

/// Entry-point stems that make a file stand for its directory
const DIRECTORY_STEMS: &[&str] = &["__init__", "index", "mod", "lib"];

/// Prefixes that only say "relative to the package root"
const ROOT_PREFIXES: &[&str] = &["crate/", "self/", "super/", "@/", "~/"];

struct ImportResolver<'a> {
    /// Module key (path without extension) -> file
    modules: HashMap<String, &'a str>,
    /// Directory -> first file in it, for package-level imports (Go)
    directories: HashMap<String, &'a str>,
}

impl<'a> ImportResolver<'a> {
    /// `paths` must be sorted so directory representatives are deterministic
    fn new(paths: &[&'a str]) -> Self {
        let mut modules = HashMap::new();
        let mut directories: HashMap<String, &'a str> = HashMap::new();

        for &path in paths {
            let key = strip_extension(path);
            modules.insert(key.to_string(), path);

            let (dir, stem) = split_dir(key);
            if DIRECTORY_STEMS.contains(&stem) && !dir.is_empty() {
                modules.entry(dir.to_string()).or_insert(path);
            }
            if !dir.is_empty() {
                directories.entry(dir.to_string()).or_insert(path);
            }
        }

        Self {
            modules,
            directories,
        }
    }

    fn resolve(&self, importer: &str, specifier: &str) -> Option<&'a str> {
        let specifier = specifier.trim().trim_matches(['"', '\'', '<', '>']);
        if specifier.is_empty() {
            return None;
        }

        let target = if specifier.starts_with("./") || specifier.starts_with("../") {
            self.resolve_relative_path(importer, specifier)
        } else if specifier.starts_with('.') {
            self.resolve_python_relative(importer, specifier)
        } else {
            self.resolve_absolute(importer, specifier)
        };

        target.filter(|&t| t != importer)
    }

    fn resolve_relative_path(&self, importer: &str, specifier: &str) -> Option<&'a str> {
        let (dir, _) = split_dir(importer);
        let joined = normalize_path(&format!("{}/{}", dir, specifier))?;
        self.lookup_exact(&joined)
            .or_else(|| self.lookup_exact(strip_extension(&joined)))
    }

    /// `from ..models import User` climbs one package per extra dot
    fn resolve_python_relative(&self, importer: &str, specifier: &str) -> Option<&'a str> {
        let dots = specifier.chars().take_while(|&c| c == '.').count();
        let rest = specifier[dots..].replace('.', "/");

        let mut base = split_dir(importer).0.to_string();
        for _ in 1..dots {
            base = split_dir(&base).0.to_string();
        }

        let candidate = match (base.is_empty(), rest.is_empty()) {
            (_, true) => base,
            (true, false) => rest,
            (false, false) => format!("{}/{}", base, rest),
        };
        self.lookup_exact(&candidate)
    }

    fn resolve_absolute(&self, importer: &str, specifier: &str) -> Option<&'a str> {
        let mut fragment = specifier.replace("::", "/");
        // Dotted module paths, unless the specifier is already a path (Go, C headers)
        if !fragment.contains('/') && !has_source_extension(&fragment) {
            fragment = fragment.replace('.', "/");
        }
        for prefix in ROOT_PREFIXES {
            while let Some(stripped) = fragment.strip_prefix(prefix) {
                fragment = stripped.to_string();
            }
        }

        let mut segments: Vec<&str> = fragment.split('/').filter(|s| !s.is_empty()).collect();

        if let Some(found) = self.lookup_fragment(importer, &segments.join("/")) {
            return Some(found);
        }

        // Symbol imports name something inside a module: `models::customer::Customer`
        while segments.len() > 1 {
            segments.pop();
            let candidate = segments.join("/");
            if let Some(found) = self.lookup_suffix(importer, &self.modules, &candidate) {
                return Some(found);
            }
        }
        None
    }

    fn lookup_exact(&self, key: &str) -> Option<&'a str> {
        self.modules.get(key).copied()
    }

    fn lookup_fragment(&self, importer: &str, fragment: &str) -> Option<&'a str> {
        if fragment.is_empty() {
            return None;
        }
        let module = strip_extension(fragment);
        self.lookup_suffix(importer, &self.modules, module)
            .or_else(|| self.lookup_prefixed(importer, &self.modules, module))
            .or_else(|| self.lookup_suffix(importer, &self.directories, module))
            .or_else(|| self.lookup_prefixed(importer, &self.directories, module))
    }

    /// Keys equal to `fragment` or ending in `/fragment`
    fn lookup_suffix(
        &self,
        importer: &str,
        table: &HashMap<String, &'a str>,
        fragment: &str,
    ) -> Option<&'a str> {
        let suffix = format!("/{}", fragment);
        let candidates: BTreeSet<&'a str> = table
            .iter()
            .filter(|(key, _)| key.as_str() == fragment || key.ends_with(&suffix))
            .map(|(_, &path)| path)
            .filter(|&path| path != importer)
            .collect();
        pick_closest(importer, candidates)
    }

    /// Keys that the fragment ends with: `example.com/app/internal/models` -> `internal/models`
    fn lookup_prefixed(
        &self,
        importer: &str,
        table: &HashMap<String, &'a str>,
        fragment: &str,
    ) -> Option<&'a str> {
        let candidates: BTreeSet<&'a str> = table
            .iter()
            .filter(|(key, _)| key.contains('/') && fragment.ends_with(&format!("/{}", key)))
            .map(|(_, &path)| path)
            .filter(|&path| path != importer)
            .collect();
        pick_closest(importer, candidates)
    }
}

/// Prefer the candidate sharing the longest directory prefix with the importer
fn pick_closest<'a>(importer: &str, candidates: BTreeSet<&'a str>) -> Option<&'a str> {
    if candidates.len() <= 1 {
        return candidates.into_iter().next();
    }

    let scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|c| (shared_segments(importer, c), c))
        .collect();
    let best = scored.iter().map(|(score, _)| *score).max()?;
    let mut winners = scored.into_iter().filter(|(score, _)| *score == best);

    match (winners.next(), winners.next()) {
        (Some((_, only)), None) => Some(only),
        _ => None,
    }
}

fn shared_segments(a: &str, b: &str) -> usize {
    let (a_dir, _) = split_dir(a);
    let (b_dir, _) = split_dir(b);
    a_dir
        .split('/')
        .zip(b_dir.split('/'))
        .take_while(|(x, y)| !x.is_empty() && x == y)
        .count()
}

fn split_dir(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

fn strip_extension(path: &str) -> &str {
    let (_, name) = split_dir(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &path[..path.len() - (name.len() - dot)],
        _ => path,
    }
}

fn has_source_extension(fragment: &str) -> bool {
    matches!(
        fragment.rsplit_once('.').map(|(_, ext)| ext),
        Some("h" | "hpp" | "c" | "cpp" | "js" | "ts" | "tsx" | "jsx" | "mjs")
    )
}

/// Resolve `.` and `..` segments; `None` when the path escapes the root
fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallSite, CodeElement};

    fn file(path: &str, elements: Vec<CodeElement>, calls: &[&str]) -> FileExtraction {
        FileExtraction {
            path: path.to_string(),
            elements,
            calls: calls
                .iter()
                .map(|c| CallSite {
                    callee: c.to_string(),
                    line: 1,
                })
                .collect(),
        }
    }

    fn import(spec: &str, path: &str) -> CodeElement {
        CodeElement::import(spec, path)
    }

    #[test]
    fn test_weights_accumulate_per_kind() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_reference("a.py", "b.py", EdgeKind::Call));
        assert!(graph.add_reference("a.py", "b.py", EdgeKind::Call));
        assert!(graph.add_reference("a.py", "b.py", EdgeKind::Import));
        assert!(!graph.add_reference("a.py", "a.py", EdgeKind::Call));

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge_weight("a.py", "b.py", EdgeKind::Call), Some(2));
        assert_eq!(graph.edge_weight("a.py", "b.py", EdgeKind::Import), Some(1));
        assert_eq!(graph.edge_weight("b.py", "a.py", EdgeKind::Call), None);
    }

    #[test]
    fn test_python_imports() {
        let extractions = vec![
            file(
                "app/api/orders.py",
                vec![
                    import("app.services.orders", "app/api/orders.py"),
                    import("..models", "app/api/orders.py"),
                    import("os", "app/api/orders.py"),
                ],
                &[],
            ),
            file("app/services/orders.py", vec![], &[]),
            file("app/models/__init__.py", vec![], &[]),
        ];
        let graph = GraphBuilder::build(&extractions);

        assert!(graph.has_edge("app/api/orders.py", "app/services/orders.py"));
        assert!(graph.has_edge("app/api/orders.py", "app/models/__init__.py"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_typescript_relative_imports() {
        let extractions = vec![
            file(
                "src/components/Cart.tsx",
                vec![
                    import("../services/cart", "src/components/Cart.tsx"),
                    import("./Button", "src/components/Cart.tsx"),
                    import("react", "src/components/Cart.tsx"),
                ],
                &[],
            ),
            file("src/services/cart.ts", vec![], &[]),
            file("src/components/Button.tsx", vec![], &[]),
            file("src/utils/index.ts", vec![], &[]),
        ];
        let graph = GraphBuilder::build(&extractions);

        assert!(graph.has_edge("src/components/Cart.tsx", "src/services/cart.ts"));
        assert!(graph.has_edge("src/components/Cart.tsx", "src/components/Button.tsx"));
        assert_eq!(graph.dependencies("src/components/Cart.tsx").len(), 2);
    }

    #[test]
    fn test_rust_and_go_imports() {
        let extractions = vec![
            file(
                "src/main.rs",
                vec![import("crate::models::customer::Customer", "src/main.rs")],
                &[],
            ),
            file("src/models/customer.rs", vec![], &[]),
            file(
                "cmd/server/main.go",
                vec![import("example.com/shop/internal/store", "cmd/server/main.go")],
                &[],
            ),
            file("internal/store/orders.go", vec![], &[]),
        ];
        let graph = GraphBuilder::build(&extractions);

        assert!(graph.has_edge("src/main.rs", "src/models/customer.rs"));
        assert!(graph.has_edge("cmd/server/main.go", "internal/store/orders.go"));
    }

    #[test]
    fn test_call_resolution_requires_unique_definition() {
        let extractions = vec![
            file(
                "app/api.py",
                vec![],
                &["charge", "charge", "log", "helper", "print"],
            ),
            file(
                "app/payments.py",
                vec![CodeElement::function("charge", "app/payments.py")],
                &[],
            ),
            file(
                "app/a.py",
                vec![CodeElement::function("log", "app/a.py")],
                &[],
            ),
            file(
                "app/b.py",
                vec![CodeElement::function("log", "app/b.py")],
                &[],
            ),
        ];
        let graph = GraphBuilder::build(&extractions);

        assert_eq!(
            graph.edge_weight("app/api.py", "app/payments.py", EdgeKind::Call),
            Some(2)
        );
        // `log` is ambiguous, `helper` and `print` are unknown
        assert_eq!(graph.dependencies("app/api.py").len(), 1);
    }

    #[test]
    fn test_local_definition_shadows_call() {
        let extractions = vec![
            file(
                "a.py",
                vec![CodeElement::function("save", "a.py")],
                &["save"],
            ),
            file("b.py", vec![CodeElement::function("save", "b.py")], &[]),
        ];
        let graph = GraphBuilder::build(&extractions);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_inheritance_edges() {
        let mut child = CodeElement::class("OrderRepository", "repo/orders.py");
        child.bases = vec!["BaseRepository".to_string()];
        let extractions = vec![
            file("repo/orders.py", vec![child], &[]),
            file(
                "repo/base.py",
                vec![CodeElement::class("BaseRepository", "repo/base.py")],
                &[],
            ),
        ];
        let graph = GraphBuilder::build(&extractions);
        assert_eq!(
            graph.edge_weight("repo/orders.py", "repo/base.py", EdgeKind::Inherit),
            Some(1)
        );
    }

    #[test]
    fn test_ambiguous_import_prefers_nearest() {
        let extractions = vec![
            file(
                "billing/api.py",
                vec![import("models", "billing/api.py")],
                &[],
            ),
            file("billing/models.py", vec![], &[]),
            file("shipping/models.py", vec![], &[]),
        ];
        let graph = GraphBuilder::build(&extractions);
        assert!(graph.has_edge("billing/api.py", "billing/models.py"));
        assert!(!graph.has_edge("billing/api.py", "shipping/models.py"));
    }

    #[test]
    fn test_build_is_order_independent() {
        let extractions = vec![
            file("a.py", vec![import("b", "a.py")], &["run"]),
            file("b.py", vec![import("c", "b.py")], &[]),
            file("c.py", vec![CodeElement::function("run", "c.py")], &[]),
        ];
        let mut reversed = extractions.clone();
        reversed.reverse();

        assert_eq!(
            GraphBuilder::build(&extractions).edges(),
            GraphBuilder::build(&reversed).edges()
        );
    }

    #[test]
    fn test_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_reference("a", "b", EdgeKind::Import);
        graph.add_reference("b", "c", EdgeKind::Import);
        graph.add_reference("c", "a", EdgeKind::Call);
        graph.add_reference("c", "d", EdgeKind::Import);

        assert_eq!(
            graph.cycles(),
            vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]
        );
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(strip_extension("src/app.service.ts"), "src/app.service");
        assert_eq!(strip_extension("src/.env"), "src/.env");
        assert_eq!(normalize_path("src/a/../b/./c").as_deref(), Some("src/b/c"));
        assert_eq!(normalize_path("../escape"), None);
    }
}
