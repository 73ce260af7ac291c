use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use super::{
    ElementExtractor, ParamStyle, clean_doc_comment, create_ts_parser, node_line, node_text,
    parse_parameter_list,
};
use crate::types::{
    CallSite, CodeElement, DocGateError, FileExtraction, Result, SourceFile, Visibility,
};

pub struct PythonExtractor;

impl ElementExtractor for PythonExtractor {
    fn extract(&self, file: &SourceFile) -> Result<FileExtraction> {
        let mut parser = create_ts_parser(tree_sitter_python::LANGUAGE, &file.path)?;
        let tree = parser
            .parse(&file.content, None)
            .ok_or_else(|| DocGateError::analysis(&file.path, "Failed to parse Python file"))?;

        let content = file.content.as_bytes();
        let mut result = FileExtraction::empty(&file.path);

        walk_block(tree.root_node(), content, &file.path, None, &mut result);
        result.calls = extract_calls(tree.root_node(), content);

        Ok(result)
    }
}

fn walk_block(
    block: Node,
    content: &[u8],
    path: &str,
    owner: Option<&str>,
    result: &mut FileExtraction,
) {
    let mut cursor = block.walk();
    for child in block.named_children(&mut cursor) {
        match child.kind() {
            "import_statement" => extract_import(child, content, path, result),
            "import_from_statement" => {
                if let Some(module) = child.child_by_field_name("module_name") {
                    let element = CodeElement::import(node_text(module, content), path)
                        .with_line(node_line(child));
                    result.elements.push(element);
                }
            }
            "class_definition" => extract_class(child, child, content, path, result),
            "function_definition" => {
                extract_function(child, child, content, path, owner, result)
            }
            "decorated_definition" => {
                if let Some(definition) = child.child_by_field_name("definition") {
                    match definition.kind() {
                        "class_definition" => {
                            extract_class(definition, child, content, path, result)
                        }
                        "function_definition" => {
                            extract_function(definition, child, content, path, owner, result)
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn extract_import(node: Node, content: &[u8], path: &str, result: &mut FileExtraction) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        // `import numpy as np` wraps the dotted name
        let module = match name.kind() {
            "aliased_import" => name.child_by_field_name("name").unwrap_or(name),
            _ => name,
        };
        result.elements.push(
            CodeElement::import(node_text(module, content), path).with_line(node_line(node)),
        );
    }
}

/// `anchor` is the node leading `#` comments attach to; the decorator block when present
fn extract_class(
    node: Node,
    anchor: Node,
    content: &[u8],
    path: &str,
    result: &mut FileExtraction,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, content).to_string();

    let mut class = CodeElement::class(&name, path).with_line(node_line(node));
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        class.bases = superclasses
            .named_children(&mut cursor)
            .filter(|n| matches!(n.kind(), "identifier" | "attribute"))
            .map(|n| base_name(node_text(n, content)))
            .collect();
    }

    let body = node.child_by_field_name("body");
    class.doc = body
        .and_then(|b| docstring(b, content))
        .or_else(|| leading_comments(anchor, content));
    result.elements.push(class);

    if let Some(body) = body {
        walk_block(body, content, path, Some(&name), result);
    }
}

fn extract_function(
    node: Node,
    anchor: Node,
    content: &[u8],
    path: &str,
    owner: Option<&str>,
    result: &mut FileExtraction,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, content);

    let mut function = CodeElement::function(name, path).with_line(node_line(node));
    if let Some(owner) = owner {
        function = function.with_owner(owner);
        // Dunder methods are protocol hooks, not API surface
        if name.starts_with("__") && name.ends_with("__") {
            function.visibility = Visibility::Private;
        }
    }
    if let Some(params) = node.child_by_field_name("parameters") {
        function.parameters =
            parse_parameter_list(node_text(params, content), ParamStyle::NameColonType);
    }
    function.return_type = node
        .child_by_field_name("return_type")
        .map(|n| node_text(n, content).to_string());
    function.doc = node
        .child_by_field_name("body")
        .and_then(|b| docstring(b, content))
        .or_else(|| leading_comments(anchor, content));

    result.elements.push(function);
}

/// First statement of a body when it is a bare string literal
fn docstring(body: Node, content: &[u8]) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }

    let raw = node_text(literal, content);
    let stripped = raw
        .trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B'])
        .trim_matches('"')
        .trim_matches('\'')
        .trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// Contiguous `#` comment lines ending right above `anchor`
fn leading_comments(anchor: Node, content: &[u8]) -> Option<String> {
    let mut lines = Vec::new();
    let mut next_row = anchor.start_position().row;
    let mut prev = anchor.prev_sibling();

    while let Some(node) = prev {
        if node.kind() != "comment" || node.end_position().row + 1 != next_row {
            break;
        }
        let text = node_text(node, content);
        if text.starts_with("#!") {
            break;
        }
        lines.push(text);
        next_row = node.start_position().row;
        prev = node.prev_sibling();
    }

    lines.reverse();
    clean_doc_comment(&lines.join("\n"))
}

/// `models.Model` -> `Model`
fn base_name(text: &str) -> String {
    text.rsplit('.').next().unwrap_or(text).to_string()
}

fn extract_calls(root: Node, content: &[u8]) -> Vec<CallSite> {
    let query_str = r#"
        (call function: (identifier) @callee)
        (call function: (attribute attribute: (identifier) @callee))
    "#;

    let mut calls = Vec::new();
    if let Ok(query) = Query::new(&tree_sitter_python::LANGUAGE.into(), query_str) {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, content);

        while let Some(m) = matches.next() {
            for cap in m.captures.iter() {
                calls.push(CallSite {
                    callee: node_text(cap.node, content).to_string(),
                    line: node_line(cap.node),
                });
            }
        }
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementKind;

    fn extract(content: &str) -> FileExtraction {
        PythonExtractor
            .extract(&SourceFile::new("app/services/payment.py", content))
            .unwrap()
    }

    #[test]
    fn test_functions_and_parameters() {
        let result = extract(
            r#"
def process_payment(amount: float, currency: str = "USD") -> bool:
    """Charge the customer."""
    return gateway.charge(amount, currency)

def _internal():
    pass
"#,
        );

        let funcs: Vec<_> = result.definitions().collect();
        assert_eq!(funcs.len(), 2);
        assert_eq!(funcs[0].signature(), "process_payment(amount, currency)");
        assert_eq!(funcs[0].return_type.as_deref(), Some("bool"));
        assert_eq!(funcs[0].doc.as_deref(), Some("Charge the customer."));
        assert_eq!(funcs[0].line, 2);
        assert!(funcs[0].is_public());
        assert!(!funcs[1].is_public());
    }

    #[test]
    fn test_class_with_methods() {
        let result = extract(
            r#"
class PaymentService(BaseService, mixins.LoggingMixin):
    """Handles payments."""

    def __init__(self, repo):
        self.repo = repo

    @retry
    def refund(self, payment_id):
        pass
"#,
        );

        let class = result
            .elements
            .iter()
            .find(|e| e.kind == ElementKind::Class)
            .unwrap();
        assert_eq!(class.name, "PaymentService");
        assert_eq!(class.bases, vec!["BaseService", "LoggingMixin"]);
        assert_eq!(class.doc.as_deref(), Some("Handles payments."));

        let refund = result.elements.iter().find(|e| e.name == "refund").unwrap();
        assert_eq!(refund.qualified_name, "PaymentService.refund");
        assert_eq!(refund.parameter_names(), vec!["payment_id"]);

        let init = result.elements.iter().find(|e| e.name == "__init__").unwrap();
        assert!(!init.is_public());
    }

    #[test]
    fn test_leading_hash_comments_as_doc() {
        let result = extract(
            r#"#!/usr/bin/env python
# Charges the card.
# Retries once on timeout.
def charge(card):
    pass

# Detached note

def refund(card):
    pass

# Repository for orders
@dataclass
class OrderRepository:
    pass

# Overridden by the docstring
def ship(order):
    """Ships an order."""
"#,
        );

        let doc = |name: &str| {
            result
                .elements
                .iter()
                .find(|e| e.name == name)
                .and_then(|e| e.doc.clone())
        };
        assert_eq!(
            doc("charge").as_deref(),
            Some("Charges the card.\nRetries once on timeout.")
        );
        assert_eq!(doc("refund"), None);
        assert_eq!(doc("OrderRepository").as_deref(), Some("Repository for orders"));
        assert_eq!(doc("ship").as_deref(), Some("Ships an order."));
    }

    #[test]
    fn test_imports() {
        let result = extract(
            "import os\nimport numpy as np\nfrom .models import User\nfrom app.repo import Repo\n",
        );
        let imports: Vec<_> = result.imports().map(|e| e.name.as_str()).collect();
        assert_eq!(imports, vec!["os", "numpy", ".models", "app.repo"]);
    }

    #[test]
    fn test_call_sites() {
        let result = extract("def run():\n    repo = UserRepository()\n    repo.save(user)\n");
        let callees: Vec<_> = result.calls.iter().map(|c| c.callee.as_str()).collect();
        assert!(callees.contains(&"UserRepository"));
        assert!(callees.contains(&"save"));
    }

    #[test]
    fn test_malformed_input_is_best_effort() {
        let result = PythonExtractor
            .extract(&SourceFile::new("broken.py", "def broken(:\n    pass\n"));
        assert!(result.is_ok());
    }
}
