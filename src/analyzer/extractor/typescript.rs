use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use super::{
    ElementExtractor, ParamStyle, clean_doc_comment, create_ts_parser, node_line, node_text,
    parse_parameter_list,
};
use crate::analyzer::language::Language;
use crate::types::{
    CallSite, CodeElement, DocGateError, FileExtraction, Result, SourceFile, Visibility,
};

/// Handles TypeScript, TSX, JavaScript and JSX
pub struct TypeScriptExtractor;

impl ElementExtractor for TypeScriptExtractor {
    fn extract(&self, file: &SourceFile) -> Result<FileExtraction> {
        // The TSX grammar is a superset that also accepts plain JavaScript with JSX
        let language: tree_sitter::Language = match file.language {
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            _ => tree_sitter_typescript::LANGUAGE_TSX.into(),
        };

        let mut parser = create_ts_parser(language.clone(), &file.path)?;
        let tree = parser.parse(&file.content, None).ok_or_else(|| {
            DocGateError::analysis(&file.path, format!("Failed to parse {} file", file.language))
        })?;

        let root = tree.root_node();
        let content = file.content.as_bytes();
        let mut ctx = WalkContext {
            content,
            path: &file.path,
            module_exports: has_exports(root),
            result: FileExtraction::empty(&file.path),
        };

        ctx.walk_statements(root, false);
        let mut result = ctx.result;
        result.calls = extract_calls(&language, root, content);

        Ok(result)
    }
}

struct WalkContext<'a> {
    content: &'a [u8],
    path: &'a str,
    /// ES module with at least one export: unexported declarations are private
    module_exports: bool,
    result: FileExtraction,
}

impl WalkContext<'_> {
    fn walk_statements(&mut self, parent: Node, exported: bool) {
        let mut cursor = parent.walk();
        let children: Vec<Node> = parent.named_children(&mut cursor).collect();

        for child in children {
            self.statement(child, child, exported);
        }
    }

    /// `anchor` is the node a leading doc comment attaches to
    fn statement(&mut self, node: Node, anchor: Node, exported: bool) {
        match node.kind() {
            "import_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.push_import(source, node);
                }
            }
            "export_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.push_import(source, node);
                }
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    self.statement(declaration, node, true);
                } else if let Some(value) = node.child_by_field_name("value")
                    && matches!(value.kind(), "function_expression" | "function")
                    && let Some(function) = self.function(value, node)
                {
                    // `export default function App() {}`
                    self.result.elements.push(function);
                }
            }
            "class_declaration" | "abstract_class_declaration" | "interface_declaration" => {
                self.class(node, anchor, exported)
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(mut function) = self.function(node, anchor) {
                    function.visibility = self.top_level_visibility(&function.name, exported);
                    self.result.elements.push(function);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                self.variable_declaration(node, anchor, exported)
            }
            _ => {}
        }
    }

    fn push_import(&mut self, source: Node, statement: Node) {
        let specifier = unquote(node_text(source, self.content));
        if !specifier.is_empty() {
            self.result
                .elements
                .push(CodeElement::import(specifier, self.path).with_line(node_line(statement)));
        }
    }

    fn class(&mut self, node: Node, anchor: Node, exported: bool) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.content).to_string();

        let mut class = CodeElement::class(&name, self.path).with_line(node_line(node));
        class.bases = heritage(node, self.content);
        class.doc = leading_doc(anchor, self.content);
        class.visibility = self.top_level_visibility(&name, exported);
        self.result.elements.push(class);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if !matches!(member.kind(), "method_definition" | "method_signature") {
                continue;
            }
            if let Some(method) = self.function(member, member) {
                let private = method.name.starts_with('#')
                    || method.name.starts_with('_')
                    || method.name == "constructor"
                    || has_restricted_modifier(member, self.content);
                let visibility = if private {
                    Visibility::Private
                } else {
                    Visibility::Public
                };
                self.result
                    .elements
                    .push(method.with_owner(&name).with_visibility(visibility));
            }
        }
    }

    /// Function-like node with `name`, `parameters` and `return_type` fields
    fn function(&self, node: Node, anchor: Node) -> Option<CodeElement> {
        let name = node_text(node.child_by_field_name("name")?, self.content);
        let mut function = CodeElement::function(name, self.path).with_line(node_line(node));
        self.fill_signature(&mut function, node);
        function.doc = leading_doc(anchor, self.content);
        Some(function)
    }

    fn fill_signature(&self, function: &mut CodeElement, node: Node) {
        if let Some(params) = node.child_by_field_name("parameters") {
            function.parameters =
                parse_parameter_list(node_text(params, self.content), ParamStyle::NameColonType);
        } else if let Some(param) = node.child_by_field_name("parameter") {
            // `x => x + 1`
            function.parameters =
                parse_parameter_list(node_text(param, self.content), ParamStyle::NameColonType);
        }
        function.return_type = node
            .child_by_field_name("return_type")
            .map(|n| node_text(n, self.content).trim_start_matches(':').trim().to_string());
    }

    /// `const handler = (req) => …`, `const x = require('./x')`
    fn variable_declaration(&mut self, node: Node, anchor: Node, exported: bool) {
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "variable_declarator")
            .collect();

        for declarator in declarators {
            let (Some(name_node), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };

            match value.kind() {
                "arrow_function" | "function_expression" | "function" => {
                    let name = node_text(name_node, self.content);
                    let mut function =
                        CodeElement::function(name, self.path).with_line(node_line(declarator));
                    self.fill_signature(&mut function, value);
                    function.doc = leading_doc(anchor, self.content);
                    function.visibility = self.top_level_visibility(name, exported);
                    self.result.elements.push(function);
                }
                "call_expression" => {
                    if let Some(source) = require_source(value, self.content) {
                        self.push_import(source, node);
                    }
                }
                _ => {}
            }
        }
    }

    fn top_level_visibility(&self, name: &str, exported: bool) -> Visibility {
        if exported {
            Visibility::Public
        } else if self.module_exports {
            Visibility::Private
        } else {
            Visibility::from_underscore(name)
        }
    }
}

fn has_exports(root: Node) -> bool {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .any(|n| n.kind() == "export_statement")
}

/// Names from `extends` and `implements` clauses
fn heritage(class: Node, content: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = class.walk();
    for child in class.named_children(&mut cursor) {
        let clauses: Vec<Node> = match child.kind() {
            "class_heritage" => {
                let mut inner = child.walk();
                child.named_children(&mut inner).collect()
            }
            "extends_type_clause" => vec![child],
            _ => continue,
        };
        for clause in clauses {
            let mut inner = clause.walk();
            for target in clause.named_children(&mut inner) {
                let text = node_text(target, content);
                // Drop generic arguments and namespaces: `ns.Base<T>` -> `Base`
                let base = text.split('<').next().unwrap_or(text);
                let base = base.rsplit('.').next().unwrap_or(base).trim();
                if !base.is_empty() {
                    bases.push(base.to_string());
                }
            }
        }
    }
    bases
}

fn has_restricted_modifier(member: Node, content: &[u8]) -> bool {
    let mut cursor = member.walk();
    member
        .children(&mut cursor)
        .filter(|n| n.kind() == "accessibility_modifier")
        .any(|n| matches!(node_text(n, content), "private" | "protected"))
}

/// JSDoc block ending on the line right before `anchor`
fn leading_doc(anchor: Node, content: &[u8]) -> Option<String> {
    let prev = anchor.prev_sibling()?;
    if prev.kind() != "comment" {
        return None;
    }
    let text = node_text(prev, content);
    if !text.starts_with("/**") || prev.end_position().row + 1 < anchor.start_position().row {
        return None;
    }
    clean_doc_comment(text)
}

fn require_source<'t>(call: Node<'t>, content: &[u8]) -> Option<Node<'t>> {
    let function = call.child_by_field_name("function")?;
    if node_text(function, content) != "require" {
        return None;
    }
    let first = call.child_by_field_name("arguments")?.named_child(0)?;
    (first.kind() == "string").then_some(first)
}

fn unquote(text: &str) -> &str {
    text.trim_matches(['"', '\'', '`'])
}

fn extract_calls(language: &tree_sitter::Language, root: Node, content: &[u8]) -> Vec<CallSite> {
    let query_str = r#"
        (call_expression function: (identifier) @callee)
        (call_expression function: (member_expression property: (property_identifier) @callee))
        (new_expression constructor: (identifier) @callee)
    "#;

    let mut calls = Vec::new();
    match Query::new(language, query_str) {
        Ok(query) => {
            let mut cursor = QueryCursor::new();
            let mut matches = cursor.matches(&query, root, content);

            while let Some(m) = matches.next() {
                for cap in m.captures.iter() {
                    let callee = node_text(cap.node, content);
                    if callee != "require" {
                        calls.push(CallSite {
                            callee: callee.to_string(),
                            line: node_line(cap.node),
                        });
                    }
                }
            }
        }
        Err(e) => tracing::debug!(error = %e, "Call query rejected by grammar"),
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementKind;

    fn extract(path: &str, content: &str) -> FileExtraction {
        TypeScriptExtractor
            .extract(&SourceFile::new(path, content))
            .unwrap()
    }

    #[test]
    fn test_exported_class_and_methods() {
        let result = extract(
            "src/services/userService.ts",
            r#"
import { UserRepository } from "../repositories/userRepository";

/** Application service for users. */
export class UserService extends BaseService implements Auditable {
  constructor(private readonly repo: UserRepository) { super(); }

  /** Look up one user. */
  async findUser(id: string, options?: FindOptions): Promise<User> {
    return this.repo.findById(id);
  }

  private audit(entry: string) {}
}
"#,
        );

        let class = result
            .elements
            .iter()
            .find(|e| e.kind == ElementKind::Class)
            .unwrap();
        assert_eq!(class.name, "UserService");
        assert_eq!(class.bases, vec!["BaseService", "Auditable"]);
        assert_eq!(class.doc.as_deref(), Some("Application service for users."));
        assert!(class.is_public());

        let find = result.elements.iter().find(|e| e.name == "findUser").unwrap();
        assert_eq!(find.qualified_name, "UserService.findUser");
        assert_eq!(find.parameter_names(), vec!["id", "options"]);
        assert_eq!(find.return_type.as_deref(), Some("Promise<User>"));
        assert_eq!(find.doc.as_deref(), Some("Look up one user."));

        let audit = result.elements.iter().find(|e| e.name == "audit").unwrap();
        assert!(!audit.is_public());

        let imports: Vec<_> = result.imports().map(|e| e.name.as_str()).collect();
        assert_eq!(imports, vec!["../repositories/userRepository"]);

        assert!(result.calls.iter().any(|c| c.callee == "findById"));
    }

    #[test]
    fn test_arrow_functions_and_visibility() {
        let result = extract(
            "src/handlers.ts",
            r#"
export const handleLogin = async (req: Request, res: Response) => {
  const svc = new AuthService();
  return svc.login(req.body);
};

function helper(x: number): number { return x; }
"#,
        );

        let login = result.elements.iter().find(|e| e.name == "handleLogin").unwrap();
        assert_eq!(login.parameter_names(), vec!["req", "res"]);
        assert!(login.is_public());

        let helper = result.elements.iter().find(|e| e.name == "helper").unwrap();
        assert!(!helper.is_public());
        assert_eq!(helper.return_type.as_deref(), Some("number"));

        assert!(result.calls.iter().any(|c| c.callee == "AuthService"));
    }

    #[test]
    fn test_commonjs_script() {
        let result = extract(
            "lib/util.js",
            "const path = require('path');\nfunction joinAll(a, b) { return path.join(a, b); }\n",
        );

        let imports: Vec<_> = result.imports().map(|e| e.name.as_str()).collect();
        assert_eq!(imports, vec!["path"]);

        let join = result.elements.iter().find(|e| e.name == "joinAll").unwrap();
        assert!(join.is_public());
        assert!(!result.calls.iter().any(|c| c.callee == "require"));
    }

    #[test]
    fn test_tsx_component() {
        let result = extract(
            "src/components/App.tsx",
            "export default function App({ title }: Props) {\n  return <h1>{title}</h1>;\n}\n",
        );
        let app = result.elements.iter().find(|e| e.name == "App").unwrap();
        assert_eq!(app.parameter_names(), vec!["{ title }"]);
        assert!(app.is_public());
    }
}
