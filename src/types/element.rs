use serde::{Deserialize, Serialize};

use crate::analyzer::language::Language;

/// A source file read for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the project root (unique key)
    pub path: String,
    pub content: String,
    pub language: Language,
}

impl SourceFile {
    /// Creates a source file, detecting the language from the path
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            content: content.into(),
            language,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Function,
    Class,
    Import,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Function => write!(f, "function"),
            ElementKind::Class => write!(f, "class"),
            ElementKind::Import => write!(f, "import"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: Some(type_annotation.into()),
        }
    }
}

/// Named element extracted from a source file
///
/// For imports, `name` holds the module specifier as written in source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeElement {
    pub kind: ElementKind,
    pub name: String,
    /// `Owner.name` for methods, otherwise equal to `name`
    pub qualified_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Owning file path
    pub file: String,
    pub line: u32,
    pub doc: Option<String>,
    /// Base classes and implemented interfaces (classes only)
    pub bases: Vec<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// Leading-underscore convention shared by Python and most scripting languages
    pub fn from_underscore(name: &str) -> Self {
        if name.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

impl CodeElement {
    pub fn new(kind: ElementKind, name: impl Into<String>, file: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind,
            qualified_name: name.clone(),
            parameters: Vec::new(),
            return_type: None,
            file: file.into(),
            line: 1,
            doc: None,
            bases: Vec::new(),
            visibility: Visibility::from_underscore(&name),
            name,
        }
    }

    pub fn function(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(ElementKind::Function, name, file)
    }

    pub fn class(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(ElementKind::Class, name, file)
    }

    pub fn import(specifier: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(ElementKind::Import, specifier, file)
    }

    pub fn with_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = names.into_iter().map(Parameter::new).collect();
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.qualified_name = format!("{}.{}", owner, self.name);
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Documentable element visible outside its file
    pub fn is_public(&self) -> bool {
        self.kind != ElementKind::Import && self.visibility == Visibility::Public
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Display form `name(a, b)`
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameter_names().join(", "))
    }
}

/// A call or instantiation observed in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    pub line: u32,
}

/// Everything extracted from one source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileExtraction {
    pub path: String,
    pub elements: Vec<CodeElement>,
    pub calls: Vec<CallSite>,
}

impl FileExtraction {
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn imports(&self) -> impl Iterator<Item = &CodeElement> {
        self.elements
            .iter()
            .filter(|e| e.kind == ElementKind::Import)
    }

    /// Functions and classes (everything that can be documented)
    pub fn definitions(&self) -> impl Iterator<Item = &CodeElement> {
        self.elements
            .iter()
            .filter(|e| e.kind != ElementKind::Import)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_display() {
        let element = CodeElement::function("process_payment", "pay.py")
            .with_parameters(["amount", "currency"]);
        assert_eq!(element.signature(), "process_payment(amount, currency)");
    }

    #[test]
    fn test_visibility() {
        assert!(CodeElement::function("run", "a.py").is_public());
        assert!(!CodeElement::function("_helper", "a.py").is_public());
        assert!(!CodeElement::import("os", "a.py").is_public());
        assert!(
            !CodeElement::function("helper", "lib.rs")
                .with_visibility(Visibility::Private)
                .is_public()
        );
    }

    #[test]
    fn test_source_file_detects_language() {
        let file = SourceFile::new("src/app.py", "print('hi')");
        assert_eq!(file.language, Language::Python);
    }

    #[test]
    fn test_qualified_name() {
        let method = CodeElement::function("charge", "svc.py").with_owner("PaymentService");
        assert_eq!(method.qualified_name, "PaymentService.charge");
        assert_eq!(method.name, "charge");
    }
}
