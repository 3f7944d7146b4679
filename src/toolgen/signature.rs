//! Callable declarations and signature inspection.
//!
//! Every tool-eligible callable carries an explicit structural declaration
//! (typed parameter list plus doc text) supplied at registration. The
//! inspector turns a registration into a `CallableDescriptor`, the
//! normalized shape the schema builder and the synthesizer consume.
//!
//! A registration without a declaration ("opaque") is still invocable, but
//! inspecting it fails with `SignatureUnavailable` and the registry drops
//! it: exposing a tool whose arguments nobody can describe to the model is
//! worse than not exposing it at all.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::error::ToolError;
use super::type_map::{map_type, DeclaredType, TypeTag};

/// Future returned by a tool callable.
pub type ToolFuture = BoxFuture<'static, Result<Value, ToolError>>;

/// Type-erased async tool callable. Receives the decoded JSON argument
/// object and produces a JSON result.
pub type ToolFn = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Whether a parameter has a default, and what it is.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    /// No default: the caller must supply this parameter.
    Required,
    /// A concrete default. An explicit `Value::Null` default still makes
    /// the parameter optional.
    Value(Value),
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: DeclaredType,
    pub default: ParamDefault,
    pub variadic: bool,
}

impl ParamDecl {
    pub fn required(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: ParamDefault::Required,
            variadic: false,
        }
    }

    pub fn optional(name: impl Into<String>, ty: DeclaredType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            default: ParamDefault::Value(default),
            variadic: false,
        }
    }

    pub fn variadic(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: ParamDefault::Value(Value::Null),
            variadic: true,
        }
    }
}

/// The structural declaration of a callable: its identifier, doc text,
/// ordered parameters, and (optionally) its return type.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub doc: String,
    pub params: Vec<ParamDecl>,
    pub returns: Option<DeclaredType>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, doc: impl Into<String>, params: Vec<ParamDecl>) -> Self {
        Self {
            name: name.into(),
            doc: doc.into(),
            params,
            returns: None,
        }
    }

    pub fn returning(mut self, ty: DeclaredType) -> Self {
        self.returns = Some(ty);
        self
    }
}

/// How a callable was registered.
#[derive(Debug, Clone)]
pub enum FunctionSource {
    /// Full structural declaration available.
    Declared(FunctionDecl),
    /// Callable only; no parameter structure was supplied.
    Opaque { name: String },
}

/// A callable plus its registration metadata, as stored in a module source.
#[derive(Clone)]
pub struct RegisteredFunction {
    pub source: FunctionSource,
    pub callable: ToolFn,
}

impl RegisteredFunction {
    pub fn declared(decl: FunctionDecl, callable: ToolFn) -> Self {
        Self {
            source: FunctionSource::Declared(decl),
            callable,
        }
    }

    pub fn opaque(name: impl Into<String>, callable: ToolFn) -> Self {
        Self {
            source: FunctionSource::Opaque { name: name.into() },
            callable,
        }
    }

    pub fn name(&self) -> &str {
        match &self.source {
            FunctionSource::Declared(decl) => &decl.name,
            FunctionSource::Opaque { name } => name,
        }
    }
}

impl std::fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// One parameter of an inspected callable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub type_tag: TypeTag,
    pub has_default: bool,
    pub default_value: Option<Value>,
    pub is_variadic: bool,
}

/// Normalized description of a callable, produced fresh on every
/// inspection. Parameters preserve declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub returns: Option<TypeTag>,
    pub description: String,
}

impl CallableDescriptor {
    /// Names of parameters without defaults, in declaration order.
    pub fn required_names(&self) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|p| !p.has_default)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Renders a compact signature line, e.g.
    /// `find_product_at_heb(product_query: str, browser_page: BrowserPage)`.
    /// Used as input to the description summarizer.
    pub fn signature_text(&self, decl: &FunctionDecl) -> String {
        let rendered: Vec<String> = decl
            .params
            .iter()
            .map(|p| {
                let mut s = format!("{}: {}", p.name, p.ty.label());
                if let ParamDefault::Value(default) = &p.default {
                    s.push_str(&format!(" = {}", default));
                }
                if p.variadic {
                    s = format!("*{}", s);
                }
                s
            })
            .collect();
        format!("{}({})", self.name, rendered.join(", "))
    }
}

/// Extracts a `CallableDescriptor` from a registration.
///
/// The description is the declared doc text with surrounding whitespace
/// trimmed; an empty doc is legal (the tool is just harder for the planner
/// to pick well). Opaque registrations fail with `SignatureUnavailable`.
pub fn inspect(func: &RegisteredFunction) -> Result<CallableDescriptor, ToolError> {
    let decl = match &func.source {
        FunctionSource::Declared(decl) => decl,
        FunctionSource::Opaque { name } => {
            return Err(ToolError::SignatureUnavailable {
                name: name.clone(),
                reason: "registered without a structural declaration".to_string(),
            });
        }
    };

    let parameters = decl
        .params
        .iter()
        .map(|p| ParameterDescriptor {
            name: p.name.clone(),
            type_tag: map_type(&p.ty),
            has_default: matches!(p.default, ParamDefault::Value(_)),
            default_value: match &p.default {
                ParamDefault::Value(v) => Some(v.clone()),
                ParamDefault::Required => None,
            },
            is_variadic: p.variadic,
        })
        .collect();

    Ok(CallableDescriptor {
        name: decl.name.clone(),
        parameters,
        returns: decl.returns.as_ref().map(map_type),
        description: decl.doc.trim().to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A callable that echoes its arguments back; good enough for tests
    /// that only care about registration metadata.
    pub(crate) fn echo_callable() -> ToolFn {
        Arc::new(|args: Value| Box::pin(async move { Ok(args) }))
    }

    pub(crate) fn sample_decl() -> FunctionDecl {
        FunctionDecl::new(
            "add",
            "Adds two numbers",
            vec![
                ParamDecl::required("a", DeclaredType::Int),
                ParamDecl::required("b", DeclaredType::Int),
            ],
        )
        .returning(DeclaredType::Int)
    }

    #[test]
    fn test_inspect_declared_function() {
        let func = RegisteredFunction::declared(sample_decl(), echo_callable());
        let desc = inspect(&func).unwrap();

        assert_eq!(desc.name, "add");
        assert_eq!(desc.description, "Adds two numbers");
        assert_eq!(desc.parameters.len(), 2);
        assert_eq!(desc.parameters[0].name, "a");
        assert_eq!(desc.parameters[0].type_tag, TypeTag::Integer);
        assert!(!desc.parameters[0].has_default);
        assert_eq!(desc.returns, Some(TypeTag::Integer));
    }

    #[test]
    fn test_inspect_opaque_fails() {
        let func = RegisteredFunction::opaque("mystery", echo_callable());
        let err = inspect(&func).unwrap_err();
        assert!(matches!(err, ToolError::SignatureUnavailable { .. }));
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn test_doc_trimming_and_absent_doc() {
        let decl = FunctionDecl::new("trimmed", "  padded doc \n", vec![]);
        let func = RegisteredFunction::declared(decl, echo_callable());
        assert_eq!(inspect(&func).unwrap().description, "padded doc");

        let decl = FunctionDecl::new("undocumented", "", vec![]);
        let func = RegisteredFunction::declared(decl, echo_callable());
        assert_eq!(inspect(&func).unwrap().description, "");
    }

    #[test]
    fn test_defaults_and_required_ordering() {
        let decl = FunctionDecl::new(
            "mixed",
            "",
            vec![
                ParamDecl::required("a", DeclaredType::Str),
                ParamDecl::optional("b", DeclaredType::Int, json!(0)),
                ParamDecl::required("c", DeclaredType::Bool),
                ParamDecl::optional("d", DeclaredType::Str, Value::Null),
            ],
        );
        let func = RegisteredFunction::declared(decl, echo_callable());
        let desc = inspect(&func).unwrap();

        // Explicit null default still counts as optional.
        assert!(desc.parameters[3].has_default);
        assert_eq!(desc.parameters[3].default_value, Some(Value::Null));
        assert_eq!(desc.required_names(), vec!["a", "c"]);
    }

    #[test]
    fn test_signature_text() {
        let decl = FunctionDecl::new(
            "setup",
            "",
            vec![
                ParamDecl::required("page", DeclaredType::Named("BrowserPage".into())),
                ParamDecl::optional("zip_code", DeclaredType::Int, json!(78209)),
            ],
        );
        let func = RegisteredFunction::declared(decl.clone(), echo_callable());
        let desc = inspect(&func).unwrap();
        assert_eq!(
            desc.signature_text(&decl),
            "setup(page: BrowserPage, zip_code: int = 78209)"
        );
    }
}
