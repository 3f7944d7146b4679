//! Synthesis of standalone callables from stateful tool classes.
//!
//! Tool-calling protocols invoke bare functions with JSON arguments; they
//! have no notion of an object with receiver state. To expose something
//! like a browser manager, each of its methods is wrapped in a synthesized
//! callable that takes an explicit `instance_handle` argument, and the
//! constructor becomes an `initialize_*` callable that mints the handle.
//!
//! Handles are opaque strings backed by an `InstanceArena`: a table mapping
//! handle → owned instance. A synthesized callable holds no instance state
//! itself; every invocation either constructs a new instance or resolves
//! the handle it was given. The serial execution model of the agent loop
//! guarantees a handle is never checked out twice concurrently.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::ToolError;
use super::signature::{FunctionDecl, ParamDecl, RegisteredFunction, ToolFn};
use super::type_map::DeclaredType;

/// An instance stored in the arena.
pub type BoxedInstance = Box<dyn Any + Send>;

/// Table of live instances, keyed by opaque handle strings.
///
/// Instances are *checked out* (removed) for the duration of a method call
/// and checked back in afterwards, so a mutable borrow never crosses the
/// table lock. A handle whose entry is gone (never minted, torn down, or
/// lost to a failed call) resolves to `InvalidInstanceHandle`.
#[derive(Default)]
pub struct InstanceArena {
    slots: Mutex<HashMap<String, BoxedInstance>>,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an instance and returns its freshly minted handle.
    /// The label prefix keeps handles recognizable in transcripts.
    pub async fn insert(&self, label: &str, instance: BoxedInstance) -> String {
        let handle = format!("{}-{}", label, Uuid::new_v4());
        self.slots.lock().await.insert(handle.clone(), instance);
        handle
    }

    /// Removes and returns the instance behind a handle.
    pub async fn checkout(&self, handle: &str) -> Result<BoxedInstance, ToolError> {
        self.slots.lock().await.remove(handle).ok_or_else(|| {
            ToolError::InvalidInstanceHandle {
                handle: handle.to_string(),
                expected: "a live instance".to_string(),
                reason: "no such instance (never created, or already torn down)".to_string(),
            }
        })
    }

    /// Returns a checked-out instance to the table.
    pub async fn checkin(&self, handle: &str, instance: BoxedInstance) {
        self.slots.lock().await.insert(handle.to_string(), instance);
    }

    /// Drops an instance permanently. Missing handles are ignored.
    pub async fn discard(&self, handle: &str) {
        self.slots.lock().await.remove(handle);
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}

/// Downcasts a checked-out instance, mapping a type mismatch to
/// `InvalidInstanceHandle` (a handle from some other class was passed).
pub fn expect_instance<'a, T: Any>(
    boxed: &'a mut BoxedInstance,
    handle: &str,
    expected: &str,
) -> Result<&'a mut T, ToolError> {
    boxed
        .downcast_mut::<T>()
        .ok_or_else(|| ToolError::InvalidInstanceHandle {
            handle: handle.to_string(),
            expected: expected.to_string(),
            reason: "handle refers to an instance of a different class".to_string(),
        })
}

/// A class whose constructor and public methods can be exposed as tools.
///
/// Implementations declare their structure explicitly (no runtime
/// reflection exists to derive it) and own the dispatch from a method name
/// plus JSON arguments to the real call. `invoke` receives the arena so a
/// method can mint handles for resources it returns (a started page, say).
#[async_trait]
pub trait ToolClass: Send + Sync {
    /// The class name in its original spelling, e.g. `BrowserManager`.
    fn class_name(&self) -> &str;

    /// Constructor declaration: doc and parameters. The declared name is
    /// ignored; the synthesized callable is always `initialize_<class>`.
    fn constructor(&self) -> FunctionDecl;

    /// Declarations for the instance methods. Names beginning with `_`
    /// follow the private-naming convention and are not synthesized.
    fn methods(&self) -> Vec<FunctionDecl>;

    /// Builds a new instance from constructor arguments.
    async fn construct(&self, args: &Map<String, Value>) -> Result<BoxedInstance, ToolError>;

    /// Invokes `method` on the instance behind `handle`.
    async fn invoke(
        &self,
        arena: &InstanceArena,
        method: &str,
        handle: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError>;
}

/// `BrowserManager` → `browser_manager`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
            if i > 0 && (prev_lower || (chars[i - 1].is_uppercase() && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

fn as_argument_map(tool: &str, args: &Value) -> Result<Map<String, Value>, ToolError> {
    match args {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(ToolError::ArgumentDecode {
            name: tool.to_string(),
            reason: format!("expected a JSON object, got {}", other),
        }),
    }
}

/// Converts a class's public surface into standalone registered callables:
/// one `initialize_<class>` constructor wrapper plus one
/// `<method>_<class>` wrapper per public method. Docs are carried over
/// verbatim from the class declarations.
///
/// Name collisions with other sources are not resolved here; the registry
/// merge applies last-write-wins.
pub fn synthesize(class: Arc<dyn ToolClass>, arena: Arc<InstanceArena>) -> Vec<RegisteredFunction> {
    let snake = snake_case(class.class_name());
    let mut functions = Vec::new();

    // Constructor wrapper: build an instance, park it in the arena, hand
    // the handle back as the return value.
    let ctor = class.constructor();
    let ctor_name = format!("initialize_{}", snake);
    let ctor_decl = FunctionDecl {
        name: ctor_name.clone(),
        doc: ctor.doc,
        params: ctor.params,
        returns: Some(DeclaredType::Named("InstanceHandle".to_string())),
    };
    let ctor_callable: ToolFn = {
        let class = class.clone();
        let arena = arena.clone();
        let label = snake.clone();
        let tool_name = ctor_name;
        Arc::new(move |args: Value| {
            let class = class.clone();
            let arena = arena.clone();
            let label = label.clone();
            let tool_name = tool_name.clone();
            Box::pin(async move {
                let map = as_argument_map(&tool_name, &args)?;
                let instance = class.construct(&map).await?;
                let handle = arena.insert(&label, instance).await;
                Ok(Value::String(handle))
            })
        })
    };
    functions.push(RegisteredFunction::declared(ctor_decl, ctor_callable));

    // Method wrappers: explicit leading instance_handle parameter, then the
    // method's own parameters.
    for method in class.methods() {
        if method.name.starts_with('_') {
            continue;
        }

        let tool_name = format!("{}_{}", method.name, snake);
        let mut params = vec![ParamDecl::required(
            "instance_handle",
            DeclaredType::Named("InstanceHandle".to_string()),
        )];
        params.extend(method.params.clone());
        let decl = FunctionDecl {
            name: tool_name.clone(),
            doc: method.doc.clone(),
            params,
            returns: method.returns.clone(),
        };

        let callable: ToolFn = {
            let class = class.clone();
            let arena = arena.clone();
            let method_name = method.name.clone();
            Arc::new(move |args: Value| {
                let class = class.clone();
                let arena = arena.clone();
                let method_name = method_name.clone();
                let tool_name = tool_name.clone();
                Box::pin(async move {
                    let mut map = as_argument_map(&tool_name, &args)?;
                    let handle = match map.remove("instance_handle") {
                        Some(Value::String(h)) => h,
                        Some(other) => {
                            return Err(ToolError::InvalidInstanceHandle {
                                handle: other.to_string(),
                                expected: class.class_name().to_string(),
                                reason: "instance_handle must be a string".to_string(),
                            });
                        }
                        None => {
                            return Err(ToolError::missing_argument(&tool_name, "instance_handle"))
                        }
                    };
                    class.invoke(&arena, &method_name, &handle, &map).await
                })
            })
        };
        functions.push(RegisteredFunction::declared(decl, callable));
    }

    functions
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Minimal stateful class used across the toolgen tests: a counter
    /// with a starting value and an `increment` method.
    pub(crate) struct Counter {
        value: i64,
    }

    pub(crate) struct CounterClass;

    #[async_trait]
    impl ToolClass for CounterClass {
        fn class_name(&self) -> &str {
            "Counter"
        }

        fn constructor(&self) -> FunctionDecl {
            FunctionDecl::new(
                "new",
                "Create a counter starting at `start`.",
                vec![ParamDecl::optional("start", DeclaredType::Int, json!(0))],
            )
        }

        fn methods(&self) -> Vec<FunctionDecl> {
            vec![
                FunctionDecl::new(
                    "increment",
                    "Advance the counter by `step` and return the new value.",
                    vec![ParamDecl::optional("step", DeclaredType::Int, json!(1))],
                )
                .returning(DeclaredType::Int),
                FunctionDecl::new("_reset", "private helper, never exposed", vec![]),
            ]
        }

        async fn construct(&self, args: &Map<String, Value>) -> Result<BoxedInstance, ToolError> {
            let start = args.get("start").and_then(Value::as_i64).unwrap_or(0);
            Ok(Box::new(Counter { value: start }))
        }

        async fn invoke(
            &self,
            arena: &InstanceArena,
            method: &str,
            handle: &str,
            args: &Map<String, Value>,
        ) -> Result<Value, ToolError> {
            let mut boxed = arena.checkout(handle).await?;
            let counter = match expect_instance::<Counter>(&mut boxed, handle, "Counter") {
                Ok(c) => c,
                Err(e) => {
                    arena.checkin(handle, boxed).await;
                    return Err(e);
                }
            };
            let result = match method {
                "increment" => {
                    let step = args.get("step").and_then(Value::as_i64).unwrap_or(1);
                    counter.value += step;
                    Ok(json!(counter.value))
                }
                other => Err(ToolError::invocation(
                    other,
                    format!("Counter has no method `{}`", other),
                )),
            };
            arena.checkin(handle, boxed).await;
            result
        }
    }

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Counter"), "counter");
        assert_eq!(snake_case("BrowserManager"), "browser_manager");
        assert_eq!(snake_case("HTTPFetcher"), "http_fetcher");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_synthesized_names_and_docs() {
        let arena = Arc::new(InstanceArena::new());
        let funcs = synthesize(Arc::new(CounterClass), arena);

        let names: Vec<&str> = funcs.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["initialize_counter", "increment_counter"]);

        // Private `_reset` must not be synthesized; docs carry over.
        let inspected = crate::toolgen::signature::inspect(&funcs[1]).unwrap();
        assert_eq!(
            inspected.description,
            "Advance the counter by `step` and return the new value."
        );
    }

    #[test]
    fn test_method_callable_takes_leading_handle_param() {
        let arena = Arc::new(InstanceArena::new());
        let funcs = synthesize(Arc::new(CounterClass), arena);
        let inspected = crate::toolgen::signature::inspect(&funcs[1]).unwrap();

        assert_eq!(inspected.parameters[0].name, "instance_handle");
        assert!(!inspected.parameters[0].has_default);
        assert_eq!(inspected.parameters[1].name, "step");
        assert_eq!(inspected.required_names(), vec!["instance_handle"]);
    }

    #[test]
    fn test_initialize_and_increment_round_trip() {
        let rt = rt();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let funcs = synthesize(Arc::new(CounterClass), arena.clone());
            let init = &funcs[0];
            let increment = &funcs[1];

            let handle = (init.callable)(json!({})).await.unwrap();
            let handle = handle.as_str().unwrap().to_string();
            assert!(handle.starts_with("counter-"));
            assert_eq!(arena.len().await, 1);

            let out = (increment.callable)(json!({
                "instance_handle": handle,
                "step": 3
            }))
            .await
            .unwrap();
            assert_eq!(out, json!(3));

            // State persists behind the handle across calls.
            let out = (increment.callable)(json!({ "instance_handle": handle }))
                .await
                .unwrap();
            assert_eq!(out, json!(4));
        });
    }

    #[test]
    fn test_constructor_arguments_are_applied() {
        let rt = rt();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let funcs = synthesize(Arc::new(CounterClass), arena);
            let handle = (funcs[0].callable)(json!({ "start": 10 })).await.unwrap();
            let out = (funcs[1].callable)(json!({
                "instance_handle": handle,
                "step": 5
            }))
            .await
            .unwrap();
            assert_eq!(out, json!(15));
        });
    }

    #[test]
    fn test_unknown_handle_is_invalid() {
        let rt = rt();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let funcs = synthesize(Arc::new(CounterClass), arena);
            let err = (funcs[1].callable)(json!({
                "instance_handle": "counter-0000"
            }))
            .await
            .unwrap_err();
            assert!(matches!(err, ToolError::InvalidInstanceHandle { .. }));
        });
    }

    #[test]
    fn test_wrong_class_handle_is_invalid_and_instance_survives() {
        let rt = rt();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let handle = arena.insert("other", Box::new(String::from("not a counter"))).await;

            let funcs = synthesize(Arc::new(CounterClass), arena.clone());
            let err = (funcs[1].callable)(json!({ "instance_handle": handle }))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidInstanceHandle { .. }));

            // The failed downcast must not destroy the stored instance.
            assert_eq!(arena.len().await, 1);
        });
    }

    #[test]
    fn test_missing_handle_argument() {
        let rt = rt();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let funcs = synthesize(Arc::new(CounterClass), arena);
            let err = (funcs[1].callable)(json!({ "step": 1 })).await.unwrap_err();
            assert!(matches!(err, ToolError::ArgumentDecode { .. }));
        });
    }

    #[test]
    fn test_arena_discard_makes_handle_stale() {
        let rt = rt();
        rt.block_on(async {
            let arena = InstanceArena::new();
            let handle = arena.insert("counter", Box::new(Counter { value: 0 })).await;
            arena.discard(&handle).await;
            assert!(arena.checkout(&handle).await.is_err());
            assert!(arena.is_empty().await);
        });
    }
}
