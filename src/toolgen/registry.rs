//! Tool registry assembly.
//!
//! Aggregates callables from heterogeneous sources, flat function modules
//! and tool classes, into the three parallel maps the agent loop consumes:
//! name → callable, name → schema, name → audience-friendly description.
//! Built once per session and immutable afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::llm::Summarizer;

use super::error::ToolError;
use super::schema::{self, ToolSchema};
use super::signature::{inspect, FunctionSource, RegisteredFunction, ToolFn};
use super::synthesize::{synthesize, InstanceArena, ToolClass};

/// Reserved schema-only entry: the executor treats a call to this name as
/// the termination signal. It never appears in `callables`.
pub const SENTINEL_TOOL: &str = "instructions_complete";

fn sentinel_schema() -> ToolSchema {
    ToolSchema {
        name: SENTINEL_TOOL.to_string(),
        description: "Function should be called when we have completed ALL of the instructions."
            .to_string(),
        parameters: None,
    }
}

/// A named, flat collection of functions. Only functions registered here
/// belong to the module; there is no re-export ambiguity to filter out,
/// registration is the definition.
pub struct FunctionModule {
    name: String,
    functions: Vec<RegisteredFunction>,
}

impl FunctionModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn register(mut self, function: RegisteredFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[RegisteredFunction] {
        &self.functions
    }
}

/// One source of tools for the registry.
pub enum ToolSource {
    Module(FunctionModule),
    Class(Arc<dyn ToolClass>),
}

/// The three parallel maps handed to the planner and executor, plus the
/// sentinel entry in `schemas`. Keys of `callables` and `descriptions`
/// match the non-sentinel schema names exactly.
pub struct ToolRegistry {
    callables: HashMap<String, ToolFn>,
    schemas: Vec<ToolSchema>,
    descriptions: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn callable(&self, name: &str) -> Option<&ToolFn> {
        self.callables.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    /// Schema list in registration order, sentinel last. Consumable
    /// directly as the `tools` parameter of a chat completion.
    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn descriptions(&self) -> &HashMap<String, String> {
        &self.descriptions
    }

    /// Number of invocable tools (the sentinel does not count).
    pub fn len(&self) -> usize {
        self.callables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callables.is_empty()
    }
}

/// Builds a `ToolRegistry` from a list of sources.
///
/// Merge order is source order; a later registration of an already-used
/// name wins and the earlier one is discarded with a warning (accepted
/// limitation). Functions whose signature cannot be
/// inspected are dropped with a warning rather than registered broken.
pub struct ToolRegistryBuilder {
    sources: Vec<ToolSource>,
    arena: Arc<InstanceArena>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ToolRegistryBuilder {
    pub fn new(arena: Arc<InstanceArena>) -> Self {
        Self {
            sources: Vec::new(),
            arena,
            summarizer: None,
        }
    }

    pub fn source(mut self, source: ToolSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = ToolSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Attach a summarizer used to derive short tool descriptions. Without
    /// one, descriptions fall back to the raw doc text.
    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub async fn build(&self) -> ToolRegistry {
        let mut callables: HashMap<String, ToolFn> = HashMap::new();
        let mut schemas: Vec<ToolSchema> = Vec::new();
        let mut raw_docs: HashMap<String, String> = HashMap::new();
        let mut signatures: HashMap<String, String> = HashMap::new();

        for source in &self.sources {
            let (source_name, functions): (String, Vec<RegisteredFunction>) = match source {
                ToolSource::Module(module) => {
                    (module.name().to_string(), module.functions().to_vec())
                }
                ToolSource::Class(class) => (
                    class.class_name().to_string(),
                    synthesize(class.clone(), self.arena.clone()),
                ),
            };

            for function in functions {
                let schema = match schema::build(&function) {
                    Ok(schema) => schema,
                    Err(ToolError::SignatureUnavailable { name, reason }) => {
                        warn!(tool = %name, source = %source_name, %reason,
                              "dropping tool with unavailable signature");
                        continue;
                    }
                    Err(other) => {
                        warn!(tool = %function.name(), source = %source_name,
                              error = %other, "dropping tool");
                        continue;
                    }
                };

                if callables.contains_key(&schema.name) {
                    warn!(tool = %schema.name, source = %source_name,
                          "tool name collision, last registration wins");
                    schemas.retain(|s| s.name != schema.name);
                }

                if let FunctionSource::Declared(decl) = &function.source {
                    if let Ok(desc) = inspect(&function) {
                        signatures.insert(schema.name.clone(), desc.signature_text(decl));
                    }
                }
                raw_docs.insert(schema.name.clone(), schema.description.clone());
                callables.insert(schema.name.clone(), function.callable.clone());
                schemas.push(schema);
            }
        }

        schemas.push(sentinel_schema());

        let mut descriptions = HashMap::new();
        for (name, doc) in &raw_docs {
            let described = match &self.summarizer {
                Some(summarizer) => {
                    let signature = signatures.get(name).cloned().unwrap_or_else(|| name.clone());
                    match summarizer.summarize(&format!("{}\n{}", signature, doc)).await {
                        Ok(short) => short,
                        Err(e) => {
                            warn!(tool = %name, error = %e,
                                  "description summarization failed, using raw doc");
                            doc.clone()
                        }
                    }
                }
                None => doc.clone(),
            };
            descriptions.insert(name.clone(), described);
        }

        ToolRegistry {
            callables,
            schemas,
            descriptions,
        }
    }
}
