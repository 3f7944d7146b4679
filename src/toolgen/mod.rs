//! Tool introspection and schema generation.
//!
//! This module tree turns ordinary callables and stateful classes into the
//! uniform surface an LLM tool-calling API understands:
//!
//! - **type_map**: declared parameter types → JSON Schema type tags, with a
//!   permissive `string` fallback for anything unrecognized
//! - **signature**: explicit structural declarations and the inspector that
//!   normalizes them into `CallableDescriptor`s
//! - **schema**: one callable → one `ToolSchema` record
//! - **synthesize**: stateful classes → standalone handle-taking callables
//!   backed by an instance arena
//! - **registry**: merges every source into the callable/schema/description
//!   maps and appends the `instructions_complete` sentinel

pub mod error;
pub mod registry;
pub mod schema;
pub mod signature;
pub mod synthesize;
pub mod type_map;

pub use error::ToolError;
pub use registry::{
    FunctionModule, ToolRegistry, ToolRegistryBuilder, ToolSource, SENTINEL_TOOL,
};
pub use schema::{SchemaParameters, ToolSchema};
pub use signature::{
    CallableDescriptor, FunctionDecl, ParamDecl, ParamDefault, ParameterDescriptor,
    RegisteredFunction, ToolFn, ToolFuture,
};
pub use synthesize::{
    expect_instance, snake_case, BoxedInstance, InstanceArena, ToolClass,
};
pub use type_map::{map_type, DeclaredType, TypeTag};
