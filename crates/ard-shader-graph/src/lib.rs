//! Backend neutral description of vertex and pixel shaders.
//!
//! A shader is an expression graph built inside of a [`ShaderGraph`](graph::ShaderGraph). Each
//! stage is identified by a root node. Resources (attributes, uniforms, samplers) are leaves of the
//! graph carrying the slots and offsets they are bound to.

pub mod data_type;
pub mod graph;
pub mod node;
pub mod program;
pub mod uniform;

use thiserror::Error;

pub mod prelude {
    pub use crate::data_type::*;
    pub use crate::graph::*;
    pub use crate::node::*;
    pub use crate::program::*;
    pub use crate::uniform::*;
    pub use crate::GraphError;
}

use node::{NodeId, Operation};
use uniform::UniformGroupId;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node `{0}` does not exist")]
    UnknownNode(NodeId),
    #[error("uniform group `{0:?}` does not exist")]
    UnknownUniformGroup(UniformGroupId),
    #[error("`{0}` is not a valid swizzle mask")]
    InvalidSwizzle(String),
    #[error("operation `{op:?}` expects {expected} operands but received {found}")]
    OperandCount {
        op: Operation,
        expected: usize,
        found: usize,
    },
    #[error("node `{0}` must be a sampler")]
    ExpectedSampler(NodeId),
    #[error("uniform at offset {offset} with {count} elements ends past the 32 bit address range")]
    UniformOverflow { offset: u32, count: u32 },
    #[error("a sequence needs at least one statement")]
    EmptySequence,
}
