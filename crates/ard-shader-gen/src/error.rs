use ard_shader_graph::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{kind} node `{node}` is not allowed in a {stage:?} shader")]
    StageMismatch {
        node: NodeId,
        kind: &'static str,
        stage: ShaderStage,
    },
    #[error("node `{0}` does not exist")]
    UnknownNode(NodeId),
    #[error("uniform group `{0:?}` does not exist")]
    UnknownUniformGroup(UniformGroupId),
    #[error("sampler node `{0}` can only be used as the sampler of a sample node")]
    InvalidSamplerUse(NodeId),
    #[error("operation `{op:?}` is not supported by the {backend} backend")]
    UnknownOperation {
        op: Operation,
        backend: &'static str,
    },
    #[error("operation `{op:?}` expects {expected} operands but received {found}")]
    OperandCount {
        op: Operation,
        expected: usize,
        found: usize,
    },
    #[error("invalid layout for uniform at slot {slot} offset {offset}: {violation}")]
    Layout {
        slot: u32,
        offset: u32,
        violation: LayoutViolation,
    },
    #[error("sampler at slot {slot} can't produce values of type `{ty:?}`")]
    InvalidSamplerValueType { slot: u32, ty: DataType },
    #[error("{backend} doesn't support the `{dim:?}` sampler at slot {slot}")]
    InvalidSamplerCoordType {
        slot: u32,
        dim: SamplerDim,
        backend: &'static str,
    },
    #[error("conflicting declarations for {kind} `{key}`")]
    ConflictingDeclaration { kind: &'static str, key: String },
    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

/// Reason a uniform can't be placed where it was declared.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum LayoutViolation {
    #[error("offset must be a multiple of 4")]
    Misaligned,
    #[error("offset must be a multiple of {0} under std140 rules")]
    BaseAlignment(u32),
    #[error("overlaps the previous uniform which ends at offset {0}")]
    Overlap(u32),
    #[error("array element size {0} is not a multiple of 16")]
    ArrayStride(u32),
    #[error("{0} bytes starting at this offset cross a register boundary")]
    RegisterCrossing(u32),
    #[error("ends past the 32 bit address range")]
    Overflow,
}
