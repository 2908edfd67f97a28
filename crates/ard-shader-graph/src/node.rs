use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{data_type::DataType, uniform::UniformGroupId, GraphError};

/// Index of a node inside a [`ShaderGraph`](crate::graph::ShaderGraph).
///
/// Node ids are the identity of a node. Two references to the same id denote the same temp or
/// declaration, regardless of what the nodes contain.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u32);

/// The pipeline stage a shader is generated for.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Node {
    FloatConst(f32),
    IntConst(i32),
    Attribute(AttributeNode),
    Uniform(UniformNode),
    Sampler(SamplerNode),
    Temp(TempNode),
    Transformed(TransformedNode),
    Rasterized(RasterizedNode),
    /// Evaluates `.0` and then `.1`.
    Sequence(NodeId, NodeId),
    Swizzle {
        node: NodeId,
        mask: Swizzle,
    },
    Operation {
        op: Operation,
        #[serde(default)]
        args: SmallVec<[NodeId; 4]>,
    },
    Sample {
        sampler: NodeId,
        coords: NodeId,
    },
    Cast {
        node: NodeId,
        ty: DataType,
    },
}

/// Per-vertex input.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttributeNode {
    pub ty: DataType,
    /// Vertex element index. Used as the attribute location by GLSL.
    pub element_index: u32,
    /// Input semantic. Used by HLSL.
    pub semantic: u32,
}

/// A field inside of a uniform group.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformNode {
    pub ty: DataType,
    pub group: UniformGroupId,
    /// Byte offset from the start of the group.
    pub offset: u32,
    /// Number of array elements. `1` means the uniform is not an array.
    pub count: u32,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SamplerDim {
    Dim1D,
    Dim2D,
    Dim3D,
    Cube,
}

/// A texture bound to a sampler slot.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SamplerNode {
    /// Type of a fetched texel.
    pub ty: DataType,
    pub dim: SamplerDim,
    pub slot: u32,
}

/// Mutable scratch variable. Temps are compared by node identity only.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TempNode {
    pub ty: DataType,
}

/// Value interpolated from the vertex stage to the pixel stage.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransformedNode {
    pub ty: DataType,
    pub semantic: u32,
}

/// Pixel stage output written to a render target.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RasterizedNode {
    pub ty: DataType,
    pub target: u32,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Assign,
    Index,
    Negate,
    Add,
    Subtract,
    /// Component-wise multiplication.
    Multiply,
    Divide,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    /// Writes the clip space position of a vertex.
    SetPosition,
    GetInstanceId,
    Saturate,
    /// `float2(float, float)`
    Float11to2,
    /// `float3(float, float, float)`
    Float111to3,
    /// `float4(float, float, float, float)`
    Float1111to4,
    /// `float4(float3, float)`
    Float31to4,
    /// `float4(float2, float, float)`
    Float211to4,
    Dot,
    Cross,
    /// Matrix multiplication.
    Mul,
    Length,
    Normalize,
    Pow,
    Min,
    Max,
    Abs,
    Sin,
    Cos,
    Exp,
    Exp2,
    Log,
    Ddx,
    Ddy,
    /// Discards the pixel if the operand is negative.
    Clip,
}

/// Component selection mask, such as `xyz` or `wzyx`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Swizzle(String);

impl Node {
    /// Child nodes in traversal order.
    pub fn children(&self) -> SmallVec<[NodeId; 4]> {
        match self {
            Node::FloatConst(_)
            | Node::IntConst(_)
            | Node::Attribute(_)
            | Node::Uniform(_)
            | Node::Sampler(_)
            | Node::Temp(_)
            | Node::Transformed(_)
            | Node::Rasterized(_) => SmallVec::new(),
            Node::Sequence(a, b) => SmallVec::from_slice(&[*a, *b]),
            Node::Swizzle { node, .. } => SmallVec::from_slice(&[*node]),
            Node::Operation { args, .. } => args.clone(),
            Node::Sample { sampler, coords } => SmallVec::from_slice(&[*sampler, *coords]),
            Node::Cast { node, .. } => SmallVec::from_slice(&[*node]),
        }
    }

    /// Name of the node kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::FloatConst(_) => "float constant",
            Node::IntConst(_) => "int constant",
            Node::Attribute(_) => "attribute",
            Node::Uniform(_) => "uniform",
            Node::Sampler(_) => "sampler",
            Node::Temp(_) => "temp",
            Node::Transformed(_) => "transformed",
            Node::Rasterized(_) => "rasterized",
            Node::Sequence(..) => "sequence",
            Node::Swizzle { .. } => "swizzle",
            Node::Operation { .. } => "operation",
            Node::Sample { .. } => "sample",
            Node::Cast { .. } => "cast",
        }
    }
}

impl NodeId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Operation {
    /// Number of operands the operation takes.
    pub const fn arity(self) -> usize {
        match self {
            Operation::GetInstanceId => 0,
            Operation::Negate
            | Operation::SetPosition
            | Operation::Saturate
            | Operation::Length
            | Operation::Normalize
            | Operation::Abs
            | Operation::Sin
            | Operation::Cos
            | Operation::Exp
            | Operation::Exp2
            | Operation::Log
            | Operation::Ddx
            | Operation::Ddy
            | Operation::Clip => 1,
            Operation::Assign
            | Operation::Index
            | Operation::Add
            | Operation::Subtract
            | Operation::Multiply
            | Operation::Divide
            | Operation::Less
            | Operation::LessEqual
            | Operation::Equal
            | Operation::NotEqual
            | Operation::Float11to2
            | Operation::Float31to4
            | Operation::Dot
            | Operation::Cross
            | Operation::Mul
            | Operation::Pow
            | Operation::Min
            | Operation::Max => 2,
            Operation::Float111to3 | Operation::Float211to4 => 3,
            Operation::Float1111to4 => 4,
        }
    }
}

impl Swizzle {
    pub fn new(mask: impl Into<String>) -> Result<Self, GraphError> {
        let mask = mask.into();
        let valid_len = (1..=4).contains(&mask.len());
        let xyzw = mask.chars().all(|c| "xyzw".contains(c));
        let rgba = mask.chars().all(|c| "rgba".contains(c));

        if !valid_len || !(xyzw || rgba) {
            return Err(GraphError::InvalidSwizzle(mask));
        }

        Ok(Swizzle(mask))
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Swizzle {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Swizzle::new(value)
    }
}

impl From<Swizzle> for String {
    fn from(value: Swizzle) -> Self {
        value.0
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swizzle_masks() {
        assert!(Swizzle::new("x").is_ok());
        assert!(Swizzle::new("wzyx").is_ok());
        assert!(Swizzle::new("rgb").is_ok());
        assert!(matches!(
            Swizzle::new(""),
            Err(GraphError::InvalidSwizzle(_))
        ));
        assert!(matches!(
            Swizzle::new("xyzwx"),
            Err(GraphError::InvalidSwizzle(_))
        ));
        // Component sets can't be mixed.
        assert!(matches!(
            Swizzle::new("xg"),
            Err(GraphError::InvalidSwizzle(_))
        ));
        assert!(matches!(
            Swizzle::new("q"),
            Err(GraphError::InvalidSwizzle(_))
        ));
    }

    #[test]
    fn operation_arity() {
        assert_eq!(Operation::GetInstanceId.arity(), 0);
        assert_eq!(Operation::Normalize.arity(), 1);
        assert_eq!(Operation::Assign.arity(), 2);
        assert_eq!(Operation::Float211to4.arity(), 3);
        assert_eq!(Operation::Float1111to4.arity(), 4);
    }
}
