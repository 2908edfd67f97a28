pub mod glsl;
pub mod hlsl;

use std::fmt::{self, Write};

use ard_shader_graph::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    bindings::ShaderSource,
    error::GenerateError,
    generator::generate,
};

use self::{glsl::GlslCodeGen, hlsl::HlslCodeGen};

/// How an operation is printed by a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lowering {
    /// `a = (b)`
    Assign,
    /// `a[b]`
    Index,
    /// `op(a)`
    Prefix(&'static str),
    /// `(a) op (b)`
    Infix(&'static str),
    /// `name((a), (b), ...)`
    Call(&'static str),
    /// `clamp((a), 0, 1)`
    Clamp01,
    /// `(target = a)`
    SetOutput(&'static str),
    /// Printed verbatim. Takes no operands.
    Builtin(&'static str),
    /// `if((a) < 0.0) discard`, or `if(any(lessThan((a), vecN(0.0)))) discard` for vectors.
    Discard,
}

/// Everything that differs between shading languages.
///
/// The generator drives the traversal and calls into the code gen for keywords, type names,
/// identifiers, declarations, and buffer layouts.
pub trait ShaderCodeGen {
    /// Name of the backend for diagnostics.
    fn name(&self) -> &'static str;

    fn type_name(&self, ty: DataType) -> &'static str;

    fn lower(&self, op: Operation) -> Option<Lowering>;

    /// Identity of an attribute declaration, used for sorting and bindings.
    fn attribute_key(&self, attribute: &AttributeNode) -> u32;

    fn entry_point(&self, stage: ShaderStage) -> &'static str;

    fn profile(&self, stage: ShaderStage) -> Option<String>;

    fn uniform_block_name(&self, stage: ShaderStage, slot: u32) -> String;

    fn sampler_name(&self, stage: ShaderStage, slot: u32) -> String;

    fn attribute_name(&self, attribute: &AttributeNode) -> String {
        format!("a{}", self.attribute_key(attribute))
    }

    fn render_target_name(&self, target: u32) -> String {
        format!("r{target}")
    }

    fn begin_shader(&self, out: &mut String, stage: ShaderStage) -> fmt::Result;

    fn write_attributes(&self, out: &mut String, attributes: &[AttributeNode]) -> fmt::Result;

    fn write_transformed(
        &self,
        out: &mut String,
        stage: ShaderStage,
        transformed: &[TransformedNode],
    ) -> fmt::Result;

    fn write_rasterized(&self, out: &mut String, rasterized: &[RasterizedNode]) -> fmt::Result;

    /// Writes one uniform buffer. `uniforms` are sorted by offset and have no duplicates.
    fn write_uniform_block(
        &self,
        out: &mut String,
        stage: ShaderStage,
        slot: u32,
        uniforms: &[UniformNode],
    ) -> Result<(), GenerateError>;

    fn write_sampler(
        &self,
        out: &mut String,
        stage: ShaderStage,
        sampler: &SamplerNode,
    ) -> Result<(), GenerateError>;

    fn begin_entry(
        &self,
        out: &mut String,
        stage: ShaderStage,
        needs_instance_id: bool,
    ) -> fmt::Result;

    fn write_temp_decl(&self, out: &mut String, index: u32, ty: DataType) -> fmt::Result {
        writeln!(out, "\t{} _{index};", self.type_name(ty))
    }

    fn end_entry(&self, out: &mut String, stage: ShaderStage) -> fmt::Result;

    fn write_float(&self, out: &mut String, value: f32) -> fmt::Result {
        write!(out, "{value:.10}f")
    }

    fn write_attribute(&self, out: &mut String, attribute: &AttributeNode) -> fmt::Result;

    fn write_uniform(&self, out: &mut String, slot: u32, offset: u32) -> fmt::Result {
        write!(out, "u{slot}_{offset}")
    }

    fn write_temp(&self, out: &mut String, index: u32) -> fmt::Result {
        write!(out, "_{index}")
    }

    fn write_transformed_ref(&self, out: &mut String, transformed: &TransformedNode)
        -> fmt::Result;

    fn write_rasterized_ref(&self, out: &mut String, rasterized: &RasterizedNode) -> fmt::Result;

    /// Writes everything of a texture fetch that comes before the coordinates.
    fn begin_sample(
        &self,
        out: &mut String,
        stage: ShaderStage,
        sampler: &SamplerNode,
    ) -> Result<(), GenerateError>;

    /// Writes everything of a texture fetch that comes after the coordinates.
    fn end_sample(&self, out: &mut String, sampler: &SamplerNode) -> Result<(), GenerateError>;

    fn begin_cast(&self, out: &mut String, ty: DataType) -> fmt::Result;

    fn end_cast(&self, out: &mut String) -> fmt::Result {
        out.write_char(')')
    }
}

/// Lowerings that are spelled the same way by every backend.
pub fn lower_common(op: Operation) -> Option<Lowering> {
    let lowering = match op {
        Operation::Assign => Lowering::Assign,
        Operation::Index => Lowering::Index,
        Operation::Negate => Lowering::Prefix("-"),
        Operation::Add => Lowering::Infix("+"),
        Operation::Subtract => Lowering::Infix("-"),
        Operation::Multiply => Lowering::Infix("*"),
        Operation::Divide => Lowering::Infix("/"),
        Operation::Less => Lowering::Infix("<"),
        Operation::LessEqual => Lowering::Infix("<="),
        Operation::Equal => Lowering::Infix("=="),
        Operation::NotEqual => Lowering::Infix("!="),
        Operation::Dot => Lowering::Call("dot"),
        Operation::Cross => Lowering::Call("cross"),
        Operation::Length => Lowering::Call("length"),
        Operation::Normalize => Lowering::Call("normalize"),
        Operation::Pow => Lowering::Call("pow"),
        Operation::Min => Lowering::Call("min"),
        Operation::Max => Lowering::Call("max"),
        Operation::Abs => Lowering::Call("abs"),
        Operation::Sin => Lowering::Call("sin"),
        Operation::Cos => Lowering::Call("cos"),
        Operation::Exp => Lowering::Call("exp"),
        Operation::Exp2 => Lowering::Call("exp2"),
        Operation::Log => Lowering::Call("log"),
        _ => return None,
    };

    Some(lowering)
}

/// Backend selection usable from configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShaderBackend {
    Glsl(GlslCodeGen),
    Hlsl(HlslCodeGen),
}

impl ShaderBackend {
    pub fn name(&self) -> &'static str {
        match self {
            ShaderBackend::Glsl(code_gen) => code_gen.name(),
            ShaderBackend::Hlsl(code_gen) => code_gen.name(),
        }
    }

    /// File extension for generated sources.
    pub fn extension(&self) -> &'static str {
        match self {
            ShaderBackend::Glsl(_) => "glsl",
            ShaderBackend::Hlsl(_) => "hlsl",
        }
    }

    pub fn generate(
        &self,
        graph: &ShaderGraph,
        root: NodeId,
        stage: ShaderStage,
    ) -> Result<ShaderSource, GenerateError> {
        match self {
            ShaderBackend::Glsl(code_gen) => generate(code_gen, graph, root, stage),
            ShaderBackend::Hlsl(code_gen) => generate(code_gen, graph, root, stage),
        }
    }
}
