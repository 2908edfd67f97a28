use std::fmt::{self, Write};

use ard_shader_graph::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    code_gen::{lower_common, Lowering, ShaderCodeGen},
    error::GenerateError,
    layout::Std140Layout,
};

/// Generates GLSL using `std140` uniform blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlslCodeGen {
    /// Value of the `#version` directive.
    pub version: u32,
}

impl Default for GlslCodeGen {
    fn default() -> Self {
        Self { version: 330 }
    }
}

const PADDING_TYPES: [&str; 4] = ["float", "vec2", "vec3", "vec4"];

impl GlslCodeGen {
    fn uniform_prefix(stage: ShaderStage) -> &'static str {
        match stage {
            ShaderStage::Vertex => "UBv",
            ShaderStage::Pixel => "UBp",
        }
    }

    fn sampler_prefix(stage: ShaderStage) -> &'static str {
        match stage {
            ShaderStage::Vertex => "sv",
            ShaderStage::Pixel => "sp",
        }
    }

    /// Texel component count of a sampler.
    fn sampler_components(sampler: &SamplerNode) -> Result<u32, GenerateError> {
        sampler
            .ty
            .components()
            .ok_or(GenerateError::InvalidSamplerValueType {
                slot: sampler.slot,
                ty: sampler.ty,
            })
    }
}

impl ShaderCodeGen for GlslCodeGen {
    fn name(&self) -> &'static str {
        "GLSL"
    }

    fn type_name(&self, ty: DataType) -> &'static str {
        match ty {
            DataType::Float => "float",
            DataType::Float2 => "vec2",
            DataType::Float3 => "vec3",
            DataType::Float4 => "vec4",
            DataType::Float3x3 => "mat3x3",
            DataType::Float4x4 => "mat4x4",
            DataType::UInt => "uint",
            DataType::UInt2 => "uvec2",
            DataType::UInt3 => "uvec3",
            DataType::UInt4 => "uvec4",
            DataType::Int => "int",
            DataType::Int2 => "ivec2",
            DataType::Int3 => "ivec3",
            DataType::Int4 => "ivec4",
        }
    }

    fn lower(&self, op: Operation) -> Option<Lowering> {
        let lowering = match op {
            // Matrix multiplication is an operator in GLSL
            Operation::Mul => Lowering::Infix("*"),
            Operation::SetPosition => Lowering::SetOutput("gl_Position"),
            Operation::GetInstanceId => Lowering::Builtin("uint(gl_InstanceID)"),
            Operation::Saturate => Lowering::Clamp01,
            Operation::Float11to2 => Lowering::Call("vec2"),
            Operation::Float111to3 => Lowering::Call("vec3"),
            Operation::Float1111to4 | Operation::Float31to4 | Operation::Float211to4 => {
                Lowering::Call("vec4")
            }
            Operation::Ddx => Lowering::Call("dFdx"),
            Operation::Ddy => Lowering::Call("dFdy"),
            Operation::Clip => Lowering::Discard,
            op => return lower_common(op),
        };

        Some(lowering)
    }

    fn attribute_key(&self, attribute: &AttributeNode) -> u32 {
        attribute.element_index
    }

    fn entry_point(&self, _stage: ShaderStage) -> &'static str {
        "main"
    }

    fn profile(&self, _stage: ShaderStage) -> Option<String> {
        None
    }

    fn uniform_block_name(&self, stage: ShaderStage, slot: u32) -> String {
        format!("{}{slot}", Self::uniform_prefix(stage))
    }

    fn sampler_name(&self, stage: ShaderStage, slot: u32) -> String {
        format!("{}{slot}", Self::sampler_prefix(stage))
    }

    fn begin_shader(&self, out: &mut String, _stage: ShaderStage) -> fmt::Result {
        writeln!(out, "#version {}", self.version)
    }

    fn write_attributes(&self, out: &mut String, attributes: &[AttributeNode]) -> fmt::Result {
        for attribute in attributes {
            writeln!(
                out,
                "in {} a{};",
                self.type_name(attribute.ty),
                attribute.element_index
            )?;
        }
        Ok(())
    }

    fn write_transformed(
        &self,
        out: &mut String,
        stage: ShaderStage,
        transformed: &[TransformedNode],
    ) -> fmt::Result {
        let qualifier = match stage {
            ShaderStage::Vertex => "out",
            ShaderStage::Pixel => "in",
        };

        for node in transformed {
            writeln!(
                out,
                "{qualifier} {} v{};",
                self.type_name(node.ty),
                node.semantic
            )?;
        }
        Ok(())
    }

    fn write_rasterized(&self, out: &mut String, rasterized: &[RasterizedNode]) -> fmt::Result {
        for node in rasterized {
            writeln!(out, "out {} r{};", self.type_name(node.ty), node.target)?;
        }
        Ok(())
    }

    fn write_uniform_block(
        &self,
        out: &mut String,
        stage: ShaderStage,
        slot: u32,
        uniforms: &[UniformNode],
    ) -> Result<(), GenerateError> {
        writeln!(
            out,
            "layout(std140) uniform {}\n{{",
            self.uniform_block_name(stage, slot)
        )?;

        let mut layout = Std140Layout::new(slot);
        for uniform in uniforms {
            for padding in layout.place(uniform)? {
                writeln!(
                    out,
                    "\t{} dump{slot}_{}_{};",
                    PADDING_TYPES[padding.components as usize - 1],
                    padding.offset,
                    padding.components
                )?;
            }

            write!(out, "\t{} ", self.type_name(uniform.ty))?;
            self.write_uniform(out, slot, uniform.offset)?;
            if uniform.count > 1 {
                write!(out, "[{}]", uniform.count)?;
            }
            writeln!(out, ";")?;
        }

        writeln!(out, "}};")?;
        Ok(())
    }

    fn write_sampler(
        &self,
        out: &mut String,
        stage: ShaderStage,
        sampler: &SamplerNode,
    ) -> Result<(), GenerateError> {
        if sampler.ty.is_matrix() {
            return Err(GenerateError::InvalidSamplerValueType {
                slot: sampler.slot,
                ty: sampler.ty,
            });
        }

        let prefix = match sampler.ty.scalar_kind() {
            ScalarKind::Float => "",
            ScalarKind::UInt => "u",
            ScalarKind::Int => "i",
        };

        let dim = match sampler.dim {
            SamplerDim::Dim1D => "1D",
            SamplerDim::Dim2D => "2D",
            SamplerDim::Dim3D => "3D",
            SamplerDim::Cube => "Cube",
        };

        writeln!(
            out,
            "uniform {prefix}sampler{dim} {};",
            self.sampler_name(stage, sampler.slot)
        )?;
        Ok(())
    }

    fn begin_entry(
        &self,
        out: &mut String,
        _stage: ShaderStage,
        _needs_instance_id: bool,
    ) -> fmt::Result {
        out.write_str("void main()\n{\n")
    }

    fn end_entry(&self, out: &mut String, _stage: ShaderStage) -> fmt::Result {
        out.write_str(";\n}\n")
    }

    fn write_attribute(&self, out: &mut String, attribute: &AttributeNode) -> fmt::Result {
        write!(out, "a{}", attribute.element_index)
    }

    fn write_transformed_ref(
        &self,
        out: &mut String,
        transformed: &TransformedNode,
    ) -> fmt::Result {
        write!(out, "v{}", transformed.semantic)
    }

    fn write_rasterized_ref(&self, out: &mut String, rasterized: &RasterizedNode) -> fmt::Result {
        write!(out, "r{}", rasterized.target)
    }

    fn begin_sample(
        &self,
        out: &mut String,
        stage: ShaderStage,
        sampler: &SamplerNode,
    ) -> Result<(), GenerateError> {
        write!(
            out,
            "(texture({}, ",
            self.sampler_name(stage, sampler.slot)
        )?;
        Ok(())
    }

    fn end_sample(&self, out: &mut String, sampler: &SamplerNode) -> Result<(), GenerateError> {
        out.write_char(')')?;

        // `texture` always returns four components
        let components = Self::sampler_components(sampler)?;
        if components < 4 {
            out.write_char('.')?;
            out.push_str(&"xyzw"[..components as usize]);
        }

        out.write_char(')')?;
        Ok(())
    }

    fn begin_cast(&self, out: &mut String, ty: DataType) -> fmt::Result {
        write!(out, "{}(", self.type_name(ty))
    }
}
