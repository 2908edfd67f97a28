use std::fmt::{self, Write};

use ard_shader_graph::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    code_gen::{lower_common, Lowering, ShaderCodeGen},
    error::GenerateError,
    layout::pack_offset,
};

/// Generates HLSL using constant buffers with explicit `packoffset`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HlslCodeGen {
    /// Shader model used to build the compilation profile, as `(major, minor)`.
    pub shader_model: (u32, u32),
}

impl Default for HlslCodeGen {
    fn default() -> Self {
        Self {
            shader_model: (4, 0),
        }
    }
}

/// Struct type and variable name of the entry point's input and output.
struct EntrySignature {
    input_type: &'static str,
    input: &'static str,
    output_type: &'static str,
    output: &'static str,
}

impl HlslCodeGen {
    fn signature(stage: ShaderStage) -> EntrySignature {
        match stage {
            ShaderStage::Vertex => EntrySignature {
                input_type: "A",
                input: "a",
                output_type: "V",
                output: "v",
            },
            ShaderStage::Pixel => EntrySignature {
                input_type: "V",
                input: "v",
                output_type: "R",
                output: "r",
            },
        }
    }

    #[inline]
    fn semantic(semantic: u32) -> String {
        format!("TEXCOORD{semantic}")
    }
}

impl ShaderCodeGen for HlslCodeGen {
    fn name(&self) -> &'static str {
        "HLSL"
    }

    fn type_name(&self, ty: DataType) -> &'static str {
        match ty {
            DataType::Float => "float",
            DataType::Float2 => "float2",
            DataType::Float3 => "float3",
            DataType::Float4 => "float4",
            DataType::Float3x3 => "float3x3",
            DataType::Float4x4 => "float4x4",
            DataType::UInt => "uint",
            DataType::UInt2 => "uint2",
            DataType::UInt3 => "uint3",
            DataType::UInt4 => "uint4",
            DataType::Int => "int",
            DataType::Int2 => "int2",
            DataType::Int3 => "int3",
            DataType::Int4 => "int4",
        }
    }

    fn lower(&self, op: Operation) -> Option<Lowering> {
        let lowering = match op {
            Operation::Mul => Lowering::Call("mul"),
            Operation::SetPosition => Lowering::SetOutput("v.vTP"),
            Operation::GetInstanceId => Lowering::Builtin("sI"),
            Operation::Saturate => Lowering::Call("saturate"),
            Operation::Float11to2 => Lowering::Call("float2"),
            Operation::Float111to3 => Lowering::Call("float3"),
            Operation::Float1111to4 | Operation::Float31to4 | Operation::Float211to4 => {
                Lowering::Call("float4")
            }
            Operation::Ddx => Lowering::Call("ddx"),
            Operation::Ddy => Lowering::Call("ddy"),
            Operation::Clip => Lowering::Call("clip"),
            op => return lower_common(op),
        };

        Some(lowering)
    }

    fn attribute_key(&self, attribute: &AttributeNode) -> u32 {
        attribute.semantic
    }

    fn entry_point(&self, stage: ShaderStage) -> &'static str {
        match stage {
            ShaderStage::Vertex => "VS",
            ShaderStage::Pixel => "PS",
        }
    }

    fn profile(&self, stage: ShaderStage) -> Option<String> {
        let (major, minor) = self.shader_model;
        let prefix = match stage {
            ShaderStage::Vertex => "vs",
            ShaderStage::Pixel => "ps",
        };
        Some(format!("{prefix}_{major}_{minor}"))
    }

    fn uniform_block_name(&self, _stage: ShaderStage, slot: u32) -> String {
        format!("CB{slot}")
    }

    fn sampler_name(&self, _stage: ShaderStage, slot: u32) -> String {
        format!("t{slot}")
    }

    fn begin_shader(&self, _out: &mut String, _stage: ShaderStage) -> fmt::Result {
        Ok(())
    }

    fn write_attributes(&self, out: &mut String, attributes: &[AttributeNode]) -> fmt::Result {
        out.write_str("struct A\n{\n")?;
        for attribute in attributes {
            writeln!(
                out,
                "\t{} a{} : {};",
                self.type_name(attribute.ty),
                attribute.semantic,
                Self::semantic(attribute.semantic)
            )?;
        }
        out.write_str("};\n")
    }

    fn write_transformed(
        &self,
        out: &mut String,
        _stage: ShaderStage,
        transformed: &[TransformedNode],
    ) -> fmt::Result {
        out.write_str("struct V\n{\n\tfloat4 vTP : SV_Position;\n")?;
        for node in transformed {
            writeln!(
                out,
                "\t{} v{} : {};",
                self.type_name(node.ty),
                node.semantic,
                Self::semantic(node.semantic)
            )?;
        }
        out.write_str("};\n")
    }

    fn write_rasterized(&self, out: &mut String, rasterized: &[RasterizedNode]) -> fmt::Result {
        out.write_str("struct R\n{\n")?;
        for node in rasterized {
            writeln!(
                out,
                "\t{} r{target} : SV_Target{target};",
                self.type_name(node.ty),
                target = node.target
            )?;
        }
        out.write_str("};\n")
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
            "cbuffer {} : register(b{slot})\n{{",
            self.uniform_block_name(stage, slot)
        )?;

        for uniform in uniforms {
            let pack = pack_offset(slot, uniform)?;

            write!(out, "\t{} ", self.type_name(uniform.ty))?;
            self.write_uniform(out, slot, uniform.offset)?;
            if uniform.count > 1 {
                write!(out, "[{}]", uniform.count)?;
            }
            writeln!(out, " : packoffset({pack});")?;
        }

        writeln!(out, "}};")?;
        Ok(())
    }

    fn write_sampler(
        &self,
        out: &mut String,
        _stage: ShaderStage,
        sampler: &SamplerNode,
    ) -> Result<(), GenerateError> {
        if sampler.ty.is_matrix() {
            return Err(GenerateError::InvalidSamplerValueType {
                slot: sampler.slot,
                ty: sampler.ty,
            });
        }

        let texture = match sampler.dim {
            SamplerDim::Dim1D => "Texture1D",
            SamplerDim::Dim2D => "Texture2D",
            SamplerDim::Dim3D => "Texture3D",
            // Integer cube maps can't be filtered with `Sample`
            SamplerDim::Cube if sampler.ty.scalar_kind() == ScalarKind::Float => "TextureCube",
            SamplerDim::Cube => {
                return Err(GenerateError::InvalidSamplerCoordType {
                    slot: sampler.slot,
                    dim: sampler.dim,
                    backend: self.name(),
                })
            }
        };

        let slot = sampler.slot;
        writeln!(
            out,
            "{texture}<{}> t{slot} : register(t{slot});",
            self.type_name(sampler.ty)
        )?;
        writeln!(out, "SamplerState s{slot} : register(s{slot});")?;
        Ok(())
    }

    fn begin_entry(
        &self,
        out: &mut String,
        stage: ShaderStage,
        needs_instance_id: bool,
    ) -> fmt::Result {
        let sig = Self::signature(stage);
        write!(
            out,
            "{} {}({} {}",
            sig.output_type,
            self.entry_point(stage),
            sig.input_type,
            sig.input
        )?;

        if needs_instance_id {
            out.write_str(", uint sI : SV_InstanceID")?;
        }

        write!(out, ")\n{{\n\t{} {};\n", sig.output_type, sig.output)
    }

    fn end_entry(&self, out: &mut String, stage: ShaderStage) -> fmt::Result {
        write!(out, ";\n\treturn {};\n}}\n", Self::signature(stage).output)
    }

    fn write_attribute(&self, out: &mut String, attribute: &AttributeNode) -> fmt::Result {
        write!(out, "a.a{}", attribute.semantic)
    }

    fn write_transformed_ref(
        &self,
        out: &mut String,
        transformed: &TransformedNode,
    ) -> fmt::Result {
        write!(out, "v.v{}", transformed.semantic)
    }

    fn write_rasterized_ref(&self, out: &mut String, rasterized: &RasterizedNode) -> fmt::Result {
        write!(out, "r.r{}", rasterized.target)
    }

    fn begin_sample(
        &self,
        out: &mut String,
        _stage: ShaderStage,
        sampler: &SamplerNode,
    ) -> Result<(), GenerateError> {
        write!(out, "t{slot}.Sample(s{slot}, ", slot = sampler.slot)?;
        Ok(())
    }

    fn end_sample(&self, out: &mut String, _sampler: &SamplerNode) -> Result<(), GenerateError> {
        out.write_char(')')?;
        Ok(())
    }

    fn begin_cast(&self, out: &mut String, ty: DataType) -> fmt::Result {
        write!(out, "({})(", self.type_name(ty))
    }
}
