//! Shader source generation from [`ard_shader_graph`] expression graphs.
//!
//! Each run of the generator produces the source of one shader stage for one backend along with
//! a [`ShaderBindings`](bindings::ShaderBindings) table naming the uniform blocks, samplers,
//! attributes, and render targets of the shader and the slots they must be bound to.

pub mod bindings;
pub mod code_gen;
pub mod error;
pub mod generator;
pub mod layout;


pub mod prelude {
    pub use crate::bindings::*;
    pub use crate::code_gen::{
        glsl::GlslCodeGen, hlsl::HlslCodeGen, Lowering, ShaderBackend, ShaderCodeGen,
    };
    pub use crate::error::*;
    pub use crate::generator::generate;
}
