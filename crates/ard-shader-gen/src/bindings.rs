use serde::{Deserialize, Serialize};

/// Associates a generated symbol with the slot it must be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub slot: u32,
}

/// Describes how the symbols of a generated shader map to hardware slots.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderBindings {
    pub uniform_blocks: Vec<Binding>,
    pub samplers: Vec<Binding>,
    pub attributes: Vec<Binding>,
    pub render_targets: Vec<Binding>,
}

/// Output of a shader generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    code: Vec<u8>,
    bindings: ShaderBindings,
    entry_point: &'static str,
    profile: Option<String>,
}

impl Binding {
    #[inline]
    pub fn new(name: impl Into<String>, slot: u32) -> Self {
        Self {
            name: name.into(),
            slot,
        }
    }
}

impl ShaderSource {
    pub(crate) fn new(
        code: Vec<u8>,
        bindings: ShaderBindings,
        entry_point: &'static str,
        profile: Option<String>,
    ) -> Self {
        Self {
            code,
            bindings,
            entry_point,
            profile,
        }
    }

    /// Generated source code.
    #[inline(always)]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[inline(always)]
    pub fn bindings(&self) -> &ShaderBindings {
        &self.bindings
    }

    /// Name of the function to invoke.
    #[inline(always)]
    pub fn entry_point(&self) -> &'static str {
        self.entry_point
    }

    /// Compilation target, for backends which need one.
    #[inline(always)]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }
}
