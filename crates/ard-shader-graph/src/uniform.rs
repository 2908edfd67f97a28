use serde::{Deserialize, Serialize};

use crate::{data_type::DataType, node::NodeId, GraphError};

/// Size of one register of a uniform buffer.
pub const REGISTER_SIZE: u32 = 16;

/// Index of a uniform group inside of a [`ShaderGraph`](crate::graph::ShaderGraph).
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UniformGroupId(pub(crate) u32);

/// A collection of uniforms sharing one buffer slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformGroup {
    slot: u32,
    /// Number of bytes occupied by the uniforms added so far.
    size: u32,
    uniforms: Vec<NodeId>,
}

impl UniformGroupId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl UniformGroup {
    pub(crate) fn new(slot: u32) -> Self {
        Self {
            slot,
            size: 0,
            uniforms: Vec::default(),
        }
    }

    #[inline(always)]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Size of the group in bytes, rounded up to a whole register.
    #[inline(always)]
    pub fn size(&self) -> u32 {
        // `push` only accepts uniforms whose end can be rounded up
        align_up(self.size, REGISTER_SIZE).unwrap_or(self.size)
    }

    /// Uniform nodes belonging to the group, in the order they were added.
    #[inline(always)]
    pub fn uniforms(&self) -> &[NodeId] {
        &self.uniforms
    }

    /// Finds the next offset suitable for a uniform of the given type and array count.
    ///
    /// Vectors of three or four components, matrices, and arrays start on a register boundary.
    /// Two component vectors start on an 8 byte boundary. Everything else is 4 byte aligned.
    ///
    /// Returns `None` if the offset doesn't fit in 32 bits.
    pub fn next_offset(&self, ty: DataType, count: u32) -> Option<u32> {
        let alignment = if count > 1 || ty.is_matrix() {
            REGISTER_SIZE
        } else {
            match ty.components() {
                Some(1) => 4,
                Some(2) => 8,
                _ => REGISTER_SIZE,
            }
        };

        align_up(self.size, alignment)
    }

    pub(crate) fn push(
        &mut self,
        id: NodeId,
        ty: DataType,
        offset: u32,
        count: u32,
    ) -> Result<(), GraphError> {
        let end = footprint(ty)
            .checked_mul(count.max(1))
            .and_then(|size| offset.checked_add(size))
            .filter(|end| align_up(*end, REGISTER_SIZE).is_some())
            .ok_or(GraphError::UniformOverflow { offset, count })?;

        self.size = self.size.max(end);
        self.uniforms.push(id);
        Ok(())
    }
}

/// Bytes a value occupies inside a uniform buffer. Matrix columns are padded to a full register.
#[inline]
pub fn footprint(ty: DataType) -> u32 {
    match ty {
        DataType::Float3x3 => 3 * REGISTER_SIZE,
        ty => ty.size(),
    }
}

#[inline(always)]
pub(crate) const fn align_up(value: u32, alignment: u32) -> Option<u32> {
    match value.checked_add(alignment - 1) {
        Some(value) => Some(value / alignment * alignment),
        None => None,
    }
}
