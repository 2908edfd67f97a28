//! Placement of uniforms inside of uniform buffers.
//!
//! GLSL uses `std140` blocks where the position of a field is implied by the fields before it,
//! so padding fields are inserted to move each uniform to its declared offset. HLSL constant
//! buffers place every field explicitly with `packoffset`.

use std::{fmt, ops::Range};

use ard_shader_graph::prelude::*;
use smallvec::SmallVec;

use crate::error::{GenerateError, LayoutViolation};

/// Unused space inserted into a `std140` block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Padding {
    pub offset: u32,
    /// Number of 4 byte components. Between 1 and 4.
    pub components: u32,
}

/// Tracks where the next field of a `std140` block would be placed.
#[derive(Debug)]
pub struct Std140Layout {
    slot: u32,
    cursor: u32,
}

/// Register and components selected by a `packoffset` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOffset {
    pub register: u32,
    /// `None` when the whole register (or a run of whole registers) is used.
    pub components: Option<Range<u32>>,
}

const COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];

/// Checks shared by every backend.
pub fn validate_uniform(slot: u32, uniform: &UniformNode) -> Result<(), GenerateError> {
    if uniform.offset % 4 != 0 {
        return Err(layout_err(slot, uniform, LayoutViolation::Misaligned));
    }

    let size = uniform.ty.size();
    if uniform.count > 1 && size % REGISTER_SIZE != 0 {
        return Err(layout_err(slot, uniform, LayoutViolation::ArrayStride(size)));
    }

    Ok(())
}

impl Std140Layout {
    pub fn new(slot: u32) -> Self {
        Self { slot, cursor: 0 }
    }

    /// Moves the cursor up to `uniform`, returning the padding needed to get there, and then
    /// past it.
    pub fn place(
        &mut self,
        uniform: &UniformNode,
    ) -> Result<SmallVec<[Padding; 4]>, GenerateError> {
        validate_uniform(self.slot, uniform)?;

        let end = footprint(uniform.ty)
            .checked_mul(uniform.count.max(1))
            .and_then(|size| uniform.offset.checked_add(size))
            .ok_or_else(|| layout_err(self.slot, uniform, LayoutViolation::Overflow))?;

        let alignment = base_alignment(uniform);
        if uniform.offset % alignment != 0 {
            return Err(layout_err(
                self.slot,
                uniform,
                LayoutViolation::BaseAlignment(alignment),
            ));
        }

        // Values never straddle a register
        let size = uniform.ty.size();
        if self.cursor % REGISTER_SIZE + size > REGISTER_SIZE {
            self.cursor = align_up(self.cursor, REGISTER_SIZE)
                .ok_or_else(|| layout_err(self.slot, uniform, LayoutViolation::Overflow))?;
        }

        let mut padding = SmallVec::new();
        while self.cursor < uniform.offset {
            let gap = uniform.offset - self.cursor;
            let room = REGISTER_SIZE - self.cursor % REGISTER_SIZE;
            let max = gap.min(room);

            let filler = [16, 12, 8, 4]
                .into_iter()
                .find(|&size| size <= max && self.cursor % filler_alignment(size) == 0)
                .unwrap_or(4);

            padding.push(Padding {
                offset: self.cursor,
                components: filler / 4,
            });
            self.cursor += filler;
        }

        if self.cursor > uniform.offset {
            return Err(layout_err(
                self.slot,
                uniform,
                LayoutViolation::Overlap(self.cursor),
            ));
        }

        self.cursor = end;

        Ok(padding)
    }
}

/// Computes the `packoffset` of a uniform inside of a constant buffer.
pub fn pack_offset(slot: u32, uniform: &UniformNode) -> Result<PackOffset, GenerateError> {
    validate_uniform(slot, uniform)?;

    let register = uniform.offset / REGISTER_SIZE;
    let within = uniform.offset % REGISTER_SIZE;
    let size = uniform.ty.size();

    // Arrays and values of at least a register must start at a register boundary
    if uniform.count > 1 || size >= REGISTER_SIZE {
        if within != 0 {
            return Err(layout_err(
                slot,
                uniform,
                LayoutViolation::RegisterCrossing(size),
            ));
        }

        return Ok(PackOffset {
            register,
            components: None,
        });
    }

    if within + size > REGISTER_SIZE {
        return Err(layout_err(
            slot,
            uniform,
            LayoutViolation::RegisterCrossing(size),
        ));
    }

    Ok(PackOffset {
        register,
        components: Some((within / 4)..((within + size) / 4)),
    })
}

impl fmt::Display for PackOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.register)?;
        if let Some(components) = &self.components {
            f.write_str(".")?;
            for i in components.clone() {
                write!(f, "{}", COMPONENTS[i as usize])?;
            }
        }
        Ok(())
    }
}

/// Base alignment of a uniform under `std140` rules.
fn base_alignment(uniform: &UniformNode) -> u32 {
    if uniform.count > 1 || uniform.ty.is_matrix() {
        return REGISTER_SIZE;
    }

    match uniform.ty.components() {
        Some(1) => 4,
        Some(2) => 8,
        _ => REGISTER_SIZE,
    }
}

fn filler_alignment(size: u32) -> u32 {
    match size {
        4 => 4,
        8 => 8,
        _ => REGISTER_SIZE,
    }
}

#[inline(always)]
fn align_up(value: u32, alignment: u32) -> Option<u32> {
    Some(value.checked_add(alignment - 1)? / alignment * alignment)
}

#[inline(always)]
fn layout_err(slot: u32, uniform: &UniformNode, violation: LayoutViolation) -> GenerateError {
    GenerateError::Layout {
        slot,
        offset: uniform.offset,
        violation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(ty: DataType, offset: u32, count: u32) -> UniformNode {
        let mut graph = ShaderGraph::new();
        let group = graph.add_uniform_group(0);
        let id = graph.uniform_at(group, ty, offset, count).unwrap();
        match &graph[id] {
            Node::Uniform(uniform) => *uniform,
            _ => unreachable!(),
        }
    }

    fn violation(res: Result<impl fmt::Debug, GenerateError>) -> LayoutViolation {
        match res {
            Err(GenerateError::Layout { violation, .. }) => violation,
            other => panic!("expected a layout error, got {other:?}"),
        }
    }

    #[test]
    fn std140_contiguous_scalars() {
        let mut layout = Std140Layout::new(0);
        assert!(layout.place(&uniform(DataType::Float, 0, 1)).unwrap().is_empty());
        assert!(layout.place(&uniform(DataType::Float, 4, 1)).unwrap().is_empty());
    }

    #[test]
    fn std140_padding_respects_alignment() {
        let mut layout = Std140Layout::new(0);
        layout.place(&uniform(DataType::Float, 0, 1)).unwrap();
        // The vector can't start at 4, so only the second register needs filling
        let padding = layout.place(&uniform(DataType::Float4, 32, 1)).unwrap();
        assert_eq!(
            padding.as_slice(),
            &[Padding {
                offset: 16,
                components: 4
            }]
        );
    }

    #[test]
    fn std140_padding_inside_a_register() {
        let mut layout = Std140Layout::new(0);
        layout.place(&uniform(DataType::Float, 0, 1)).unwrap();
        let padding = layout.place(&uniform(DataType::Float, 12, 1)).unwrap();
        assert_eq!(
            padding.as_slice(),
            &[
                Padding {
                    offset: 4,
                    components: 1
                },
                Padding {
                    offset: 8,
                    components: 1
                },
            ]
        );

        let mut layout = Std140Layout::new(0);
        layout.place(&uniform(DataType::Float, 0, 1)).unwrap();
        let padding = layout.place(&uniform(DataType::Float2, 24, 1)).unwrap();
        assert_eq!(
            padding.as_slice(),
            &[
                Padding {
                    offset: 4,
                    components: 1
                },
                Padding {
                    offset: 8,
                    components: 2
                },
                Padding {
                    offset: 16,
                    components: 2
                },
            ]
        );
    }

    #[test]
    fn std140_overflow() {
        let mut layout = Std140Layout::new(0);
        let mut array = uniform(DataType::Float4x4, 0, 1);
        array.count = 70_000_000;
        assert_eq!(
            violation(layout.place(&array)),
            LayoutViolation::Overflow
        );

        let mut layout = Std140Layout::new(0);
        let mut last = uniform(DataType::Float4, 0, 1);
        last.offset = 4_294_967_280;
        last.count = 2;
        assert_eq!(violation(layout.place(&last)), LayoutViolation::Overflow);
    }

    #[test]
    fn std140_register_straddle() {
        let mut layout = Std140Layout::new(0);
        layout.place(&uniform(DataType::Float2, 0, 1)).unwrap();
        layout.place(&uniform(DataType::Float, 8, 1)).unwrap();
        // The matrix can't start at 12, so the cursor moves to the next register on its own
        let padding = layout.place(&uniform(DataType::Float4x4, 16, 1)).unwrap();
        assert!(padding.is_empty());

        let padding = layout.place(&uniform(DataType::Float3, 96, 1)).unwrap();
        assert_eq!(
            padding.as_slice(),
            &[
                Padding {
                    offset: 80,
                    components: 4
                }
            ]
        );
    }

    #[test]
    fn std140_errors() {
        let mut layout = Std140Layout::new(0);
        assert_eq!(
            violation(layout.place(&uniform(DataType::Float, 2, 1))),
            LayoutViolation::Misaligned
        );
        assert_eq!(
            violation(layout.place(&uniform(DataType::Float3, 0, 3))),
            LayoutViolation::ArrayStride(12)
        );
        assert_eq!(
            violation(layout.place(&uniform(DataType::Float3, 4, 1))),
            LayoutViolation::BaseAlignment(16)
        );

        let mut layout = Std140Layout::new(0);
        layout.place(&uniform(DataType::Float4, 0, 1)).unwrap();
        assert_eq!(
            violation(layout.place(&uniform(DataType::Float, 8, 1))),
            LayoutViolation::Overlap(16)
        );
    }

    #[test]
    fn pack_offsets() {
        let pack = |ty, offset, count| pack_offset(0, &uniform(ty, offset, count)).unwrap();

        assert_eq!(pack(DataType::Float, 0, 1).to_string(), "c0.x");
        assert_eq!(pack(DataType::Float, 4, 1).to_string(), "c0.y");
        assert_eq!(pack(DataType::Float2, 24, 1).to_string(), "c1.zw");
        assert_eq!(pack(DataType::Float3, 36, 1).to_string(), "c2.yzw");
        assert_eq!(pack(DataType::Float4, 48, 1).to_string(), "c3");
        assert_eq!(pack(DataType::Float4x4, 64, 1).to_string(), "c4");
        assert_eq!(pack(DataType::Float4, 128, 8).to_string(), "c8");
    }

    #[test]
    fn pack_offset_errors() {
        let pack = |ty, offset, count| pack_offset(0, &uniform(ty, offset, count));

        assert_eq!(
            violation(pack(DataType::Float, 6, 1)),
            LayoutViolation::Misaligned
        );
        assert_eq!(
            violation(pack(DataType::Float3, 8, 1)),
            LayoutViolation::RegisterCrossing(12)
        );
        assert_eq!(
            violation(pack(DataType::Float4x4, 4, 1)),
            LayoutViolation::RegisterCrossing(64)
        );
        assert_eq!(
            violation(pack(DataType::Float2, 0, 2)),
            LayoutViolation::ArrayStride(8)
        );
    }
}
