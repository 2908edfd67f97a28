use serde::{Deserialize, Serialize};

/// Type of a value flowing through a shader graph.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Float,
    Float2,
    Float3,
    Float4,
    Float3x3,
    Float4x4,
    UInt,
    UInt2,
    UInt3,
    UInt4,
    Int,
    Int2,
    Int3,
    Int4,
}

/// Base scalar of a [`DataType`].
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Float,
    UInt,
    Int,
}

impl DataType {
    /// Size of the value in bytes, without any padding.
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            DataType::Float | DataType::UInt | DataType::Int => 4,
            DataType::Float2 | DataType::UInt2 | DataType::Int2 => 8,
            DataType::Float3 | DataType::UInt3 | DataType::Int3 => 12,
            DataType::Float4 | DataType::UInt4 | DataType::Int4 => 16,
            DataType::Float3x3 => 36,
            DataType::Float4x4 => 64,
        }
    }

    #[inline]
    pub const fn scalar_kind(self) -> ScalarKind {
        match self {
            DataType::Float
            | DataType::Float2
            | DataType::Float3
            | DataType::Float4
            | DataType::Float3x3
            | DataType::Float4x4 => ScalarKind::Float,
            DataType::UInt | DataType::UInt2 | DataType::UInt3 | DataType::UInt4 => {
                ScalarKind::UInt
            }
            DataType::Int | DataType::Int2 | DataType::Int3 | DataType::Int4 => ScalarKind::Int,
        }
    }

    /// Number of components for scalars and vectors. `None` for matrices.
    #[inline]
    pub const fn components(self) -> Option<u32> {
        match self {
            DataType::Float3x3 | DataType::Float4x4 => None,
            _ => Some(self.size() / 4),
        }
    }

    #[inline]
    pub const fn is_matrix(self) -> bool {
        matches!(self, DataType::Float3x3 | DataType::Float4x4)
    }

    /// Scalar or vector type with the given base and number of components.
    pub const fn vector(kind: ScalarKind, components: u32) -> Option<DataType> {
        let ty = match (kind, components) {
            (ScalarKind::Float, 1) => DataType::Float,
            (ScalarKind::Float, 2) => DataType::Float2,
            (ScalarKind::Float, 3) => DataType::Float3,
            (ScalarKind::Float, 4) => DataType::Float4,
            (ScalarKind::UInt, 1) => DataType::UInt,
            (ScalarKind::UInt, 2) => DataType::UInt2,
            (ScalarKind::UInt, 3) => DataType::UInt3,
            (ScalarKind::UInt, 4) => DataType::UInt4,
            (ScalarKind::Int, 1) => DataType::Int,
            (ScalarKind::Int, 2) => DataType::Int2,
            (ScalarKind::Int, 3) => DataType::Int3,
            (ScalarKind::Int, 4) => DataType::Int4,
            _ => return None,
        };
        Some(ty)
    }

    /// Type produced by indexing a value of this type. Matrices yield a column and vectors yield
    /// a scalar. `None` for scalars.
    pub const fn element(self) -> Option<DataType> {
        match self {
            DataType::Float3x3 => Some(DataType::Float3),
            DataType::Float4x4 => Some(DataType::Float4),
            ty => match ty.components() {
                Some(1) | None => None,
                Some(_) => DataType::vector(ty.scalar_kind(), 1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(DataType::Float.size(), 4);
        assert_eq!(DataType::UInt3.size(), 12);
        assert_eq!(DataType::Int4.size(), 16);
        assert_eq!(DataType::Float3x3.size(), 36);
        assert_eq!(DataType::Float4x4.size(), 64);
    }

    #[test]
    fn components() {
        assert_eq!(DataType::Float2.components(), Some(2));
        assert_eq!(DataType::UInt.components(), Some(1));
        assert_eq!(DataType::Int4.components(), Some(4));
        assert_eq!(DataType::Float4x4.components(), None);
        assert_eq!(DataType::Float3x3.scalar_kind(), ScalarKind::Float);
        assert_eq!(DataType::UInt2.scalar_kind(), ScalarKind::UInt);
    }

    #[test]
    fn vectors_and_elements() {
        assert_eq!(DataType::vector(ScalarKind::Int, 3), Some(DataType::Int3));
        assert_eq!(DataType::vector(ScalarKind::Float, 1), Some(DataType::Float));
        assert_eq!(DataType::vector(ScalarKind::UInt, 5), None);
        assert_eq!(DataType::vector(ScalarKind::Float, 0), None);

        assert_eq!(DataType::Float4x4.element(), Some(DataType::Float4));
        assert_eq!(DataType::Float3x3.element(), Some(DataType::Float3));
        assert_eq!(DataType::UInt3.element(), Some(DataType::UInt));
        assert_eq!(DataType::Float.element(), None);
    }
}
