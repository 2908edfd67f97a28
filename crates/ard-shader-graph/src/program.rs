use serde::{Deserialize, Serialize};

use crate::{graph::ShaderGraph, node::*, GraphError};

/// Serialized description of a vertex and pixel shader pair sharing one graph.
///
/// Node ids are positions inside of `nodes`, and uniform group ids are positions inside of
/// `uniform_groups`. A node may only refer to nodes listed before it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderProgramDesc {
    /// Buffer slot of each uniform group.
    #[serde(default)]
    pub uniform_groups: Vec<u32>,
    pub nodes: Vec<Node>,
    /// Root of the vertex shader.
    pub vertex: NodeId,
    /// Root of the pixel shader.
    pub pixel: NodeId,
}

/// A validated graph with the roots of both stages.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    graph: ShaderGraph,
    vertex: NodeId,
    pixel: NodeId,
}

impl ShaderProgramDesc {
    pub fn into_program(self) -> Result<ShaderProgram, GraphError> {
        let mut graph = ShaderGraph::new();

        for slot in self.uniform_groups {
            graph.add_uniform_group(slot);
        }

        for node in self.nodes {
            graph.push(node)?;
        }

        for root in [self.vertex, self.pixel] {
            if graph.node(root).is_none() {
                return Err(GraphError::UnknownNode(root));
            }
        }

        Ok(ShaderProgram {
            graph,
            vertex: self.vertex,
            pixel: self.pixel,
        })
    }
}

impl ShaderProgram {
    #[inline(always)]
    pub fn graph(&self) -> &ShaderGraph {
        &self.graph
    }

    /// Root node of the given stage.
    #[inline(always)]
    pub fn root(&self, stage: ShaderStage) -> NodeId {
        match stage {
            ShaderStage::Vertex => self.vertex,
            ShaderStage::Pixel => self.pixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;

    const PROGRAM: &str = r#"
(
    uniform_groups: [0],
    nodes: [
        Attribute((ty: Float4, element_index: 0, semantic: 0)),
        Uniform((ty: Float4x4, group: 0, offset: 0, count: 1)),
        Operation(op: Mul, args: [1, 0]),
        Operation(op: SetPosition, args: [2]),
        Rasterized((ty: Float4, target: 0)),
        FloatConst(1.0),
        Operation(op: Float1111to4, args: [5, 5, 5, 5]),
        Operation(op: Assign, args: [4, 6]),
        Swizzle(node: 0, mask: "xy"),
    ],
    vertex: 3,
    pixel: 7,
)
"#;

    #[test]
    fn load_program() {
        let desc: ShaderProgramDesc = ron::de::from_str(PROGRAM).unwrap();
        let program = desc.into_program().unwrap();

        assert_eq!(program.graph().len(), 9);
        assert_eq!(program.root(ShaderStage::Vertex), NodeId(3));
        assert_eq!(program.root(ShaderStage::Pixel), NodeId(7));
        assert_eq!(
            program.graph()[NodeId(4)],
            Node::Rasterized(RasterizedNode {
                ty: DataType::Float4,
                target: 0
            })
        );

        let group = program.graph().groups().next().unwrap().1;
        assert_eq!(group.uniforms(), &[NodeId(1)]);
    }

    #[test]
    fn invalid_swizzle_is_rejected_when_parsing() {
        let src = PROGRAM.replace("\"xy\"", "\"xyq\"");
        assert!(ron::de::from_str::<ShaderProgramDesc>(&src).is_err());
    }

    #[test]
    fn cycles_are_rejected() {
        let desc = ShaderProgramDesc {
            uniform_groups: Vec::default(),
            nodes: vec![Node::FloatConst(0.0), Node::Sequence(NodeId(0), NodeId(1))],
            vertex: NodeId(1),
            pixel: NodeId(1),
        };
        assert!(matches!(
            desc.into_program(),
            Err(GraphError::UnknownNode(NodeId(1)))
        ));
    }

    #[test]
    fn missing_root() {
        let desc = ShaderProgramDesc {
            uniform_groups: Vec::default(),
            nodes: vec![Node::IntConst(0)],
            vertex: NodeId(0),
            pixel: NodeId(4),
        };
        assert!(matches!(
            desc.into_program(),
            Err(GraphError::UnknownNode(NodeId(4)))
        ));
    }
}
