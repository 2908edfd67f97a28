use std::ops::Index;

use smallvec::SmallVec;

use crate::{
    data_type::DataType,
    node::*,
    uniform::{UniformGroup, UniformGroupId},
    GraphError,
};

/// Arena holding the nodes of one or more shader expressions.
///
/// Nodes can only refer to nodes that were added before them, so the graph is acyclic by
/// construction. Nodes are never mutated or removed once added, which makes the graph safe to
/// share between generators running on different threads.
#[derive(Debug, Default, Clone)]
pub struct ShaderGraph {
    nodes: Vec<Node>,
    groups: Vec<UniformGroup>,
}

impl ShaderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    #[inline(always)]
    pub fn group(&self, id: UniformGroupId) -> Option<&UniformGroup> {
        self.groups.get(id.index())
    }

    pub fn groups(&self) -> impl Iterator<Item = (UniformGroupId, &UniformGroup)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(i, group)| (UniformGroupId(i as u32), group))
    }

    /// Creates a new uniform group bound to the buffer `slot`.
    pub fn add_uniform_group(&mut self, slot: u32) -> UniformGroupId {
        let id = UniformGroupId(self.groups.len() as u32);
        self.groups.push(UniformGroup::new(slot));
        id
    }

    /// Adds a node to the graph, validating that everything it refers to already exists.
    pub fn push(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = NodeId(self.nodes.len() as u32);

        for child in node.children() {
            if child.index() >= self.nodes.len() {
                return Err(GraphError::UnknownNode(child));
            }
        }

        match &node {
            Node::Operation { op, args } => {
                if args.len() != op.arity() {
                    return Err(GraphError::OperandCount {
                        op: *op,
                        expected: op.arity(),
                        found: args.len(),
                    });
                }
            }
            Node::Sample { sampler, .. } => {
                if !matches!(self[*sampler], Node::Sampler(_)) {
                    return Err(GraphError::ExpectedSampler(*sampler));
                }
            }
            Node::Uniform(uniform) => {
                let group = self
                    .groups
                    .get_mut(uniform.group.index())
                    .ok_or(GraphError::UnknownUniformGroup(uniform.group))?;
                group.push(id, uniform.ty, uniform.offset, uniform.count)?;
            }
            _ => {}
        }

        self.nodes.push(node);
        Ok(id)
    }

    pub fn float(&mut self, value: f32) -> NodeId {
        self.push_leaf(Node::FloatConst(value))
    }

    pub fn int(&mut self, value: i32) -> NodeId {
        self.push_leaf(Node::IntConst(value))
    }

    pub fn attribute(&mut self, ty: DataType, element_index: u32, semantic: u32) -> NodeId {
        self.push_leaf(Node::Attribute(AttributeNode {
            ty,
            element_index,
            semantic,
        }))
    }

    /// Adds a uniform to `group` at the next suitable offset.
    pub fn add_uniform(
        &mut self,
        group: UniformGroupId,
        ty: DataType,
        count: u32,
    ) -> Result<NodeId, GraphError> {
        let uniform_group = self
            .group(group)
            .ok_or(GraphError::UnknownUniformGroup(group))?;
        let offset = uniform_group
            .next_offset(ty, count)
            .ok_or(GraphError::UniformOverflow {
                offset: uniform_group.size(),
                count,
            })?;
        self.uniform_at(group, ty, offset, count)
    }

    /// Adds a uniform to `group` at an explicit byte offset.
    pub fn uniform_at(
        &mut self,
        group: UniformGroupId,
        ty: DataType,
        offset: u32,
        count: u32,
    ) -> Result<NodeId, GraphError> {
        self.push(Node::Uniform(UniformNode {
            ty,
            group,
            offset,
            count,
        }))
    }

    pub fn sampler(&mut self, ty: DataType, dim: SamplerDim, slot: u32) -> NodeId {
        self.push_leaf(Node::Sampler(SamplerNode { ty, dim, slot }))
    }

    pub fn temp(&mut self, ty: DataType) -> NodeId {
        self.push_leaf(Node::Temp(TempNode { ty }))
    }

    pub fn transformed(&mut self, ty: DataType, semantic: u32) -> NodeId {
        self.push_leaf(Node::Transformed(TransformedNode { ty, semantic }))
    }

    pub fn rasterized(&mut self, ty: DataType, target: u32) -> NodeId {
        self.push_leaf(Node::Rasterized(RasterizedNode { ty, target }))
    }

    pub fn sequence(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, GraphError> {
        self.push(Node::Sequence(a, b))
    }

    /// Chains the statements together so they are evaluated in order.
    pub fn sequence_all(&mut self, statements: &[NodeId]) -> Result<NodeId, GraphError> {
        let (first, rest) = statements.split_first().ok_or(GraphError::EmptySequence)?;
        rest.iter()
            .try_fold(*first, |acc, statement| self.sequence(acc, *statement))
    }

    pub fn swizzle(&mut self, node: NodeId, mask: &str) -> Result<NodeId, GraphError> {
        let mask = Swizzle::new(mask)?;
        self.push(Node::Swizzle { node, mask })
    }

    pub fn operation(&mut self, op: Operation, args: &[NodeId]) -> Result<NodeId, GraphError> {
        self.push(Node::Operation {
            op,
            args: SmallVec::from_slice(args),
        })
    }

    #[inline]
    pub fn assign(&mut self, dst: NodeId, src: NodeId) -> Result<NodeId, GraphError> {
        self.operation(Operation::Assign, &[dst, src])
    }

    pub fn sample(&mut self, sampler: NodeId, coords: NodeId) -> Result<NodeId, GraphError> {
        self.push(Node::Sample { sampler, coords })
    }

    pub fn cast(&mut self, node: NodeId, ty: DataType) -> Result<NodeId, GraphError> {
        self.push(Node::Cast { node, ty })
    }

    #[inline(always)]
    fn push_leaf(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}

impl Index<NodeId> for ShaderGraph {
    type Output = Node;

    #[inline(always)]
    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_references_are_rejected() {
        let mut graph = ShaderGraph::new();
        let a = graph.float(1.0);
        let res = graph.push(Node::Sequence(a, NodeId(7)));
        assert!(matches!(res, Err(GraphError::UnknownNode(NodeId(7)))));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn operand_count_is_checked() {
        let mut graph = ShaderGraph::new();
        let a = graph.float(1.0);
        let res = graph.operation(Operation::Add, &[a]);
        assert!(matches!(
            res,
            Err(GraphError::OperandCount {
                op: Operation::Add,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn sample_requires_sampler() {
        let mut graph = ShaderGraph::new();
        let coords = graph.transformed(DataType::Float2, 0);
        let not_a_sampler = graph.temp(DataType::Float4);
        assert!(matches!(
            graph.sample(not_a_sampler, coords),
            Err(GraphError::ExpectedSampler(_))
        ));

        let sampler = graph.sampler(DataType::Float4, SamplerDim::Dim2D, 0);
        assert!(graph.sample(sampler, coords).is_ok());
    }

    #[test]
    fn uniforms_are_tracked_by_group() {
        let mut graph = ShaderGraph::new();
        let group = graph.add_uniform_group(3);
        let a = graph.add_uniform(group, DataType::Float, 1).unwrap();
        let b = graph.add_uniform(group, DataType::Float4x4, 1).unwrap();

        let group = graph.group(group).unwrap();
        assert_eq!(group.slot(), 3);
        assert_eq!(group.uniforms(), &[a, b]);
        assert_eq!(group.size(), 80);

        assert!(matches!(
            graph.add_uniform(UniformGroupId(9), DataType::Float, 1),
            Err(GraphError::UnknownUniformGroup(_))
        ));
    }

    #[test]
    fn uniform_offset_allocation() {
        let mut graph = ShaderGraph::new();
        let group = graph.add_uniform_group(0);

        let offsets: Vec<u32> = [
            (DataType::Float, 1),
            (DataType::Float2, 1),
            (DataType::Float, 1),
            (DataType::Float3, 1),
            (DataType::Float, 1),
            (DataType::Float4, 4),
            (DataType::Float3x3, 1),
            (DataType::UInt, 1),
        ]
        .into_iter()
        .map(|(ty, count)| {
            let id = graph.add_uniform(group, ty, count).unwrap();
            match &graph[id] {
                Node::Uniform(uniform) => uniform.offset,
                _ => unreachable!(),
            }
        })
        .collect();

        assert_eq!(offsets, vec![0, 8, 16, 32, 44, 48, 112, 160]);
        assert_eq!(graph.group(group).unwrap().size(), 176);
    }

    #[test]
    fn uniform_end_must_fit() {
        let mut graph = ShaderGraph::new();
        let group = graph.add_uniform_group(0);

        assert!(matches!(
            graph.uniform_at(group, DataType::Float4, 4_294_967_280, 2),
            Err(GraphError::UniformOverflow {
                offset: 4_294_967_280,
                count: 2
            })
        ));
        assert!(matches!(
            graph.uniform_at(group, DataType::Float4x4, 0, 70_000_000),
            Err(GraphError::UniformOverflow { .. })
        ));

        // Rejected uniforms leave the graph untouched
        assert!(graph.is_empty());
        assert!(graph.group(group).unwrap().uniforms().is_empty());
        assert_eq!(graph.group(group).unwrap().size(), 0);

        // The last register of the address range is still usable
        let last = graph
            .uniform_at(group, DataType::Float4, 4_294_967_264, 1)
            .unwrap();
        assert_eq!(graph.group(group).unwrap().uniforms(), &[last]);
        assert_eq!(graph.group(group).unwrap().size(), 4_294_967_280);
        assert!(matches!(
            graph.add_uniform(group, DataType::Float4, 1),
            Err(GraphError::UniformOverflow { .. })
        ));
    }

    #[test]
    fn sequence_all_chains_in_order() {
        let mut graph = ShaderGraph::new();
        let a = graph.int(1);
        let b = graph.int(2);
        let c = graph.int(3);
        let seq = graph.sequence_all(&[a, b, c]).unwrap();

        match &graph[seq] {
            Node::Sequence(first, last) => {
                assert_eq!(*last, c);
                assert_eq!(graph[*first], Node::Sequence(a, b));
            }
            _ => panic!("expected a sequence"),
        }

        assert!(matches!(
            graph.sequence_all(&[]),
            Err(GraphError::EmptySequence)
        ));
    }
}
