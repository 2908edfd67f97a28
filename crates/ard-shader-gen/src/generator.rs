use std::fmt::{Display, Write};

use ard_log::{debug, trace};
use ard_shader_graph::prelude::*;
use rustc_hash::FxHashMap;

use crate::{
    bindings::{Binding, ShaderBindings, ShaderSource},
    code_gen::{Lowering, ShaderCodeGen},
    error::GenerateError,
};

/// Generates the source of one shader stage.
///
/// The graph is only read, so generators for several stages or backends may run over the same
/// graph at the same time.
pub fn generate<G: ShaderCodeGen + ?Sized>(
    code_gen: &G,
    graph: &ShaderGraph,
    root: NodeId,
    stage: ShaderStage,
) -> Result<ShaderSource, GenerateError> {
    GeneratorInstance::new(code_gen, graph, root, stage).generate()
}

/// Working state of a single generator run.
///
/// Registration walks the graph and collects every declaration the shader needs. Emission then
/// sorts and deduplicates the declarations and prints the shader.
pub struct GeneratorInstance<'a, G: ?Sized> {
    code_gen: &'a G,
    graph: &'a ShaderGraph,
    root: NodeId,
    stage: ShaderStage,
    attributes: Vec<AttributeNode>,
    uniforms: Vec<(UniformGroupId, UniformNode)>,
    samplers: Vec<SamplerNode>,
    /// Maps temps to their index, assigned in the order they were first encountered.
    temps: FxHashMap<NodeId, u32>,
    /// Value type of every temp, indexed by the temps index.
    temp_types: Vec<DataType>,
    transformed: Vec<TransformedNode>,
    rasterized: Vec<RasterizedNode>,
    needs_instance_id: bool,
    out: String,
}

impl<'a, G: ShaderCodeGen + ?Sized> GeneratorInstance<'a, G> {
    pub fn new(code_gen: &'a G, graph: &'a ShaderGraph, root: NodeId, stage: ShaderStage) -> Self {
        Self {
            code_gen,
            graph,
            root,
            stage,
            attributes: Vec::default(),
            uniforms: Vec::default(),
            samplers: Vec::default(),
            temps: FxHashMap::default(),
            temp_types: Vec::default(),
            transformed: Vec::default(),
            rasterized: Vec::default(),
            needs_instance_id: false,
            out: String::default(),
        }
    }

    /// Runs both passes, consuming the instance.
    pub fn generate(mut self) -> Result<ShaderSource, GenerateError> {
        if self.graph.node(self.root).is_none() {
            return Err(GenerateError::UnknownNode(self.root));
        }

        debug!(
            "generating {:?} shader with the {} backend",
            self.stage,
            self.code_gen.name()
        );

        self.register(self.root)?;

        trace!(
            "registered {} attributes, {} uniforms, {} samplers, {} temps, {} varyings, {} targets",
            self.attributes.len(),
            self.uniforms.len(),
            self.samplers.len(),
            self.temp_types.len(),
            self.transformed.len(),
            self.rasterized.len(),
        );

        self.emit()
    }

    fn register(&mut self, id: NodeId) -> Result<(), GenerateError> {
        let graph = self.graph;
        let node = &graph[id];

        match node {
            Node::FloatConst(_) | Node::IntConst(_) => {}
            Node::Attribute(attribute) => {
                self.require_stage(id, node, ShaderStage::Vertex)?;
                self.attributes.push(*attribute);
            }
            Node::Uniform(uniform) => self.uniforms.push((uniform.group, *uniform)),
            Node::Sampler(sampler) => self.samplers.push(*sampler),
            Node::Temp(temp) => {
                if !self.temps.contains_key(&id) {
                    self.temps.insert(id, self.temp_types.len() as u32);
                    self.temp_types.push(temp.ty);
                }
            }
            Node::Transformed(transformed) => self.transformed.push(*transformed),
            Node::Rasterized(rasterized) => {
                self.require_stage(id, node, ShaderStage::Pixel)?;
                self.rasterized.push(*rasterized);
            }
            Node::Sequence(a, b) => {
                self.register(*a)?;
                self.register(*b)?;
            }
            Node::Swizzle { node, .. } => self.register(*node)?,
            Node::Operation { op, args } => {
                match op {
                    Operation::GetInstanceId => {
                        self.require_stage(id, node, ShaderStage::Vertex)?;
                        self.needs_instance_id = true;
                    }
                    Operation::SetPosition => {
                        self.require_stage(id, node, ShaderStage::Vertex)?;
                    }
                    _ => {}
                }

                for arg in args {
                    self.register(*arg)?;
                }
            }
            Node::Sample { sampler, coords } => {
                self.register(*sampler)?;
                self.register(*coords)?;
            }
            Node::Cast { node, .. } => self.register(*node)?,
        }

        Ok(())
    }

    fn require_stage(
        &self,
        id: NodeId,
        node: &Node,
        stage: ShaderStage,
    ) -> Result<(), GenerateError> {
        if self.stage != stage {
            return Err(GenerateError::StageMismatch {
                node: id,
                kind: node.kind(),
                stage: self.stage,
            });
        }
        Ok(())
    }

    fn emit(mut self) -> Result<ShaderSource, GenerateError> {
        let code_gen = self.code_gen;
        let stage = self.stage;

        let attributes = dedup_declarations(
            std::mem::take(&mut self.attributes),
            "attribute",
            |attribute| code_gen.attribute_key(attribute),
        )?;
        let transformed = dedup_declarations(
            std::mem::take(&mut self.transformed),
            "transformed value",
            |node| node.semantic,
        )?;
        let rasterized = dedup_declarations(
            std::mem::take(&mut self.rasterized),
            "render target",
            |node| node.target,
        )?;
        let uniform_blocks = self.uniform_blocks()?;
        let samplers = dedup_declarations(
            std::mem::take(&mut self.samplers),
            "sampler",
            |sampler| sampler.slot,
        )?;

        // Declarations
        code_gen.begin_shader(&mut self.out, stage)?;
        if stage == ShaderStage::Vertex {
            code_gen.write_attributes(&mut self.out, &attributes)?;
        }
        code_gen.write_transformed(&mut self.out, stage, &transformed)?;
        if stage == ShaderStage::Pixel {
            code_gen.write_rasterized(&mut self.out, &rasterized)?;
        }

        for (slot, uniforms) in &uniform_blocks {
            code_gen.write_uniform_block(&mut self.out, stage, *slot, uniforms)?;
        }

        for sampler in &samplers {
            code_gen.write_sampler(&mut self.out, stage, sampler)?;
        }

        // Entry point
        code_gen.begin_entry(&mut self.out, stage, self.needs_instance_id)?;
        for (index, ty) in self.temp_types.iter().enumerate() {
            code_gen.write_temp_decl(&mut self.out, index as u32, *ty)?;
        }
        self.out.push('\t');
        self.print(self.root)?;
        code_gen.end_entry(&mut self.out, stage)?;

        let bindings = ShaderBindings {
            uniform_blocks: uniform_blocks
                .iter()
                .map(|(slot, _)| Binding::new(code_gen.uniform_block_name(stage, *slot), *slot))
                .collect(),
            samplers: samplers
                .iter()
                .map(|sampler| {
                    Binding::new(code_gen.sampler_name(stage, sampler.slot), sampler.slot)
                })
                .collect(),
            attributes: attributes
                .iter()
                .map(|attribute| {
                    Binding::new(
                        code_gen.attribute_name(attribute),
                        code_gen.attribute_key(attribute),
                    )
                })
                .collect(),
            render_targets: rasterized
                .iter()
                .map(|node| Binding::new(code_gen.render_target_name(node.target), node.target))
                .collect(),
        };

        debug!(
            "generated {} bytes of {} for the {:?} stage",
            self.out.len(),
            code_gen.name(),
            stage
        );

        Ok(ShaderSource::new(
            self.out.into_bytes(),
            bindings,
            code_gen.entry_point(stage),
            code_gen.profile(stage),
        ))
    }

    /// Groups the registered uniforms by buffer slot, each sorted by offset.
    fn uniform_blocks(&mut self) -> Result<Vec<(u32, Vec<UniformNode>)>, GenerateError> {
        let graph = self.graph;
        let mut uniforms = std::mem::take(&mut self.uniforms)
            .into_iter()
            .map(|(group_id, uniform)| {
                graph
                    .group(group_id)
                    .map(|group| (group.slot(), group_id, uniform))
                    .ok_or(GenerateError::UnknownUniformGroup(group_id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        uniforms.sort_by_key(|(slot, _, uniform)| (*slot, uniform.offset));

        let mut blocks = Vec::<(u32, UniformGroupId, Vec<UniformNode>)>::default();
        for (slot, group_id, uniform) in uniforms {
            if let Some((_, last_group, block)) = blocks
                .last_mut()
                .filter(|(last_slot, _, _)| *last_slot == slot)
            {
                if *last_group != group_id {
                    return Err(GenerateError::ConflictingDeclaration {
                        kind: "uniform group",
                        key: slot.to_string(),
                    });
                }

                match block.last() {
                    Some(last) if *last == uniform => continue,
                    Some(last) if last.offset == uniform.offset => {
                        return Err(GenerateError::ConflictingDeclaration {
                            kind: "uniform",
                            key: format!("{slot}:{}", uniform.offset),
                        });
                    }
                    _ => {}
                }

                block.push(uniform);
                continue;
            }

            blocks.push((slot, group_id, vec![uniform]));
        }

        Ok(blocks
            .into_iter()
            .map(|(slot, _, block)| (slot, block))
            .collect())
    }

    fn print(&mut self, id: NodeId) -> Result<(), GenerateError> {
        let code_gen = self.code_gen;
        let graph = self.graph;

        match &graph[id] {
            Node::FloatConst(value) => code_gen.write_float(&mut self.out, *value)?,
            Node::IntConst(value) => write!(self.out, "{value}")?,
            Node::Attribute(attribute) => code_gen.write_attribute(&mut self.out, attribute)?,
            Node::Uniform(uniform) => {
                let slot = graph
                    .group(uniform.group)
                    .map(|group| group.slot())
                    .ok_or(GenerateError::UnknownUniformGroup(uniform.group))?;
                code_gen.write_uniform(&mut self.out, slot, uniform.offset)?;
            }
            Node::Sampler(_) => return Err(GenerateError::InvalidSamplerUse(id)),
            Node::Temp(_) => {
                let index = self.temps.get(&id).copied().ok_or(GenerateError::UnknownNode(id))?;
                code_gen.write_temp(&mut self.out, index)?;
            }
            Node::Transformed(transformed) => {
                code_gen.write_transformed_ref(&mut self.out, transformed)?
            }
            Node::Rasterized(rasterized) => {
                code_gen.write_rasterized_ref(&mut self.out, rasterized)?
            }
            Node::Sequence(a, b) => {
                self.print(*a)?;
                self.out.push_str(";\n\t");
                self.print(*b)?;
            }
            Node::Swizzle { node, mask } => {
                self.out.push('(');
                self.print(*node)?;
                write!(self.out, ").{mask}")?;
            }
            Node::Operation { op, args } => self.print_operation(*op, args)?,
            Node::Sample { sampler, coords } => {
                let sampler_node = match &graph[*sampler] {
                    Node::Sampler(sampler_node) => sampler_node,
                    _ => return Err(GenerateError::InvalidSamplerUse(*sampler)),
                };

                code_gen.begin_sample(&mut self.out, self.stage, sampler_node)?;
                self.print(*coords)?;
                code_gen.end_sample(&mut self.out, sampler_node)?;
            }
            Node::Cast { node, ty } => {
                code_gen.begin_cast(&mut self.out, *ty)?;
                self.print(*node)?;
                code_gen.end_cast(&mut self.out)?;
            }
        }

        Ok(())
    }

    fn print_operation(&mut self, op: Operation, args: &[NodeId]) -> Result<(), GenerateError> {
        let lowering = self
            .code_gen
            .lower(op)
            .ok_or(GenerateError::UnknownOperation {
                op,
                backend: self.code_gen.name(),
            })?;

        let operand_count = |expected: usize| GenerateError::OperandCount {
            op,
            expected,
            found: args.len(),
        };

        match (lowering, args) {
            (Lowering::Assign, [dst, src]) => {
                self.print(*dst)?;
                self.out.push_str(" = (");
                self.print(*src)?;
                self.out.push(')');
            }
            (Lowering::Index, [base, index]) => {
                self.print(*base)?;
                self.out.push('[');
                self.print(*index)?;
                self.out.push(']');
            }
            (Lowering::Prefix(prefix), [a]) => {
                write!(self.out, "{prefix}(")?;
                self.print(*a)?;
                self.out.push(')');
            }
            (Lowering::Infix(infix), [a, b]) => {
                self.out.push('(');
                self.print(*a)?;
                write!(self.out, ") {infix} (")?;
                self.print(*b)?;
                self.out.push(')');
            }
            (Lowering::Call(name), args) => {
                write!(self.out, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push('(');
                    self.print(*arg)?;
                    self.out.push(')');
                }
                self.out.push(')');
            }
            (Lowering::Clamp01, [a]) => {
                self.out.push_str("clamp((");
                self.print(*a)?;
                self.out.push_str("), 0, 1)");
            }
            (Lowering::SetOutput(target), [a]) => {
                write!(self.out, "({target} = ")?;
                self.print(*a)?;
                self.out.push(')');
            }
            (Lowering::Builtin(text), []) => self.out.push_str(text),
            (Lowering::Discard, [a]) => {
                // Vectors can't be compared against a scalar, so compare component-wise
                match self.value_type(*a).filter(|ty| ty.components() > Some(1)) {
                    Some(ty) => {
                        self.out.push_str("if(any(lessThan((");
                        self.print(*a)?;
                        write!(
                            self.out,
                            "), {}(0.0)))) discard",
                            self.code_gen.type_name(ty)
                        )?;
                    }
                    None => {
                        self.out.push_str("if((");
                        self.print(*a)?;
                        self.out.push_str(") < 0.0) discard");
                    }
                }
            }
            (Lowering::Assign | Lowering::Index | Lowering::Infix(_), _) => {
                return Err(operand_count(2))
            }
            (
                Lowering::Prefix(_)
                | Lowering::Clamp01
                | Lowering::SetOutput(_)
                | Lowering::Discard,
                _,
            ) => return Err(operand_count(1)),
            (Lowering::Builtin(_), _) => return Err(operand_count(0)),
        }

        Ok(())
    }

    /// Type of the value a node evaluates to, when it can be worked out from the graph alone.
    fn value_type(&self, id: NodeId) -> Option<DataType> {
        match self.graph.node(id)? {
            Node::FloatConst(_) => Some(DataType::Float),
            Node::IntConst(_) => Some(DataType::Int),
            Node::Attribute(attribute) => Some(attribute.ty),
            Node::Uniform(uniform) => Some(uniform.ty),
            Node::Sampler(_) => None,
            Node::Temp(temp) => Some(temp.ty),
            Node::Transformed(transformed) => Some(transformed.ty),
            Node::Rasterized(rasterized) => Some(rasterized.ty),
            Node::Sequence(_, b) => self.value_type(*b),
            Node::Swizzle { node, mask } => DataType::vector(
                self.value_type(*node)?.scalar_kind(),
                mask.as_str().len() as u32,
            ),
            Node::Operation { op, args } => self.operation_type(*op, args),
            Node::Sample { sampler, .. } => match self.graph.node(*sampler)? {
                Node::Sampler(sampler) => Some(sampler.ty),
                _ => None,
            },
            Node::Cast { ty, .. } => Some(*ty),
        }
    }

    fn operation_type(&self, op: Operation, args: &[NodeId]) -> Option<DataType> {
        let arg = |i: usize| args.get(i).and_then(|arg| self.value_type(*arg));

        match op {
            Operation::Float11to2 => Some(DataType::Float2),
            Operation::Float111to3 => Some(DataType::Float3),
            Operation::Float1111to4 | Operation::Float31to4 | Operation::Float211to4 => {
                Some(DataType::Float4)
            }
            Operation::Dot | Operation::Length => Some(DataType::Float),
            Operation::GetInstanceId => Some(DataType::UInt),
            Operation::Less
            | Operation::LessEqual
            | Operation::Equal
            | Operation::NotEqual
            | Operation::SetPosition
            | Operation::Clip => None,
            Operation::Assign => arg(0),
            Operation::Index => match self.graph.node(*args.first()?)? {
                Node::Uniform(uniform) if uniform.count > 1 => Some(uniform.ty),
                _ => arg(0)?.element(),
            },
            Operation::Mul => {
                let (a, b) = (arg(0)?, arg(1)?);
                Some(if a.is_matrix() && !b.is_matrix() { b } else { a })
            }
            // Scalars broadcast against vectors
            _ => args
                .iter()
                .filter_map(|arg| self.value_type(*arg))
                .max_by_key(|ty| ty.size()),
        }
    }
}

/// Sorts declarations by `key` and removes duplicates.
///
/// Identical declarations collapse into one. Different declarations sharing a key would produce
/// the same symbol twice and are rejected.
fn dedup_declarations<T, K>(
    mut items: Vec<T>,
    kind: &'static str,
    key: impl Fn(&T) -> K,
) -> Result<Vec<T>, GenerateError>
where
    T: PartialEq,
    K: Ord + Display,
{
    items.sort_by_key(|item| key(item));

    let mut out = Vec::<T>::with_capacity(items.len());
    for item in items {
        if let Some(last) = out.last() {
            if key(last) == key(&item) {
                if *last == item {
                    continue;
                }

                return Err(GenerateError::ConflictingDeclaration {
                    kind,
                    key: key(&item).to_string(),
                });
            }
        }

        out.push(item);
    }

    Ok(out)
}
