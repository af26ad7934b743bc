/*
 * Procedure builder
 *
 * Fluent construction of the procedure snapshot the engine consumes. The
 * analysis driver lowers real syntax into this shape; tests use it directly.
 *
 * Conventions:
 * - every recorded event gets the next source line, so spans stay distinct
 *   and assertions can anchor on them
 * - each sub-basic-block lives in its own basic block unless the caller
 *   groups them explicitly
 * - predecessor lists and basic-block groupings are derived in `finish`
 */

use ahash::AHashMap as HashMap;

use crate::features::cfg::domain::{
    Argument, BasicBlock, BlockId, Expr, ExprId, ExprKind, LoopFacts, LoopId, Procedure,
    StorageClass, SubBasicBlock, SubBlockId, TypeShape, VarId, Variable,
};
use crate::shared::models::{Result, Span};

pub struct ProcedureBuilder {
    name: String,
    is_constructor: bool,
    entry: Option<SubBlockId>,
    variables: Vec<Variable>,
    exprs: Vec<Expr>,
    sub_blocks: Vec<SubBasicBlock>,
    next_block: BlockId,
    loops: Vec<LoopFacts>,
    next_line: u32,
}

impl ProcedureBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_constructor: false,
            entry: None,
            variables: Vec::new(),
            exprs: Vec::new(),
            sub_blocks: Vec::new(),
            next_block: 0,
            loops: Vec::new(),
            next_line: 1,
        }
    }

    pub fn constructor(name: impl Into<String>) -> Self {
        let mut b = Self::new(name);
        b.is_constructor = true;
        b
    }

    // ── Variables ──────────────────────────────────────────────────────

    pub fn param(&mut self, name: impl Into<String>) -> VarId {
        self.variable(name, StorageClass::Parameter, TypeShape::value(), false)
    }

    pub fn param_typed(&mut self, name: impl Into<String>, ty: TypeShape) -> VarId {
        self.variable(name, StorageClass::Parameter, ty, false)
    }

    /// Local with no initializer; attach the declaration with [`declare`]
    pub fn local(&mut self, name: impl Into<String>) -> VarId {
        self.variable(name, StorageClass::Local, TypeShape::value(), false)
    }

    pub fn local_typed(&mut self, name: impl Into<String>, ty: TypeShape) -> VarId {
        self.variable(name, StorageClass::Local, ty, false)
    }

    pub fn member(&mut self, name: impl Into<String>) -> VarId {
        self.variable(name, StorageClass::Member, TypeShape::value(), false)
    }

    pub fn static_var(&mut self, name: impl Into<String>) -> VarId {
        self.variable(name, StorageClass::Static, TypeShape::value(), false)
    }

    fn variable(
        &mut self,
        name: impl Into<String>,
        storage: StorageClass,
        ty: TypeShape,
        has_initializer: bool,
    ) -> VarId {
        let id = self.variables.len();
        self.variables.push(Variable {
            id,
            name: name.into(),
            storage,
            ty,
            has_initializer,
            decl_sub_block: None,
        });
        id
    }

    // ── Sub-basic-blocks and edges ─────────────────────────────────────

    /// New sub-basic-block in a fresh basic block
    pub fn sub_block(&mut self) -> SubBlockId {
        let block = self.next_block;
        self.next_block += 1;
        self.sub_block_in(block)
    }

    /// New sub-basic-block inside an existing basic block
    pub fn sub_block_in(&mut self, block: BlockId) -> SubBlockId {
        let id = self.sub_blocks.len();
        self.next_block = self.next_block.max(block + 1);
        self.sub_blocks.push(SubBasicBlock {
            id,
            block,
            exprs: Vec::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            span: Span::zero(),
        });
        id
    }

    pub fn edge(&mut self, from: SubBlockId, to: SubBlockId) {
        self.sub_blocks[from].successors.push(to);
    }

    pub fn entry(&mut self, sbb: SubBlockId) {
        self.entry = Some(sbb);
    }

    // ── Events ─────────────────────────────────────────────────────────

    /// Record the declaration of an uninitialized local
    pub fn declare(&mut self, sbb: SubBlockId, var: VarId) {
        self.variables[var].decl_sub_block = Some(sbb);
    }

    /// Declaration with initializer: `T v = ...;`
    pub fn init(&mut self, sbb: SubBlockId, var: VarId) -> ExprId {
        self.variables[var].decl_sub_block = Some(sbb);
        self.variables[var].has_initializer = true;
        self.event(sbb, ExprKind::Init(var))
    }

    /// Full assignment: `v = ...;`
    pub fn assign(&mut self, sbb: SubBlockId, var: VarId) -> ExprId {
        self.event(sbb, ExprKind::Assign(var))
    }

    /// Plain value read
    pub fn read(&mut self, sbb: SubBlockId, var: VarId) -> ExprId {
        self.event(sbb, ExprKind::Read(var))
    }

    /// Access under `sizeof`/`alignof`; never observes a value
    pub fn non_evaluated_read(&mut self, sbb: SubBlockId, var: VarId) -> ExprId {
        self.event(sbb, ExprKind::NonEvaluatedRead(var))
    }

    /// Field store through a qualifier: `q.f = ...;`
    pub fn field_store(&mut self, sbb: SubBlockId, qualifier: VarId) -> ExprId {
        self.event(sbb, ExprKind::FieldStore { qualifier })
    }

    pub fn call(
        &mut self,
        sbb: SubBlockId,
        qualifier: Option<VarId>,
        const_qualified: bool,
        args: Vec<Argument>,
    ) -> ExprId {
        self.event(
            sbb,
            ExprKind::Call {
                qualifier,
                const_qualified,
                args,
            },
        )
    }

    /// Constructor field-initializer use of a parameter; anchored at entry
    pub fn field_init_read(&mut self, var: VarId) -> ExprId {
        let entry = self.entry.unwrap_or(0);
        let id = self.event(entry, ExprKind::Read(var));
        self.exprs[id].in_field_init = true;
        id
    }

    fn event(&mut self, sbb: SubBlockId, kind: ExprKind) -> ExprId {
        let id = self.exprs.len();
        let span = Span::line(self.next_line);
        self.next_line += 1;
        self.exprs.push(Expr {
            id,
            sub_block: sbb,
            kind,
            span,
            in_field_init: false,
        });
        self.sub_blocks[sbb].exprs.push(id);
        id
    }

    // ── Loops ──────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn add_loop(
        &mut self,
        head: SubBlockId,
        body: Vec<SubBlockId>,
        exit_edges: Vec<(SubBlockId, SubBlockId)>,
        condition_true_on_entry: bool,
        condition_always_true: bool,
    ) -> LoopId {
        let id = self.loops.len();
        self.loops.push(LoopFacts {
            id,
            head,
            body,
            exit_edges,
            condition_true_on_entry,
            condition_always_true,
        });
        id
    }

    // ── Finish ─────────────────────────────────────────────────────────

    pub fn finish(mut self) -> Result<Procedure> {
        // Derive predecessor lists
        let edges: Vec<(SubBlockId, SubBlockId)> = self
            .sub_blocks
            .iter()
            .flat_map(|s| s.successors.iter().map(move |&t| (s.id, t)))
            .collect();
        for (from, to) in edges {
            if to < self.sub_blocks.len() {
                self.sub_blocks[to].predecessors.push(from);
            }
        }

        // Sub-block spans cover their events
        for sbb in &mut self.sub_blocks {
            let lines: Vec<u32> = sbb
                .exprs
                .iter()
                .map(|&e| self.exprs[e].span.start_line)
                .collect();
            if let (Some(&lo), Some(&hi)) = (lines.iter().min(), lines.iter().max()) {
                sbb.span = Span::new(lo, 0, hi, 0);
            }
        }

        // Group sub-blocks into basic blocks
        let mut grouped: HashMap<BlockId, Vec<SubBlockId>> = HashMap::new();
        for sbb in &self.sub_blocks {
            grouped.entry(sbb.block).or_default().push(sbb.id);
        }
        let mut blocks: Vec<BasicBlock> = (0..self.next_block)
            .map(|id| BasicBlock {
                id,
                sub_blocks: grouped.remove(&id).unwrap_or_default(),
                successors: Vec::new(),
                predecessors: Vec::new(),
            })
            .collect();
        for sbb in &self.sub_blocks {
            for &succ in &sbb.successors {
                if succ >= self.sub_blocks.len() {
                    // Dangling edge; validate() below reports it.
                    continue;
                }
                let (from, to) = (sbb.block, self.sub_blocks[succ].block);
                if from != to && !blocks[from].successors.contains(&to) {
                    blocks[from].successors.push(to);
                    blocks[to].predecessors.push(from);
                }
            }
        }

        let proc = Procedure {
            name: self.name,
            is_constructor: self.is_constructor,
            entry: self.entry.unwrap_or(0),
            variables: self.variables,
            exprs: self.exprs,
            sub_blocks: self.sub_blocks,
            blocks,
            loops: self.loops,
        };
        proc.validate()?;
        Ok(proc)
    }
}
