//! Procedure/CFG domain model
//!
//! The engine is intra-procedural: it consumes one `Procedure` at a time,
//! already lowered by the analysis driver to basic blocks and the finer
//! sub-basic-block partition (cut wherever a non-SSA-eligible variable's
//! value may change). Everything here is an immutable snapshot; no entity is
//! mutated after construction and nothing persists across procedures.
//!
//! Expression modelling is deliberately shallow. Each sub-basic-block holds
//! an ordered list of *expression events*, the shapes the detectors and
//! resolvers pattern-match on, rather than full syntax trees. Argument
//! sub-expressions that read a variable's value appear as their own `Read`
//! events in evaluation order; the `Call` event itself carries only the
//! structural argument shapes needed for partial-definition detection
//! (taking the address of a variable is not a read of its value).

use serde::{Deserialize, Serialize};

use crate::shared::models::{FlowVarError, Result, Span};

/// Basic block identifier
pub type BlockId = usize;

/// Sub-basic-block identifier
pub type SubBlockId = usize;

/// Variable identifier (identity is by declaration)
pub type VarId = usize;

/// Expression event identifier
pub type ExprId = usize;

/// Loop identifier
pub type LoopId = usize;

/// Storage class of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageClass {
    /// Block-scope local
    Local,
    /// Formal parameter of the procedure
    Parameter,
    /// Instance field / member (excluded from intra-procedural resolution)
    Member,
    /// Static storage duration (never treated as uninitialized)
    Static,
}

/// Shape of a variable's declared type, reduced to what the resolvers need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeShape {
    /// Reference type (`T&`); collapsed onto the referent for resolution
    pub is_reference: bool,
    /// Pointer type (`T*`)
    pub is_pointer: bool,
}

impl TypeShape {
    /// Plain value type
    pub fn value() -> Self {
        Self::default()
    }

    pub fn reference() -> Self {
        Self {
            is_reference: true,
            is_pointer: false,
        }
    }

    pub fn pointer() -> Self {
        Self {
            is_reference: false,
            is_pointer: true,
        }
    }
}

/// A declared local, parameter, or field-like storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    pub storage: StorageClass,
    pub ty: TypeShape,
    /// Whether the declaration carries an initializer
    pub has_initializer: bool,
    /// Sub-basic-block holding the declaration (locals only)
    pub decl_sub_block: Option<SubBlockId>,
}

impl Variable {
    pub fn is_local(&self) -> bool {
        self.storage == StorageClass::Local
    }

    pub fn is_parameter(&self) -> bool {
        self.storage == StorageClass::Parameter
    }
}

/// Shape of the callee parameter type, after stripping top-level qualifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamShape {
    /// Non-const reference (`T&`)
    MutableRef,
    /// Non-const pointer (`T*`)
    MutablePtr,
    ConstRef,
    ConstPtr,
    ByValue,
}

impl ParamShape {
    /// Can the callee write through this parameter?
    pub fn is_writable_indirection(&self) -> bool {
        matches!(self, ParamShape::MutableRef | ParamShape::MutablePtr)
    }
}

/// Structural shape of an argument expression at a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgShape {
    /// A bare variable access: `f(x)`
    VarAccess(VarId),
    /// Address-of a variable access: `f(&x)`
    AddressOfVar(VarId),
    /// Address-of the zeroth element of an array: `f(&a[0])`; aliases the
    /// whole array
    AddressOfArrayZero(VarId),
    /// Anything else (temporaries, literals, computed expressions)
    Other,
}

/// One argument at a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub shape: ArgShape,
    pub param: ParamShape,
}

/// An expression event inside a sub-basic-block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Plain read of a variable's value
    Read(VarId),
    /// Access occurring purely as the operand of a non-evaluating operator
    /// (`sizeof`/`alignof`); never observes a value
    NonEvaluatedRead(VarId),
    /// Declaration initializer: `T v = ...;` a full definition
    Init(VarId),
    /// Assignment with the variable as the entire left-hand side: `v = ...;`
    /// The access is an overwrite, not a use
    Assign(VarId),
    /// Instance-field store through a qualifier: `q.f = ...;` the field is
    /// the assignment target, the qualifier is partially defined
    FieldStore { qualifier: VarId },
    /// A call, possibly through a qualifier: `q.m(args...)`
    Call {
        qualifier: Option<VarId>,
        /// Whether the callee is const/read-only qualified
        const_qualified: bool,
        args: Vec<Argument>,
    },
}

impl ExprKind {
    /// The variable fully (re)defined by this event, if any
    pub fn full_def_of(&self) -> Option<VarId> {
        match self {
            ExprKind::Init(v) | ExprKind::Assign(v) => Some(*v),
            _ => None,
        }
    }

    /// The variable whose value this event reads, if any
    pub fn read_of(&self) -> Option<VarId> {
        match self {
            ExprKind::Read(v) => Some(*v),
            _ => None,
        }
    }
}

/// An expression event anchored in the CFG
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub id: ExprId,
    pub sub_block: SubBlockId,
    pub kind: ExprKind,
    pub span: Span,
    /// The access sits in a constructor field-initializer list rather than a
    /// standard CFG node; anchored at the entry sub-basic-block
    pub in_field_init: bool,
}

/// A sub-basic-block: the addressable granularity unit of the fallback
/// resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubBasicBlock {
    pub id: SubBlockId,
    /// The enclosing basic block
    pub block: BlockId,
    /// Expression events in program order
    pub exprs: Vec<ExprId>,
    pub successors: Vec<SubBlockId>,
    pub predecessors: Vec<SubBlockId>,
    pub span: Span,
}

/// A basic block, as a grouping of its sub-basic-blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    /// Sub-basic-blocks in program order
    pub sub_blocks: Vec<SubBlockId>,
    pub successors: Vec<BlockId>,
    pub predecessors: Vec<BlockId>,
}

/// Loop facts supplied by the CFG collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopFacts {
    pub id: LoopId,
    /// The condition-test sub-basic-block the loop is entered through
    pub head: SubBlockId,
    /// Every sub-basic-block inside the loop, condition included
    pub body: Vec<SubBlockId>,
    /// Edges out of the loop's condition test: (inside, first-outside)
    pub exit_edges: Vec<(SubBlockId, SubBlockId)>,
    /// Condition proven true on first entry
    pub condition_true_on_entry: bool,
    /// Condition proven true on every iteration (`while (true)` proper)
    pub condition_always_true: bool,
}

impl LoopFacts {
    pub fn contains(&self, sbb: SubBlockId) -> bool {
        self.body.contains(&sbb)
    }

    /// True on entry but not on every iteration: the shape the skip-loop
    /// exemption targets
    pub fn is_always_true_upon_entry(&self) -> bool {
        self.condition_true_on_entry && !self.condition_always_true
    }
}

/// One procedure body, fully lowered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    pub is_constructor: bool,
    /// Entry sub-basic-block (parameters receive their initial value here)
    pub entry: SubBlockId,
    pub variables: Vec<Variable>,
    pub exprs: Vec<Expr>,
    pub sub_blocks: Vec<SubBasicBlock>,
    pub blocks: Vec<BasicBlock>,
    pub loops: Vec<LoopFacts>,
}

impl Procedure {
    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id]
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    pub fn sub_block(&self, id: SubBlockId) -> &SubBasicBlock {
        &self.sub_blocks[id]
    }

    /// Formal parameters, in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.is_parameter())
    }

    /// Expression events of one sub-basic-block, in program order
    pub fn events_in(&self, sbb: SubBlockId) -> impl Iterator<Item = &Expr> {
        self.sub_blocks[sbb].exprs.iter().map(move |&e| &self.exprs[e])
    }

    /// Position of an expression event within its sub-basic-block
    pub fn position_in_sub_block(&self, expr: ExprId) -> Option<usize> {
        let sbb = self.exprs[expr].sub_block;
        self.sub_blocks[sbb].exprs.iter().position(|&e| e == expr)
    }

    /// Whether any event in `sbb` fully assigns `var`
    pub fn sub_block_fully_assigns(&self, sbb: SubBlockId, var: VarId) -> bool {
        self.events_in(sbb).any(|e| e.kind.full_def_of() == Some(var))
    }

    /// Whether `sbb` holds the declaration of `var`
    pub fn sub_block_declares(&self, sbb: SubBlockId, var: VarId) -> bool {
        self.variables[var].decl_sub_block == Some(sbb)
    }

    /// Shape validation: every id in range, entry present, edges symmetric.
    /// Analysis never starts on a malformed snapshot; past this point the
    /// engine is infallible.
    pub fn validate(&self) -> Result<()> {
        if self.entry >= self.sub_blocks.len() {
            return Err(FlowVarError::cfg(format!(
                "entry sub-block {} out of range ({} sub-blocks)",
                self.entry,
                self.sub_blocks.len()
            )));
        }
        for (i, v) in self.variables.iter().enumerate() {
            if v.id != i {
                return Err(FlowVarError::cfg(format!("variable id {} at index {}", v.id, i)));
            }
            if let Some(sbb) = v.decl_sub_block {
                if sbb >= self.sub_blocks.len() {
                    return Err(FlowVarError::cfg(format!(
                        "declaration of '{}' in unknown sub-block {}",
                        v.name, sbb
                    )));
                }
            }
        }
        for (i, e) in self.exprs.iter().enumerate() {
            if e.id != i {
                return Err(FlowVarError::cfg(format!("expression id {} at index {}", e.id, i)));
            }
            if e.sub_block >= self.sub_blocks.len() {
                return Err(FlowVarError::cfg(format!(
                    "expression {} anchored in unknown sub-block {}",
                    e.id, e.sub_block
                )));
            }
            let mentioned: Vec<VarId> = match &e.kind {
                ExprKind::Read(v)
                | ExprKind::NonEvaluatedRead(v)
                | ExprKind::Init(v)
                | ExprKind::Assign(v)
                | ExprKind::FieldStore { qualifier: v } => vec![*v],
                ExprKind::Call { qualifier, args, .. } => {
                    let mut vs: Vec<VarId> = qualifier.iter().copied().collect();
                    for a in args {
                        match a.shape {
                            ArgShape::VarAccess(v)
                            | ArgShape::AddressOfVar(v)
                            | ArgShape::AddressOfArrayZero(v) => vs.push(v),
                            ArgShape::Other => {}
                        }
                    }
                    vs
                }
            };
            for v in mentioned {
                if v >= self.variables.len() {
                    return Err(FlowVarError::cfg(format!(
                        "expression {} mentions unknown variable {}",
                        e.id, v
                    )));
                }
            }
        }
        for sbb in &self.sub_blocks {
            for &e in &sbb.exprs {
                if e >= self.exprs.len() || self.exprs[e].sub_block != sbb.id {
                    return Err(FlowVarError::cfg(format!(
                        "sub-block {} lists expression {} it does not anchor",
                        sbb.id, e
                    )));
                }
            }
            for &succ in &sbb.successors {
                if succ >= self.sub_blocks.len() {
                    return Err(FlowVarError::cfg(format!(
                        "edge {} -> {} targets unknown sub-block",
                        sbb.id, succ
                    )));
                }
                if !self.sub_blocks[succ].predecessors.contains(&sbb.id) {
                    return Err(FlowVarError::cfg(format!(
                        "edge {} -> {} missing from predecessor list",
                        sbb.id, succ
                    )));
                }
            }
        }
        for l in &self.loops {
            if !l.contains(l.head) {
                return Err(FlowVarError::cfg(format!(
                    "loop {} head {} outside its own body",
                    l.id, l.head
                )));
            }
            for &(inside, outside) in &l.exit_edges {
                if !l.contains(inside) || l.contains(outside) {
                    return Err(FlowVarError::cfg(format!(
                        "loop {} exit edge {} -> {} not an inside-to-outside edge",
                        l.id, inside, outside
                    )));
                }
            }
        }
        Ok(())
    }
}
