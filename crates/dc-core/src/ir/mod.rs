//! A small SSA IR with block parameters and object/address value categories.
//!
//! Only the operations cast emission needs are modelled. Function arguments
//! are the parameters of the entry block.

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::types::{LoweredTy, OptionalKind, Symbol};

pub mod builder;
pub mod pretty;
pub mod verify;

pub use builder::IrBuilder;
pub use verify::{verify_function, verify_open_function};

pub type ValueId = u32;
pub type InstId = u32;
pub type BlockId = u32;

/// An SSA value and its lowered type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrValue {
    pub id: ValueId,
    pub ty: LoweredTy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionalCase {
    Some,
    None,
}

/// One case of one optional flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumElement {
    pub kind: OptionalKind,
    pub case: OptionalCase,
}

impl EnumElement {
    pub fn some(kind: OptionalKind) -> Self {
        Self {
            kind,
            case: OptionalCase::Some,
        }
    }

    pub fn none(kind: OptionalKind) -> Self {
        Self {
            kind,
            case: OptionalCase::None,
        }
    }

    pub fn is_some(&self) -> bool {
        self.case == OptionalCase::Some
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadQualifier {
    /// The memory is left uninitialized.
    Take,
    /// The loaded value is an additional owned copy.
    Copy,
    /// No ownership is involved.
    Trivial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrInstruction {
    pub id: InstId,
    pub loc: Span,
    pub kind: IrInstructionKind,
    pub result: Option<IrValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrInstructionKind {
    RetainValue {
        operand: IrValue,
    },
    Load {
        address: IrValue,
        qualifier: LoadQualifier,
    },
    Store {
        value: IrValue,
        address: IrValue,
        is_init: bool,
    },
    CopyAddr {
        src: IrValue,
        dest: IrValue,
        is_take: bool,
        is_init: bool,
    },
    /// Class or class-metatype conversion to a superclass.
    Upcast {
        operand: IrValue,
    },
    AllocStack {
        ty: LoweredTy,
    },
    DeallocStack {
        address: IrValue,
    },
    /// Projects the payload out of a present optional in memory, leaving the
    /// optional itself uninitialized once the payload is taken.
    UncheckedTakeEnumDataAddr {
        address: IrValue,
        element: EnumElement,
    },
    /// Projects the payload slot of an optional about to be initialized as
    /// `element`.
    InitEnumDataAddr {
        address: IrValue,
        element: EnumElement,
    },
    /// Writes the case tag of an optional in memory.
    InjectEnumAddr {
        address: IrValue,
        element: EnumElement,
    },
    /// Builds an optional scalar.
    Enum {
        payload: Option<IrValue>,
        element: EnumElement,
    },
}

impl IrInstructionKind {
    pub fn operands(&self) -> Vec<&IrValue> {
        match self {
            IrInstructionKind::RetainValue { operand } | IrInstructionKind::Upcast { operand } => {
                vec![operand]
            }
            IrInstructionKind::Load { address, .. }
            | IrInstructionKind::DeallocStack { address }
            | IrInstructionKind::UncheckedTakeEnumDataAddr { address, .. }
            | IrInstructionKind::InitEnumDataAddr { address, .. }
            | IrInstructionKind::InjectEnumAddr { address, .. } => vec![address],
            IrInstructionKind::Store { value, address, .. } => vec![value, address],
            IrInstructionKind::CopyAddr { src, dest, .. } => vec![src, dest],
            IrInstructionKind::AllocStack { .. } => Vec::new(),
            IrInstructionKind::Enum { payload, .. } => payload.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrTerminator {
    pub loc: Span,
    pub kind: IrTerminatorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrTerminatorKind {
    Br {
        target: BlockId,
        args: Vec<IrValue>,
    },
    /// The `some` destination receives the payload as its only parameter.
    SwitchEnum {
        operand: IrValue,
        cases: Vec<(EnumElement, BlockId)>,
    },
    SwitchEnumAddr {
        address: IrValue,
        cases: Vec<(EnumElement, BlockId)>,
    },
    Return(Option<IrValue>),
    Unreachable,
}

impl IrTerminatorKind {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            IrTerminatorKind::Br { target, .. } => vec![*target],
            IrTerminatorKind::SwitchEnum { cases, .. }
            | IrTerminatorKind::SwitchEnumAddr { cases, .. } => {
                cases.iter().map(|(_, block)| *block).collect()
            }
            IrTerminatorKind::Return(_) | IrTerminatorKind::Unreachable => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrBasicBlock {
    pub id: BlockId,
    pub params: Vec<IrValue>,
    pub instructions: Vec<IrInstruction>,
    pub terminator: Option<IrTerminator>,
}

impl IrBasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            params: Vec::new(),
            instructions: Vec::new(),
            terminator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrFunction {
    pub name: Symbol,
    /// Indexed by `BlockId`.
    pub blocks: Vec<IrBasicBlock>,
    /// Block order for printing and traversal.
    pub layout: Vec<BlockId>,
    pub entry: BlockId,
    next_value: ValueId,
    next_inst: InstId,
}

impl IrFunction {
    pub fn new(name: impl Into<Symbol>) -> Self {
        Self {
            name: name.into(),
            blocks: vec![IrBasicBlock::new(0)],
            layout: vec![0],
            entry: 0,
            next_value: 0,
            next_inst: 0,
        }
    }

    pub fn add_argument(&mut self, ty: LoweredTy) -> IrValue {
        let entry = self.entry;
        self.add_block_param(entry, ty)
    }

    pub fn arguments(&self) -> &[IrValue] {
        &self.block(self.entry).params
    }

    pub fn block(&self, id: BlockId) -> &IrBasicBlock {
        &self.blocks[id as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut IrBasicBlock {
        &mut self.blocks[id as usize]
    }

    pub fn blocks_in_order(&self) -> impl Iterator<Item = &IrBasicBlock> {
        self.layout.iter().map(move |id| self.block(*id))
    }

    pub fn instructions(&self) -> impl Iterator<Item = &IrInstruction> {
        self.blocks_in_order()
            .flat_map(|block| block.instructions.iter())
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.layout.contains(&id)
    }

    pub(crate) fn add_block_param(&mut self, block: BlockId, ty: LoweredTy) -> IrValue {
        let value = self.fresh_value(ty);
        self.block_mut(block).params.push(value.clone());
        value
    }

    /// Creates an unplaced block; callers position it in `layout`.
    pub(crate) fn create_block(&mut self) -> BlockId {
        let id = self.blocks.len() as BlockId;
        self.blocks.push(IrBasicBlock::new(id));
        id
    }

    pub(crate) fn fresh_value(&mut self, ty: LoweredTy) -> IrValue {
        let id = self.next_value;
        self.next_value += 1;
        IrValue { id, ty }
    }

    pub(crate) fn fresh_inst_id(&mut self) -> InstId {
        let id = self.next_inst;
        self.next_inst += 1;
        id
    }
}
