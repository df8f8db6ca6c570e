#![allow(dead_code)]
//! A reference interpreter for emitted functions.
//!
//! Memory is modelled per (cell, payload depth): projecting the payload of an
//! optional at depth `d` names depth `d + 1` of the same cell. A slot missing
//! from the map is uninitialized. Every operation that duplicates ownership
//! of a value bumps `copies`. A slot read by a trivial load is known to own
//! nothing, so it may be overwritten or abandoned.

use std::collections::{HashMap, HashSet};

use dc_core::ir::{
    BlockId, IrFunction, IrInstructionKind, IrTerminatorKind, IrValue, LoadQualifier, ValueId,
};

/// An observable runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Obj {
    /// A class instance, named by its dynamic class.
    Instance(String),
    /// A value of any other type.
    Token(String),
    Some(Box<Obj>),
    None,
}

impl Obj {
    pub fn instance(class: &str) -> Self {
        Obj::Instance(class.to_string())
    }

    pub fn token(name: &str) -> Self {
        Obj::Token(name.to_string())
    }

    pub fn some(payload: Obj) -> Self {
        Obj::Some(Box::new(payload))
    }
}

/// Initial state of one function argument.
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Obj),
    /// Storage holding the given value, or uninitialized storage.
    Memory(Option<Obj>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Addr {
    cell: usize,
    depth: usize,
}

#[derive(Debug, Clone)]
enum Reg {
    Value(Obj),
    Addr(Addr),
}

#[derive(Debug, Default)]
pub struct Outcome {
    pub returned: Option<Obj>,
    /// Final contents of each memory argument, in argument order.
    pub memory: Vec<Option<Obj>>,
    pub copies: usize,
    pub stack_allocations: usize,
}

#[derive(Default)]
struct Machine {
    regs: HashMap<ValueId, Reg>,
    slots: HashMap<Addr, Obj>,
    trivial: HashSet<Addr>,
    cells: usize,
    stack: Vec<usize>,
    copies: usize,
    stack_allocations: usize,
}

impl Machine {
    fn value(&self, value: &IrValue) -> Result<Obj, String> {
        match self.regs.get(&value.id) {
            Some(Reg::Value(obj)) => Ok(obj.clone()),
            Some(Reg::Addr(_)) => Err(format!("%{} is an address", value.id)),
            None => Err(format!("%{} is not defined", value.id)),
        }
    }

    fn addr(&self, value: &IrValue) -> Result<Addr, String> {
        match self.regs.get(&value.id) {
            Some(Reg::Addr(addr)) => Ok(*addr),
            Some(Reg::Value(_)) => Err(format!("%{} is not an address", value.id)),
            None => Err(format!("%{} is not defined", value.id)),
        }
    }

    fn new_cell(&mut self) -> Addr {
        let cell = self.cells;
        self.cells += 1;
        Addr { cell, depth: 0 }
    }

    fn init(&mut self, addr: Addr, obj: Obj) -> Result<(), String> {
        if self.slots.contains_key(&addr) && !self.trivial.remove(&addr) {
            return Err(format!("{:?} is already initialized", addr));
        }
        self.slots.insert(addr, obj);
        Ok(())
    }

    fn take(&mut self, addr: Addr) -> Result<Obj, String> {
        self.trivial.remove(&addr);
        self.slots
            .remove(&addr)
            .ok_or_else(|| format!("{:?} is not initialized", addr))
    }

    fn read(&self, addr: Addr) -> Result<Obj, String> {
        self.slots
            .get(&addr)
            .cloned()
            .ok_or_else(|| format!("{:?} is not initialized", addr))
    }

    /// Initialized slots of `cell` that own something. An absent optional
    /// owns nothing, and neither does a trivially loaded slot.
    fn owned_slots(&self, cell: usize) -> Vec<Addr> {
        self.slots
            .iter()
            .filter(|(addr, obj)| {
                addr.cell == cell && **obj != Obj::None && !self.trivial.contains(addr)
            })
            .map(|(addr, _)| *addr)
            .collect()
    }

    fn define(&mut self, value: &IrValue, reg: Reg) {
        self.regs.insert(value.id, reg);
    }

    fn step(&mut self, kind: &IrInstructionKind, result: Option<&IrValue>) -> Result<(), String> {
        let result = || result.ok_or_else(|| format!("{:?} has no result", kind));
        match kind {
            IrInstructionKind::RetainValue { operand } => {
                self.value(operand)?;
                self.copies += 1;
            }
            IrInstructionKind::Load { address, qualifier } => {
                let addr = self.addr(address)?;
                let obj = match qualifier {
                    LoadQualifier::Take => self.take(addr)?,
                    LoadQualifier::Copy => {
                        self.copies += 1;
                        self.read(addr)?
                    }
                    LoadQualifier::Trivial => {
                        self.trivial.insert(addr);
                        self.read(addr)?
                    }
                };
                self.define(result()?, Reg::Value(obj));
            }
            IrInstructionKind::Store { value, address, .. } => {
                let obj = self.value(value)?;
                let addr = self.addr(address)?;
                self.init(addr, obj)?;
            }
            IrInstructionKind::CopyAddr {
                src, dest, is_take, ..
            } => {
                let src = self.addr(src)?;
                let dest = self.addr(dest)?;
                let obj = if *is_take {
                    self.take(src)?
                } else {
                    self.copies += 1;
                    self.read(src)?
                };
                self.init(dest, obj)?;
            }
            IrInstructionKind::Upcast { operand } => {
                let obj = self.value(operand)?;
                self.define(result()?, Reg::Value(obj));
            }
            IrInstructionKind::AllocStack { .. } => {
                let addr = self.new_cell();
                self.stack.push(addr.cell);
                self.stack_allocations += 1;
                self.define(result()?, Reg::Addr(addr));
            }
            IrInstructionKind::DeallocStack { address } => {
                let addr = self.addr(address)?;
                if self.stack.pop() != Some(addr.cell) {
                    return Err(format!("dealloc_stack of cell {} out of order", addr.cell));
                }
                let live = self.owned_slots(addr.cell);
                if !live.is_empty() {
                    return Err(format!("deallocating initialized storage {:?}", live));
                }
            }
            IrInstructionKind::UncheckedTakeEnumDataAddr { address, .. } => {
                let addr = self.addr(address)?;
                let payload = match self.take(addr)? {
                    Obj::Some(payload) => *payload,
                    other => return Err(format!("taking the payload of {:?}", other)),
                };
                let projected = Addr {
                    depth: addr.depth + 1,
                    ..addr
                };
                self.init(projected, payload)?;
                self.define(result()?, Reg::Addr(projected));
            }
            IrInstructionKind::InitEnumDataAddr { address, .. } => {
                let addr = self.addr(address)?;
                let projected = Addr {
                    depth: addr.depth + 1,
                    ..addr
                };
                self.define(result()?, Reg::Addr(projected));
            }
            IrInstructionKind::InjectEnumAddr { address, element } => {
                let addr = self.addr(address)?;
                let obj = if element.is_some() {
                    let payload = self.take(Addr {
                        depth: addr.depth + 1,
                        ..addr
                    })?;
                    Obj::some(payload)
                } else {
                    Obj::None
                };
                self.init(addr, obj)?;
            }
            IrInstructionKind::Enum { payload, element } => {
                let obj = match (payload, element.is_some()) {
                    (Some(payload), true) => Obj::some(self.value(payload)?),
                    (None, false) => Obj::None,
                    _ => return Err("enum payload does not match its case".to_string()),
                };
                self.define(result()?, Reg::Value(obj));
            }
        }
        Ok(())
    }
}

/// Runs `function` from its entry block.
pub fn run(function: &IrFunction, args: Vec<Arg>) -> Result<Outcome, String> {
    let params = function.arguments();
    if params.len() != args.len() {
        return Err(format!(
            "{} takes {} arguments, {} given",
            function.name,
            params.len(),
            args.len()
        ));
    }

    let mut machine = Machine::default();
    let mut memory_args = Vec::new();
    for (param, arg) in params.iter().zip(args) {
        match arg {
            Arg::Value(obj) => machine.define(param, Reg::Value(obj)),
            Arg::Memory(contents) => {
                let addr = machine.new_cell();
                if let Some(obj) = contents {
                    machine.init(addr, obj)?;
                }
                memory_args.push(addr);
                machine.define(param, Reg::Addr(addr));
            }
        }
    }

    let mut current: BlockId = function.entry;
    let returned = loop {
        let block = function.block(current);
        for inst in &block.instructions {
            machine.step(&inst.kind, inst.result.as_ref())?;
        }
        let terminator = block
            .terminator
            .as_ref()
            .ok_or_else(|| format!("bb{} has no terminator", current))?;
        match &terminator.kind {
            IrTerminatorKind::Br { target, args } => {
                let values = args
                    .iter()
                    .map(|arg| machine.value(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                for (param, obj) in function.block(*target).params.iter().zip(values) {
                    machine.define(param, Reg::Value(obj));
                }
                current = *target;
            }
            IrTerminatorKind::SwitchEnum { operand, cases } => {
                let obj = machine.value(operand)?;
                let present = matches!(obj, Obj::Some(_));
                let (_, target) = cases
                    .iter()
                    .find(|(element, _)| element.is_some() == present)
                    .ok_or_else(|| format!("no case for {:?}", obj))?;
                if let Obj::Some(payload) = obj {
                    if let Some(param) = function.block(*target).params.first() {
                        machine.define(param, Reg::Value(*payload));
                    }
                }
                current = *target;
            }
            IrTerminatorKind::SwitchEnumAddr { address, cases } => {
                let obj = machine.read(machine.addr(address)?)?;
                let present = matches!(obj, Obj::Some(_));
                let (_, target) = cases
                    .iter()
                    .find(|(element, _)| element.is_some() == present)
                    .ok_or_else(|| format!("no case for {:?}", obj))?;
                current = *target;
            }
            IrTerminatorKind::Return(value) => {
                break value.as_ref().map(|value| machine.value(value)).transpose()?;
            }
            IrTerminatorKind::Unreachable => return Err(format!("bb{} is unreachable", current)),
        }
    };

    if !machine.stack.is_empty() {
        return Err(format!("stack cells {:?} leaked", machine.stack));
    }

    let mut memory = Vec::new();
    for addr in memory_args {
        let stray: Vec<_> = machine
            .owned_slots(addr.cell)
            .into_iter()
            .filter(|slot| slot.depth != 0)
            .collect();
        if !stray.is_empty() {
            return Err(format!("payload slots {:?} were never wrapped", stray));
        }
        memory.push(machine.slots.get(&addr).cloned());
    }

    Ok(Outcome {
        returned,
        memory,
        copies: machine.copies,
        stack_allocations: machine.stack_allocations,
    })
}
