//! Structural checks over an [`IrFunction`].
//!
//! Besides per-instruction category checks, the verifier walks the control
//! flow graph carrying the stack of live `alloc_stack` results: deallocation
//! must release the most recent allocation, every predecessor of a block must
//! agree on the live stack, and nothing may be live at `return`.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::ir::{
    BlockId, EnumElement, IrBasicBlock, IrFunction, IrInstruction, IrInstructionKind,
    IrTerminatorKind, IrValue, ValueId,
};

pub fn verify_function(function: &IrFunction) -> Result<()> {
    verify(function, None)
}

/// Verifies a function that is still being built: `open` is the block the
/// builder is positioned at and may lack its terminator.
pub fn verify_open_function(function: &IrFunction, open: BlockId) -> Result<()> {
    verify(function, Some(open))
}

fn verify(function: &IrFunction, open: Option<BlockId>) -> Result<()> {
    let fail = |message: String| Error::verify(function.name.as_str(), message);

    let mut seen = HashSet::new();
    for block_id in &function.layout {
        if !seen.insert(*block_id) {
            return Err(fail(format!("bb{} appears twice in the layout", block_id)));
        }
    }
    if !seen.contains(&function.entry) {
        return Err(fail(format!("entry bb{} is not laid out", function.entry)));
    }

    for block in function.blocks_in_order() {
        for inst in &block.instructions {
            validate_instruction(inst).map_err(&fail)?;
        }
        if block.terminator.is_none() && open == Some(block.id) {
            continue;
        }
        validate_terminator(function, block).map_err(&fail)?;
    }

    validate_stack_discipline(function).map_err(&fail)
}

fn validate_instruction(inst: &IrInstruction) -> std::result::Result<(), String> {
    let expect_address = |value: &IrValue, role: &str| {
        if value.ty.is_address() {
            Ok(())
        } else {
            Err(format!("i{}: {} {} is not an address", inst.id, role, value.ty))
        }
    };
    let expect_object = |value: &IrValue, role: &str| {
        if value.ty.is_address() {
            Err(format!("i{}: {} {} is not an object", inst.id, role, value.ty))
        } else {
            Ok(())
        }
    };
    let expect_optional = |value: &IrValue, element: &EnumElement| match value
        .ty
        .ty
        .optional_object()
    {
        Some((kind, _)) if kind == element.kind => Ok(()),
        _ => Err(format!(
            "i{}: {} does not match optional element {:?}",
            inst.id, value.ty, element
        )),
    };

    match &inst.kind {
        IrInstructionKind::RetainValue { operand } => expect_object(operand, "retained value"),
        IrInstructionKind::Load { address, .. } => expect_address(address, "load source"),
        IrInstructionKind::Store { value, address, .. } => {
            expect_object(value, "stored value")?;
            expect_address(address, "store destination")?;
            if value.ty.ty != address.ty.ty {
                return Err(format!(
                    "i{}: storing {} into {}",
                    inst.id, value.ty, address.ty
                ));
            }
            Ok(())
        }
        IrInstructionKind::CopyAddr { src, dest, .. } => {
            expect_address(src, "copy source")?;
            expect_address(dest, "copy destination")?;
            if src.ty != dest.ty {
                return Err(format!("i{}: copying {} into {}", inst.id, src.ty, dest.ty));
            }
            Ok(())
        }
        IrInstructionKind::Upcast { operand } => expect_object(operand, "upcast operand"),
        IrInstructionKind::AllocStack { ty } => {
            if ty.is_address() {
                Err(format!("i{}: alloc_stack of address type {}", inst.id, ty))
            } else {
                Ok(())
            }
        }
        IrInstructionKind::DeallocStack { address } => {
            expect_address(address, "deallocated storage")
        }
        IrInstructionKind::UncheckedTakeEnumDataAddr { address, element }
        | IrInstructionKind::InitEnumDataAddr { address, element } => {
            expect_address(address, "optional storage")?;
            expect_optional(address, element)?;
            if !element.is_some() {
                return Err(format!("i{}: projecting the payload of `none`", inst.id));
            }
            Ok(())
        }
        IrInstructionKind::InjectEnumAddr { address, element } => {
            expect_address(address, "optional storage")?;
            expect_optional(address, element)
        }
        IrInstructionKind::Enum { payload, element } => {
            let Some(result) = &inst.result else {
                return Err(format!("i{}: enum without a result", inst.id));
            };
            expect_optional(result, element)?;
            match (payload, element.is_some()) {
                (Some(payload), true) => {
                    expect_object(payload, "enum payload")?;
                    if Some(&payload.ty) != result.ty.optional_payload().as_ref() {
                        return Err(format!(
                            "i{}: payload {} does not fit {}",
                            inst.id, payload.ty, result.ty
                        ));
                    }
                    Ok(())
                }
                (None, false) => Ok(()),
                _ => Err(format!("i{}: payload does not match the case", inst.id)),
            }
        }
    }
}

fn validate_terminator(function: &IrFunction, block: &IrBasicBlock) -> std::result::Result<(), String> {
    let Some(terminator) = &block.terminator else {
        return Err(format!("bb{} has no terminator", block.id));
    };
    for successor in terminator.kind.successors() {
        if !function.contains_block(successor) {
            return Err(format!("bb{} branches to missing bb{}", block.id, successor));
        }
    }

    match &terminator.kind {
        IrTerminatorKind::Br { target, args } => {
            let params = &function.block(*target).params;
            if params.len() != args.len() {
                return Err(format!(
                    "bb{} passes {} arguments to bb{} which takes {}",
                    block.id,
                    args.len(),
                    target,
                    params.len()
                ));
            }
            for (arg, param) in args.iter().zip(params) {
                if arg.ty != param.ty {
                    return Err(format!(
                        "bb{} passes {} to a {} parameter of bb{}",
                        block.id, arg.ty, param.ty, target
                    ));
                }
            }
            Ok(())
        }
        IrTerminatorKind::SwitchEnum { operand, cases } => {
            if operand.ty.is_address() {
                return Err(format!("bb{}: switch_enum on address {}", block.id, operand.ty));
            }
            validate_cases(function, block.id, operand, cases, true)
        }
        IrTerminatorKind::SwitchEnumAddr { address, cases } => {
            if !address.ty.is_address() {
                return Err(format!(
                    "bb{}: switch_enum_addr on object {}",
                    block.id, address.ty
                ));
            }
            validate_cases(function, block.id, address, cases, false)
        }
        IrTerminatorKind::Return(_) | IrTerminatorKind::Unreachable => Ok(()),
    }
}

fn validate_cases(
    function: &IrFunction,
    block: BlockId,
    operand: &IrValue,
    cases: &[(EnumElement, BlockId)],
    payload_is_argument: bool,
) -> std::result::Result<(), String> {
    let Some((kind, _)) = operand.ty.ty.optional_object() else {
        return Err(format!("bb{}: switching on non-optional {}", block, operand.ty));
    };
    let mut covered = HashSet::new();
    for (element, target) in cases {
        if element.kind != kind || !covered.insert(element.case) {
            return Err(format!("bb{}: unexpected case {:?}", block, element));
        }
        let params = &function.block(*target).params;
        let expected = match (element.is_some() && payload_is_argument, operand.ty.optional_payload()) {
            (true, Some(payload)) => vec![payload],
            _ => Vec::new(),
        };
        let actual: Vec<_> = params.iter().map(|param| param.ty.clone()).collect();
        if actual != expected {
            return Err(format!(
                "bb{}: case {:?} destination bb{} has parameters {:?}",
                block, element.case, target, actual
            ));
        }
    }
    if covered.len() != 2 {
        return Err(format!("bb{}: switch does not cover both cases", block));
    }
    Ok(())
}

fn validate_stack_discipline(function: &IrFunction) -> std::result::Result<(), String> {
    let mut entry_states: HashMap<BlockId, Vec<ValueId>> = HashMap::new();
    let mut worklist = VecDeque::new();
    entry_states.insert(function.entry, Vec::new());
    worklist.push_back(function.entry);

    while let Some(block_id) = worklist.pop_front() {
        let mut stack = entry_states[&block_id].clone();
        let block = function.block(block_id);
        for inst in &block.instructions {
            match &inst.kind {
                IrInstructionKind::AllocStack { .. } => {
                    if let Some(result) = &inst.result {
                        stack.push(result.id);
                    }
                }
                IrInstructionKind::DeallocStack { address } => match stack.pop() {
                    Some(top) if top == address.id => {}
                    Some(top) => {
                        return Err(format!(
                            "bb{}: dealloc_stack of %{} while %{} is the most recent allocation",
                            block_id, address.id, top
                        ))
                    }
                    None => {
                        return Err(format!(
                            "bb{}: dealloc_stack of %{} with nothing allocated",
                            block_id, address.id
                        ))
                    }
                },
                _ => {}
            }
        }

        let Some(terminator) = &block.terminator else {
            continue;
        };
        if matches!(terminator.kind, IrTerminatorKind::Return(_)) && !stack.is_empty() {
            return Err(format!(
                "bb{}: returning with live stack allocations {:?}",
                block_id, stack
            ));
        }
        for successor in terminator.kind.successors() {
            match entry_states.get(&successor) {
                Some(existing) if existing != &stack => {
                    return Err(format!(
                        "bb{} reaches bb{} with stack {:?}, another path has {:?}",
                        block_id, successor, stack, existing
                    ));
                }
                Some(_) => {}
                None => {
                    entry_states.insert(successor, stack.clone());
                    worklist.push_back(successor);
                }
            }
        }
    }
    Ok(())
}
