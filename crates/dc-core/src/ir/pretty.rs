use std::fmt;

use itertools::Itertools;

use crate::pretty::{LineWriter, PrettyPrintable};
use crate::types::OptionalKind;

use super::{
    EnumElement, IrBasicBlock, IrFunction, IrInstruction, IrInstructionKind, IrTerminatorKind,
    IrValue, LoadQualifier, OptionalCase,
};

impl PrettyPrintable for IrFunction {
    fn fmt_pretty(&self, out: &mut LineWriter<'_, '_>) -> fmt::Result {
        let args = self.arguments().iter().map(format_typed).join(", ");
        out.line(format!("fn @{}({}) {{", self.name, args))?;
        for block in self.blocks_in_order() {
            write_block(block, out)?;
        }
        out.line("}")
    }
}

fn write_block(block: &IrBasicBlock, out: &mut LineWriter<'_, '_>) -> fmt::Result {
    if block.params.is_empty() {
        out.line(format!("bb{}:", block.id))?;
    } else {
        let params = block.params.iter().map(format_typed).join(", ");
        out.line(format!("bb{}({}):", block.id, params))?;
    }
    out.nested(|out| {
        for inst in &block.instructions {
            let mut line = summarize_instruction(inst);
            if let (true, Some(result)) = (out.options.show_types, &inst.result) {
                line.push_str(&format!(" : {}", result.ty));
            }
            if out.options.show_spans {
                line.push_str(&format!(" // {}", inst.loc));
            }
            out.line(line)?;
        }
        match &block.terminator {
            Some(terminator) => out.line(summarize_terminator(&terminator.kind)),
            None => out.line("<unterminated>"),
        }
    })
}

fn format_value(value: &IrValue) -> String {
    format!("%{}", value.id)
}

fn format_typed(value: &IrValue) -> String {
    format!("%{} : {}", value.id, value.ty)
}

fn format_element(element: &EnumElement) -> String {
    let flavor = match element.kind {
        OptionalKind::Optional => "Optional",
        OptionalKind::ImplicitlyUnwrapped => "ImplicitlyUnwrappedOptional",
    };
    let case = match element.case {
        OptionalCase::Some => "some",
        OptionalCase::None => "none",
    };
    format!("#{}.{}", flavor, case)
}

fn summarize_instruction(inst: &IrInstruction) -> String {
    let body = match &inst.kind {
        IrInstructionKind::RetainValue { operand } => {
            format!("retain_value {}", format_typed(operand))
        }
        IrInstructionKind::Load { address, qualifier } => {
            let qualifier = match qualifier {
                LoadQualifier::Take => "take",
                LoadQualifier::Copy => "copy",
                LoadQualifier::Trivial => "trivial",
            };
            format!("load [{}] {}", qualifier, format_typed(address))
        }
        IrInstructionKind::Store {
            value,
            address,
            is_init,
        } => format!(
            "store {} to {}{}",
            format_value(value),
            if *is_init { "[init] " } else { "[assign] " },
            format_typed(address)
        ),
        IrInstructionKind::CopyAddr {
            src,
            dest,
            is_take,
            is_init,
        } => format!(
            "copy_addr {}{} to {}{}",
            if *is_take { "[take] " } else { "" },
            format_value(src),
            if *is_init { "[init] " } else { "" },
            format_typed(dest)
        ),
        IrInstructionKind::Upcast { operand } => {
            format!("upcast {}", format_typed(operand))
        }
        IrInstructionKind::AllocStack { ty } => format!("alloc_stack {}", ty),
        IrInstructionKind::DeallocStack { address } => {
            format!("dealloc_stack {}", format_typed(address))
        }
        IrInstructionKind::UncheckedTakeEnumDataAddr { address, element } => format!(
            "unchecked_take_enum_data_addr {}, {}",
            format_typed(address),
            format_element(element)
        ),
        IrInstructionKind::InitEnumDataAddr { address, element } => format!(
            "init_enum_data_addr {}, {}",
            format_typed(address),
            format_element(element)
        ),
        IrInstructionKind::InjectEnumAddr { address, element } => format!(
            "inject_enum_addr {}, {}",
            format_typed(address),
            format_element(element)
        ),
        IrInstructionKind::Enum { payload, element } => match payload {
            Some(payload) => format!("enum {}, {}", format_element(element), format_typed(payload)),
            None => format!("enum {}", format_element(element)),
        },
    };
    match &inst.result {
        Some(result) => format!("{} = {}", format_value(result), body),
        None => body,
    }
}

fn summarize_terminator(kind: &IrTerminatorKind) -> String {
    let cases = |cases: &[(EnumElement, u32)]| {
        cases
            .iter()
            .map(|(element, block)| format!("case {}: bb{}", format_element(element), block))
            .join(", ")
    };
    match kind {
        IrTerminatorKind::Br { target, args } if args.is_empty() => format!("br bb{}", target),
        IrTerminatorKind::Br { target, args } => format!(
            "br bb{}({})",
            target,
            args.iter().map(format_value).join(", ")
        ),
        IrTerminatorKind::SwitchEnum { operand, cases: arms } => {
            format!("switch_enum {}, {}", format_typed(operand), cases(arms.as_slice()))
        }
        IrTerminatorKind::SwitchEnumAddr { address, cases: arms } => {
            format!("switch_enum_addr {}, {}", format_typed(address), cases(arms.as_slice()))
        }
        IrTerminatorKind::Return(Some(value)) => format!("return {}", format_typed(value)),
        IrTerminatorKind::Return(None) => "return".to_string(),
        IrTerminatorKind::Unreachable => "unreachable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrBuilder;
    use crate::pretty::{pretty, PrettyOptions};
    use crate::span::Span;
    use crate::types::{LoweredTy, Ty};
    use pretty_assertions::assert_eq;

    #[test]
    fn prints_blocks_params_and_instructions() {
        let mut function = IrFunction::new("wrap");
        let arg = function.add_argument(LoweredTy::object(Ty::class("Base")));
        let mut builder = IrBuilder::new(&mut function);
        builder.create_retain_value(Span::default(), &arg);
        let wrapped = builder.create_enum(
            Span::default(),
            Some(&arg),
            EnumElement::some(OptionalKind::Optional),
            LoweredTy::object(Ty::optional(Ty::class("Base"))),
        );
        builder.create_return(Span::default(), Some(&wrapped));

        let text = pretty(&function, PrettyOptions::default()).to_string();
        assert_eq!(
            text,
            "fn @wrap(%0 : $Base) {\n\
             bb0(%0 : $Base):\n  \
             retain_value %0 : $Base\n  \
             %1 = enum #Optional.some, %0 : $Base : $Base?\n  \
             return %1 : $Base?\n\
             }\n"
        );
    }
}
