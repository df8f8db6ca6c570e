#![allow(dead_code)]
pub mod eval;

use dc_cast::{CastConsumptionKind, CastEmitter, EmitOptions, Source, Target, UnconditionalCast};
use dc_core::ir::{verify_function, IrBuilder, IrFunction, IrInstructionKind};
use dc_core::span::Span;
use dc_core::types::{LoweredTy, Ty, TypeContext};

/// `Base <- Derived <- Leaf`, plus an unrelated `Other` and an address-only
/// plain type `Resilient`.
pub fn hierarchy() -> TypeContext {
    let mut ctx = TypeContext::new()
        .with_class("Base", None)
        .and_then(|ctx| ctx.with_class("Derived", Some("Base")))
        .and_then(|ctx| ctx.with_class("Leaf", Some("Derived")))
        .and_then(|ctx| ctx.with_class("Other", None))
        .expect("hierarchy should be well formed");
    ctx.declare_address_only("Resilient");
    ctx
}

pub fn loc() -> Span {
    Span::new(0, 10, 20)
}

/// `fn(source) -> target` through the scalar entry point.
pub fn scalar_cast(ctx: &TypeContext, source: &Ty, target: &Ty) -> IrFunction {
    let mut function = IrFunction::new("scalar_cast");
    let arg = function.add_argument(LoweredTy::object(source.clone()));
    let mut builder = IrBuilder::new(&mut function);
    let result = UnconditionalCast::with_options(ctx, loc(), EmitOptions::verified())
        .try_emit_scalar(
            &mut builder,
            &arg,
            &LoweredTy::object(target.clone()),
            source,
            target,
        )
        .expect("scalar cast should be accepted");
    builder.create_return(loc(), Some(&result));
    verify_function(&function).expect("emitted function should verify");
    function
}

/// `fn(*source, *target)` through the indirect entry point.
pub fn indirect_cast(
    ctx: &TypeContext,
    consumption: CastConsumptionKind,
    source: &Ty,
    target: &Ty,
) -> IrFunction {
    let mut function = IrFunction::new("indirect_cast");
    let src = function.add_argument(LoweredTy::address(source.clone()));
    let dest = function.add_argument(LoweredTy::address(target.clone()));
    let mut builder = IrBuilder::new(&mut function);
    UnconditionalCast::with_options(ctx, loc(), EmitOptions::verified())
        .try_emit_indirect(&mut builder, consumption, &src, source, &dest, target)
        .expect("indirect cast should be accepted");
    builder.create_return(loc(), None);
    verify_function(&function).expect("emitted function should verify");
    function
}

/// Drives the emitter directly, for representation pairs the entry points
/// do not expose. Address sources and targets are function arguments.
pub fn emitter_cast(
    ctx: &TypeContext,
    source: LoweredTy,
    consumption: CastConsumptionKind,
    target: LoweredTy,
) -> IrFunction {
    let mut function = IrFunction::new("emitter_cast");
    let src = function.add_argument(source.clone());
    let dest = target
        .is_address()
        .then(|| function.add_argument(target.clone()));
    let mut builder = IrBuilder::new(&mut function);

    let source = Source::new(src, source.ty, consumption);
    let target = match dest {
        Some(dest) => Target::indirect(dest, target.ty),
        None => Target::scalar(target.clone(), target.ty),
    };
    let result = CastEmitter::new(&mut builder, ctx, loc()).emit_top_level(source, target);
    if result.is_address() {
        builder.create_return(loc(), None);
    } else {
        builder.create_return(loc(), Some(&result.value));
    }
    verify_function(&function).expect("emitted function should verify");
    function
}

pub fn count(function: &IrFunction, predicate: impl Fn(&IrInstructionKind) -> bool) -> usize {
    function
        .instructions()
        .filter(|inst| predicate(&inst.kind))
        .count()
}
