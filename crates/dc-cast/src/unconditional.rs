//! Entry points for emitting casts that are statically known to succeed.
//!
//! Every precondition is checked before the first instruction is created, so
//! a rejected request leaves the function untouched.

use dc_core::ir::{verify_open_function, IrBuilder, IrValue};
use dc_core::pretty::{pretty, PrettyOptions};
use dc_core::span::Span;
use dc_core::types::{LoweredTy, Ty, TypeOracle};
use dc_core::{assert_expr, debug, error, warn};

use crate::config::EmitOptions;
use crate::emitter::{CastConsumptionKind, CastEmitter, Source, Target};
use crate::error::{CastError, Result};
use crate::feasibility::classify_dynamic_cast;

/// Emits unconditional casts into a function under construction.
pub struct UnconditionalCast<'a> {
    types: &'a dyn TypeOracle,
    loc: Span,
    options: EmitOptions,
}

impl<'a> UnconditionalCast<'a> {
    pub fn new(types: &'a dyn TypeOracle, loc: Span) -> Self {
        Self::with_options(types, loc, EmitOptions::default())
    }

    pub fn with_options(types: &'a dyn TypeOracle, loc: Span, options: EmitOptions) -> Self {
        Self {
            types,
            loc,
            options,
        }
    }

    /// Converts the scalar `value` of formal type `source_type` to a scalar
    /// of `lowered_target`. The source is consumed.
    pub fn try_emit_scalar(
        &self,
        builder: &mut IrBuilder<'_>,
        value: &IrValue,
        lowered_target: &LoweredTy,
        source_type: &Ty,
        target_type: &Ty,
    ) -> Result<IrValue> {
        expect_scalar("source value", &value.ty, source_type)?;
        expect_scalar("target type", lowered_target, target_type)?;
        for ty in [source_type, target_type] {
            if self.types.lowering(ty).is_address_only() {
                return Err(CastError::mismatch("scalar cast type", "a loadable type", ty));
            }
        }
        self.check_guaranteed(source_type, target_type)?;

        if source_type == target_type {
            return Ok(value.clone());
        }

        debug!(
            "emitting scalar cast {} -> {} at {}",
            source_type, target_type, self.loc
        );
        let source = Source::new(
            value.clone(),
            source_type.clone(),
            CastConsumptionKind::TakeAlways,
        );
        let target = Target::scalar(lowered_target.clone(), target_type.clone());
        let result = CastEmitter::new(builder, self.types, self.loc).emit_top_level(source, target);
        assert_expr!(
            !result.is_address() && &result.value.ty == lowered_target,
            "scalar cast produced {} instead of {}",
            result.value.ty,
            lowered_target
        );

        self.finish(builder)?;
        Ok(result.value)
    }

    /// Panicking form of [`UnconditionalCast::try_emit_scalar`].
    pub fn emit_scalar(
        &self,
        builder: &mut IrBuilder<'_>,
        value: &IrValue,
        lowered_target: &LoweredTy,
        source_type: &Ty,
        target_type: &Ty,
    ) -> IrValue {
        match self.try_emit_scalar(builder, value, lowered_target, source_type, target_type) {
            Ok(value) => value,
            Err(err) => abort(err),
        }
    }

    /// Initializes the memory at `dest` with the value at `src` converted to
    /// `target_type`. `consumption` decides whether `src` stays valid.
    pub fn try_emit_indirect(
        &self,
        builder: &mut IrBuilder<'_>,
        consumption: CastConsumptionKind,
        src: &IrValue,
        source_type: &Ty,
        dest: &IrValue,
        target_type: &Ty,
    ) -> Result<()> {
        expect_address("source address", &src.ty, source_type)?;
        expect_address("destination address", &dest.ty, target_type)?;
        self.check_guaranteed(source_type, target_type)?;

        debug!(
            "emitting indirect cast {} -> {} ({:?}) at {}",
            source_type, target_type, consumption, self.loc
        );
        let source = Source::new(src.clone(), source_type.clone(), consumption);
        let target = Target::indirect(dest.clone(), target_type.clone());
        let result = CastEmitter::new(builder, self.types, self.loc).emit_top_level(source, target);
        assert_expr!(
            result.is_address() && &result.value == dest,
            "indirect cast did not fill the destination %{}",
            dest.id
        );

        self.finish(builder)
    }

    /// Panicking form of [`UnconditionalCast::try_emit_indirect`].
    pub fn emit_indirect(
        &self,
        builder: &mut IrBuilder<'_>,
        consumption: CastConsumptionKind,
        src: &IrValue,
        source_type: &Ty,
        dest: &IrValue,
        target_type: &Ty,
    ) {
        if let Err(err) =
            self.try_emit_indirect(builder, consumption, src, source_type, dest, target_type)
        {
            abort(err)
        }
    }

    fn check_guaranteed(&self, source_type: &Ty, target_type: &Ty) -> Result<()> {
        let source_depth = source_type.optional_depth();
        let target_depth = target_type.optional_depth();
        if source_depth > target_depth {
            return Err(CastError::OptionalDepthUnderflow {
                source_depth,
                target_depth,
            });
        }
        let verdict = classify_dynamic_cast(self.types, source_type, target_type);
        if !verdict.is_will_succeed() {
            return Err(CastError::NotGuaranteed {
                source_type: source_type.clone(),
                target_type: target_type.clone(),
                verdict,
            });
        }
        Ok(())
    }

    fn finish(&self, builder: &IrBuilder<'_>) -> Result<()> {
        let function = builder.function();
        if self.options.trace_ir {
            debug!("after cast:\n{}", pretty(function, PrettyOptions::default()));
        }
        if self.options.verify {
            if let Err(err) = verify_open_function(function, builder.insertion_block()) {
                warn!("{}", err);
                return Err(err.into());
            }
        }
        Ok(())
    }
}

fn expect_scalar(role: &'static str, lowered: &LoweredTy, formal: &Ty) -> Result<()> {
    if lowered.is_address() {
        return Err(CastError::mismatch(role, "a scalar", lowered));
    }
    if &lowered.ty != formal {
        return Err(CastError::mismatch(role, format!("of type {}", formal), lowered));
    }
    Ok(())
}

fn expect_address(role: &'static str, lowered: &LoweredTy, formal: &Ty) -> Result<()> {
    if !lowered.is_address() {
        return Err(CastError::mismatch(role, "an address", lowered));
    }
    if &lowered.ty != formal {
        return Err(CastError::mismatch(role, format!("of type {}", formal), lowered));
    }
    Ok(())
}

fn abort(err: CastError) -> ! {
    error!("unconditional cast rejected: {}", err);
    panic!("{}", err)
}

/// Emits a cast of the scalar `value` that is known to succeed and returns
/// the converted scalar. Identical formal types return `value` unchanged.
///
/// Panics if the cast is not classified as certain to succeed, or if the
/// values do not have the scalar representations of their formal types.
pub fn emit_successful_scalar_unconditional_cast(
    builder: &mut IrBuilder<'_>,
    types: &dyn TypeOracle,
    loc: Span,
    value: &IrValue,
    lowered_target: &LoweredTy,
    source_type: &Ty,
    target_type: &Ty,
) -> IrValue {
    UnconditionalCast::new(types, loc).emit_scalar(
        builder,
        value,
        lowered_target,
        source_type,
        target_type,
    )
}

/// Emits a cast between two addresses that is known to succeed.
///
/// Panics under the same conditions as
/// [`emit_successful_scalar_unconditional_cast`].
#[allow(clippy::too_many_arguments)]
pub fn emit_successful_indirect_unconditional_cast(
    builder: &mut IrBuilder<'_>,
    types: &dyn TypeOracle,
    loc: Span,
    consumption: CastConsumptionKind,
    src: &IrValue,
    source_type: &Ty,
    dest: &IrValue,
    target_type: &Ty,
) {
    UnconditionalCast::new(types, loc).emit_indirect(
        builder,
        consumption,
        src,
        source_type,
        dest,
        target_type,
    )
}
