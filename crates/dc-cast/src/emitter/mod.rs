//! Emission of casts already classified as [`Feasibility::WillSucceed`].
//!
//! The emitter recurses over the same optional structure the classifier
//! walked. Each step takes a [`Source`] (a value or address plus how it may
//! be consumed) and a [`Target`] (an address to initialize, or the lowered
//! type of the scalar to produce) and returns the filled target as a new,
//! uniquely owned `Source`.
//!
//! [`Feasibility::WillSucceed`]: crate::feasibility::Feasibility::WillSucceed

use dc_core::assert_expr;
use dc_core::ir::{IrBuilder, IrValue};
use dc_core::span::Span;
use dc_core::types::{LoweredTy, Ty, TypeOracle};
use dc_core::TypeLowering;
use serde::{Deserialize, Serialize};

mod optional;

/// How the ownership of a cast source is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastConsumptionKind {
    /// The source is consumed.
    TakeAlways,
    /// The source is consumed if the cast succeeds. Unconditional casts
    /// always succeed, so this behaves like `TakeAlways`.
    TakeOnSuccess,
    /// The source must stay valid; the emitted code works on a copy.
    CopyOnSuccess,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub value: IrValue,
    pub formal_type: Ty,
    pub consumption: CastConsumptionKind,
}

impl Source {
    pub fn new(value: IrValue, formal_type: Ty, consumption: CastConsumptionKind) -> Self {
        Self {
            value,
            formal_type,
            consumption,
        }
    }

    pub fn is_address(&self) -> bool {
        self.value.ty.is_address()
    }

    pub fn should_take(&self) -> bool {
        self.consumption != CastConsumptionKind::CopyOnSuccess
    }
}

/// Where a cast result goes: either an uninitialized address, or a scalar of
/// `lowered_type` that the emission has to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub address: Option<IrValue>,
    pub lowered_type: LoweredTy,
    pub formal_type: Ty,
}

impl Target {
    pub fn indirect(address: IrValue, formal_type: Ty) -> Self {
        assert_expr!(
            address.ty.is_address(),
            "indirect target {} is not an address",
            address.ty
        );
        Self {
            lowered_type: address.ty.clone(),
            address: Some(address),
            formal_type,
        }
    }

    pub fn scalar(lowered_type: LoweredTy, formal_type: Ty) -> Self {
        assert_expr!(
            !lowered_type.is_address(),
            "scalar target {} is an address",
            lowered_type
        );
        Self {
            address: None,
            lowered_type,
            formal_type,
        }
    }

    pub fn is_address(&self) -> bool {
        self.address.is_some()
    }

    pub fn as_address_source(&self) -> Source {
        match &self.address {
            Some(address) => Source::new(
                address.clone(),
                self.formal_type.clone(),
                CastConsumptionKind::TakeAlways,
            ),
            None => panic!("scalar target {} has no address", self.formal_type),
        }
    }

    pub fn as_scalar_source(&self, value: IrValue) -> Source {
        assert_expr!(!self.is_address(), "address target {} given a scalar", self.formal_type);
        assert_expr!(!value.ty.is_address(), "scalar result {} is an address", value.ty);
        Source::new(
            value,
            self.formal_type.clone(),
            CastConsumptionKind::TakeAlways,
        )
    }
}

/// Payload type of an optional lowered type, in the same category.
pub(crate) fn payload_type(ty: &LoweredTy) -> LoweredTy {
    match ty.optional_payload() {
        Some(payload) => payload,
        None => panic!("expected an optional type, found {}", ty),
    }
}

pub struct CastEmitter<'a, 'f> {
    builder: &'a mut IrBuilder<'f>,
    types: &'a dyn TypeOracle,
    loc: Span,
}

impl<'a, 'f> CastEmitter<'a, 'f> {
    pub fn new(builder: &'a mut IrBuilder<'f>, types: &'a dyn TypeOracle, loc: Span) -> Self {
        Self {
            builder,
            types,
            loc,
        }
    }

    /// Emits the whole conversion. The target must be at least as optional as
    /// the source; the extra layers are injected around the inner conversion.
    pub fn emit_top_level(&mut self, source: Source, target: Target) -> Source {
        let source_depth = source.formal_type.optional_depth();
        let target_depth = target.formal_type.optional_depth();
        assert_expr!(
            source_depth <= target_depth,
            "cannot remove optionality from {} to {}",
            source.formal_type,
            target.formal_type
        );
        self.emit_and_inject_into_optionals(source, &target, target_depth - source_depth)
    }

    fn lowering(&self, ty: &Ty) -> TypeLowering {
        self.types.lowering(ty)
    }

    /// Makes a scalar source +1, retaining it when it has to be preserved.
    fn get_owned_scalar(&mut self, source: &Source, lowering: &TypeLowering) -> IrValue {
        assert_expr!(!source.is_address(), "owned scalar from address {}", source.value.ty);
        if !source.should_take() {
            lowering.emit_retain_value(self.builder, self.loc, &source.value);
        }
        source.value.clone()
    }

    fn put_owned_scalar(&mut self, scalar: IrValue, target: &Target) -> Source {
        assert_expr!(
            scalar.ty == target.lowered_type.object_type(),
            "scalar {} does not fit target {}",
            scalar.ty,
            target.lowered_type
        );
        match &target.address {
            None => target.as_scalar_source(scalar),
            Some(address) => {
                let lowering = self.lowering(&target.formal_type);
                lowering.emit_store_of_copy(self.builder, self.loc, &scalar, address, true);
                target.as_address_source()
            }
        }
    }

    fn emit_same_type(&mut self, mut source: Source, target: &Target) -> Source {
        assert_expr!(
            source.formal_type == target.formal_type,
            "same-type emission from {} to {}",
            source.formal_type,
            target.formal_type
        );
        let lowering = self.lowering(&source.formal_type);

        // The destination always wants a +1 value.
        if !source.is_address() {
            source.value = self.get_owned_scalar(&source, &lowering);
            source.consumption = CastConsumptionKind::TakeAlways;
        }

        match (&target.address, source.is_address()) {
            (None, false) => target.as_scalar_source(source.value),
            (None, true) => {
                let value = lowering.emit_load_of_copy(
                    self.builder,
                    self.loc,
                    &source.value,
                    source.should_take(),
                );
                target.as_scalar_source(value)
            }
            (Some(dest), true) => {
                lowering.emit_copy_into(
                    self.builder,
                    self.loc,
                    &source.value,
                    dest,
                    source.should_take(),
                    true,
                );
                target.as_address_source()
            }
            (Some(dest), false) => {
                lowering.emit_store_of_copy(self.builder, self.loc, &source.value, dest, true);
                target.as_address_source()
            }
        }
    }

    fn emit(&mut self, source: Source, target: &Target) -> Source {
        if source.formal_type == target.formal_type {
            return self.emit_same_type(source, target);
        }

        if let Some((kind, object)) = source.formal_type.optional_object() {
            let object = object.clone();
            return self.emit_optional_to_optional(source, kind, object, target);
        }
        assert_expr!(
            target.formal_type.any_optional_object_type().is_none(),
            "unbalanced optional depth from {} to {}",
            source.formal_type,
            target.formal_type
        );

        // The only other conversion classified as certain is an upcast.
        let lowering = self.lowering(&source.formal_type);
        let value = if source.is_address() {
            lowering.emit_load_of_copy(self.builder, self.loc, &source.value, source.should_take())
        } else {
            self.get_owned_scalar(&source, &lowering)
        };
        let value = self
            .builder
            .create_upcast(self.loc, &value, target.lowered_type.object_type());
        self.put_owned_scalar(value, target)
    }

    fn emit_and_inject_into_optionals(
        &mut self,
        source: Source,
        target: &Target,
        depth: usize,
    ) -> Source {
        if depth == 0 {
            return self.emit(source, target);
        }

        let (object_target, state) = self.prepare_for_emit_some(target);
        let object_source = self.emit_and_inject_into_optionals(source, &object_target, depth - 1);
        self.emit_some(object_source, target, state)
    }

    /// Runs `body` with stack storage for `ty` that is deallocated as soon as
    /// `body` returns, on the same control-flow path that allocated it.
    fn with_scoped_temporary<R>(
        &mut self,
        ty: LoweredTy,
        body: impl FnOnce(&mut Self, &IrValue) -> R,
    ) -> R {
        let address = self.builder.create_alloc_stack(self.loc, ty);
        let result = body(self, &address);
        self.builder.create_dealloc_stack(self.loc, &address);
        result
    }
}
