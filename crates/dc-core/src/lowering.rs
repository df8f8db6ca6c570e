//! How a formal type is represented once lowered, and the value operations
//! that respect that representation.

use serde::{Deserialize, Serialize};

use crate::ir::{IrBuilder, IrValue, LoadQualifier};
use crate::span::Span;
use crate::types::Ty;

/// Ordered from cheapest to most constrained; aggregates take the maximum of
/// their elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoweringKind {
    /// Held as a scalar; copying needs no bookkeeping.
    Trivial,
    /// Held as a scalar that owns a reference; copying retains it.
    Reference,
    /// Must live in memory; only address operations apply.
    AddressOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLowering {
    ty: Ty,
    kind: LoweringKind,
}

impl TypeLowering {
    pub fn new(ty: Ty, kind: LoweringKind) -> Self {
        Self { ty, kind }
    }

    pub fn is_address_only(&self) -> bool {
        self.kind == LoweringKind::AddressOnly
    }

    pub fn is_trivial(&self) -> bool {
        self.kind == LoweringKind::Trivial
    }

    /// Produces an additional owned reference to `value` in place.
    pub fn emit_retain_value(&self, builder: &mut IrBuilder<'_>, loc: Span, value: &IrValue) {
        assert_expr!(
            !value.ty.is_address(),
            "retain of address value {}",
            value.ty
        );
        if self.is_trivial() {
            return;
        }
        builder.create_retain_value(loc, value);
    }

    /// Loads an owned scalar, consuming the memory when `is_take`.
    pub fn emit_load_of_copy(
        &self,
        builder: &mut IrBuilder<'_>,
        loc: Span,
        address: &IrValue,
        is_take: bool,
    ) -> IrValue {
        assert_expr!(
            !self.is_address_only(),
            "cannot load address-only type {}",
            self.ty
        );
        let qualifier = match (self.is_trivial(), is_take) {
            (true, _) => LoadQualifier::Trivial,
            (false, true) => LoadQualifier::Take,
            (false, false) => LoadQualifier::Copy,
        };
        builder.create_load(loc, address, qualifier)
    }

    /// Stores an owned scalar, transferring its ownership into memory.
    pub fn emit_store_of_copy(
        &self,
        builder: &mut IrBuilder<'_>,
        loc: Span,
        value: &IrValue,
        address: &IrValue,
        is_init: bool,
    ) {
        builder.create_store(loc, value, address, is_init);
    }

    /// Copies between two addresses, consuming the source when `is_take`.
    pub fn emit_copy_into(
        &self,
        builder: &mut IrBuilder<'_>,
        loc: Span,
        src: &IrValue,
        dest: &IrValue,
        is_take: bool,
        is_init: bool,
    ) {
        builder.create_copy_addr(loc, src, dest, is_take, is_init);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrFunction, IrInstructionKind};
    use crate::types::LoweredTy;

    #[test]
    fn trivial_retain_emits_nothing() {
        let mut function = IrFunction::new("retain");
        let arg = function.add_argument(LoweredTy::object(Ty::plain("Int")));
        let mut builder = IrBuilder::new(&mut function);
        TypeLowering::new(Ty::plain("Int"), LoweringKind::Trivial).emit_retain_value(
            &mut builder,
            Span::default(),
            &arg,
        );
        assert_eq!(function.instructions().count(), 0);
    }

    #[test]
    fn load_qualifier_tracks_ownership() {
        let mut function = IrFunction::new("load");
        let addr = function.add_argument(LoweredTy::address(Ty::class("Base")));
        let mut builder = IrBuilder::new(&mut function);
        let lowering = TypeLowering::new(Ty::class("Base"), LoweringKind::Reference);
        lowering.emit_load_of_copy(&mut builder, Span::default(), &addr, false);
        lowering.emit_load_of_copy(&mut builder, Span::default(), &addr, true);
        let qualifiers: Vec<_> = function
            .instructions()
            .filter_map(|inst| match &inst.kind {
                IrInstructionKind::Load { qualifier, .. } => Some(*qualifier),
                _ => None,
            })
            .collect();
        assert_eq!(qualifiers, vec![LoadQualifier::Copy, LoadQualifier::Take]);
    }

    #[test]
    #[should_panic(expected = "cannot load address-only type")]
    fn address_only_load_is_an_internal_error() {
        let mut function = IrFunction::new("load");
        let addr = function.add_argument(LoweredTy::address(Ty::archetype("T")));
        let mut builder = IrBuilder::new(&mut function);
        TypeLowering::new(Ty::archetype("T"), LoweringKind::AddressOnly).emit_load_of_copy(
            &mut builder,
            Span::default(),
            &addr,
            true,
        );
    }
}
