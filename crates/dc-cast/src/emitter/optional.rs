//! Unwrapping and rewrapping of optional layers.

use dc_core::assert_expr;
use dc_core::ir::{BlockId, EnumElement, IrBuilder, IrValue};
use dc_core::span::Span;
use dc_core::types::{OptionalKind, Ty};

use super::{payload_type, CastConsumptionKind, CastEmitter, Source, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwitchState {
    Present,
    Absent,
    Join,
}

/// The control flow of a switch over an optional source.
///
/// Blocks are visited in a fixed order: the present branch, then the absent
/// branch, then the join. Each branch hands its filled target to the switch,
/// which forwards scalars to the join through a block parameter.
pub(super) struct OptionalSwitch {
    state: SwitchState,
    present: BlockId,
    absent: BlockId,
    join: BlockId,
    payload: Option<IrValue>,
    result: Option<IrValue>,
}

impl OptionalSwitch {
    /// Terminates the insertion block with a switch over `source` and leaves
    /// the builder in the present branch.
    pub(super) fn begin(
        builder: &mut IrBuilder<'_>,
        loc: Span,
        source: &Source,
        kind: OptionalKind,
        target: &Target,
    ) -> Self {
        let join = builder.split_block_for_fallthrough();
        let absent = builder.split_block_for_fallthrough();
        let present = builder.split_block_for_fallthrough();

        let cases = vec![
            (EnumElement::some(kind), present),
            (EnumElement::none(kind), absent),
        ];
        let payload = if source.is_address() {
            builder.create_switch_enum_addr(loc, &source.value, cases);
            None
        } else {
            builder.create_switch_enum(loc, &source.value, cases);
            Some(builder.add_block_param(present, payload_type(&source.value.ty)))
        };
        let result = if target.is_address() {
            None
        } else {
            Some(builder.add_block_param(join, target.lowered_type.clone()))
        };

        builder.set_insertion_point(present);
        Self {
            state: SwitchState::Present,
            present,
            absent,
            join,
            payload,
            result,
        }
    }

    /// The payload delivered to the present branch of a scalar switch.
    pub(super) fn payload(&self) -> Option<&IrValue> {
        self.payload.as_ref()
    }

    pub(super) fn finish_present(&mut self, builder: &mut IrBuilder<'_>, loc: Span, filled: &Source) {
        assert_expr!(
            self.state == SwitchState::Present,
            "present branch of bb{} already finished",
            self.present
        );
        self.branch_to_join(builder, loc, filled);
        builder.set_insertion_point(self.absent);
        self.state = SwitchState::Absent;
    }

    pub(super) fn finish_absent(&mut self, builder: &mut IrBuilder<'_>, loc: Span, filled: &Source) {
        assert_expr!(
            self.state == SwitchState::Absent,
            "absent branch bb{} finished out of order",
            self.absent
        );
        self.branch_to_join(builder, loc, filled);
        builder.set_insertion_point(self.join);
        self.state = SwitchState::Join;
    }

    /// The filled target as seen from the join block.
    pub(super) fn join(self, target: &Target) -> Source {
        assert_expr!(
            self.state == SwitchState::Join,
            "join bb{} reached before both branches finished",
            self.join
        );
        match self.result {
            Some(result) => target.as_scalar_source(result),
            None => target.as_address_source(),
        }
    }

    fn branch_to_join(&self, builder: &mut IrBuilder<'_>, loc: Span, filled: &Source) {
        match &self.result {
            Some(result) => {
                assert_expr!(
                    !filled.is_address() && filled.value.ty == result.ty,
                    "branch result {} does not match join parameter {}",
                    filled.value.ty,
                    result.ty
                );
                builder.create_branch(loc, self.join, vec![filled.value.clone()]);
            }
            None => {
                assert_expr!(
                    filled.is_address(),
                    "branch result {} is not the target address",
                    filled.value.ty
                );
                builder.create_branch(loc, self.join, Vec::new());
            }
        }
    }
}

/// Case carried from `prepare_for_emit_some` to `emit_some`.
pub(super) struct EmitSomeState {
    element: EnumElement,
}

fn target_optional(target: &Target) -> (OptionalKind, Ty) {
    match target.formal_type.optional_object() {
        Some((kind, object)) => (kind, object.clone()),
        None => panic!("target {} is not optional", target.formal_type),
    }
}

impl CastEmitter<'_, '_> {
    pub(super) fn emit_optional_to_optional(
        &mut self,
        source: Source,
        kind: OptionalKind,
        object: Ty,
        target: &Target,
    ) -> Source {
        assert_expr!(
            target.formal_type.any_optional_object_type().is_some(),
            "optional {} cast to non-optional {}",
            source.formal_type,
            target.formal_type
        );
        let mut switch = OptionalSwitch::begin(self.builder, self.loc, &source, kind, target);

        let (object_target, state) = self.prepare_for_emit_some(target);
        let element = EnumElement::some(kind);
        let object_result = if let Some(payload) = switch.payload() {
            let payload = Source::new(payload.clone(), object, source.consumption);
            self.emit(payload, &object_target)
        } else if source.should_take() {
            let payload = self.builder.create_unchecked_take_enum_data_addr(
                self.loc,
                &source.value,
                element,
                payload_type(&source.value.ty),
            );
            let payload = Source::new(payload, object, CastConsumptionKind::TakeAlways);
            self.emit(payload, &object_target)
        } else {
            // Projecting the payload destroys the optional, so work on a copy.
            let lowering = self.lowering(&source.formal_type);
            self.with_scoped_temporary(source.value.ty.object_type(), |emitter, temp| {
                lowering.emit_copy_into(emitter.builder, emitter.loc, &source.value, temp, false, true);
                let payload = emitter.builder.create_unchecked_take_enum_data_addr(
                    emitter.loc,
                    temp,
                    element,
                    payload_type(&temp.ty),
                );
                let payload = Source::new(payload, object, CastConsumptionKind::TakeAlways);
                emitter.emit(payload, &object_target)
            })
        };
        let present = self.emit_some(object_result, target, state);
        switch.finish_present(self.builder, self.loc, &present);

        let absent = self.emit_none(target);
        switch.finish_absent(self.builder, self.loc, &absent);

        switch.join(target)
    }

    /// Target for the payload of an optional target. An address target is
    /// projected to its present-case payload slot.
    pub(super) fn prepare_for_emit_some(&mut self, target: &Target) -> (Target, EmitSomeState) {
        let (kind, object) = target_optional(target);
        let element = EnumElement::some(kind);
        let object_target = match &target.address {
            Some(address) => {
                let payload = self.builder.create_init_enum_data_addr(
                    self.loc,
                    address,
                    element,
                    payload_type(&address.ty),
                );
                Target::indirect(payload, object)
            }
            None => Target::scalar(payload_type(&target.lowered_type), object),
        };
        (object_target, EmitSomeState { element })
    }

    /// Wraps a filled payload target into the present case of `target`.
    pub(super) fn emit_some(&mut self, source: Source, target: &Target, state: EmitSomeState) -> Source {
        match &target.address {
            Some(address) => {
                assert_expr!(
                    source.is_address(),
                    "payload {} of address target was not written in place",
                    source.value.ty
                );
                self.builder
                    .create_inject_enum_addr(self.loc, address, state.element);
                target.as_address_source()
            }
            None => {
                let lowering = self.lowering(&source.formal_type);
                let payload = self.get_owned_scalar(&source, &lowering);
                let value = self.builder.create_enum(
                    self.loc,
                    Some(&payload),
                    state.element,
                    target.lowered_type.clone(),
                );
                target.as_scalar_source(value)
            }
        }
    }

    pub(super) fn emit_none(&mut self, target: &Target) -> Source {
        let (kind, _) = target_optional(target);
        let element = EnumElement::none(kind);
        match &target.address {
            Some(address) => {
                self.builder.create_inject_enum_addr(self.loc, address, element);
                target.as_address_source()
            }
            None => {
                let value =
                    self.builder
                        .create_enum(self.loc, None, element, target.lowered_type.clone());
                target.as_scalar_source(value)
            }
        }
    }
}
