use crate::ir::{
    BlockId, EnumElement, IrFunction, IrInstruction, IrInstructionKind, IrTerminator,
    IrTerminatorKind, IrValue, LoadQualifier,
};
use crate::span::Span;
use crate::types::LoweredTy;

/// Appends instructions at the end of an insertion block.
///
/// Instructions and the terminator are stored separately, so inserting into a
/// block that already ends in a terminator places the instruction before it.
pub struct IrBuilder<'f> {
    function: &'f mut IrFunction,
    insertion: BlockId,
}

impl<'f> IrBuilder<'f> {
    pub fn new(function: &'f mut IrFunction) -> Self {
        let insertion = function.entry;
        Self {
            function,
            insertion,
        }
    }

    pub fn function(&self) -> &IrFunction {
        self.function
    }

    pub fn insertion_block(&self) -> BlockId {
        self.insertion
    }

    pub fn set_insertion_point(&mut self, block: BlockId) {
        assert_expr!(
            self.function.contains_block(block),
            "bb{} is not part of {}",
            block,
            self.function.name
        );
        self.insertion = block;
    }

    /// Appends a fresh block at the end of the layout.
    pub fn new_block(&mut self) -> BlockId {
        let id = self.function.create_block();
        self.function.layout.push(id);
        id
    }

    /// Creates a block right after the insertion block that inherits its
    /// terminator, so code emitted at the insertion point falls through to it.
    pub fn split_block_for_fallthrough(&mut self) -> BlockId {
        let id = self.function.create_block();
        let position = self
            .function
            .layout
            .iter()
            .position(|block| *block == self.insertion)
            .map(|idx| idx + 1)
            .unwrap_or(self.function.layout.len());
        self.function.layout.insert(position, id);
        let terminator = self.function.block_mut(self.insertion).terminator.take();
        self.function.block_mut(id).terminator = terminator;
        id
    }

    pub fn add_block_param(&mut self, block: BlockId, ty: LoweredTy) -> IrValue {
        self.function.add_block_param(block, ty)
    }

    fn push(&mut self, loc: Span, kind: IrInstructionKind, result: Option<IrValue>) {
        let id = self.function.fresh_inst_id();
        let block = self.insertion;
        self.function.block_mut(block).instructions.push(IrInstruction {
            id,
            loc,
            kind,
            result,
        });
    }

    fn insert(&mut self, loc: Span, kind: IrInstructionKind) {
        self.push(loc, kind, None);
    }

    fn insert_with_result(
        &mut self,
        loc: Span,
        kind: IrInstructionKind,
        result_ty: LoweredTy,
    ) -> IrValue {
        let result = self.function.fresh_value(result_ty);
        self.push(loc, kind, Some(result.clone()));
        result
    }

    fn terminate(&mut self, loc: Span, kind: IrTerminatorKind) {
        let block = self.insertion;
        let slot = &mut self.function.block_mut(block).terminator;
        assert_expr!(slot.is_none(), "bb{} is already terminated", block);
        *slot = Some(IrTerminator { loc, kind });
    }

    pub fn create_retain_value(&mut self, loc: Span, operand: &IrValue) {
        self.insert(
            loc,
            IrInstructionKind::RetainValue {
                operand: operand.clone(),
            },
        );
    }

    pub fn create_load(&mut self, loc: Span, address: &IrValue, qualifier: LoadQualifier) -> IrValue {
        let result_ty = address.ty.object_type();
        self.insert_with_result(
            loc,
            IrInstructionKind::Load {
                address: address.clone(),
                qualifier,
            },
            result_ty,
        )
    }

    pub fn create_store(&mut self, loc: Span, value: &IrValue, address: &IrValue, is_init: bool) {
        self.insert(
            loc,
            IrInstructionKind::Store {
                value: value.clone(),
                address: address.clone(),
                is_init,
            },
        );
    }

    pub fn create_copy_addr(
        &mut self,
        loc: Span,
        src: &IrValue,
        dest: &IrValue,
        is_take: bool,
        is_init: bool,
    ) {
        self.insert(
            loc,
            IrInstructionKind::CopyAddr {
                src: src.clone(),
                dest: dest.clone(),
                is_take,
                is_init,
            },
        );
    }

    pub fn create_upcast(&mut self, loc: Span, operand: &IrValue, ty: LoweredTy) -> IrValue {
        self.insert_with_result(
            loc,
            IrInstructionKind::Upcast {
                operand: operand.clone(),
            },
            ty,
        )
    }

    /// Allocates uninitialized stack storage for a value of object type `ty`.
    pub fn create_alloc_stack(&mut self, loc: Span, ty: LoweredTy) -> IrValue {
        let address = ty.address_type();
        self.insert_with_result(loc, IrInstructionKind::AllocStack { ty }, address)
    }

    pub fn create_dealloc_stack(&mut self, loc: Span, address: &IrValue) {
        self.insert(
            loc,
            IrInstructionKind::DeallocStack {
                address: address.clone(),
            },
        );
    }

    pub fn create_unchecked_take_enum_data_addr(
        &mut self,
        loc: Span,
        address: &IrValue,
        element: EnumElement,
        payload_ty: LoweredTy,
    ) -> IrValue {
        self.insert_with_result(
            loc,
            IrInstructionKind::UncheckedTakeEnumDataAddr {
                address: address.clone(),
                element,
            },
            payload_ty,
        )
    }

    pub fn create_init_enum_data_addr(
        &mut self,
        loc: Span,
        address: &IrValue,
        element: EnumElement,
        payload_ty: LoweredTy,
    ) -> IrValue {
        self.insert_with_result(
            loc,
            IrInstructionKind::InitEnumDataAddr {
                address: address.clone(),
                element,
            },
            payload_ty,
        )
    }

    pub fn create_inject_enum_addr(&mut self, loc: Span, address: &IrValue, element: EnumElement) {
        self.insert(
            loc,
            IrInstructionKind::InjectEnumAddr {
                address: address.clone(),
                element,
            },
        );
    }

    pub fn create_enum(
        &mut self,
        loc: Span,
        payload: Option<&IrValue>,
        element: EnumElement,
        ty: LoweredTy,
    ) -> IrValue {
        self.insert_with_result(
            loc,
            IrInstructionKind::Enum {
                payload: payload.cloned(),
                element,
            },
            ty,
        )
    }

    pub fn create_branch(&mut self, loc: Span, target: BlockId, args: Vec<IrValue>) {
        self.terminate(loc, IrTerminatorKind::Br { target, args });
    }

    pub fn create_switch_enum(
        &mut self,
        loc: Span,
        operand: &IrValue,
        cases: Vec<(EnumElement, BlockId)>,
    ) {
        self.terminate(
            loc,
            IrTerminatorKind::SwitchEnum {
                operand: operand.clone(),
                cases,
            },
        );
    }

    pub fn create_switch_enum_addr(
        &mut self,
        loc: Span,
        address: &IrValue,
        cases: Vec<(EnumElement, BlockId)>,
    ) {
        self.terminate(
            loc,
            IrTerminatorKind::SwitchEnumAddr {
                address: address.clone(),
                cases,
            },
        );
    }

    pub fn create_return(&mut self, loc: Span, value: Option<&IrValue>) {
        self.terminate(loc, IrTerminatorKind::Return(value.cloned()));
    }

    pub fn create_unreachable(&mut self, loc: Span) {
        self.terminate(loc, IrTerminatorKind::Unreachable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ty;

    #[test]
    fn split_moves_terminator_and_keeps_layout_adjacent() {
        let mut function = IrFunction::new("split");
        let arg = function.add_argument(LoweredTy::object(Ty::class("Base")));
        let mut builder = IrBuilder::new(&mut function);
        let tail = builder.new_block();
        builder.create_return(Span::default(), Some(&arg));

        let cont = builder.split_block_for_fallthrough();
        let next = builder.split_block_for_fallthrough();

        assert_eq!(function.layout, vec![0, next, cont, tail]);
        assert!(function.block(0).terminator.is_none());
        assert!(function.block(next).terminator.is_none());
        assert!(matches!(
            function.block(cont).terminator.as_ref().map(|t| &t.kind),
            Some(IrTerminatorKind::Return(Some(_)))
        ));
    }

    #[test]
    fn values_are_numbered_in_creation_order() {
        let mut function = IrFunction::new("numbering");
        let addr = function.add_argument(LoweredTy::address(Ty::class("Base")));
        let mut builder = IrBuilder::new(&mut function);
        let loaded = builder.create_load(Span::default(), &addr, LoadQualifier::Take);
        let temp = builder.create_alloc_stack(Span::default(), loaded.ty.clone());
        assert_eq!((addr.id, loaded.id, temp.id), (0, 1, 2));
        assert_eq!(loaded.ty, LoweredTy::object(Ty::class("Base")));
        assert_eq!(temp.ty, LoweredTy::address(Ty::class("Base")));
    }

    #[test]
    #[should_panic(expected = "already terminated")]
    fn double_termination_is_rejected() {
        let mut function = IrFunction::new("twice");
        let mut builder = IrBuilder::new(&mut function);
        builder.create_unreachable(Span::default());
        builder.create_unreachable(Span::default());
    }
}
