use std::collections::{HashMap, HashSet};

use crate::lowering::{LoweringKind, TypeLowering};
use crate::types::{Symbol, Ty, TyKind};

/// Type-system queries consumed by cast classification and emission.
///
/// Implementors only answer the two nominal questions; hierarchy walks and
/// representation lowering are derived from them.
pub trait TypeOracle {
    /// Direct superclass of a declared class, if any.
    fn superclass_of(&self, class: &Symbol) -> Option<Symbol>;

    /// Whether a plain nominal type must be manipulated through memory.
    fn is_address_only_nominal(&self, name: &Symbol) -> bool;

    /// Whether `ancestor` is `descendant` or one of its superclasses.
    /// Metatypes compare their instance types.
    fn is_ancestor_or_self(&self, ancestor: &Ty, descendant: &Ty) -> bool {
        match (&ancestor.kind, &descendant.kind) {
            (TyKind::Class(ancestor), TyKind::Class(descendant)) => {
                let mut current = Some(descendant.clone());
                while let Some(class) = current {
                    if &class == ancestor {
                        return true;
                    }
                    current = self.superclass_of(&class);
                }
                false
            }
            (
                TyKind::Metatype {
                    instance: ancestor, ..
                },
                TyKind::Metatype {
                    instance: descendant,
                    ..
                },
            ) => self.is_ancestor_or_self(ancestor, descendant),
            _ => ancestor == descendant,
        }
    }

    fn lowering_kind(&self, ty: &Ty) -> LoweringKind {
        match &ty.kind {
            TyKind::Class(_) => LoweringKind::Reference,
            TyKind::Metatype { .. } => LoweringKind::Trivial,
            TyKind::Existential(_) | TyKind::Archetype(_) => LoweringKind::AddressOnly,
            TyKind::Plain(name) if self.is_address_only_nominal(name) => {
                LoweringKind::AddressOnly
            }
            TyKind::Plain(_) => LoweringKind::Trivial,
            TyKind::Optional { object, .. } => self.lowering_kind(object),
            TyKind::Tuple(elements) => elements
                .iter()
                .map(|element| self.lowering_kind(element))
                .max()
                .unwrap_or(LoweringKind::Trivial),
        }
    }

    /// Representation and value operations for `ty`.
    fn lowering(&self, ty: &Ty) -> TypeLowering {
        TypeLowering::new(ty.clone(), self.lowering_kind(ty))
    }
}

#[derive(Debug, Clone)]
struct ClassDecl {
    superclass: Option<Symbol>,
}

/// Declared classes and address-only nominal types of a module.
#[derive(Debug, Clone, Default)]
pub struct TypeContext {
    classes: HashMap<Symbol, ClassDecl>,
    address_only: HashSet<Symbol>,
}

impl TypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a class. The superclass must already be declared, which keeps
    /// the hierarchy acyclic.
    pub fn declare_class(
        &mut self,
        name: impl Into<Symbol>,
        superclass: Option<&str>,
    ) -> crate::Result<()> {
        let name = name.into();
        if self.classes.contains_key(&name) {
            bail!("class `{}` is already declared", name);
        }
        let superclass = superclass.map(Symbol::from);
        if let Some(parent) = &superclass {
            if !self.classes.contains_key(parent) {
                bail!("superclass `{}` of `{}` is not declared", parent, name);
            }
        }
        self.classes.insert(name, ClassDecl { superclass });
        Ok(())
    }

    /// Builder-style variant of [`TypeContext::declare_class`].
    pub fn with_class(mut self, name: &str, superclass: Option<&str>) -> crate::Result<Self> {
        self.declare_class(name, superclass)?;
        Ok(self)
    }

    pub fn declare_address_only(&mut self, name: impl Into<Symbol>) {
        self.address_only.insert(name.into());
    }
}

impl TypeOracle for TypeContext {
    fn superclass_of(&self, class: &Symbol) -> Option<Symbol> {
        self.classes
            .get(class)
            .and_then(|decl| decl.superclass.clone())
    }

    fn is_address_only_nominal(&self, name: &Symbol) -> bool {
        self.address_only.contains(name)
    }
}
