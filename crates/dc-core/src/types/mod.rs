//! The formal type algebra consumed by cast classification and emission.
//!
//! Types are a closed sum: every query below is a single `match` over
//! [`TyKind`], so peeling one optional or metatype layer is decided once per
//! recursion level.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

pub mod context;
mod ident;

pub use context::{TypeContext, TypeOracle};
pub use ident::Symbol;

/// Which optional flavor wraps a type. Both flavors share the same
/// present/absent layout but are distinct formal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionalKind {
    Optional,
    ImplicitlyUnwrapped,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ty {
    pub kind: TyKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TyKind {
    /// A nominal class type, ordered by the class hierarchy.
    Class(Symbol),

    /// A protocol composition. The concrete runtime type is unknown.
    Existential(Vec<Symbol>),

    /// An unresolved generic parameter.
    Archetype(Symbol),

    /// The type of a type value. `existential` marks the metatype of an
    /// existential, whose instances may be any conforming concrete metatype.
    Metatype { instance: Box<Ty>, existential: bool },

    /// `object` or absent.
    Optional { kind: OptionalKind, object: Box<Ty> },

    Tuple(Vec<Ty>),

    /// Any other nominal type: structs, enums, foreign bridged types.
    Plain(Symbol),
}

impl Ty {
    pub fn new(kind: TyKind) -> Self {
        Self { kind }
    }

    pub fn class(name: impl Into<Symbol>) -> Self {
        Self::new(TyKind::Class(name.into()))
    }

    pub fn existential<I, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self::new(TyKind::Existential(
            protocols.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn archetype(name: impl Into<Symbol>) -> Self {
        Self::new(TyKind::Archetype(name.into()))
    }

    pub fn metatype(instance: Ty) -> Self {
        Self::new(TyKind::Metatype {
            instance: Box::new(instance),
            existential: false,
        })
    }

    pub fn existential_metatype(instance: Ty) -> Self {
        Self::new(TyKind::Metatype {
            instance: Box::new(instance),
            existential: true,
        })
    }

    pub fn optional(object: Ty) -> Self {
        Self::new(TyKind::Optional {
            kind: OptionalKind::Optional,
            object: Box::new(object),
        })
    }

    pub fn implicitly_unwrapped(object: Ty) -> Self {
        Self::new(TyKind::Optional {
            kind: OptionalKind::ImplicitlyUnwrapped,
            object: Box::new(object),
        })
    }

    /// Wraps `self` in `depth` layers of `Optional`.
    pub fn wrapped_in_optionals(self, depth: usize) -> Self {
        (0..depth).fold(self, |ty, _| Ty::optional(ty))
    }

    pub fn tuple(elements: Vec<Ty>) -> Self {
        Self::new(TyKind::Tuple(elements))
    }

    pub fn plain(name: impl Into<Symbol>) -> Self {
        Self::new(TyKind::Plain(name.into()))
    }

    /// Peels one optional layer and reports its flavor.
    pub fn optional_object(&self) -> Option<(OptionalKind, &Ty)> {
        match &self.kind {
            TyKind::Optional { kind, object } => Some((*kind, object.as_ref())),
            _ => None,
        }
    }

    pub fn any_optional_object_type(&self) -> Option<&Ty> {
        self.optional_object().map(|(_, object)| object)
    }

    /// Number of optional layers wrapping the innermost non-optional type.
    pub fn optional_depth(&self) -> usize {
        let mut depth = 0;
        let mut ty = self;
        while let Some(object) = ty.any_optional_object_type() {
            depth += 1;
            ty = object;
        }
        depth
    }

    pub fn is_existential_type(&self) -> bool {
        matches!(self.kind, TyKind::Existential(_))
    }

    /// Whether an unresolved generic parameter occurs anywhere in the type.
    pub fn has_archetype(&self) -> bool {
        match &self.kind {
            TyKind::Archetype(_) => true,
            TyKind::Metatype { instance, .. } => instance.has_archetype(),
            TyKind::Optional { object, .. } => object.has_archetype(),
            TyKind::Tuple(elements) => elements.iter().any(Ty::has_archetype),
            TyKind::Class(_) | TyKind::Existential(_) | TyKind::Plain(_) => false,
        }
    }

    /// Returns the instance type and whether this is an existential metatype.
    pub fn as_metatype(&self) -> Option<(&Ty, bool)> {
        match &self.kind {
            TyKind::Metatype {
                instance,
                existential,
            } => Some((instance.as_ref(), *existential)),
            _ => None,
        }
    }

    /// Number of metatype layers, of either flavor, wrapping the type.
    pub fn metatype_depth(&self) -> usize {
        let mut depth = 0;
        let mut ty = self;
        while let Some((instance, _)) = ty.as_metatype() {
            depth += 1;
            ty = instance;
        }
        depth
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TyKind::Class(name) | TyKind::Archetype(name) | TyKind::Plain(name) => {
                write!(f, "{}", name)
            }
            TyKind::Existential(protocols) if protocols.is_empty() => write!(f, "Any"),
            TyKind::Existential(protocols) => write!(f, "any {}", protocols.iter().join(" & ")),
            TyKind::Metatype {
                instance,
                existential: false,
            } => write!(f, "({}).Type", instance),
            TyKind::Metatype {
                instance,
                existential: true,
            } => write!(f, "any ({}).Type", instance),
            TyKind::Optional {
                kind: OptionalKind::Optional,
                object,
            } => write!(f, "{}?", object),
            TyKind::Optional {
                kind: OptionalKind::ImplicitlyUnwrapped,
                object,
            } => write!(f, "{}!", object),
            TyKind::Tuple(elements) => write!(f, "({})", elements.iter().join(", ")),
        }
    }
}

/// Whether a lowered value is held directly or named by its memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueCategory {
    Object,
    Address,
}

/// A formal type together with the category it is lowered to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoweredTy {
    pub ty: Ty,
    pub category: ValueCategory,
}

impl LoweredTy {
    pub fn object(ty: Ty) -> Self {
        Self {
            ty,
            category: ValueCategory::Object,
        }
    }

    pub fn address(ty: Ty) -> Self {
        Self {
            ty,
            category: ValueCategory::Address,
        }
    }

    pub fn is_address(&self) -> bool {
        self.category == ValueCategory::Address
    }

    pub fn object_type(&self) -> LoweredTy {
        LoweredTy::object(self.ty.clone())
    }

    pub fn address_type(&self) -> LoweredTy {
        LoweredTy::address(self.ty.clone())
    }

    /// The lowered type of an optional's payload, in the same category.
    pub fn optional_payload(&self) -> Option<LoweredTy> {
        self.ty.any_optional_object_type().map(|object| LoweredTy {
            ty: object.clone(),
            category: self.category,
        })
    }
}

impl Display for LoweredTy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.category {
            ValueCategory::Object => write!(f, "${}", self.ty),
            ValueCategory::Address => write!(f, "$*{}", self.ty),
        }
    }
}
