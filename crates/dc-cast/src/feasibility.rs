//! Static classification of dynamic casts.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use dc_core::trace;
use dc_core::types::{Ty, TyKind, TypeOracle};
use serde::{Deserialize, Serialize};

/// The statically known outcome of a dynamic cast.
///
/// Ordered by strength: `WillSucceed > MaySucceed > WillFail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feasibility {
    /// The cast always succeeds and needs no runtime check.
    WillSucceed,
    /// The cast needs a runtime check.
    MaySucceed,
    /// The cast never succeeds.
    WillFail,
}

impl Feasibility {
    fn strength(self) -> u8 {
        match self {
            Feasibility::WillFail => 0,
            Feasibility::MaySucceed => 1,
            Feasibility::WillSucceed => 2,
        }
    }

    /// Demotes certain success to possible success; used when an outer
    /// layer can make the cast fail at runtime.
    pub fn weaken(self) -> Self {
        match self {
            Feasibility::WillSucceed => Feasibility::MaySucceed,
            other => other,
        }
    }

    /// The weaker of the two verdicts.
    pub fn meet(self, other: Self) -> Self {
        std::cmp::min(self, other)
    }

    pub fn is_will_succeed(self) -> bool {
        self == Feasibility::WillSucceed
    }
}

impl PartialOrd for Feasibility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Feasibility {
    fn cmp(&self, other: &Self) -> Ordering {
        self.strength().cmp(&other.strength())
    }
}

impl Display for Feasibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Feasibility::WillSucceed => "will succeed",
            Feasibility::MaySucceed => "may succeed",
            Feasibility::WillFail => "will fail",
        };
        write!(f, "{}", text)
    }
}

/// Classifies the cast of a value of type `source` to type `target`.
///
/// Total and pure; recursion strictly peels optional layers, then metatype
/// layers, before reaching a base case.
pub fn classify_dynamic_cast(types: &dyn TypeOracle, source: &Ty, target: &Ty) -> Feasibility {
    let verdict = classify(types, source, target);
    trace!("classified cast {} -> {}: {}", source, target, verdict);
    verdict
}

fn classify(types: &dyn TypeOracle, source: &Ty, target: &Ty) -> Feasibility {
    if source == target {
        return Feasibility::WillSucceed;
    }

    match (
        source.any_optional_object_type(),
        target.any_optional_object_type(),
    ) {
        // A common level of optionality doesn't affect feasibility.
        (Some(source_object), Some(target_object)) => {
            return classify(types, source_object, target_object)
        }
        // Nor does casting to a more optional type.
        (None, Some(target_object)) => return classify(types, source, target_object),
        // Casting to a less optional type fails whenever the value is absent.
        (Some(source_object), None) => return classify(types, source_object, target).weaken(),
        (None, None) => {}
    }

    // Over-approximate: conformance and generic substitution are not modelled.
    if source.has_archetype()
        || source.is_existential_type()
        || target.has_archetype()
        || target.is_existential_type()
    {
        return Feasibility::MaySucceed;
    }

    classify_concrete(types, source, target)
}

fn classify_concrete(types: &dyn TypeOracle, mut source: &Ty, mut target: &Ty) -> Feasibility {
    while let Some((source_instance, source_existential)) = source.as_metatype() {
        let Some((target_instance, target_existential)) = target.as_metatype() else {
            return Feasibility::WillFail;
        };
        source = source_instance;
        target = target_instance;

        // Existential metatypes are only compared by their remaining depth,
        // even when the instance types are identical.
        if source_existential || target_existential {
            return if source.metatype_depth() == target.metatype_depth() {
                Feasibility::MaySucceed
            } else {
                Feasibility::WillFail
            };
        }
    }

    match (&source.kind, &target.kind) {
        (TyKind::Class(_), TyKind::Class(_)) => {
            if types.is_ancestor_or_self(target, source) {
                Feasibility::WillSucceed
            } else if types.is_ancestor_or_self(source, target) {
                Feasibility::MaySucceed
            } else {
                // Bridged class pairs are not classified.
                Feasibility::WillFail
            }
        }
        (TyKind::Tuple(_), TyKind::Tuple(_)) => {
            trace!("tuple cast {} -> {} is not classified", source, target);
            Feasibility::WillFail
        }
        // Bridged nominal conversions are not classified either.
        _ => Feasibility::WillFail,
    }
}
