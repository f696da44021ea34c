//! Symbolic effects of recognized library methods.
//!
//! Only methods registered here affect constraints when invoked. Every other
//! invocation just yields a fresh result.

use crate::il::MethodRef;
use crate::symbolic::{ByteArray, Constraint, ProgramState, SaltSize, SymbolicValue};
use log::trace;
use std::collections::BTreeMap;

const RANDOM_NUMBER_GENERATORS: [&str; 2] = ["RandomNumberGenerator", "RNGCryptoServiceProvider"];
const RANDOM_FILL_METHODS: [&str; 2] = ["GetBytes", "GetNonZeroBytes"];

/// What invoking a method does to the values it touches.
///
/// Constraints are overwritten, never asserted: an effect can not make a path
/// infeasible.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Effect {
    ConstrainArgument {
        argument: usize,
        constraint: Constraint,
    },
    ConstrainReceiver { constraint: Constraint },
    ConstrainResult { constraint: Constraint },
}

#[derive(Clone, Debug, Default)]
pub struct EffectRegistry {
    effects: BTreeMap<MethodRef, Vec<Effect>>,
}

impl EffectRegistry {
    pub fn new() -> EffectRegistry {
        EffectRegistry::default()
    }

    /// The random-fill methods of the cryptographic random number generators,
    /// which leave their first argument unpredictable.
    pub fn with_default_effects() -> EffectRegistry {
        let mut registry = EffectRegistry::new();
        for type_name in RANDOM_NUMBER_GENERATORS.iter() {
            for method_name in RANDOM_FILL_METHODS.iter() {
                let method = MethodRef::new(*type_name, *method_name);
                registry.register(
                    method.clone(),
                    Effect::ConstrainArgument {
                        argument: 0,
                        constraint: ByteArray::Modified.into(),
                    },
                );
                registry.register(
                    method,
                    Effect::ConstrainArgument {
                        argument: 0,
                        constraint: SaltSize::Safe.into(),
                    },
                );
            }
        }
        registry
    }

    pub fn register(&mut self, method: MethodRef, effect: Effect) {
        self.effects.entry(method).or_default().push(effect);
    }

    pub fn effects(&self, method: &MethodRef) -> &[Effect] {
        self.effects
            .get(method)
            .map(|effects| effects.as_slice())
            .unwrap_or(&[])
    }

    /// Applies the effects of invoking `method`.
    pub fn apply(
        &self,
        method: &MethodRef,
        receiver: Option<&SymbolicValue>,
        arguments: &[SymbolicValue],
        result: &SymbolicValue,
        state: ProgramState,
    ) -> ProgramState {
        let mut state = state;
        for effect in self.effects(method) {
            let (target, constraint) = match *effect {
                Effect::ConstrainArgument {
                    argument,
                    constraint,
                } => (arguments.get(argument), constraint),
                Effect::ConstrainReceiver { constraint } => (receiver, constraint),
                Effect::ConstrainResult { constraint } => (Some(result), constraint),
            };
            if let Some(target) = target {
                trace!("{} constrains {} to {}", method, target, constraint);
                state = state.replace_constraint(target, constraint);
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::ValueFactory;

    #[test]
    fn random_fill_makes_salt_safe() {
        let registry = EffectRegistry::with_default_effects();
        let mut factory = ValueFactory::new();
        let salt = factory.fresh();
        let result = factory.fresh();
        let state = ProgramState::new()
            .set_constraint(&salt, SaltSize::Short.into())
            .unwrap()
            .set_constraint(&salt, ByteArray::Constant.into())
            .unwrap();

        let state = registry.apply(
            &MethodRef::new("RNGCryptoServiceProvider", "GetNonZeroBytes"),
            None,
            &[salt.clone()],
            &result,
            state,
        );

        assert!(state.has_constraint(&salt, SaltSize::Safe.into()));
        assert!(state.has_constraint(&salt, ByteArray::Modified.into()));
    }

    #[test]
    fn unregistered_methods_have_no_effect() {
        let registry = EffectRegistry::with_default_effects();
        let mut factory = ValueFactory::new();
        let argument = factory.fresh();
        let result = factory.fresh();

        let state = registry.apply(
            &MethodRef::new("Random", "NextBytes"),
            None,
            &[argument],
            &result,
            ProgramState::new(),
        );

        assert_eq!(state, ProgramState::new());
    }

    #[test]
    fn missing_argument_is_skipped() {
        let mut registry = EffectRegistry::new();
        let method = MethodRef::new("Stream", "Close");
        registry.register(
            method.clone(),
            Effect::ConstrainArgument {
                argument: 2,
                constraint: ByteArray::Modified.into(),
            },
        );
        let mut factory = ValueFactory::new();
        let result = factory.fresh();

        let state = registry.apply(&method, None, &[], &result, ProgramState::new());

        assert_eq!(state, ProgramState::new());
    }
}
