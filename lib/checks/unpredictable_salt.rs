//! Salts handed to password-based key derivation must be long and random.
//!
//! Byte arrays are `Constant` when created, and `Short` when their constant
//! size is below `MINIMUM_SALT_SIZE`. The random-fill effects registered with
//! the engine overwrite both facts.

use crate::checks::{Check, CheckContext, UNPREDICTABLE_SALT};
use crate::il::{InstructionKinds, Operation};
use crate::symbolic::{ByteArray, ProgramState, SaltSize};
use crate::Error;

/// Salts shorter than this many bytes are reported.
pub const MINIMUM_SALT_SIZE: i64 = 32;

const KEY_DERIVATION_TYPES: [&str; 2] = ["PasswordDeriveBytes", "Rfc2898DeriveBytes"];
const SALT_ARGUMENT: usize = 1;

pub struct UnpredictableSalt;

impl UnpredictableSalt {
    fn is_byte_array(context: &CheckContext) -> bool {
        // Without type information every array is assumed to hold bytes.
        match context.semantic().type_of(context.node()) {
            Some(type_name) => type_name == "byte[]",
            None => true,
        }
    }

    /// Key derivation constructors, and static key derivation methods.
    fn takes_salt(context: &CheckContext) -> bool {
        let method = match context.method() {
            Some(method) => method,
            None => return false,
        };
        if !KEY_DERIVATION_TYPES.contains(&method.containing_type()) {
            return false;
        }
        match *context.instruction().operation() {
            Operation::ObjectCreation { .. } => true,
            Operation::Invocation { has_receiver, .. } => !has_receiver,
            _ => false,
        }
    }
}

impl Check for UnpredictableSalt {
    fn rule_id(&self) -> &'static str {
        UNPREDICTABLE_SALT
    }

    fn interests(&self) -> InstructionKinds {
        InstructionKinds::ARRAY_CREATION
            | InstructionKinds::OBJECT_CREATION
            | InstructionKinds::INVOCATION
    }

    fn pre_process_instruction(
        &self,
        context: &CheckContext,
        state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        if !UnpredictableSalt::takes_salt(context) {
            return Ok(Some(state));
        }

        let salt = match context.argument(&state, SALT_ARGUMENT) {
            Some(salt) => salt,
            None => return Ok(Some(state)),
        };

        if state.has_constraint(&salt, SaltSize::Short.into()) {
            context.report("Make this salt longer.");
        } else if state.has_constraint(&salt, ByteArray::Constant.into()) {
            context.report("Make this salt unpredictable.");
        }

        Ok(Some(state))
    }

    fn post_process_instruction(
        &self,
        context: &CheckContext,
        state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        let dimensions = match *context.instruction().operation() {
            Operation::ArrayCreation { ref dimensions } => dimensions,
            _ => return Ok(Some(state)),
        };
        if !UnpredictableSalt::is_byte_array(context) {
            return Ok(Some(state));
        }

        let array = state.peek_value(0);
        let state = match state.set_constraint(&array, ByteArray::Constant.into()) {
            Some(state) => state,
            None => return Ok(None),
        };

        let size = match dimensions.as_slice() {
            [size] => context
                .semantic()
                .constant_value(*size)
                .and_then(|constant| constant.integer()),
            _ => None,
        };
        match size {
            Some(size) if size < MINIMUM_SALT_SIZE => {
                Ok(state.set_constraint(&array, SaltSize::Short.into()))
            }
            _ => Ok(Some(state)),
        }
    }
}
