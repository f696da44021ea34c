use crate::checks::{Check, CheckContext, NULL_POINTER_DEREFERENCE};
use crate::il::InstructionKinds;
use crate::symbolic::{Nullability, ProgramState};
use crate::Error;

/// Reports member accesses and instance invocations on a value known to be
/// null.
///
/// Dereferencing a null value ends the path. Any other dereference proves
/// the receiver is not null for the rest of the path.
pub struct NullPointerDereference;

impl Check for NullPointerDereference {
    fn rule_id(&self) -> &'static str {
        NULL_POINTER_DEREFERENCE
    }

    fn interests(&self) -> InstructionKinds {
        InstructionKinds::INVOCATION | InstructionKinds::MEMBER_ACCESS
    }

    fn pre_process_instruction(
        &self,
        context: &CheckContext,
        state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        let receiver = match context.receiver(&state) {
            Some(receiver) => receiver,
            None => return Ok(Some(state)),
        };

        if state.has_constraint(&receiver, Nullability::Null.into()) {
            let name = state
                .symbols_bound_to(&receiver)
                .first()
                .map(|symbol| symbol.name().to_string())
                .unwrap_or_else(|| "expression".to_string());
            context.report(format!("'{}' is null on at least one execution path.", name));
            return Ok(None);
        }

        Ok(state.set_constraint(&receiver, Nullability::NotNull.into()))
    }
}
