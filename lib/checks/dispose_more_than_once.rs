use crate::checks::{Check, CheckContext, DISPOSE_MORE_THAN_ONCE};
use crate::il::InstructionKinds;
use crate::symbolic::{Disposal, ProgramState};
use crate::Error;

/// Reports `Dispose()` called on an object already disposed on the same path.
pub struct DisposeMoreThanOnce;

impl Check for DisposeMoreThanOnce {
    fn rule_id(&self) -> &'static str {
        DISPOSE_MORE_THAN_ONCE
    }

    fn interests(&self) -> InstructionKinds {
        InstructionKinds::INVOCATION
    }

    fn pre_process_instruction(
        &self,
        context: &CheckContext,
        state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        match context.method() {
            Some(ref method) if method.name() == "Dispose" && context.argument_node(0).is_none() => {}
            _ => return Ok(Some(state)),
        }
        let receiver = match context.receiver(&state) {
            Some(receiver) if !receiver.is_unknown() => receiver,
            _ => return Ok(Some(state)),
        };

        if state.has_constraint(&receiver, Disposal::Disposed.into()) {
            let name = state
                .symbols_bound_to(&receiver)
                .first()
                .map(|symbol| symbol.name().to_string())
                .unwrap_or_else(|| "object".to_string());
            context.report(format!(
                "Refactor this code to make sure '{}' is disposed only once.",
                name
            ));
            return Ok(Some(state));
        }

        Ok(Some(
            state.replace_constraint(&receiver, Disposal::Disposed.into()),
        ))
    }
}
