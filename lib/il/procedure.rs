//! A `Procedure` is the unit of analysis: one `ControlFlowGraph` and the
//! parameters bound when it is entered.

use crate::il::*;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Procedure {
    name: String,
    #[serde(default)]
    parameters: Vec<Symbol>,
    control_flow_graph: ControlFlowGraph,
}

impl Procedure {
    pub fn new<S: Into<String>>(
        name: S,
        parameters: Vec<Symbol>,
        control_flow_graph: ControlFlowGraph,
    ) -> Procedure {
        Procedure {
            name: name.into(),
            parameters,
            control_flow_graph,
        }
    }

    pub fn from_json(json: &str) -> Result<Procedure, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Symbol] {
        &self.parameters
    }

    pub fn control_flow_graph(&self) -> &ControlFlowGraph {
        &self.control_flow_graph
    }

    pub fn control_flow_graph_mut(&mut self) -> &mut ControlFlowGraph {
        &mut self.control_flow_graph
    }

    /// Ensures the body of this procedure can be explored.
    pub fn validate(&self) -> Result<(), Error> {
        self.control_flow_graph
            .validate()
            .map_err(|e| match e {
                Error::Unsupported(reason) => {
                    Error::Unsupported(format!("{}: {}", self.name, reason))
                }
                e => e,
            })
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| parameter.to_string())
            .collect::<Vec<String>>();
        writeln!(f, "procedure {}({})", self.name, parameters.join(", "))?;
        write!(f, "{}", self.control_flow_graph)
    }
}
