use std::collections::HashMap;

use crate::runtime_value::RuntimeValue;

/// The program's variable store: one flat name→value map, created
/// fresh per run. Only `variables_set` writes it; reading a name that
/// was never set yields numeric zero.
#[derive(Debug, Default)]
pub struct VariableStore {
    variables: HashMap<String, RuntimeValue>,
}

impl VariableStore {
    pub fn new() -> Self {
        VariableStore {
            variables: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> RuntimeValue {
        self.variables
            .get(name)
            .cloned()
            .unwrap_or(RuntimeValue::Number(0.0))
    }

    pub fn set(&mut self, name: &str, value: RuntimeValue) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}
