use std::collections::HashMap;

use crate::runtime_value::RuntimeValue;

/// Variables of one code block. Every block starts from an empty environment.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<String, RuntimeValue>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_variable(&self, name: &str) -> Option<&RuntimeValue> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: &str, value: RuntimeValue) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}
