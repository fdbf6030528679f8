use indexmap::IndexMap;

use crate::expr::Value;

/// Name bindings visible to expressions.
///
/// Bindings live in a global namespace plus a stack of scope frames. Reads
/// look at the innermost frame first and then at the globals; writes go to
/// the innermost frame, or to the globals when no frame is open.
#[derive(Debug, Clone)]
pub struct Environment {
    globals: IndexMap<String, Value>,
    frames: Vec<IndexMap<String, Value>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A fresh environment with the constants `pi` and `e`.
    pub fn new() -> Self {
        let mut globals = IndexMap::new();
        globals.insert("pi".to_string(), Value::Float(std::f64::consts::PI));
        globals.insert("e".to_string(), Value::Float(std::f64::consts::E));
        Self {
            globals,
            frames: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .last()
            .and_then(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let scope = self.frames.last_mut().unwrap_or(&mut self.globals);
        scope.insert(name.into(), value);
    }

    /// Open a scope frame holding `bindings`.
    pub fn push_frame(&mut self, bindings: IndexMap<String, Value>) {
        self.frames.push(bindings);
    }

    /// Close the innermost scope frame, returning its bindings.
    pub fn pop_frame(&mut self) -> Option<IndexMap<String, Value>> {
        self.frames.pop()
    }

    /// Number of open scope frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Run `f` with an extra scope frame, closing it afterwards.
    pub fn with_frame<T>(
        &mut self,
        bindings: IndexMap<String, Value>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.push_frame(bindings);
        let result = f(self);
        self.pop_frame();
        result
    }

    /// Global bindings in definition order.
    pub fn globals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.globals.iter().map(|(name, value)| (name.as_str(), value))
    }
}
