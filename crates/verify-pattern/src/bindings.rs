use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use verify_common::Symbol;

/// A value captured by a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub value: String,
    /// Bound through a `$`-prefixed name; survives label boundaries.
    pub global: bool,
}

/// The variables visible to the directive being matched.
///
/// Iteration follows first-definition order.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: IndexMap<Symbol, Binding, FxBuildHasher>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: Symbol) -> Option<&str> {
        self.values.get(&name).map(|b| b.value.as_str())
    }

    /// Bind or rebind a variable.
    pub fn bind(&mut self, name: Symbol, value: String, global: bool) {
        self.values.insert(name, Binding { value, global });
    }

    /// Drop everything except global bindings. Called at each label.
    pub fn clear_locals(&mut self) {
        self.values.retain(|_, binding| binding.global);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Binding)> {
        self.values.iter().map(|(name, binding)| (*name, binding))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verify_common::SymbolInterner;

    #[test]
    fn test_bind_and_rebind() {
        let mut interner = SymbolInterner::new();
        let x = interner.intern("X");
        let mut bindings = Bindings::new();

        assert_eq!(bindings.get(x), None);
        bindings.bind(x, "%1".to_string(), false);
        assert_eq!(bindings.get(x), Some("%1"));
        bindings.bind(x, "%2".to_string(), false);
        assert_eq!(bindings.get(x), Some("%2"));
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_clear_locals_keeps_globals() {
        let mut interner = SymbolInterner::new();
        let local = interner.intern("SELF");
        let global = interner.intern("$MODULE");
        let mut bindings = Bindings::new();
        bindings.bind(local, "%0".to_string(), false);
        bindings.bind(global, "gizmo".to_string(), true);

        bindings.clear_locals();

        assert_eq!(bindings.get(local), None);
        assert_eq!(bindings.get(global), Some("gizmo"));
        assert_eq!(bindings.iter().count(), 1);
    }
}
