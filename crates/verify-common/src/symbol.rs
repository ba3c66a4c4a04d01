use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// An interned variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

/// String interner for binding names.
///
/// One interner lives in each session; symbols from different interners
/// must not be mixed.
#[derive(Debug, Default)]
pub struct SymbolInterner {
    map: FxHashMap<SmolStr, Symbol>,
    strings: Vec<SmolStr>,
}

impl SymbolInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        let smol = SmolStr::new(s);
        self.strings.push(smol.clone());
        self.map.insert(smol, sym);
        sym
    }

    /// Look up a name without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut interner = SymbolInterner::new();
        let a = interner.intern("SELF");
        let b = interner.intern("$GLOBAL");
        assert_ne!(a, b);
        assert_eq!(interner.intern("SELF"), a);
        assert_eq!(interner.resolve(b), "$GLOBAL");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_get_does_not_intern() {
        let mut interner = SymbolInterner::new();
        assert_eq!(interner.get("X"), None);
        let x = interner.intern("X");
        assert_eq!(interner.get("X"), Some(x));
        assert_eq!(interner.len(), 1);
    }
}
