//! Module-wide symbol table.
//!
//! Entries are kept in declaration order so iteration never depends on hash
//! order; the name index is only used for lookups.

use rustc_hash::FxHashMap;

use crate::{NodeRef, SymbolId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    /// An alias and, once known, the function it finally names.
    Alias {
        target: String,
        resolved: Option<SymbolId>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub declared_at: NodeRef,
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
    by_name: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a symbol. Returns the existing id if the name is taken.
    pub fn declare(&mut self, symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(&existing) = self.by_name.get(&symbol.name) {
            return Err(existing);
        }
        let id = SymbolId(self.entries.len() as u32);
        self.by_name.insert(symbol.name.clone(), id);
        self.entries.push(symbol);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.entries[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The function a name stands for, looking through resolved aliases.
    pub fn function_for(&self, name: &str) -> Option<SymbolId> {
        let id = self.lookup(name)?;
        match &self.get(id).kind {
            SymbolKind::Function => Some(id),
            SymbolKind::Alias { resolved, .. } => *resolved,
        }
    }
}

impl PartialEq for SymbolTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for SymbolTable {}
