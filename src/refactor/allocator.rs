//! Placeholder name allocation.
//!
//! One allocator per clone class; counters are partitioned by divergence
//! category so the generated formal parameters read as
//! `parametrized_name_0`, `parametrized_constant_1`, ...

/// Category of the divergence a placeholder stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCategory {
    /// Divergent identifier.
    Name,
    /// Divergent literal.
    Constant,
    /// Anything else.
    Var,
}

#[derive(Debug, Default)]
pub struct NameAllocator {
    names: Vec<String>,
    name_count: usize,
    constant_count: usize,
    var_count: usize,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh placeholder in the given category.
    pub fn allocate(&mut self, category: NameCategory) -> String {
        let name = match category {
            NameCategory::Name => {
                let n = format!("parametrized_name_{}", self.name_count);
                self.name_count += 1;
                n
            }
            NameCategory::Constant => {
                let n = format!("parametrized_constant_{}", self.constant_count);
                self.constant_count += 1;
                n
            }
            NameCategory::Var => {
                let n = format!("parametrized_var_{}", self.var_count);
                self.var_count += 1;
                n
            }
        };
        self.names.push(name.clone());
        name
    }

    /// All allocated names, in allocation order. This is the order the
    /// merged function's new formal parameters are appended in.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.name_count, self.constant_count, self.var_count)
    }
}
