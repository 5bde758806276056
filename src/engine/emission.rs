/// One rendered result of the running snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub name: String,
    pub fragment: String,
}

/// Results collected while a single snippet runs. Cleared before every run.
#[derive(Debug, Default)]
pub struct EmissionRegistry {
    items: Vec<Emission>,
}

impl EmissionRegistry {
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Name the next unnamed emission receives: `Output k`, 1-based within the current snippet.
    pub fn default_name(&self) -> String {
        format!("Output {}", self.items.len() + 1)
    }

    pub fn push(&mut self, name: String, fragment: String) {
        self.items.push(Emission { name, fragment });
    }

    pub fn items(&self) -> &[Emission] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
