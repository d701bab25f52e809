use std::collections::HashSet;

/// Turns an arbitrary object name into a POV-Ray identifier.
///
/// Hyphens are dropped, every other character outside `[A-Za-z0-9_]` becomes
/// `_`, and names starting with a digit get a leading `_`.
pub fn clean_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|&c| c != '-')
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    cleaned
}

/// Identifiers declared so far in one output file.
#[derive(Debug, Default, Clone)]
pub struct NameSet {
    names: HashSet<String>,
}

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cleans `name` and makes it unique by appending `_001`, `_002`, ...
    /// The returned name counts as declared from then on.
    pub fn declare(&mut self, name: &str) -> String {
        let base = clean_name(name);
        let mut candidate = base.clone();
        let mut i = 1;
        while self.names.contains(&candidate) {
            candidate = format!("{base}_{i:03}");
            i += 1;
        }
        self.names.insert(candidate.clone());
        candidate
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
