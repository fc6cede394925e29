/// Frontmatter variables, kept in declaration order.
///
/// Order matters only when a substituted value itself contains a `${...}`
/// placeholder for a variable declared later; that value is substituted again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    entries: Vec<(String, String)>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable. A replaced variable keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Variables::new();
        for (k, v) in iter {
            vars.insert(k, v);
        }
        vars
    }
}

/// Replace every `${name}` on a line whose name is a known variable.
///
/// Unknown placeholders are left untouched.
pub fn substitute(line: &str, variables: &Variables) -> String {
    let mut line = line.to_string();
    for (name, value) in variables.iter() {
        let placeholder = format!("${{{}}}", name);
        if line.contains(&placeholder) {
            line = line.replace(&placeholder, value);
        }
    }
    line
}
