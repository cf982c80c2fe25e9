// Name Index
// Maps free-text endpoint names from events to node ids, rebuilt with the graph

use std::collections::HashMap;

/// Which rule resolved a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    RootAlias,
    Label,
    StepName,
}

/// Explicit `display name -> node id` mapping.
///
/// Lookup order is the root alias, then full label text, then the step's
/// `name`. All matches are case-sensitive. When two nodes share a name the
/// first one registered keeps it.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    root_alias: String,
    root_id: String,
    by_label: HashMap<String, String>,
    by_step_name: HashMap<String, String>,
}

impl NameIndex {
    pub fn new(root_alias: impl Into<String>, root_id: impl Into<String>) -> Self {
        Self {
            root_alias: root_alias.into(),
            root_id: root_id.into(),
            by_label: HashMap::new(),
            by_step_name: HashMap::new(),
        }
    }

    pub fn register_label(&mut self, label_text: impl Into<String>, node_id: &str) {
        self.by_label
            .entry(label_text.into())
            .or_insert_with(|| node_id.to_string());
    }

    pub fn register_step_name(&mut self, name: &str, node_id: &str) {
        if name.is_empty() {
            return;
        }
        self.by_step_name
            .entry(name.to_string())
            .or_insert_with(|| node_id.to_string());
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.resolve_with_rule(name).map(|(id, _)| id)
    }

    pub fn resolve_with_rule(&self, name: &str) -> Option<(&str, NameMatch)> {
        if name == self.root_alias {
            return Some((self.root_id.as_str(), NameMatch::RootAlias));
        }
        if let Some(id) = self.by_label.get(name) {
            return Some((id.as_str(), NameMatch::Label));
        }
        self.by_step_name
            .get(name)
            .map(|id| (id.as_str(), NameMatch::StepName))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> NameIndex {
        let mut names = NameIndex::new("ceo", "root");
        names.register_label("CEO", "root");
        names.register_label("Code\ndev", "s2");
        names.register_step_name("Code", "s2");
        names
    }

    #[test]
    fn test_root_alias_wins() {
        let names = index();
        assert_eq!(
            names.resolve_with_rule("ceo"),
            Some(("root", NameMatch::RootAlias))
        );
    }

    #[test]
    fn test_label_then_step_name() {
        let names = index();
        assert_eq!(
            names.resolve_with_rule("Code\ndev"),
            Some(("s2", NameMatch::Label))
        );
        assert_eq!(
            names.resolve_with_rule("Code"),
            Some(("s2", NameMatch::StepName))
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let names = index();
        assert_eq!(names.resolve("code"), None);
        assert_eq!(names.resolve("CEO"), Some("root"));
        assert_eq!(names.resolve("Ceo"), None);
    }

    #[test]
    fn test_first_registration_keeps_ambiguous_name() {
        let mut names = NameIndex::new("ceo", "root");
        names.register_step_name("Review", "s1");
        names.register_step_name("Review", "s4");
        assert_eq!(names.resolve("Review"), Some("s1"));
    }

    #[test]
    fn test_alias_resolves_without_registrations() {
        let names = NameIndex::new("ceo", "root");
        assert_eq!(names.resolve("Code"), None);
        assert_eq!(names.resolve("ceo"), Some("root"));
    }
}
