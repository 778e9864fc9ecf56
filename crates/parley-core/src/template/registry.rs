//! Template registry for runtime template lookup.
//!
//! A name-indexed set of templates with a default. Lookups that miss can
//! either fall back to the default ([`TemplateRegistry::get`]) or fail
//! ([`TemplateRegistry::get_strict`]).

use std::collections::{BTreeMap, HashMap};

use parley_types::error::TemplateError;
use parley_types::template::Template;

use super::builtin::{DEFAULT_TEMPLATE, builtin_templates};

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
    default: Template,
}

impl TemplateRegistry {
    /// A registry holding the stock templates, defaulting to `gpt-4_default`.
    pub fn builtin() -> Self {
        let templates: HashMap<String, Template> = builtin_templates()
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        let default = templates
            .get(DEFAULT_TEMPLATE)
            .cloned()
            .unwrap_or_else(|| builtin_templates().remove(0));
        Self { templates, default }
    }

    /// Use `name` as the fallback template. It must already be registered.
    pub fn set_default(&mut self, name: &str) -> Result<(), TemplateError> {
        self.default = self.get_strict(name)?.clone();
        Ok(())
    }

    pub fn default_template(&self) -> &Template {
        &self.default
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Look up a template, falling back to the default with a warning.
    pub fn get(&self, name: &str) -> &Template {
        if let Some(template) = self.templates.get(name) {
            return template;
        }
        tracing::warn!(
            requested = name,
            fallback = %self.default.name,
            "template not found, using default"
        );
        &self.default
    }

    pub fn get_strict(&self, name: &str) -> Result<&Template, TemplateError> {
        self.templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    /// Names of templates carrying `tag` (case-insensitive), ordered by id.
    pub fn search_tag(&self, tag: &str) -> Vec<&str> {
        self.sorted()
            .into_iter()
            .filter(|t| t.has_tag(tag))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// All template names, ordered by id.
    pub fn names(&self) -> Vec<&str> {
        self.sorted().into_iter().map(|t| t.name.as_str()).collect()
    }

    /// All templates, ordered by id then name.
    pub fn sorted(&self) -> Vec<&Template> {
        let mut templates: Vec<&Template> = self.templates.values().collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.name.cmp(&b.name)));
        templates
    }

    /// Register a template. Names must be unique.
    pub fn add(&mut self, template: Template) -> Result<(), TemplateError> {
        template.validate()?;
        if self.templates.contains_key(&template.name) {
            return Err(TemplateError::Duplicate(template.name));
        }
        tracing::debug!(name = %template.name, id = template.id, "registered template");
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Register every template in a JSON object keyed by template name.
    ///
    /// Either all templates are added or none are. Returns how many were
    /// added.
    pub fn add_json(&mut self, text: &str) -> Result<usize, TemplateError> {
        let parsed = parse_templates(text)?;
        for template in &parsed {
            template.validate()?;
            if self.templates.contains_key(&template.name) {
                return Err(TemplateError::Duplicate(template.name.clone()));
            }
        }
        let count = parsed.len();
        for template in parsed {
            self.templates.insert(template.name.clone(), template);
        }
        Ok(count)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Parse a JSON object of `{ name: template }`.
///
/// Each key must match its template's `name`.
pub fn parse_templates(text: &str) -> Result<Vec<Template>, TemplateError> {
    let map: BTreeMap<String, Template> =
        serde_json::from_str(text).map_err(|e| TemplateError::Invalid(e.to_string()))?;
    map.into_iter()
        .map(|(key, template)| {
            if key != template.name {
                return Err(TemplateError::Invalid(format!(
                    "key '{key}' does not match template name '{}'",
                    template.name
                )));
            }
            Ok(template)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTRA: &str = r#"{
        "tiny": {
            "name": "tiny",
            "id": 20,
            "model": "gpt-4o-mini",
            "info": {"description": "tiny budget", "tags": ["small", "cheap"]},
            "buffer": {"model": "gpt-4o-mini", "ceiling": 2000, "reminder": "be terse"},
            "completion": {"model": "gpt-4o-mini", "max_tokens": 200}
        }
    }"#;

    #[test]
    fn test_get_known() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(registry.get("gpt-4_small").buffer.ceiling, Some(4_000));
    }

    #[test]
    fn test_get_unknown_falls_back() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(registry.get("nope").name, "gpt-4_default");
    }

    #[test]
    fn test_get_strict_unknown_errors() {
        let registry = TemplateRegistry::builtin();
        assert!(matches!(
            registry.get_strict("nope"),
            Err(TemplateError::NotFound(ref n)) if n == "nope"
        ));
    }

    #[test]
    fn test_search_tag_ordered_by_id() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(
            registry.search_tag("precise"),
            ["gpt-4_precise", "gpt-3.5-16k_precise"]
        );
        assert!(registry.search_tag("nonexistent").is_empty());
    }

    #[test]
    fn test_names_ordered_by_id() {
        let registry = TemplateRegistry::builtin();
        let names = registry.names();
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "gpt-4_default");
        assert_eq!(names[6], "gpt-3.5-16k_precise");
    }

    #[test]
    fn test_add_rejects_duplicate() {
        let mut registry = TemplateRegistry::builtin();
        let copy = registry.get("gpt-4_default").clone();
        assert!(matches!(registry.add(copy), Err(TemplateError::Duplicate(_))));
    }

    #[test]
    fn test_add_json() {
        let mut registry = TemplateRegistry::builtin();
        assert_eq!(registry.add_json(EXTRA).unwrap(), 1);
        let tiny = registry.get_strict("tiny").unwrap();
        assert_eq!(tiny.buffer.reminder.as_deref(), Some("be terse"));
        assert_eq!(registry.search_tag("cheap"), ["tiny"]);
        assert!(matches!(registry.add_json(EXTRA), Err(TemplateError::Duplicate(_))));
    }

    #[test]
    fn test_key_must_match_name() {
        let text = EXTRA.replacen("\"tiny\": {", "\"other\": {", 1);
        assert!(matches!(parse_templates(&text), Err(TemplateError::Invalid(_))));
    }

    #[test]
    fn test_set_default() {
        let mut registry = TemplateRegistry::builtin();
        registry.set_default("gpt-4_small").unwrap();
        assert_eq!(registry.get("missing").name, "gpt-4_small");
        assert!(registry.set_default("missing").is_err());
    }
}
