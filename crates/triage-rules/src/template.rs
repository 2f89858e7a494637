//! Evidence templates
//!
//! Each rule's evidence text is a Handlebars template compiled when the
//! catalog is built. Rendering only sees the facts that satisfied the rule's
//! conditions, so `{{#if (has key)}}` reads as "this corroboration was found".
//! `has` tests presence; a plain `#if` would drop matched `0` and `false`.

use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;
use std::fmt;

use crate::error::CatalogError;

handlebars_helper!(has: |value: Json| !value.is_null());

/// Compiled evidence templates keyed by rule id
pub struct EvidenceTemplates {
    handlebars: Handlebars<'static>,
}

impl EvidenceTemplates {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        // Missing facts render as empty text; evidence is plain text, not HTML
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("has", Box::new(has));

        Self { handlebars }
    }

    fn template_name(rule_id: u32) -> String {
        format!("rule-{}", rule_id)
    }

    /// Compile and register the evidence template of a rule
    pub fn register(&mut self, rule_id: u32, template: &str) -> Result<(), CatalogError> {
        self.handlebars
            .register_template_string(&Self::template_name(rule_id), template)
            .map_err(|e| CatalogError::Template {
                rule_id,
                message: e.to_string(),
            })
    }

    /// Compile a template without registering it
    pub fn check(rule_id: u32, template: &str) -> Result<(), CatalogError> {
        Self::new().register(rule_id, template)
    }

    pub fn contains(&self, rule_id: u32) -> bool {
        self.handlebars.has_template(&Self::template_name(rule_id))
    }

    pub fn len(&self) -> usize {
        self.handlebars.get_templates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render a registered template. `None` when the rule has no template or
    /// a helper fails at render time.
    pub fn render(&self, rule_id: u32, data: &Value) -> Option<String> {
        match self.handlebars.render(&Self::template_name(rule_id), data) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(rule_id, error = %e, "evidence template failed to render");
                None
            }
        }
    }
}

impl Default for EvidenceTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EvidenceTemplates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EvidenceTemplates")
            .field("templates", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_matched_facts() {
        let mut templates = EvidenceTemplates::new();
        templates
            .register(1, "High ping latency detected ({{ping_latency}} ms)")
            .unwrap();

        let text = templates.render(1, &json!({"ping_latency": 250})).unwrap();
        assert_eq!(text, "High ping latency detected (250 ms)");
    }

    #[test]
    fn test_optional_sections() {
        let mut templates = EvidenceTemplates::new();
        templates
            .register(7, "Sudden shutdowns{{#if (has power_bad_report)}} with power fault{{/if}}")
            .unwrap();

        assert_eq!(templates.render(7, &json!({})).unwrap(), "Sudden shutdowns");
        assert_eq!(
            templates.render(7, &json!({"power_bad_report": true})).unwrap(),
            "Sudden shutdowns with power fault"
        );
    }

    #[test]
    fn test_presence_keeps_zero_and_false() {
        let mut templates = EvidenceTemplates::new();
        templates
            .register(22, "Speed varies{{#if (has speed_mbps)}} (currently {{speed_mbps}} Mbps){{/if}}")
            .unwrap();
        templates
            .register(38, "Profile{{#if (has firewall_on)}} with firewall {{firewall_on}}{{/if}}")
            .unwrap();

        assert_eq!(
            templates.render(22, &json!({"speed_mbps": 0})).unwrap(),
            "Speed varies (currently 0 Mbps)"
        );
        assert_eq!(templates.render(22, &json!({})).unwrap(), "Speed varies");
        assert_eq!(
            templates.render(38, &json!({"firewall_on": false})).unwrap(),
            "Profile with firewall false"
        );
    }

    #[test]
    fn test_no_html_escaping() {
        let mut templates = EvidenceTemplates::new();
        templates.register(2, "Browser reports {{browser_err}}").unwrap();

        let text = templates.render(2, &json!({"browser_err": "<proxy> & co"})).unwrap();
        assert_eq!(text, "Browser reports <proxy> & co");
    }

    #[test]
    fn test_broken_template_is_rejected() {
        let err = EvidenceTemplates::check(9, "Latency {{#if ping_latency}} high{{/each}}").unwrap_err();
        assert!(matches!(err, CatalogError::Template { rule_id: 9, .. }));
    }

    #[test]
    fn test_unknown_rule_renders_nothing() {
        let templates = EvidenceTemplates::new();
        assert!(templates.is_empty());
        assert!(templates.render(42, &json!({})).is_none());
    }
}
