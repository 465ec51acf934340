//! Handlebars rendering for campaign subjects and bodies
//!
//! Templates come from campaign rows, not a registered template set, so
//! everything renders through `render_template`. Strict mode stays off:
//! a missing variable renders as an empty string instead of failing the
//! whole send.

use std::sync::LazyLock;

use handlebars::Handlebars;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::{CampaignError, CampaignResult};

static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\s*[\w\.]+\s*)\}\}").unwrap());

/// Validation report for a template string
#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateValidation {
    pub is_valid: bool,
    /// Variables referenced by the template, deduplicated and sorted
    pub variables: Vec<String>,
    pub errors: Vec<String>,
}

/// Handlebars-based renderer for per-recipient personalization
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Campaign bodies are already HTML; escaping would mangle them.
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string against personalization data
    pub fn render(&self, template: &str, data: &Value) -> CampaignResult<String> {
        self.handlebars
            .render_template(template, data)
            .map_err(|e| CampaignError::Template(e.to_string()))
    }

    /// List the `{{variable}}` names a template references
    pub fn extract_variables(template: &str) -> Vec<String> {
        let mut variables: Vec<String> = VARIABLE_PATTERN
            .captures_iter(template)
            .map(|c| c[1].trim().to_string())
            .collect();
        variables.sort();
        variables.dedup();
        variables
    }

    /// Check template syntax without rendering against real data
    pub fn validate(&self, template: &str) -> TemplateValidation {
        let variables = Self::extract_variables(template);
        match self.handlebars.render_template(template, &Value::Object(Default::default())) {
            Ok(_) => TemplateValidation {
                is_valid: true,
                variables,
                errors: Vec::new(),
            },
            Err(e) => TemplateValidation {
                is_valid: false,
                variables,
                errors: vec![e.to_string()],
            },
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_substitutes_variables() {
        let renderer = TemplateRenderer::new();
        let data = json!({"firstname": "Ada", "company": "Acme"});

        let out = renderer
            .render("Hello {{firstname}} from {{company}}", &data)
            .unwrap();

        assert_eq!(out, "Hello Ada from Acme");
    }

    #[test]
    fn test_render_missing_variable_is_empty() {
        let renderer = TemplateRenderer::new();
        let data = json!({"firstname": "Ada"});

        let out = renderer
            .render("Hello {{firstname}} {{lastname}}!", &data)
            .unwrap();

        assert_eq!(out, "Hello Ada !");
    }

    #[test]
    fn test_render_does_not_escape_html() {
        let renderer = TemplateRenderer::new();
        let data = json!({"unsubscribe_url": "https://x.test/u?email=a@b.c&campaign_id=1"});

        let out = renderer
            .render(r#"<a href="{{unsubscribe_url}}">out</a>"#, &data)
            .unwrap();

        assert!(out.contains("a@b.c&campaign_id=1"));
        assert!(!out.contains("&amp;"));
    }

    #[test]
    fn test_render_invalid_syntax_is_template_error() {
        let renderer = TemplateRenderer::new();

        let err = renderer
            .render("Hello {{#if}}", &json!({}))
            .unwrap_err();

        assert!(matches!(err, CampaignError::Template(_)));
    }

    #[test]
    fn test_extract_variables_deduplicates_and_sorts() {
        let vars = TemplateRenderer::extract_variables(
            "{{lastname}} {{ firstname }} {{firstname}} {{custom.plan}}",
        );

        assert_eq!(vars, vec!["custom.plan", "firstname", "lastname"]);
    }

    #[test]
    fn test_extract_variables_ignores_block_helpers() {
        let vars = TemplateRenderer::extract_variables("{{#if paid}}{{plan}}{{/if}}");

        assert_eq!(vars, vec!["plan"]);
    }

    #[test]
    fn test_validate_reports_syntax_errors() {
        let renderer = TemplateRenderer::new();

        let ok = renderer.validate("Hi {{firstname}}");
        assert!(ok.is_valid);
        assert_eq!(ok.variables, vec!["firstname"]);
        assert!(ok.errors.is_empty());

        let bad = renderer.validate("Hi {{#each}}");
        assert!(!bad.is_valid);
        assert!(!bad.errors.is_empty());
    }
}
