//! Prompt templating on top of handlebars: `{{name}}` placeholders, with
//! `\{{` for a literal pair of braces. Values are inserted verbatim.

use std::fmt;
use std::sync::Arc;

use handlebars::template::{Template, TemplateElement};
use handlebars::Handlebars;

use crate::{ChainError, ChainValues};

const TEMPLATE_NAME: &str = "prompt";

/// A prompt with named placeholders
#[derive(Clone)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
    registry: Arc<Handlebars<'static>>,
}

impl PromptTemplate {
    /// Build a template with an explicit variable list. Every placeholder
    /// must be declared.
    pub fn new(
        template: impl Into<String>,
        input_variables: Vec<String>,
    ) -> Result<Self, ChainError> {
        let template = template.into();
        let (compiled, placeholders) = compile(&template)?;

        if let Some(name) = placeholders.iter().find(|name| !input_variables.contains(name)) {
            return Err(ChainError::Template(format!(
                "placeholder {{{{{}}}}} is not a declared input variable",
                name
            )));
        }

        Ok(Self {
            template,
            input_variables,
            registry: Arc::new(registry(compiled)),
        })
    }

    /// Build a template, inferring input variables from its placeholders
    /// in order of first appearance.
    pub fn from_template(template: impl Into<String>) -> Result<Self, ChainError> {
        let template = template.into();
        let (compiled, input_variables) = compile(&template)?;

        Ok(Self {
            template,
            input_variables,
            registry: Arc::new(registry(compiled)),
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Substitute placeholders. String values are inserted as-is, anything
    /// else as its JSON text.
    pub fn format(&self, values: &ChainValues) -> Result<String, ChainError> {
        let mut context = serde_json::Map::new();
        for name in &self.input_variables {
            let text = match values.get(name) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return Err(ChainError::MissingInput(name.clone())),
            };
            context.insert(name.clone(), serde_json::Value::String(text));
        }

        self.registry
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| ChainError::Template(e.to_string()))
    }

    /// Escape `text` so it survives as a literal inside a template
    pub fn escape(text: &str) -> String {
        text.replace("{{", "\\{{")
    }
}

impl fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("template", &self.template)
            .field("input_variables", &self.input_variables)
            .finish()
    }
}

impl PartialEq for PromptTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template && self.input_variables == other.input_variables
    }
}

impl Eq for PromptTemplate {}

fn registry(compiled: Template) -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    // Every placeholder must resolve
    handlebars.set_strict_mode(true);
    // Prompts are plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_template(TEMPLATE_NAME, compiled);
    handlebars
}

/// Compile `source` and list its placeholders in order of first appearance.
/// Only plain `{{name}}` expressions are accepted.
fn compile(source: &str) -> Result<(Template, Vec<String>), ChainError> {
    let compiled =
        Template::compile(source).map_err(|e| ChainError::Template(e.to_string()))?;

    let mut placeholders: Vec<String> = Vec::new();
    for element in &compiled.elements {
        match element {
            TemplateElement::RawString(_) | TemplateElement::Comment(_) => {}
            TemplateElement::Expression(helper) | TemplateElement::HtmlExpression(helper) => {
                let name = helper
                    .name
                    .as_name()
                    .filter(|name| is_identifier(name))
                    .filter(|_| helper.params.is_empty() && helper.hash.is_empty())
                    .ok_or_else(|| {
                        ChainError::Template(
                            "placeholders must be plain {{name}} expressions".into(),
                        )
                    })?;
                if !placeholders.iter().any(|p| p == name) {
                    placeholders.push(name.to_string());
                }
            }
            _ => {
                return Err(ChainError::Template(
                    "block helpers, partials and decorators are not supported".into(),
                ))
            }
        }
    }

    Ok((compiled, placeholders))
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
