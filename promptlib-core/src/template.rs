//! Variable fill and snippet splicing.
//!
//! Prompt content stays plain text in storage; placeholder syntax is only
//! interpreted here, at fill time. A [`PromptTemplate`] is the parsed part
//! list, and [`PromptTemplate::render`] substitutes variables from a map
//! and splices `{{snippet:name}}` references by looking the named prompt
//! up in the library, recursively up to [`MAX_SNIPPET_DEPTH`].

use std::collections::HashMap;

use nom::Err as NomErr;
use thiserror::Error;

use crate::parser::parse_template;
use crate::prompt::Prompt;

/// Snippet references may nest this many levels before rendering bails
/// out, which also catches self-referencing snippets.
pub const MAX_SNIPPET_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Variable(String),
    SnippetRef(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub parts: Vec<TemplatePart>,
}

#[derive(Debug, Error)]
#[error("invalid placeholder syntax: {message}")]
pub struct ParseTemplateError {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("missing variable: {0}")]
    MissingVariable(String),
    #[error("snippet not found: {0}")]
    SnippetNotFound(String),
    #[error("snippet '{0}' is nested too deeply")]
    TooDeep(String),
    #[error("snippet '{name}' has invalid placeholder syntax: {source}")]
    InvalidSnippet {
        name: String,
        #[source]
        source: ParseTemplateError,
    },
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Parse(#[from] ParseTemplateError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PromptTemplate {
    pub fn parse(content: &str) -> Result<PromptTemplate, ParseTemplateError> {
        match parse_template(content) {
            Ok((_, template)) => Ok(template),
            Err(NomErr::Error(e)) | Err(NomErr::Failure(e)) => Err(ParseTemplateError {
                message: format!("{e:?}"),
            }),
            Err(NomErr::Incomplete(_)) => Err(ParseTemplateError {
                message: "incomplete input".to_string(),
            }),
        }
    }

    /// Variable names in part order.
    pub fn variables(&self) -> Vec<&String> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Variable(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Snippet names in part order.
    pub fn snippet_refs(&self) -> Vec<&String> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::SnippetRef(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn render(
        &self,
        variables: &HashMap<String, String>,
        library: &[Prompt],
    ) -> Result<String, RenderError> {
        self.render_at_depth(variables, library, 0)
    }

    fn render_at_depth(
        &self,
        variables: &HashMap<String, String>,
        library: &[Prompt],
        depth: usize,
    ) -> Result<String, RenderError> {
        let mut result = String::new();

        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => result.push_str(text),
                TemplatePart::Variable(name) => match variables.get(name) {
                    Some(value) => result.push_str(value),
                    None => return Err(RenderError::MissingVariable(name.clone())),
                },
                TemplatePart::SnippetRef(name) => {
                    if depth >= MAX_SNIPPET_DEPTH {
                        return Err(RenderError::TooDeep(name.clone()));
                    }
                    let snippet = resolve_snippet(name, library)
                        .ok_or_else(|| RenderError::SnippetNotFound(name.clone()))?;
                    let template = PromptTemplate::parse(&snippet.content).map_err(|source| {
                        RenderError::InvalidSnippet {
                            name: name.clone(),
                            source,
                        }
                    })?;
                    let rendered = template.render_at_depth(variables, library, depth + 1)?;
                    result.push_str(&rendered);
                }
            }
        }

        Ok(result)
    }
}

/// Resolves a snippet reference by prompt name. When several records share
/// the name (typically versions of one lineage) the most recently updated
/// one wins.
fn resolve_snippet<'a>(name: &str, library: &'a [Prompt]) -> Option<&'a Prompt> {
    library
        .iter()
        .filter(|p| p.name == name)
        .max_by_key(|p| p.updated_at)
}

/// Parses and renders a prompt's content in one step.
pub fn render_prompt(
    prompt: &Prompt,
    variables: &HashMap<String, String>,
    library: &[Prompt],
) -> Result<String, TemplateError> {
    let template = PromptTemplate::parse(&prompt.content)?;
    Ok(template.render(variables, library)?)
}
