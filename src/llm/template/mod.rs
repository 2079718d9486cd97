
use std::fmt;

use crate::{AnswerError, Result};

/// Values a prompt template can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariable {
    Language,
    Question,
    Document,
}

impl TemplateVariable {
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            TemplateVariable::Language => "language",
            TemplateVariable::Question => "question",
            TemplateVariable::Document => "document",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "language" => Some(TemplateVariable::Language),
            "question" => Some(TemplateVariable::Question),
            "document" => Some(TemplateVariable::Document),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateVariable {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(TemplateVariable),
}

/// Values substituted into a [`PromptTemplate`]
#[derive(Debug, Clone, Copy)]
pub struct PromptValues<'a> {
    pub language: &'a str,
    pub question: &'a str,
    pub document: &'a str,
}

impl PromptValues<'_> {
    fn get(&self, variable: TemplateVariable) -> &str {
        match variable {
            TemplateVariable::Language => self.language,
            TemplateVariable::Question => self.question,
            TemplateVariable::Document => self.document,
        }
    }
}

/// A prompt with `{language}`, `{question}` and `{document}` placeholders.
///
/// `{{` and `}}` produce literal braces. Unknown names and unbalanced braces
/// are rejected when the template is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    #[inline]
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(AnswerError::Validation(
                "Template cannot be empty. Please provide a valid template.".to_string(),
            ));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|(_, next)| *next) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|(_, next)| *next) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }

                    if !closed {
                        return Err(template_error(format!(
                            "unclosed '{{' at position {}",
                            position
                        )));
                    }

                    let variable = TemplateVariable::parse(name.trim()).ok_or_else(|| {
                        template_error(format!(
                            "unknown placeholder '{{{}}}', expected one of {{language}}, {{question}}, {{document}}",
                            name
                        ))
                    })?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(variable));
                }
                '}' => {
                    return Err(template_error(format!(
                        "single '}}' at position {}",
                        position
                    )));
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Placeholders in order of appearance
    #[inline]
    pub fn variables(&self) -> Vec<TemplateVariable> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Variable(variable) => Some(*variable),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    #[inline]
    pub fn render(&self, values: &PromptValues<'_>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Variable(variable) => values.get(*variable),
            })
            .collect()
    }
}

fn template_error(detail: String) -> AnswerError {
    AnswerError::Validation(format!("Malformed prompt template: {}", detail))
}
