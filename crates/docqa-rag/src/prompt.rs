//! Prompt assembly from retrieved chunks
//!
//! The template set is fixed so generation behaviour stays reproducible.
//! Chunk text and the question are substituted verbatim, without escaping or
//! truncation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use docqa_core::{Chunk, Error, Result};

/// Separator placed between chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Named prompt templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    /// Free-form answer
    #[default]
    FreeForm,
    /// YES or NO on the first line, then `Reason:`
    YesNo,
    /// JSON decision record with decision, amount and justification
    DecisionRecord,
}

impl PromptTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            PromptTemplate::FreeForm => "free_form",
            PromptTemplate::YesNo => "yes_no",
            PromptTemplate::DecisionRecord => "decision_record",
        }
    }

    pub fn all() -> Vec<PromptTemplate> {
        vec![
            PromptTemplate::FreeForm,
            PromptTemplate::YesNo,
            PromptTemplate::DecisionRecord,
        ]
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PromptTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "free_form" | "freeform" | "free" => Ok(PromptTemplate::FreeForm),
            "yes_no" | "yesno" => Ok(PromptTemplate::YesNo),
            "decision_record" | "decision" => Ok(PromptTemplate::DecisionRecord),
            other => Err(Error::InvalidConfig(format!(
                "unknown prompt template '{}', expected one of: free_form, yes_no, decision_record",
                other
            ))),
        }
    }
}

/// Composes retrieved chunks and a question into a generation prompt
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    domain: String,
}

impl PromptAssembler {
    /// Create an assembler describing the corpus as "documents"
    pub fn new() -> Self {
        Self {
            domain: "documents".to_string(),
        }
    }

    /// Describe the corpus, e.g. "insurance policy documents"
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Join chunk texts in rank order, separated by a blank line
    pub fn context<'a>(&self, chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
        chunks
            .into_iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Build the prompt for `question` from `chunks` using `template`
    pub fn assemble<'a>(
        &self,
        chunks: impl IntoIterator<Item = &'a Chunk>,
        question: &str,
        template: PromptTemplate,
    ) -> String {
        let context = self.context(chunks);
        let domain = &self.domain;

        match template {
            PromptTemplate::FreeForm => format!(
                "You are an assistant helping users understand {domain}.\n\
                 \n\
                 Context:\n\
                 {context}\n\
                 \n\
                 Question: {question}\n\
                 \n\
                 Return your answer clearly."
            ),
            PromptTemplate::YesNo => format!(
                "You are an assistant answering questions about {domain}.\n\
                 \n\
                 Context:\n\
                 {context}\n\
                 \n\
                 Question: {question}\n\
                 \n\
                 Answer strictly with YES or NO on the first line.\n\
                 On the second line write \"Reason:\" followed by a brief reason citing the context.\n\
                 If the context does not contain the answer, answer NO and say so in the reason."
            ),
            PromptTemplate::DecisionRecord => format!(
                "You are an assistant interpreting {domain}.\n\
                 \n\
                 Based on the following clauses:\n\
                 \n\
                 {context}\n\
                 \n\
                 Analyze this query:\n\
                 \"{question}\"\n\
                 \n\
                 Return your response in this format:\n\
                 {{\n  \
                 \"decision\": \"<approved or rejected>\",\n  \
                 \"amount\": \"<amount if applicable>\",\n  \
                 \"justification\": \"<brief reason citing relevant clauses>\"\n\
                 }}"
            ),
        }
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new()
    }
}
