//! Interactive question loop

use colored::*;

use docqa_core::{Embedder, Error, Generator, QueryResult, Result, VectorIndex};
use docqa_rag::{PromptTemplate, QaEngine};

use crate::input::LineEditor;
use crate::ui::{print_answer, print_help, print_sources};

/// One line of chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    Template(String),
    Sources,
    Stats,
    Help,
    Exit,
    Empty,
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_lowercase().as_str() {
            "" => ChatCommand::Empty,
            "exit" | "quit" if rest.is_empty() => ChatCommand::Exit,
            "help" if rest.is_empty() => ChatCommand::Help,
            "sources" if rest.is_empty() => ChatCommand::Sources,
            "stats" if rest.is_empty() => ChatCommand::Stats,
            "template" if !rest.is_empty() => ChatCommand::Template(rest.to_string()),
            _ => ChatCommand::Ask(line.to_string()),
        }
    }
}

/// Answer questions from stdin until `exit` or end of input
pub async fn run_chat<E, G, I>(
    engine: &QaEngine<E, G, I>,
    mut template: PromptTemplate,
    show_prompt: bool,
) -> Result<()>
where
    E: Embedder,
    G: Generator,
    I: VectorIndex + Default,
{
    let mut editor = LineEditor::new("docqa>");
    let mut last_sources: Vec<QueryResult> = Vec::new();

    while let Some(line) = editor.read_line()? {
        match ChatCommand::parse(&line) {
            ChatCommand::Empty => continue,
            ChatCommand::Exit => break,
            ChatCommand::Help => print_help(),
            ChatCommand::Stats => {
                let stats = serde_json::to_string_pretty(&engine.stats())?;
                println!("{}", stats);
            }
            ChatCommand::Sources => {
                if last_sources.is_empty() {
                    println!("{}", "No answer yet.".dimmed());
                } else {
                    print_sources(&last_sources);
                }
            }
            ChatCommand::Template(name) => match name.parse::<PromptTemplate>() {
                Ok(parsed) => {
                    template = parsed;
                    println!("{} template set to {}", "✅".green(), template);
                }
                Err(e) => println!("{} {}", "⚠️".yellow(), e),
            },
            ChatCommand::Ask(question) => {
                println!("{}", "🔍 Searching documents...".dimmed());
                match engine.ask(&question, template).await {
                    Ok(answer) => {
                        print_answer(&answer, show_prompt);
                        last_sources = answer.sources;
                    }
                    // the session survives provider failures
                    Err(e @ (Error::EmbeddingFailure { .. } | Error::GenerationFailure { .. })) => {
                        tracing::warn!(error = %e, "question failed");
                        println!("{} {}", "❌".red(), e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}
