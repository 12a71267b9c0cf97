//! Terminal output for the CLI

use colored::*;
use crossterm::terminal::size;

use docqa_core::{CorpusSnapshot, QueryResult};
use docqa_rag::{Answer, DecisionRecord, IngestReport, PromptTemplate, YesNoAnswer};

/// Characters of chunk text shown per source line
const PREVIEW_CHARS: usize = 160;

/// Display startup banner
pub fn display_banner(report: &IngestReport, model: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let width = terminal_width.saturating_sub(4).clamp(24, 67);
    let border = "─".repeat(width - 2);

    println!();
    println!("{}", format!("┌{}┐", border).blue());
    println!("  {}", "docqa - ask questions about your documents".blue().bold());
    println!(
        "  {}",
        format!(
            "{} documents • {} chunks • {} dims • {}",
            report.documents, report.chunks, report.dimension, model
        )
        .dimmed()
    );
    println!("{}", format!("└{}┘", border).blue());
    println!();
    println!(
        "{}",
        "💡 Tip: Type a question, 'help' for commands, or 'exit' to leave".dimmed()
    );
    println!();
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask about the loaded documents", "<question>".green());
    println!(
        "  {} - Switch prompt template ({})",
        "template <name>".green(),
        PromptTemplate::all()
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  {} - Show the sources of the last answer", "sources".green());
    println!("  {} - Show corpus statistics", "stats".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
}

/// Render an answer, interpreting structured templates when the reply parses
pub fn format_answer(answer: &Answer) -> String {
    match answer.template {
        PromptTemplate::FreeForm => answer.text.clone(),
        PromptTemplate::YesNo => match YesNoAnswer::parse(&answer.text) {
            Ok(verdict) => {
                let label = if verdict.answer {
                    "YES".green().bold()
                } else {
                    "NO".red().bold()
                };
                format!("{}\nReason: {}", label, verdict.reason)
            }
            Err(_) => answer.text.clone(),
        },
        PromptTemplate::DecisionRecord => match DecisionRecord::parse(&answer.text) {
            Ok(record) => format_decision(&record),
            Err(_) => answer.text.clone(),
        },
    }
}

fn format_decision(record: &DecisionRecord) -> String {
    let decision = if record.is_approved() {
        record.decision.green().bold()
    } else {
        record.decision.red().bold()
    };
    let mut out = format!("Decision: {}", decision);
    if let Some(amount) = &record.amount {
        out.push_str(&format!("\nAmount: {}", amount));
    }
    out.push_str(&format!("\nJustification: {}", record.justification));
    out
}

/// One line per retrieved chunk: rank, id, distance and a text preview
pub fn format_sources(results: &[QueryResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "{} chunk {} (distance {:.4}) {}",
                format!("[{}]", r.rank + 1).cyan(),
                r.chunk.id,
                r.distance,
                preview(&r.chunk.text).dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print an answer and, optionally, the prompt that produced it
pub fn print_answer(answer: &Answer, show_prompt: bool) {
    if show_prompt {
        println!("{}", "Prompt:".bold());
        println!("{}", answer.prompt.dimmed());
        println!();
    }
    println!("{} {}", "🤖".cyan(), "Answer:".bold());
    println!("{}", format_answer(answer));
    println!();
}

pub fn print_sources(results: &[QueryResult]) {
    println!("{}", "Sources:".bold());
    println!("{}", format_sources(results));
    println!();
}

/// Print every chunk of a snapshot with its id
pub fn print_chunks(snapshot: &CorpusSnapshot) {
    println!(
        "{}",
        format!(
            "{} chunks (size {}, overlap {})",
            snapshot.len(),
            snapshot.chunk_size,
            snapshot.overlap
        )
        .bold()
    );
    for chunk in &snapshot.chunks {
        println!("{} {}", format!("#{}", chunk.id).cyan(), preview(&chunk.text));
    }
}

/// Single-line preview of `text`, cut at a character boundary
pub fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::Chunk;
    use std::sync::Arc;

    fn answer(template: PromptTemplate, text: &str) -> Answer {
        Answer {
            text: text.to_string(),
            template,
            sources: Vec::new(),
            prompt: String::new(),
        }
    }

    #[test]
    fn test_format_answer() {
        colored::control::set_override(false);

        assert_eq!(
            format_answer(&answer(PromptTemplate::YesNo, "yes\nreason: clause 4")),
            "YES\nReason: clause 4"
        );
        assert_eq!(
            format_answer(&answer(
                PromptTemplate::DecisionRecord,
                r#"{"decision": "rejected", "amount": null, "justification": "waiting period"}"#
            )),
            "Decision: rejected\nJustification: waiting period"
        );
        // unparseable structured replies are shown as-is
        assert_eq!(
            format_answer(&answer(PromptTemplate::YesNo, "It depends.")),
            "It depends."
        );
    }

    #[test]
    fn test_format_sources() {
        colored::control::set_override(false);

        let results = vec![QueryResult {
            rank: 0,
            chunk: Arc::new(Chunk {
                id: 3,
                source_offset: 9,
                text: "klmn\nopq".to_string(),
            }),
            distance: 0.5,
        }];
        assert_eq!(format_sources(&results), "[1] chunk 3 (distance 0.5000) klmn opq");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(PREVIEW_CHARS + 5);
        let short = preview(&text);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(preview("  a\n b "), "a b");
    }
}
