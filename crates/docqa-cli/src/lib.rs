//! CLI interface for docqa

mod chat;
mod input;
mod ui;

pub use chat::{ChatCommand, run_chat};
pub use input::{KeyOutcome, LineEditor, LineState};
pub use ui::{
    display_banner, format_answer, format_sources, preview, print_answer, print_chunks,
    print_help, print_sources,
};

// Re-export core types
pub use docqa_core::{Error, Result};
