//! Interactive read-eval-print loop
//!
//! Reads one line at a time, generates against the named session, prints,
//! and repeats. EOF, an interrupt, an empty line, or the `exit()` sentinel
//! ends the loop. Generation suspends only inside the completion handler,
//! so an interrupt never lands mid-commit.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::errors::ShaiError;
use crate::handler::CompletionHandler;
use crate::llm::SamplingParams;
use crate::role::Role;

/// Run the REPL against the named chat session until the user exits.
/// An initial prompt, when given, is processed as the first turn.
pub async fn run(
    handler: &mut CompletionHandler<'_>,
    role: &Role,
    params: &SamplingParams,
    chat_id: &str,
    use_cache: bool,
    init_prompt: Option<&str>,
) -> Result<(), ShaiError> {
    eprintln!(
        "{}",
        format!("Entering REPL mode, chat id '{chat_id}'. Press Ctrl+C or type exit() to quit.")
            .cyan()
    );

    let mut editor = DefaultEditor::new()
        .map_err(|e| ShaiError::Configuration(format!("cannot initialize line editor: {e}")))?;

    if let Some(prompt) = init_prompt {
        handler
            .handle(prompt, None, role, params, Some(chat_id), use_cache)
            .await?;
    }

    loop {
        match editor.readline(">>> ") {
            Ok(line) => {
                let line = line.trim();
                if is_exit(line) {
                    break;
                }
                let _ = editor.add_history_entry(line);
                handler
                    .handle(line, None, role, params, Some(chat_id), use_cache)
                    .await?;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                return Err(ShaiError::Configuration(format!("line editor failed: {e}")));
            }
        }
    }
    Ok(())
}

fn is_exit(line: &str) -> bool {
    line.is_empty() || line == "exit()"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_sentinel_lines_exit() {
        assert!(is_exit(""));
        assert!(is_exit("exit()"));
        assert!(!is_exit("exit"));
        assert!(!is_exit("how do I exit vim"));
    }
}
