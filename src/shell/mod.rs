//! Shell execution loop
//!
//! After a shell-command generation the user chooses to execute the
//! command, have it described, or abort. Describe loops back to the
//! prompt; it is always a one-shot, session-less call so it never touches
//! chat history. Execution runs through the user's shell and the child's
//! exit status is deliberately not surfaced as ours.

use std::io::{BufRead, Write};
use std::process::Command;

use colored::Colorize;

use crate::errors::ShaiError;
use crate::handler::CompletionHandler;
use crate::llm::SamplingParams;
use crate::role::{builtin, RoleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Execute,
    Describe,
    Abort,
}

/// Parse one line of user input. `y` is a legacy alias for execute; an
/// empty line takes the configured default; anything else re-prompts.
fn parse_choice(input: &str, default: Choice) -> Option<Choice> {
    match input.trim().to_lowercase().as_str() {
        "" => Some(default),
        "e" | "y" => Some(Choice::Execute),
        "d" => Some(Choice::Describe),
        "a" => Some(Choice::Abort),
        _ => None,
    }
}

/// Present the generated command and loop on the execute/describe/abort
/// choice until the user executes or aborts.
pub async fn interaction_loop(
    handler: &mut CompletionHandler<'_>,
    command: &str,
    params: &SamplingParams,
    use_cache: bool,
    default_execute: bool,
) -> Result<(), ShaiError> {
    let describe_role = builtin(RoleKind::DescribeShell);
    let default = if default_execute {
        Choice::Execute
    } else {
        Choice::Abort
    };

    let stdin = std::io::stdin();
    loop {
        eprint!("{}", "[E]xecute, [D]escribe, [A]bort: ".green().bold());
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| ShaiError::Configuration(format!("cannot read choice: {e}")))?;
        if read == 0 {
            // EOF behaves like abort
            return Ok(());
        }

        match parse_choice(&line, default) {
            Some(Choice::Execute) => {
                run_command(command);
                return Ok(());
            }
            Some(Choice::Describe) => {
                // one-shot, role-scoped, no chat id: chat history stays intact
                handler
                    .handle(command, None, &describe_role, params, None, use_cache)
                    .await?;
            }
            Some(Choice::Abort) => return Ok(()),
            None => continue,
        }
    }
}

/// Run the generated command through the user's shell. Best-effort: a
/// launch failure is reported but the child's exit status is ignored.
pub fn run_command(command: &str) {
    let result = if cfg!(windows) {
        let comspec = std::env::var("COMSPEC").unwrap_or_else(|_| "cmd".to_string());
        Command::new(comspec).args(["/C", command]).status()
    } else {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        Command::new(shell).arg("-c").arg(command).status()
    };

    match result {
        Ok(status) if !status.success() => {
            tracing::debug!(%status, "command exited non-zero");
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} failed to launch shell: {e}", "error:".red().bold());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_choices() {
        assert_eq!(parse_choice("e", Choice::Abort), Some(Choice::Execute));
        assert_eq!(parse_choice("E", Choice::Abort), Some(Choice::Execute));
        assert_eq!(parse_choice("d", Choice::Abort), Some(Choice::Describe));
        assert_eq!(parse_choice("a", Choice::Execute), Some(Choice::Abort));
    }

    #[test]
    fn y_is_a_legacy_execute_alias() {
        assert_eq!(parse_choice("y", Choice::Abort), Some(Choice::Execute));
    }

    #[test]
    fn empty_input_takes_the_default() {
        assert_eq!(parse_choice("", Choice::Execute), Some(Choice::Execute));
        assert_eq!(parse_choice("\n", Choice::Abort), Some(Choice::Abort));
    }

    #[test]
    fn unknown_input_reprompts() {
        assert_eq!(parse_choice("x", Choice::Abort), None);
        assert_eq!(parse_choice("execute", Choice::Abort), None);
    }
}
