use std::io::{BufRead, IsTerminal, Read, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shai_cli::cache::CompletionCache;
use shai_cli::config::Config;
use shai_cli::errors::ShaiError;
use shai_cli::handler::CompletionHandler;
use shai_cli::llm::{OpenAiBackend, Role, SamplingParams};
use shai_cli::role::{RoleRegistry, RoleSelector, BUILTIN_NAMES};
use shai_cli::session::SessionStore;
use shai_cli::{repl, shell};

#[derive(Parser)]
#[command(name = "shai")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), env!("SHAI_VERSION_SUFFIX")))]
#[command(about = "AI-powered shell assistant: natural language to commands, code and answers")]
struct Cli {
    /// The prompt to generate a completion for
    prompt: Option<String>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// Randomness of the generated output (0.0 to 2.0)
    #[arg(long, value_parser = parse_temperature)]
    temperature: Option<f32>,

    /// Nucleus sampling cutoff (0.0 to 1.0)
    #[arg(long = "top-p", value_parser = parse_top_p)]
    top_p: Option<f32>,

    /// Generate a shell command and offer to execute it
    #[arg(short = 's', long)]
    shell: bool,

    /// Describe a shell command
    #[arg(short = 'd', long)]
    describe_shell: bool,

    /// Generate only code
    #[arg(long)]
    code: bool,

    /// Compose the prompt in $EDITOR
    #[arg(long)]
    editor: bool,

    /// Path or URL of an image to attach to the prompt
    #[arg(long)]
    image: Option<String>,

    /// Follow a conversation with this chat id ("temp" for a throwaway
    /// session)
    #[arg(long, value_name = "ID")]
    chat: Option<String>,

    /// Start a REPL session with this chat id
    #[arg(long, value_name = "ID", conflicts_with = "chat")]
    repl: Option<String>,

    /// Print all messages of a chat id
    #[arg(long, value_name = "ID")]
    show_chat: Option<String>,

    /// List all chat ids
    #[arg(long)]
    list_chats: bool,

    /// Use a custom role for this generation
    #[arg(long, value_name = "NAME")]
    role: Option<String>,

    /// Create a custom role (role text is read from stdin or prompted)
    #[arg(long, value_name = "NAME")]
    create_role: Option<String>,

    /// Print a custom role's text
    #[arg(long, value_name = "NAME")]
    show_role: Option<String>,

    /// List role names
    #[arg(long)]
    list_roles: bool,

    /// Skip the completion cache and force a fresh remote call
    #[arg(long)]
    no_cache: bool,

    /// Skip the execute/describe/abort prompt after --shell
    #[arg(long)]
    no_interaction: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=2.0).contains(&value) {
        Ok(value)
    } else {
        Err("temperature must be between 0.0 and 2.0".to_string())
    }
}

fn parse_top_p(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err("top-p must be between 0.0 and 1.0".to_string())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "shai_cli=debug"
    } else {
        "shai_cli=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let registry = RoleRegistry::new(config.roles_dir()?)?;

    // role management verbs run and exit before any generation concerns
    if let Some(name) = cli.create_role.as_deref() {
        return create_role(&registry, name);
    }
    if let Some(name) = cli.show_role.as_deref() {
        println!("{}", registry.show(name)?.role_text);
        return Ok(());
    }
    if cli.list_roles {
        for name in BUILTIN_NAMES {
            println!("{} {}", name, "(built-in)".dimmed());
        }
        for name in registry.list()? {
            println!("{name}");
        }
        return Ok(());
    }

    let mut sessions = SessionStore::new(config.sessions_dir()?)?;

    // session inspection verbs exit early too
    if let Some(id) = cli.show_chat.as_deref() {
        return show_chat(&sessions, id);
    }
    if cli.list_chats {
        for id in sessions.list_ids()? {
            println!("{id}");
        }
        return Ok(());
    }

    let stdin_piped = !std::io::stdin().is_terminal();

    if cli.editor && stdin_piped {
        return Err(
            ShaiError::Configuration("--editor cannot be combined with piped input".to_string())
                .into(),
        );
    }

    // piped input becomes part of the prompt, except in REPL mode
    let mut prompt = cli.prompt.clone();
    if stdin_piped && cli.repl.is_none() {
        let mut piped = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut piped)
            .context("failed to read piped input")?;
        let piped = piped.trim_end();
        if !piped.is_empty() {
            prompt = match prompt {
                Some(p) if !p.is_empty() => Some(format!("{piped}\n\n{p}")),
                _ => Some(piped.to_string()),
            };
        }
    }

    if cli.editor {
        prompt = Some(edited_prompt()?);
    }

    if prompt.as_deref().map(str::trim).unwrap_or("").is_empty() && cli.repl.is_none() {
        return Err(ShaiError::Configuration(
            "no prompt given; pass one as an argument, pipe it in, or use --editor/--repl"
                .to_string(),
        )
        .into());
    }

    let selector =
        RoleSelector::from_flags(cli.shell, cli.describe_shell, cli.code, cli.role.clone())?;
    let role = registry.resolve(&selector)?;

    let params = SamplingParams {
        model: cli.model.unwrap_or_else(|| config.model.clone()),
        temperature: cli.temperature.unwrap_or(config.temperature),
        top_p: cli.top_p.unwrap_or(config.top_p),
        max_tokens: None,
    };
    let use_cache = !cli.no_cache;

    let backend = OpenAiBackend::new(&config)?;
    let cache = CompletionCache::new(config.cache_dir()?);
    let mut handler = CompletionHandler::new(&backend, &mut sessions, &cache);

    if let Some(repl_id) = cli.repl.as_deref() {
        return Ok(repl::run(
            &mut handler,
            &role,
            &params,
            repl_id,
            use_cache,
            prompt.as_deref(),
        )
        .await?);
    }

    let image_url = cli.image.as_deref().map(resolve_image_reference).transpose()?;
    let prompt = prompt.expect("prompt checked above");

    let full_text = handler
        .handle(
            &prompt,
            image_url.as_deref(),
            &role,
            &params,
            cli.chat.as_deref(),
            use_cache,
        )
        .await?;

    if cli.shell && !stdin_piped && !cli.no_interaction {
        shell::interaction_loop(
            &mut handler,
            &full_text,
            &params,
            use_cache,
            config.default_execute_shell_cmd,
        )
        .await?;
    }

    Ok(())
}

/// Read role text from stdin (piped) or an interactive prompt, then
/// persist it, asking before overwriting an existing role.
fn create_role(registry: &RoleRegistry, name: &str) -> Result<()> {
    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();

    let text = if interactive {
        eprint!("Enter role text: ");
        std::io::stderr().flush()?;
        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        line.trim().to_string()
    } else {
        let mut buf = String::new();
        stdin.lock().read_to_string(&mut buf)?;
        buf.trim().to_string()
    };

    if text.is_empty() {
        return Err(ShaiError::Configuration("role text cannot be empty".to_string()).into());
    }

    match registry.create(name, &text, false) {
        Err(ShaiError::Conflict(msg)) if interactive => {
            eprint!("{msg}. Overwrite? [y/N] ");
            std::io::stderr().flush()?;
            let mut answer = String::new();
            stdin.lock().read_line(&mut answer)?;
            if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                registry.create(name, &text, true)?;
            } else {
                return Err(ShaiError::Conflict(msg).into());
            }
        }
        other => other?,
    }

    eprintln!("Saved role '{name}'.");
    Ok(())
}

fn show_chat(sessions: &SessionStore, id: &str) -> Result<()> {
    if !sessions.exists(id) {
        return Err(ShaiError::NotFound(format!("chat '{id}' not found")).into());
    }
    for message in sessions.load(id)? {
        let label = match message.role {
            Role::System => "system".dimmed(),
            Role::User => "user".cyan(),
            Role::Assistant => "assistant".green(),
        };
        println!("{label}: {}", message.content.as_text().unwrap_or(""));
    }
    Ok(())
}

/// Turn `--image` into something the API accepts: URLs pass through,
/// local files are embedded as a base64 data URL.
fn resolve_image_reference(image: &str) -> Result<String, ShaiError> {
    if image.starts_with("http://") || image.starts_with("https://") {
        return Ok(image.to_string());
    }

    let bytes = std::fs::read(image)
        .map_err(|e| ShaiError::Configuration(format!("cannot read image '{image}': {e}")))?;
    let mime = match Path::new(image)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}

/// Compose the prompt in the user's editor via a temp file.
fn edited_prompt() -> Result<String> {
    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .map_err(|_| {
            ShaiError::Configuration(
                "--editor requires the EDITOR environment variable".to_string(),
            )
        })?;

    let temp = tempfile::Builder::new()
        .prefix("shai-prompt-")
        .suffix(".txt")
        .tempfile()
        .context("failed to create a temporary prompt file")?;

    let status = Command::new(&editor)
        .arg(temp.path())
        .status()
        .map_err(|e| ShaiError::Configuration(format!("failed to launch '{editor}': {e}")))?;
    if !status.success() {
        return Err(
            ShaiError::Configuration(format!("editor exited with status {status}")).into(),
        );
    }

    let content = std::fs::read_to_string(temp.path())?;
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(ShaiError::Configuration("editor produced an empty prompt".to_string()).into());
    }
    Ok(content)
}
