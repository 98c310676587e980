//! Interactive shell.
//!
//! Free text is routed by keyword: the evaluate keyword analyses a photo, the
//! exit words quit, and anything else goes to the chat model. Lines starting
//! with `/` are shell commands; type `/help` to list them.

use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use picto::Keywords;

use crate::commands::App;
use crate::config::home_dir;
use crate::output::{render_outcome, render_summary};

/// Available slash commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/inspect", "Show what the guidance index contains"),
    ("/add", "Add another PDF to the guidance index"),
    ("/reset", "Delete the guidance index"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the shell"),
];

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput<'a> {
    Empty,
    Exit,
    Evaluate,
    /// An advertised feature that has no implementation yet.
    Unavailable(&'static str),
    Command { name: &'a str, args: &'a str },
    Chat,
}

/// Classify one trimmed input line.
pub fn classify<'a>(line: &'a str, keywords: &Keywords) -> ShellInput<'a> {
    let line = line.trim();
    if line.is_empty() {
        return ShellInput::Empty;
    }
    if keywords.is_exit(line) {
        return ShellInput::Exit;
    }
    if let Some(rest) = line.strip_prefix('/') {
        let mut parts = rest.splitn(2, ' ');
        let name = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim();
        return ShellInput::Command { name, args };
    }
    if line.contains(&keywords.evaluate) {
        return ShellInput::Evaluate;
    }
    if line.contains(&keywords.compare) {
        return ShellInput::Unavailable("Photo comparison");
    }
    if line.contains(&keywords.region_search) {
        return ShellInput::Unavailable("Region photo search");
    }
    if line.contains(&keywords.nearby_search) {
        return ShellInput::Unavailable("Nearby photo search");
    }
    ShellInput::Chat
}

/// Shell helper for tab completion.
#[derive(Default)]
struct PictoHelper;

impl Completer for PictoHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if input.starts_with('/') && !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<12} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // .pdf completion for /add
        if let Some(args) = input.strip_prefix("/add ") {
            let mut files = Vec::new();
            if let Ok(entries) = std::fs::read_dir(".") {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdf")) {
                        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                            files.push(name.to_string());
                        }
                    }
                }
            }
            files.sort();
            let prefix_start = input.len() - args.len();
            let matches: Vec<Pair> = files
                .iter()
                .filter(|f| f.starts_with(args.trim()))
                .map(|f| Pair {
                    display: f.clone(),
                    replacement: f.clone(),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for PictoHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for PictoHelper {}
impl Validator for PictoHelper {}
impl Helper for PictoHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

type PictoEditor = Editor<PictoHelper, rustyline::history::DefaultHistory>;

/// Run the interactive shell until an exit word or end of input.
pub async fn run(app: &mut App) -> anyhow::Result<()> {
    println!();
    println!("=== Picto photo analysis ===");
    println!("Initializing...");

    let pdf = app.settings.pdf_path.clone();
    if !pdf.exists() && !app.settings.persist_dir.exists() {
        println!("Default PDF not found: {}", pdf.display());
        println!("Process a guidance PDF first.");
        return Ok(());
    }

    println!();
    println!("Processing PDF...");
    if !app.prepare_index(&pdf).await {
        return Ok(());
    }

    print_menu(&app.settings.keywords);

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: PictoEditor = Editor::with_config(config)?;
    rl.set_helper(Some(PictoHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let hist_path = home_dir().join(".picto_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    loop {
        match rl.readline("\nWhat can I help you with? ") {
            Ok(line) => {
                let keywords = app.settings.keywords.clone();
                match classify(&line, &keywords) {
                    ShellInput::Empty => continue,
                    ShellInput::Exit => {
                        println!("\nDid you enjoy Picto? Thank you, see you next time.");
                        break;
                    }
                    ShellInput::Evaluate => evaluate(app, &mut rl, line.trim()).await,
                    ShellInput::Unavailable(feature) => {
                        println!("\n{feature} is not available yet.");
                    }
                    ShellInput::Command { name, args } => {
                        if !run_command(app, name, args).await {
                            break;
                        }
                    }
                    ShellInput::Chat => {
                        println!("\nGenerating a response...");
                        let reply = app.dispatcher.analyst().chat(line.trim()).await;
                        println!("\nResponse:\n{reply}");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("(Ctrl+C) Type /exit to quit.");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);
    Ok(())
}

fn print_menu(keywords: &Keywords) {
    println!();
    println!("Hello! I'm Picto, your AI photo assistant. How can I help?");
    println!();
    println!("Picto can:");
    println!("1. Evaluate a photo (type '{}')", keywords.evaluate);
    println!("2. Compare photos (type '{}')", keywords.compare);
    println!("3. Search photos of a region (type '{}')", keywords.region_search);
    println!("4. Search nearby photos (type '{}')", keywords.nearby_search);
    println!("5. Quit (type '{}')", keywords.exit.join("' or '"));
    println!("Anything else is answered by the chat assistant. /help lists shell commands.");
}

async fn evaluate(app: &App, rl: &mut PictoEditor, request: &str) {
    let default_image = &app.settings.default_image_path;
    println!("\nDefault image path: {}", default_image.display());

    let answer = match rl.readline("Image path to analyse (Enter for the default image): ") {
        Ok(text) => text,
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };
    let image = resolve_image_path(&answer, default_image);

    if !image.exists() {
        println!("Image file not found: {}", image.display());
        return;
    }

    println!("\nAnalysing the image and searching for guidance...");
    let outcome = app
        .dispatcher
        .process_user_request(&app.index, request, Some(&image))
        .await;
    println!("\n{}", render_outcome(&outcome));
}

/// Blank answers fall back to the default image.
pub fn resolve_image_path(answer: &str, default_image: &Path) -> PathBuf {
    let trimmed = answer.trim().trim_matches('"');
    if trimmed.is_empty() {
        default_image.to_path_buf()
    } else {
        PathBuf::from(trimmed)
    }
}

/// Handle a slash command. Returns `false` when the shell should stop.
async fn run_command(app: &mut App, name: &str, args: &str) -> bool {
    match name {
        "exit" | "quit" => {
            println!("Goodbye!");
            return false;
        }
        "help" | "h" | "?" | "" => cmd_help(),
        "clear" | "cls" => print!("\x1b[2J\x1b[H"),
        "inspect" => println!("{}", render_summary(app.index.inspect().as_ref())),
        "add" => {
            if args.is_empty() {
                println!("Usage: /add <file.pdf>");
            } else {
                match app.index.add(Path::new(args)).await {
                    Ok(n) => println!("Added {n} pages from {args}."),
                    Err(e) => println!("Adding the PDF failed: {e}"),
                }
            }
        }
        "reset" => match app.index.reset() {
            Ok(true) => println!("The guidance index has been reset."),
            Ok(false) => println!("There was no index to reset."),
            Err(e) => println!("Resetting the index failed: {e}"),
        },
        _ => println!("Unknown command '/{name}'. Type /help for commands."),
    }
    true
}

fn cmd_help() {
    println!();
    println!("Commands:");
    println!();
    for (cmd, desc) in COMMANDS {
        println!("  {cmd:<12} {desc}");
    }
    println!();
}
