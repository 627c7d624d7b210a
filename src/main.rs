use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use outline::core::OutlineNode;
use outline::projectors::display_projector::{
    self, DateNote, DisplayRow, Keyword, NoteKind, RowKind,
};
use outline::storage::{DocumentStore, JsonFileStore};
use outline::{dump_tree, parse_outline};

#[derive(Debug, Parser)]
#[command(
    name = "outline",
    about = "Outline tooling built on the outline crate",
    version
)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse outline files and print their tree structure.
    Parse(ParseArgs),

    /// Render outline files with keyword and planning styling.
    View(ViewArgs),

    /// Store a file's raw text in a notebook under a key.
    Save(SaveArgs),

    /// Print a stored document as a tree, raw text, or JSON.
    Show(ShowArgs),

    /// List the keys held by a notebook.
    List(ListArgs),

    /// Remove a stored document from a notebook.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Outline files to parse.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Emit JSON instead of the indented tree dump.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// Outline files to render.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Reference date for planning arithmetic (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    on: Option<NaiveDate>,
    /// Emit the projected rows as JSON instead of styled text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct SaveArgs {
    /// Notebook file to write to (created on first save).
    #[arg(long)]
    notebook: PathBuf,
    /// Opaque key to store the document under.
    #[arg(long)]
    key: String,
    /// File whose raw text is stored verbatim.
    input: PathBuf,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Notebook file to read from.
    #[arg(long)]
    notebook: PathBuf,
    /// Key of the stored document.
    #[arg(long)]
    key: String,
    /// Print the stored text verbatim instead of its tree dump.
    #[arg(long, conflicts_with = "json")]
    raw: bool,
    /// Print the parsed tree as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Notebook file to read from.
    #[arg(long)]
    notebook: PathBuf,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    /// Notebook file to modify.
    #[arg(long)]
    notebook: PathBuf,
    /// Key of the stored document.
    #[arg(long)]
    key: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    match cli.command {
        Commands::Parse(args) => handle_parse(args, verbose),
        Commands::View(args) => handle_view(args, verbose),
        Commands::Save(args) => handle_save(args, verbose),
        Commands::Show(args) => handle_show(args, verbose),
        Commands::List(args) => handle_list(args, verbose),
        Commands::Delete(args) => handle_delete(args, verbose),
    }
}

fn handle_parse(args: ParseArgs, verbose: bool) -> Result<()> {
    let ParseArgs { inputs, json } = args;

    let mut parsed = Vec::new();
    for path in inputs {
        if verbose {
            eprintln!("Parsing {:?}", path);
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        parsed.push((path, parse_outline(&text)));
    }

    if json {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            path: String,
            tree: &'a OutlineNode,
        }

        let payload: Vec<JsonOutput<'_>> = parsed
            .iter()
            .map(|(path, tree)| JsonOutput {
                path: path.display().to_string(),
                tree,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let many = parsed.len() > 1;
        for (idx, (path, tree)) in parsed.iter().enumerate() {
            if many {
                println!("== {} ==", path.display());
            }
            print!("{}", dump_tree(tree));
            if many && idx + 1 < parsed.len() {
                println!();
            }
        }
    }
    Ok(())
}

fn handle_view(args: ViewArgs, verbose: bool) -> Result<()> {
    let ViewArgs { inputs, on, json } = args;
    let today = on.unwrap_or_else(|| Local::now().date_naive());

    let mut projected = Vec::new();
    for path in inputs {
        if verbose {
            eprintln!("Rendering {:?}", path);
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        let rows = display_projector::project_tree(&parse_outline(&text));
        projected.push((path, rows));
    }

    if json {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            path: String,
            rows: &'a [DisplayRow],
        }

        let payload: Vec<JsonOutput<'_>> = projected
            .iter()
            .map(|(path, rows)| JsonOutput {
                path: path.display().to_string(),
                rows,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let many = projected.len() > 1;
    for (idx, (path, rows)) in projected.iter().enumerate() {
        if many {
            println!("== {} ==", path.display());
        }
        for row in rows {
            if row.text.is_empty() {
                continue;
            }
            println!("{}{}", "  ".repeat(row.depth), styled_row(row, today));
        }
        if many && idx + 1 < projected.len() {
            println!();
        }
    }
    Ok(())
}

fn handle_save(args: SaveArgs, verbose: bool) -> Result<()> {
    let SaveArgs {
        notebook,
        key,
        input,
    } = args;

    let text = fs::read_to_string(&input).with_context(|| format!("reading {:?}", input))?;
    if verbose {
        eprintln!("Storing {:?} under {:?}", input, key);
    }

    let mut store =
        JsonFileStore::open(&notebook).with_context(|| format!("opening {:?}", notebook))?;
    store.put(&key, &text);
    store
        .save()
        .with_context(|| format!("saving {:?}", notebook))?;

    println!(
        "Saved {} ({} lines) to {:?}",
        key,
        text.split('\n').count(),
        notebook
    );
    Ok(())
}

fn handle_show(args: ShowArgs, verbose: bool) -> Result<()> {
    let ShowArgs {
        notebook,
        key,
        raw,
        json,
    } = args;

    let store =
        JsonFileStore::open(&notebook).with_context(|| format!("opening {:?}", notebook))?;
    let text = store
        .get(&key)
        .with_context(|| format!("no document stored under {:?}", key))?;
    if verbose {
        eprintln!("Loaded {} bytes under {:?}", text.len(), key);
    }

    if raw {
        print!("{text}");
        if !text.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    let tree = parse_outline(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", dump_tree(&tree));
    }
    Ok(())
}

fn handle_list(args: ListArgs, verbose: bool) -> Result<()> {
    let store = JsonFileStore::open(&args.notebook)
        .with_context(|| format!("opening {:?}", args.notebook))?;
    if verbose {
        eprintln!(
            "Listing {:?} ({} documents)",
            store.path(),
            store.notebook.len()
        );
    }
    if store.notebook.is_empty() {
        eprintln!("Notebook {:?} holds no documents.", args.notebook);
        return Ok(());
    }
    for key in store.keys() {
        println!("{key}");
    }
    Ok(())
}

fn handle_delete(args: DeleteArgs, verbose: bool) -> Result<()> {
    let DeleteArgs { notebook, key } = args;
    let mut store =
        JsonFileStore::open(&notebook).with_context(|| format!("opening {:?}", notebook))?;
    if verbose {
        eprintln!("Deleting {} from {:?}", key, store.path());
    }
    if !store.remove(&key) {
        anyhow::bail!("no document stored under {:?}", key);
    }
    store
        .save()
        .with_context(|| format!("saving {:?}", notebook))?;
    println!("Deleted {} from {:?}", key, notebook);
    Ok(())
}

/* ------------------------------ Row styling ------------------------------ */

fn styled_row(row: &DisplayRow, today: NaiveDate) -> String {
    match &row.kind {
        RowKind::Heading { keyword, .. } => match keyword {
            Some(keyword) => styled_heading(&row.text, keyword),
            None => row.text.bold().to_string(),
        },
        RowKind::Text => match &row.note {
            Some(note) => format!("{}  {}", row.text, styled_note(note, today)),
            None => row.text.clone(),
        },
    }
}

/// Paint the keyword occurrence inside the verbatim heading line.
fn styled_heading(text: &str, keyword: &Keyword) -> String {
    let painted = if keyword.is_done {
        keyword.text.green().bold()
    } else {
        keyword.text.red().bold()
    };
    match text.find(&keyword.text) {
        Some(at) => format!(
            "{}{}{}",
            &text[..at],
            painted,
            text[at + keyword.text.len()..].bold()
        ),
        None => text.bold().to_string(),
    }
}

fn styled_note(note: &DateNote, today: NaiveDate) -> String {
    let days = display_projector::days_until(note.date, today);
    let described = describe_note(note, today);
    if days < 0 {
        described.red().bold().to_string()
    } else if days <= 3 {
        described.yellow().to_string()
    } else {
        described.dimmed().to_string()
    }
}

/// Human phrasing for a planning note relative to a reference date.
fn describe_note(note: &DateNote, today: NaiveDate) -> String {
    let days = display_projector::days_until(note.date, today);
    let kind = match note.kind {
        NoteKind::Deadline => "deadline",
        NoteKind::Scheduled => "scheduled",
    };
    let when = if days == 0 {
        "today".to_string()
    } else if days > 0 {
        format!("in {days}d")
    } else {
        format!("{}d overdue", -days)
    };
    format!("({kind} {when})")
}
