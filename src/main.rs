//! snips CLI
//!
//! Usage:
//!   snips check <FILES>...
//!   snips list <FILES>...
//!   snips expand [OPTIONS] --line <LINE> <FILES>...

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snips::settings::filetype_of;
use snips::{parse_document, Direction, Error, ExpandRequest, Library, Settings, Statement};

#[derive(Parser)]
#[command(name = "snips")]
#[command(about = "Parse, list and expand snippet definition files")]
struct Cli {
    /// Settings file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse definition files and every snippet body, reporting errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the trigger and description of every snippet and the tag of
    /// every global block
    List {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Expand the trigger at the end of a line
    Expand {
        files: Vec<PathBuf>,

        /// Text of the line, up to and past the cursor
        #[arg(short, long)]
        line: String,

        /// Byte column of the cursor (defaults to the end of the line)
        #[arg(long)]
        column: Option<usize>,

        /// Filetype whose snippets are searched (defaults to `all`)
        #[arg(short, long, default_value = snips::ALL)]
        filetype: String,

        /// Selected text for ${VISUAL}
        #[arg(long)]
        visual: Option<String>,

        /// Also print the position of every stop in navigation order
        #[arg(long)]
        stops: bool,

        /// Navigation direction for --stops (forward/next or backward/prev)
        #[arg(long, default_value = "forward")]
        direction: Direction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => match Settings::from_file(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading settings '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    let ok = match cli.command {
        Command::Check { files } => check(&files),
        Command::List { files } => list(&files),
        Command::Expand {
            files,
            line,
            column,
            filetype,
            visual,
            stops,
            direction,
        } => {
            let column = column.unwrap_or(line.len());
            let navigation = stops.then_some(direction);
            expand(&settings, &files, &line, column, &filetype, visual, navigation)
        }
    };

    if !ok {
        std::process::exit(1);
    }
}

fn read(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            None
        }
    }
}

fn check(files: &[PathBuf]) -> bool {
    let mut ok = true;
    for path in files {
        let Some(source) = read(path) else {
            ok = false;
            continue;
        };
        let name = path.display().to_string();
        let statements = match parse_document(&source, &name) {
            Ok(statements) => statements,
            Err(e) => {
                eprint!("{}", e.format(&source));
                ok = false;
                continue;
            }
        };

        let mut count = 0;
        for statement in &statements {
            if let Statement::Snippet(snippet) = statement {
                count += 1;
                if let Err(e) = snippet.tree() {
                    eprint!("{}", e.format(&source));
                    ok = false;
                }
            }
        }
        println!("{}: {} snippets", name, count);
    }
    ok
}

fn list(files: &[PathBuf]) -> bool {
    let mut ok = true;
    for path in files {
        let Some(source) = read(path) else {
            ok = false;
            continue;
        };
        let filetype = filetype_of(path);
        let mut library = Library::new();
        match library.add_source(&filetype, &source, &path.display().to_string()) {
            Ok(()) => {}
            Err(Error::Parse(e)) => {
                eprint!("{}", e.format(&source));
                ok = false;
                continue;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ok = false;
                continue;
            }
        }

        let Some(scope) = library.scope(&filetype) else {
            continue;
        };
        for global in scope.globals() {
            println!("{}\tglobal\t{}", filetype, global.tag);
        }
        for s in scope.snippets() {
            println!("{}\t{}\t{}", filetype, s.trigger, s.description);
        }
    }
    ok
}

fn expand(
    settings: &Settings,
    files: &[PathBuf],
    line: &str,
    column: usize,
    filetype: &str,
    visual: Option<String>,
    navigation: Option<Direction>,
) -> bool {
    let mut library = Library::with_evaluators(settings.evaluators());
    for path in settings.files.iter().chain(files) {
        if let Err(e) = library.load_file(&filetype_of(path), path) {
            eprintln!("Error: {}", e);
            return false;
        }
    }

    let mut context = settings.render_context();
    if let Some(visual) = visual {
        context = context.with_visual(visual);
    }
    let request = ExpandRequest::new(line, column, filetype).with_context(context);

    let mut session = match library.expand(&request) {
        Ok(Some(session)) => session,
        Ok(None) => {
            eprintln!("No snippet matches '{}'", line);
            return false;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };

    let expansion = session.expansion();
    println!("{}", expansion.content);

    let stop_count = if navigation.is_some() { session.stops().len() } else { 1 };
    for i in 0..stop_count {
        let position = match navigation {
            Some(direction) if i > 0 => session.jump(direction),
            _ => session.jump_position(),
        };
        match session.current_stop() {
            Some(number) if !position.is_none() => eprintln!(
                "stop {}: line {} col {} length {}",
                number, position.line, position.col, position.length
            ),
            Some(number) => eprintln!("stop {}: no position", number),
            None => eprintln!("no stops, cursor at col {}", expansion.end_col),
        }
    }
    true
}
