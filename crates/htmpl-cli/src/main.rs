use clap::{Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};
use std::path::Path;

#[derive(Parser)]
#[command(name = "htmpl")]
#[command(about = "htmpl: parse and render HTML templates")]
#[command(version)]
struct Cli {
    /// Print parser diagnostics to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a template file and print the rendered markup
    Render {
        /// Input template file
        path: String,
    },

    /// Check a template file for errors without rendering it
    Check {
        /// Input template file
        path: String,
    },

    /// Print the concrete syntax tree of a template file
    Cst {
        /// Input template file
        path: String,

        /// Rule to match instead of the start rule
        #[arg(long)]
        rule: Option<String>,
    },
}

/// Writes log records to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => return,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Render { path } => cmd_render(&path),
        Command::Check { path } => cmd_check(&path),
        Command::Cst { path, rule } => cmd_cst(&path, rule.as_deref()),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_or_exit(path: &str, source: &str) -> htmpl_ast::Html {
    match htmpl_parser::parse(source, &[]) {
        Ok(html) => html,
        Err(e) => {
            eprintln!("{} in {path}: {e}", e.kind());
            std::process::exit(1);
        }
    }
}

fn cmd_render(path: &str) {
    let source = read_source(path);
    let html = parse_or_exit(path, &source);

    match html.render() {
        Ok(markup) => println!("{markup}"),
        Err(e) => {
            eprintln!("Render error: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(path: &str) {
    let source = read_source(path);
    parse_or_exit(path, &source);
    eprintln!("OK: {path}");
}

fn cmd_cst(path: &str, rule: Option<&str>) {
    let source = read_source(path);

    let grammar = match htmpl_grammar::html() {
        Ok(grammar) => grammar,
        Err(e) => {
            eprintln!("Grammar error: {e}");
            std::process::exit(1);
        }
    };

    match grammar.match_source(&source, rule) {
        Ok(cst) => print!("{}", cst.dump(grammar, &source)),
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    }
}
