use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use tabq::config::AppConfig;
use tabq::logging::init_logging;
use tabq::render::{render_grid, render_history, render_schema};
use tabq::{
    Args, CacheManager, CompressionFormat, ConfigManager, ExportFormat, HostMessage, Loader, PolarsEngine, Session,
    SessionEvent, SortDirection, Status, StatusLevel, APP_NAME,
};
use tracing::{debug, warn};

const REPL_HELP: &str = "\
Enter SQL to run it, or a command:
  :filter TEXT        keep rows where any column contains TEXT (empty clears)
  :col COL TEXT       filter one column by name or index (empty TEXT clears)
  :sort COL           cycle the sort on a column (ascending, descending, none)
  :clear              clear all filters
  :history            list executed queries, newest first
  :replay ID          run a query from the history again
  :export FORMAT [PATH]
                      export the current query (csv, tsv, parquet, json, ndjson, arrow)
  :export PATH        export in the format named by the file extension
  :tables             list relations
  :schema             describe the loaded relation
  :help               show this help
  :quit               leave";

/// A line of interactive input.
#[derive(Debug, PartialEq)]
enum Command {
    Sql(String),
    Filter(String),
    ColumnFilter { column: String, text: String },
    Sort(String),
    Clear,
    History,
    Replay(u64),
    Export {
        format: ExportFormat,
        path: Option<PathBuf>,
    },
    Tables,
    Schema,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Some(Command::Sql(line.to_string())));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let command = match name {
        "filter" | "f" => Command::Filter(arg.to_string()),
        "col" | "c" => {
            let (column, text) = match arg.split_once(char::is_whitespace) {
                Some((column, text)) => (column, text.trim()),
                None => (arg, ""),
            };
            if column.is_empty() {
                return Err(eyre!("usage: :col COL TEXT"));
            }
            Command::ColumnFilter {
                column: column.to_string(),
                text: text.to_string(),
            }
        }
        "sort" | "s" if !arg.is_empty() => Command::Sort(arg.to_string()),
        "sort" | "s" => return Err(eyre!("usage: :sort COL")),
        "clear" => Command::Clear,
        "history" | "h" => Command::History,
        "replay" | "r" => Command::Replay(
            arg.parse()
                .map_err(|_| eyre!("usage: :replay ID (got '{}')", arg))?,
        ),
        "export" | "e" => {
            let mut parts = arg.split_whitespace();
            let first = parts
                .next()
                .ok_or_else(|| eyre!("usage: :export FORMAT [PATH] | :export PATH"))?;
            match ExportFormat::from_str(first, true) {
                Ok(format) => Command::Export {
                    format,
                    path: parts.next().map(PathBuf::from),
                },
                Err(_) => {
                    let path = PathBuf::from(first);
                    let format = export_format_for(&path)
                        .ok_or_else(|| eyre!("unknown export format '{}'", first))?;
                    Command::Export {
                        format,
                        path: Some(path),
                    }
                }
            }
        }
        "tables" => Command::Tables,
        "schema" => Command::Schema,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(eyre!("unknown command ':{}', try :help", other)),
    };
    Ok(Some(command))
}

/// Export format named by a path's extension, looking past a compression suffix.
fn export_format_for(path: &Path) -> Option<ExportFormat> {
    let path = match CompressionFormat::from_extension(path) {
        Some(_) => Path::new(path.file_stem()?),
        None => path,
    };
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(ExportFormat::from_extension)
}

/// Split a `COL=TEXT` filter argument.
fn parse_column_filter(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=')
        .filter(|(column, _)| !column.is_empty())
        .ok_or_else(|| eyre!("column filter must look like COL=TEXT, got '{}'", arg))
}

fn report(status: &Status) {
    match status.level {
        StatusLevel::Error => eprintln!("error: {}", status.message),
        StatusLevel::Warning => eprintln!("warning: {}", status.message),
        StatusLevel::Info | StatusLevel::Success => eprintln!("{}", status.message),
    }
}

/// Handle an event, failing on an error status.
fn require(session: &mut Session, event: SessionEvent) -> Result<()> {
    let status = session.event(event);
    report(&status);
    if status.is_error() {
        return Err(eyre!(status.message));
    }
    Ok(())
}

fn column_index(session: &Session, column: &str) -> Result<usize> {
    session
        .grid()
        .column_index(column)
        .map_err(|e| eyre!("{}", e))
}

/// Write any exports the session handed back.
fn save_exports(rx: &Receiver<HostMessage>, output: Option<&Path>) -> Result<()> {
    while let Ok(HostMessage::Export(artifact)) = rx.try_recv() {
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&artifact.file_name));
        std::fs::write(&path, &artifact.bytes)
            .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

/// Loadable files next to `path`, for the session's workspace listing.
fn sibling_files(path: &Path) -> Vec<String> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| Loader::PRIORITY.iter().any(|l| l.can_load(name)))
        .collect();
    files.sort();
    files
}

fn print_grid(session: &Session) {
    print!("{}", render_grid(session.grid(), &session.config().display));
}

fn repl(session: &mut Session, rx: &Receiver<HostMessage>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    eprintln!("Type :help for commands.");
    loop {
        eprint!("tabq> ");
        std::io::stderr().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let command = match parse_command(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };
        debug!(?command, "interactive command");

        match command {
            Command::Sql(sql) => {
                let status = session.event(SessionEvent::RunSql(sql));
                if !status.is_error() {
                    print_grid(session);
                }
                report(&status);
            }
            Command::Filter(text) => {
                report(&session.event(SessionEvent::SetGlobalFilter(text)));
                print_grid(session);
            }
            Command::ColumnFilter { column, text } => match column_index(session, &column) {
                Ok(column) => {
                    report(&session.event(SessionEvent::SetColumnFilter { column, text }));
                    print_grid(session);
                }
                Err(e) => eprintln!("error: {}", e),
            },
            Command::Sort(column) => match column_index(session, &column) {
                Ok(column) => {
                    report(&session.event(SessionEvent::ToggleSort(column)));
                    print_grid(session);
                }
                Err(e) => eprintln!("error: {}", e),
            },
            Command::Clear => {
                report(&session.event(SessionEvent::ClearFilters));
                print_grid(session);
            }
            Command::History => print!("{}", render_history(session.history())),
            Command::Replay(id) => {
                let status = session.event(SessionEvent::Replay(id));
                if !status.is_error() {
                    print_grid(session);
                }
                report(&status);
            }
            Command::Export { format, path } => {
                report(&session.event(SessionEvent::Export(format)));
                if let Err(e) = save_exports(rx, path.as_deref()) {
                    eprintln!("error: {}", e);
                }
            }
            Command::Tables => {
                for name in session.relations() {
                    println!("{}", name);
                }
            }
            Command::Schema => match session.schema() {
                Ok(schema) => print!("{}", render_schema(&schema)),
                Err(e) => eprintln!("error: {}", tabq::error_display::user_message(&e)),
            },
            Command::Help => eprintln!("{}", REPL_HELP),
            Command::Quit => break,
        }
    }
    Ok(())
}

fn run(args: &Args, config: AppConfig) -> Result<()> {
    let path = args
        .path
        .as_ref()
        .ok_or_else(|| eyre!("A file path is required"))?;
    let bytes =
        std::fs::read(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let (tx, rx) = channel::<HostMessage>();
    let mut session = Session::new(Box::new(PolarsEngine::new()), config, tx);
    match CacheManager::new(APP_NAME) {
        Ok(cache) => session = session.with_cache(cache),
        Err(e) => warn!(error = %e, "no cache directory, history will not persist"),
    }

    session.event(SessionEvent::WorkspaceFiles(sibling_files(path)));
    require(&mut session, SessionEvent::Load { file_name, bytes })?;

    if let Some(sql) = &args.query {
        require(&mut session, SessionEvent::RunSql(sql.clone()))?;
    }
    if let Some(text) = &args.filter {
        session.event(SessionEvent::SetGlobalFilter(text.clone()));
    }
    for arg in &args.column_filters {
        let (column, text) = parse_column_filter(arg)?;
        let column = column_index(&session, column)?;
        require(
            &mut session,
            SessionEvent::SetColumnFilter {
                column,
                text: text.to_string(),
            },
        )?;
    }
    if let Some(column) = &args.sort {
        let column = column_index(&session, column)?;
        let direction = if args.descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        session
            .grid_mut()
            .set_sort(column, direction)
            .map_err(|e| eyre!("{}", e))?;
    }

    print_grid(&session);

    if let Some(format) = args.export {
        require(&mut session, SessionEvent::Export(format))?;
        save_exports(&rx, args.output.as_deref())?;
    }

    if args.history {
        print!("{}", render_history(session.history()));
    }

    if args.interactive {
        repl(&mut session, &rx)?;
    }
    Ok(())
}

/// Command-line values override the config file.
fn apply_args(config: &mut AppConfig, args: &Args) {
    if let Some(delimiter) = args.delimiter {
        config.file_loading.delimiter = Some(delimiter);
    }
    if args.no_header {
        config.file_loading.has_header = Some(false);
    }
    if let Some(skip_rows) = args.skip_rows {
        config.file_loading.skip_rows = Some(skip_rows);
    }
    if let Some(n) = args.infer_schema_length {
        config.file_loading.infer_schema_length = Some(n);
    }
    if let Some(max_rows) = args.max_rows {
        config.display.max_rows = max_rows;
    }
    if args.compression.is_some() {
        config.export.compression = args.compression;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Wrote default configuration to {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error generating config: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.clear_cache {
        match CacheManager::new(APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing cache: {}", e);
                    std::process::exit(1);
                }
                println!("Cache cleared successfully");
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No cache to clear");
                return Ok(Some(()));
            }
        }
    }

    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    let mut config = AppConfig::load(APP_NAME)?;
    apply_args(&mut config, &args);
    config.validate()?;
    init_logging(&config.logging)?;

    run(&args, config)
}
