use super::render::moderation_line;
use crate::{
    auth::{FileStorage, Storage},
    cli::globals::GlobalArgs,
    error::Error,
    moderation::{Category, ModerationAction, ModerationConsole},
};
use anyhow::Result;
use std::{io::Write, str::FromStr};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug)]
pub struct ListArgs {
    pub globals: GlobalArgs,
    pub category: Category,
    pub filter: String,
}

#[derive(Debug)]
pub struct ModerateArgs {
    pub globals: GlobalArgs,
    pub action: ModerationAction,
    pub key: String,
}

const HELP: &str = "\
commands:
  tab <pending|approved|rejected>   switch category, clears the filter
  refresh                           reload the active category from the server
  filter [text]                     filter keys by substring, empty clears
  approve <key|#n>                  approve a pending item
  reject <key|#n>                   reject a pending item
  counts                            item count per loaded category
  list                              show the active category again
  help                              this text
  quit                              leave the console";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Tab(Category),
    Refresh,
    Filter(String),
    Moderate(ModerationAction, String),
    Counts,
    List,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let required = |what: &str| -> Result<String, Error> {
            if rest.is_empty() {
                Err(Error::Validation(format!("{word} needs {what}")))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_lowercase().as_str() {
            "tab" | "select" => Ok(Self::Tab(required("a category")?.parse()?)),
            "pending" | "approved" | "rejected" => Ok(Self::Tab(word.parse()?)),
            "refresh" | "r" => Ok(Self::Refresh),
            "filter" | "f" => Ok(Self::Filter(rest.to_string())),
            "approve" | "a" => Ok(Self::Moderate(ModerationAction::Approve, required("a key")?)),
            "reject" | "x" => Ok(Self::Moderate(ModerationAction::Reject, required("a key")?)),
            "counts" => Ok(Self::Counts),
            "list" | "ls" | "" => Ok(Self::List),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(Error::Validation(format!(
                "unknown command {other:?}, type `help`"
            ))),
        }
    }
}

fn user_message(err: &Error) -> String {
    match err {
        Error::Forbidden => {
            "not authorized: your account is not in the admins group".to_string()
        }
        other => other.to_string(),
    }
}

fn print_listing<S: Storage>(console: &ModerationConsole<S>, out: &mut impl Write) -> Result<()> {
    let visible = console.visible();
    let total = console.cache().count(console.current());

    if console.filter().is_empty() {
        writeln!(out, "{} ({total})", console.current())?;
    } else {
        writeln!(
            out,
            "{} ({} of {total} matching {:?})",
            console.current(),
            visible.len(),
            console.filter()
        )?;
    }

    if visible.is_empty() {
        writeln!(out, "  no items")?;
    }

    for (index, item) in visible.iter().enumerate() {
        writeln!(out, "{}", moderation_line(index + 1, item))?;
    }

    Ok(())
}

/// `#n` picks the n-th visible pending item; anything else is taken as a key.
fn resolve_key<S: Storage>(console: &ModerationConsole<S>, arg: &str) -> Result<String, Error> {
    let Some(index) = arg.strip_prefix('#') else {
        return Ok(arg.to_string());
    };

    if console.current() != Category::Pending {
        return Err(Error::Validation(
            "item numbers only apply to the pending list, switch with `tab pending`".to_string(),
        ));
    }

    let index: usize = index
        .parse()
        .map_err(|_| Error::Validation(format!("invalid item number {arg:?}")))?;

    console
        .visible()
        .get(index.wrapping_sub(1))
        .map(|item| item.key.clone())
        .ok_or_else(|| Error::Validation(format!("no item #{index} in the current view")))
}

/// Runs one console command; returns `false` when the console should exit.
/// Domain errors are printed, not returned, so the session stays open.
///
/// # Errors
/// Returns an error only when writing to `out` fails.
pub async fn run_command<S: Storage>(
    console: &mut ModerationConsole<S>,
    command: ConsoleCommand,
    out: &mut impl Write,
) -> Result<bool> {
    let result = match command {
        ConsoleCommand::Quit => return Ok(false),
        ConsoleCommand::Help => {
            writeln!(out, "{HELP}")?;
            return Ok(true);
        }
        ConsoleCommand::Counts => {
            for category in Category::ALL {
                if console.cache().is_fetched(category) {
                    writeln!(out, "{category}: {}", console.cache().count(category))?;
                } else {
                    writeln!(out, "{category}: not loaded")?;
                }
            }
            return Ok(true);
        }
        ConsoleCommand::Tab(category) => console
            .select(category)
            .await
            .map(|source| debug!(?source, "selected {}", category)),
        ConsoleCommand::Refresh => console
            .refresh_current(true)
            .await
            .map(|source| debug!(?source, "refreshed {}", console.current())),
        ConsoleCommand::Filter(query) => {
            console.set_filter(&query);
            Ok(())
        }
        ConsoleCommand::List => Ok(()),
        ConsoleCommand::Moderate(action, arg) => match resolve_key(console, &arg) {
            Ok(key) => match console.apply_moderation(action, &key).await {
                Ok(new_key) => {
                    writeln!(out, "{} {key} -> {new_key}", action.destination())?;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => print_listing(console, out)?,
        Err(e) => writeln!(out, "error: {}", user_message(&e))?,
    }

    Ok(true)
}

/// Reads commands line by line until `quit` or end of input.
///
/// # Errors
/// Returns an error if reading input or writing output fails.
pub async fn console_loop<S, R>(
    console: &mut ModerationConsole<S>,
    input: R,
    out: &mut impl Write,
) -> Result<()>
where
    S: Storage,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        write!(out, "{}> ", console.current())?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match line.parse::<ConsoleCommand>() {
            Ok(command) => {
                if !run_command(console, command, out).await? {
                    break;
                }
            }
            Err(e) => writeln!(out, "error: {e}")?,
        }
    }

    Ok(())
}

fn open_console(globals: &GlobalArgs) -> Result<ModerationConsole<FileStorage>> {
    Ok(ModerationConsole::new(globals.api()?, globals.session()))
}

/// # Errors
/// Returns an error if the listing cannot be fetched.
pub async fn list(args: ListArgs) -> Result<()> {
    let mut console = open_console(&args.globals)?;

    console
        .select(args.category)
        .await
        .map_err(|e| anyhow::anyhow!(user_message(&e)))?;
    console.set_filter(&args.filter);

    print_listing(&console, &mut std::io::stdout().lock())
}

/// # Errors
/// Returns an error if the backend refuses the action.
pub async fn moderate(args: ModerateArgs) -> Result<()> {
    let mut console = open_console(&args.globals)?;

    let new_key = console
        .apply_moderation(args.action, &args.key)
        .await
        .map_err(|e| anyhow::anyhow!(user_message(&e)))?;

    println!("{} {} -> {new_key}", args.action.destination(), args.key);

    Ok(())
}

/// # Errors
/// Returns an error without a valid session or when the terminal goes away.
pub async fn console(globals: &GlobalArgs) -> Result<()> {
    let mut console = open_console(globals)?;

    if !console.session().is_valid() {
        return Err(Error::AuthRequired.into());
    }

    let mut out = std::io::stdout();
    writeln!(out, "moderation console, type `help` for commands")?;
    run_command(&mut console, ConsoleCommand::Tab(Category::Pending), &mut out).await?;

    console_loop(&mut console, BufReader::new(tokio::io::stdin()), &mut out).await
}
