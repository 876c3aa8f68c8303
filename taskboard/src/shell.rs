//! Line-oriented command shell over a [`SyncCoordinator`].
//!
//! Tasks and projects are addressed by the trailing characters of their id,
//! as printed by `list` and `projects`. UUID v7 ids share their leading
//! (timestamp) digits, so the tail is the part that tells them apart.

use std::fmt::Write as _;

use taskboard_proto::{Action, Priority, Project, ProjectId, Task, TaskConfiguration, TaskId};

use crate::channel::BroadcastChannel;
use crate::history::UndoLogStore;
use crate::persistence::PersistenceService;
use crate::sync::{BoardError, SyncCoordinator};

/// Number of trailing id characters shown in listings.
pub const SHORT_ID_LEN: usize = 8;

/// Shell usage text.
pub const HELP: &str = "\
commands:
  projects                          list projects
  project new <description>         create a project
  project rename <id> <description> rename a project
  project delete <id>               delete a project and its tasks
  open <id>                         open a project
  close                             close the open project
  list                              list tasks of the open project
  add <title>                       create a task
  edit <id> <title>                 change a task's title
  priority <id> <none|low|medium|high>
  describe <id> <text>              change a task's description
  rm <id>                           delete a task
  undo | redo                       walk the undo history
  history                           show undo and redo stacks
  help | quit";

/// Errors produced while parsing or executing a shell command.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The command word is not known.
    #[error("unknown command: {0} (try `help`)")]
    UnknownCommand(String),

    /// The command was given the wrong arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// No task or project id ends with the given fragment.
    #[error("no match for id {0}")]
    NoMatch(String),

    /// More than one id ends with the given fragment.
    #[error("id {0} is ambiguous")]
    Ambiguous(String),

    /// The priority word is not recognised.
    #[error(transparent)]
    Priority(#[from] taskboard_proto::ValidationError),

    /// The board operation failed.
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `projects`
    Projects,
    /// `project new <description>`
    NewProject(String),
    /// `project rename <id> <description>`
    RenameProject {
        /// Id fragment.
        project: String,
        /// New description.
        description: String,
    },
    /// `project delete <id>`
    DeleteProject(String),
    /// `open <id>`
    Open(String),
    /// `close`
    Close,
    /// `list`
    List,
    /// `add <title>`
    Add(String),
    /// `edit <id> <title>`
    Edit {
        /// Id fragment.
        task: String,
        /// New title.
        title: String,
    },
    /// `priority <id> <level>`
    SetPriority {
        /// Id fragment.
        task: String,
        /// New priority.
        priority: Priority,
    },
    /// `describe <id> <text>`
    Describe {
        /// Id fragment.
        task: String,
        /// New description.
        description: String,
    },
    /// `rm <id>`
    Remove(String),
    /// `undo`
    Undo,
    /// `redo`
    Redo,
    /// `history`
    History,
    /// `help`
    Help,
    /// `quit`
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// [`ShellError::UnknownCommand`], [`ShellError::Usage`] or
    /// [`ShellError::Priority`].
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let (word, rest) = split_word(line.trim());
        let command = match word {
            "" => return Ok(None),
            "projects" => Self::Projects,
            "project" => {
                let (sub, rest) = split_word(rest);
                match sub {
                    "new" => Self::NewProject(required(rest, "project new <description>")?),
                    "rename" => {
                        let (project, description) =
                            two_args(rest, "project rename <id> <description>")?;
                        Self::RenameProject {
                            project,
                            description,
                        }
                    }
                    "delete" => Self::DeleteProject(required(rest, "project delete <id>")?),
                    _ => return Err(ShellError::Usage("project new|rename|delete ...")),
                }
            }
            "open" => Self::Open(required(rest, "open <id>")?),
            "close" => Self::Close,
            "list" | "ls" => Self::List,
            "add" => Self::Add(required(rest, "add <title>")?),
            "edit" => {
                let (task, title) = two_args(rest, "edit <id> <title>")?;
                Self::Edit { task, title }
            }
            "priority" => {
                let (task, level) = split_word(rest);
                if task.is_empty() {
                    return Err(ShellError::Usage("priority <id> <none|low|medium|high>"));
                }
                Self::SetPriority {
                    task: task.to_string(),
                    priority: level.parse()?,
                }
            }
            "describe" => {
                let (task, description) = split_word(rest);
                if task.is_empty() {
                    return Err(ShellError::Usage("describe <id> <text>"));
                }
                Self::Describe {
                    task: task.to_string(),
                    description: description.to_string(),
                }
            }
            "rm" | "delete" => Self::Remove(required(rest, "rm <id>")?),
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "history" => Self::History,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ShellError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn required(rest: &str, usage: &'static str) -> Result<String, ShellError> {
    if rest.is_empty() {
        return Err(ShellError::Usage(usage));
    }
    Ok(rest.to_string())
}

fn two_args(rest: &str, usage: &'static str) -> Result<(String, String), ShellError> {
    let (first, second) = split_word(rest);
    if first.is_empty() || second.is_empty() {
        return Err(ShellError::Usage(usage));
    }
    Ok((first.to_string(), second.to_string()))
}

/// Trailing characters of an id, as shown in listings.
#[must_use]
pub fn short_id(id: &str) -> &str {
    let start = id
        .char_indices()
        .rev()
        .nth(SHORT_ID_LEN - 1)
        .map_or(0, |(i, _)| i);
    &id[start..]
}

/// Finds the single candidate whose id ends with `fragment`.
fn resolve<'a, T>(
    candidates: &'a [T],
    fragment: &str,
    id_of: impl Fn(&T) -> &str,
) -> Result<&'a T, ShellError> {
    if let Some(exact) = candidates.iter().find(|c| id_of(c) == fragment) {
        return Ok(exact);
    }
    let mut matches = candidates.iter().filter(|c| id_of(c).ends_with(fragment));
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found),
        (Some(_), Some(_)) => Err(ShellError::Ambiguous(fragment.to_string())),
        (None, _) => Err(ShellError::NoMatch(fragment.to_string())),
    }
}

/// One-line rendering of a task.
#[must_use]
pub fn format_task(task: &Task) -> String {
    let mut line = format!("{}  {}", short_id(task.id.as_str()), task.title);
    if task.configuration.priority != Priority::Unset {
        let _ = write!(line, "  [{}]", task.configuration.priority);
    }
    if !task.configuration.description.is_empty() {
        let _ = write!(line, "  ({})", task.configuration.description);
    }
    line
}

/// One-line rendering of an action, as listed by `history`.
#[must_use]
pub fn format_action(action: &Action) -> String {
    match action {
        Action::Create { task } => format!("create {}", task.title),
        Action::Delete { task } => format!("delete {}", task.title),
        Action::Update { before, after } if before.title == after.title => {
            format!("update {}", after.title)
        }
        Action::Update { before, after } => format!("update {} -> {}", before.title, after.title),
    }
}

fn format_project(project: &Project) -> String {
    format!("{}  {}", short_id(project.id.as_str()), project.description)
}

/// Executes one command and returns the text to show.
///
/// [`Command::Quit`] is left to the caller and yields an empty reply.
///
/// # Errors
///
/// Returns [`ShellError`] for unresolvable ids or failed board operations.
pub async fn execute<P, C, L>(
    board: &mut SyncCoordinator<P, C, L>,
    command: Command,
) -> Result<String, ShellError>
where
    P: PersistenceService,
    C: BroadcastChannel,
    L: UndoLogStore,
{
    let reply = match command {
        Command::Projects => {
            let projects = board.list_projects().await?;
            if projects.is_empty() {
                "no projects".to_string()
            } else {
                lines(projects.iter().map(format_project))
            }
        }
        Command::NewProject(description) => {
            let project = board.create_project(&description).await?;
            format!("created {}", format_project(&project))
        }
        Command::RenameProject {
            project,
            description,
        } => {
            let id = resolve_project(board, &project).await?;
            board.rename_project(&id, &description).await?;
            "renamed".to_string()
        }
        Command::DeleteProject(project) => {
            let id = resolve_project(board, &project).await?;
            board.delete_project(&id).await?;
            "deleted".to_string()
        }
        Command::Open(project) => {
            let id = resolve_project(board, &project).await?;
            board.open_project(&id).await?;
            format!("opened {} ({} tasks)", short_id(id.as_str()), board.tasks().len())
        }
        Command::Close => {
            board.close_project().await;
            "closed".to_string()
        }
        Command::List => {
            if board.active_project().is_none() {
                return Err(BoardError::NoActiveProject.into());
            }
            if board.tasks().is_empty() {
                "no tasks".to_string()
            } else {
                lines(board.tasks().iter().map(format_task))
            }
        }
        Command::Add(title) => {
            let task = board.create_task(&title, TaskConfiguration::default()).await?;
            format!("added {}", format_task(&task))
        }
        Command::Edit { task, title } => {
            let current = resolve_task(board, &task)?;
            let updated = board
                .update_task(&current.id, &title, current.configuration.clone())
                .await?;
            format!("updated {}", format_task(&updated))
        }
        Command::SetPriority { task, priority } => {
            let current = resolve_task(board, &task)?;
            let configuration = TaskConfiguration {
                priority,
                ..current.configuration.clone()
            };
            let updated = board
                .update_task(&current.id, &current.title, configuration)
                .await?;
            format!("updated {}", format_task(&updated))
        }
        Command::Describe { task, description } => {
            let current = resolve_task(board, &task)?;
            let configuration = TaskConfiguration {
                description,
                ..current.configuration.clone()
            };
            let updated = board
                .update_task(&current.id, &current.title, configuration)
                .await?;
            format!("updated {}", format_task(&updated))
        }
        Command::Remove(task) => {
            let id: TaskId = resolve_task(board, &task)?.id;
            let removed = board.delete_task(&id).await?;
            format!("removed {}", format_task(&removed))
        }
        Command::Undo => format!("undid {}", format_action(&board.undo().await?)),
        Command::Redo => format!("redid {}", format_action(&board.redo().await?)),
        Command::History => {
            let mut out = String::from("history (oldest first):");
            for action in board.history() {
                let _ = write!(out, "\n  {}", format_action(&action));
            }
            out.push_str("\nfuture (next redo first):");
            for action in board.future() {
                let _ = write!(out, "\n  {}", format_action(&action));
            }
            out
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    };
    Ok(reply)
}

fn lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}

fn resolve_task<P, C, L>(
    board: &SyncCoordinator<P, C, L>,
    fragment: &str,
) -> Result<Task, ShellError>
where
    P: PersistenceService,
    C: BroadcastChannel,
    L: UndoLogStore,
{
    resolve(board.tasks(), fragment, |t| t.id.as_str()).cloned()
}

async fn resolve_project<P, C, L>(
    board: &SyncCoordinator<P, C, L>,
    fragment: &str,
) -> Result<ProjectId, ShellError>
where
    P: PersistenceService,
    C: BroadcastChannel,
    L: UndoLogStore,
{
    let projects = board.list_projects().await?;
    Ok(resolve(&projects, fragment, |p| p.id.as_str())?.id.clone())
}
