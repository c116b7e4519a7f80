// ABOUTME: Runtime collaborator providing interactive input and status output
// ABOUTME: Defines the runtime trait and the console implementation used by the CLI

use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::io::{self, Write};
use tracing::warn;

use super::error::{Result, ScaffoldError};
use super::parameters::ParameterDeclaration;

/// Interactive input and user-facing status output for the engine.
pub trait ScaffoldRuntime: Send + Sync {
    /// Side-channel status line
    fn log(&self, message: &str);

    /// Blocking prompt for the raw text of a parameter; empty means no answer
    fn ask(&self, parameter: &ParameterDeclaration) -> Result<String>;
}

/// Runtime reading lines with path completion and writing status lines to stdout.
#[derive(Debug, Default, Clone)]
pub struct ConsoleRuntime;

impl ConsoleRuntime {
    pub fn new() -> Self {
        Self
    }
}

/// Tab-completes filesystem paths, `~/` included
pub(crate) struct PathCompletion {
    files: FilenameCompleter,
}

impl PathCompletion {
    pub(crate) fn new() -> Self {
        Self {
            files: FilenameCompleter::new(),
        }
    }
}

impl Completer for PathCompletion {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.files.complete_path(line, pos)
    }
}

impl Hinter for PathCompletion {
    type Hint = String;
}

impl Highlighter for PathCompletion {}

impl Validator for PathCompletion {}

impl Helper for PathCompletion {}

fn write_status<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "{}", message.trim_end_matches('\n'))
}

impl ScaffoldRuntime for ConsoleRuntime {
    fn log(&self, message: &str) {
        if let Err(e) = write_status(&mut io::stdout().lock(), message) {
            warn!("Failed to write status line: {}", e);
        }
    }

    fn ask(&self, parameter: &ParameterDeclaration) -> Result<String> {
        let environ: std::collections::BTreeMap<String, String> = std::env::vars().collect();
        let prompt = format!("{}: ", parameter.prompt_text(&environ));

        if parameter.secure {
            return rpassword::prompt_password(prompt).map_err(ScaffoldError::IoError);
        }

        let mut editor: Editor<PathCompletion, DefaultHistory> =
            Editor::new().map_err(readline_error)?;
        editor.set_helper(Some(PathCompletion::new()));

        match editor.readline(&prompt) {
            Ok(line) => Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
            Err(ReadlineError::Eof) => Err(ScaffoldError::InputClosed(parameter.name.clone())),
            // Ctrl-C at a prompt ends the process cleanly
            Err(ReadlineError::Interrupted) => std::process::exit(0),
            Err(e) => Err(readline_error(e)),
        }
    }
}

fn readline_error(error: ReadlineError) -> ScaffoldError {
    match error {
        ReadlineError::Io(e) => ScaffoldError::IoError(e),
        other => ScaffoldError::IoError(io::Error::new(io::ErrorKind::Other, other.to_string())),
    }
}
