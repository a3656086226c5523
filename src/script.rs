//
// emudbg
//
// Copyright 2025- Manos Pitsidianakis
//
// This file is part of emudbg.
//
// emudbg is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// emudbg is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with emudbg. If not, see <http://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later

//! Command scripts, executed one line per debugger wait while stopped.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::{
    error::DebugError, frontend::Frontend, logging::TraceItem, machine::Machine, DebugSession,
};

pub(crate) struct CommandScript {
    path: PathBuf,
    reader: BufReader<File>,
}

impl std::fmt::Debug for CommandScript {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("CommandScript")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CommandScript {
    /// Returns the next command, skipping blank and comment-only lines.
    /// `None` at end of file.
    fn next_command(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let command = strip_comment(&line);
            if !command.is_empty() {
                return Ok(Some(command.to_string()));
            }
        }
    }
}

fn strip_comment(line: &str) -> &str {
    let line = match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    };
    line.trim_end()
}

impl DebugSession {
    pub(crate) fn open_script(&mut self, path: &Path) -> Result<(), DebugError> {
        self.script = None;
        let file = File::open(path).map_err(|err| {
            log::debug!(
                target: TraceItem::Script.as_str(),
                "could not open {}: {err}",
                path.display()
            );
            DebugError::ScriptNotFound {
                path: path.to_path_buf(),
            }
        })?;
        log::debug!(target: TraceItem::Script.as_str(), "sourcing {}", path.display());
        self.script = Some(CommandScript {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        });
        Ok(())
    }

    /// Closes the current command script and opens `path`, if any.
    ///
    /// A missing file is fatal only before the machine has started;
    /// afterwards it is reported on the console.
    pub fn source_script(
        &mut self,
        frontend: &mut dyn Frontend,
        path: Option<&Path>,
    ) -> Result<(), DebugError> {
        let Some(path) = path else {
            self.script = None;
            return Ok(());
        };
        match self.open_script(path) {
            Err(err @ DebugError::ScriptNotFound { .. }) if self.started => {
                frontend.print(&err.to_string());
                Ok(())
            }
            other => other,
        }
    }

    /// Whether a command script is open.
    #[inline]
    pub fn is_sourcing_script(&self) -> bool {
        self.script.is_some()
    }

    /// Executes the next command of the open script, if any.
    pub(crate) fn process_script_line(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
    ) {
        let Some(ref mut script) = self.script else {
            return;
        };
        let command = match script.next_command() {
            Ok(Some(command)) => command,
            Ok(None) => {
                log::debug!(
                    target: TraceItem::Script.as_str(),
                    "end of {}",
                    script.path.display()
                );
                self.script = None;
                return;
            }
            Err(err) => {
                log::warn!(
                    target: TraceItem::Script.as_str(),
                    "could not read {}: {err}",
                    script.path.display()
                );
                self.script = None;
                return;
            }
        };
        log::trace!(target: TraceItem::Script.as_str(), ">{command}");
        frontend.execute_command(self, machine, &command);
    }
}
