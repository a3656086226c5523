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

use std::path::PathBuf;

#[derive(Debug)]
pub enum DebugError {
    /// A trace or options file could not be opened or read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A command script given before the machine started does not exist.
    ScriptNotFound { path: PathBuf },
    Config(String),
}

impl std::fmt::Display for DebugError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(fmt, "{}: {source}", path.display()),
            Self::ScriptNotFound { path } => {
                write!(fmt, "Cannot open command file '{}'", path.display())
            }
            Self::Config(msg) => write!(fmt, "Invalid debugger options: {msg}"),
        }
    }
}

impl std::error::Error for DebugError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
