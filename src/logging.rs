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

//! Diagnostic logging.
//!
//! Every engine component logs under its own target, listed in [`TraceItem`].
//! Targets that are not explicitly requested are silenced, so that enabling
//! `trace` level for one component does not flood the output with the
//! others.

use std::collections::BTreeSet;

pub use log::LevelFilter;

#[derive(
    Copy, Clone, Ord, PartialOrd, PartialEq, Eq, Debug, clap::ValueEnum, serde_derive::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TraceItem {
    Breakpoint,
    Expression,
    Hook,
    Hotspot,
    Memory,
    Script,
    Step,
    Trace,
    Watchpoint,
}

impl TraceItem {
    pub const POSSIBLE_VALUES: &[Self] = &[
        Self::Breakpoint,
        Self::Expression,
        Self::Hook,
        Self::Hotspot,
        Self::Memory,
        Self::Script,
        Self::Step,
        Self::Trace,
        Self::Watchpoint,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Breakpoint => "breakpoint",
            Self::Expression => "expression",
            Self::Hook => "hook",
            Self::Hotspot => "hotspot",
            Self::Memory => "memory",
            Self::Script => "script",
            Self::Step => "step",
            Self::Trace => "trace",
            Self::Watchpoint => "watchpoint",
        }
    }
}

impl std::fmt::Display for TraceItem {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

impl std::str::FromStr for TraceItem {
    type Err = Box<dyn std::error::Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for i in Self::POSSIBLE_VALUES.iter() {
            if i.as_str() == s {
                return Ok(*i);
            }
        }
        Err(Box::<dyn std::error::Error>::from(format!(
            "Expected one of {}",
            Self::POSSIBLE_VALUES
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<&str>>()
                .join(", ")
        )))
    }
}

#[derive(Debug)]
pub enum Output {
    Stdout,
    Stderr,
    File(std::fs::File),
}

impl std::io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Stdout => {
                let mut lck = std::io::stdout().lock();
                lck.write(buf)
            }
            Self::Stderr => {
                let mut lck = std::io::stderr().lock();
                lck.write(buf)
            }
            Self::File(ref mut f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout => {
                let mut lck = std::io::stdout().lock();
                lck.flush()
            }
            Self::Stderr => {
                let mut lck = std::io::stderr().lock();
                lck.flush()
            }
            Self::File(ref mut f) => f.flush(),
        }
    }
}

fn builder(level: LevelFilter, events: &BTreeSet<TraceItem>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    for item in TraceItem::POSSIBLE_VALUES {
        let item_level = if events.contains(item) {
            LevelFilter::Trace
        } else {
            LevelFilter::Off
        };
        builder.filter_module(item.as_str(), item_level);
    }
    // `RUST_LOG` directives override the defaults above.
    builder.parse_default_env();
    builder
}

/// Installs the global logger.
///
/// Fails if a logger is already installed, which is the case in tests run
/// under `test_log`.
pub fn init(
    level: LevelFilter,
    output: Output,
    events: BTreeSet<TraceItem>,
) -> Result<(), log::SetLoggerError> {
    let mut builder = builder(level, &events);
    builder.target(env_logger::Target::Pipe(Box::new(output)));
    builder.try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_item_from_str() {
        for item in TraceItem::POSSIBLE_VALUES {
            assert_eq!(item.as_str().parse::<TraceItem>().unwrap(), *item);
        }
        let err = "jit".parse::<TraceItem>().unwrap_err().to_string();
        assert!(err.starts_with("Expected one of breakpoint, expression"), "{err}");
    }
}
