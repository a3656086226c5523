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

use std::{borrow::Cow, collections::BTreeSet, path::PathBuf};

use crate::{error::DebugError, logging::TraceItem};

/// Parses a hexadecimal (`0x` prefixed) or decimal address.
pub fn maybe_hex(s: &str) -> Result<u64, Cow<'static, str>> {
    const HEX_PREFIX: &str = "0x";
    const HEX_PREFIX_UPPER: &str = "0X";
    const HEX_PREFIX_LEN: usize = HEX_PREFIX.len();

    let result = if s.starts_with(HEX_PREFIX) || s.starts_with(HEX_PREFIX_UPPER) {
        u64::from_str_radix(&s[HEX_PREFIX_LEN..], 16)
    } else {
        s.parse::<u64>()
    };

    result.map_err(|err| Cow::Owned(err.to_string()))
}

const fn default_update_interval_ms() -> u64 {
    250
}

/// Debugger options, meant to be flattened into an emulator's command line
/// or loaded from a JSON file.
#[derive(clap::Args, serde_derive::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DebugOptions {
    /// Command script to execute when the debugger starts.
    #[arg(long, value_name = "FILE")]
    pub debugscript: Option<PathBuf>,
    /// Do not halt before the first instruction.
    #[arg(long, default_value_t = false)]
    pub start_running: bool,
    /// Hexadecimal or decimal address of a breakpoint to set on the first
    /// CPU. May be repeated.
    #[arg(long = "breakpoint", value_name = "ADDRESS", value_parser = maybe_hex)]
    pub breakpoints: Vec<u64>,
    /// How often memory and watch views are refreshed while running, in
    /// milliseconds.
    #[arg(long, default_value_t = default_update_interval_ms())]
    pub update_interval_ms: u64,
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Debugger components whose diagnostic events should be logged.
    #[arg(long = "log-event", value_name = "EVENT")]
    pub log_events: Vec<TraceItem>,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            debugscript: None,
            start_running: false,
            breakpoints: vec![],
            update_interval_ms: default_update_interval_ms(),
            verbose: 0,
            log_events: vec![],
        }
    }
}

impl DebugOptions {
    pub fn from_json(input: &str) -> Result<Self, DebugError> {
        serde_json::from_str(input).map_err(|err| DebugError::Config(err.to_string()))
    }

    /// Reads options from a JSON file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DebugError> {
        let path = path.into();
        let input = match std::fs::read_to_string(&path) {
            Ok(input) => input,
            Err(source) => return Err(DebugError::Io { path, source }),
        };
        Self::from_json(&input)
    }

    pub const fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub fn log_events(&self) -> BTreeSet<TraceItem> {
        self.log_events.iter().copied().collect()
    }
}
