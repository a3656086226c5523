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

use emudbg::{cpu::DebugFlags, DebugOptions, DebugSession, ExpressionError};

mod utils;
use utils::*;

#[test_log::test]
fn test_first_breakpoint_wins() {
    let (mut session, mut machine, mut frontend, cpu) = setup(true, &[NOP; 8]);
    let first = session.breakpoint_set(cpu, 0x102, None, Some("print first"));
    let second = session.breakpoint_set(cpu, 0x102, None, Some("print second"));
    assert_eq!((first, second), (1, 2));

    run(&mut session, &mut machine, &mut frontend, cpu, 4);
    assert_eq!(frontend.commands, ["print first"]);
    assert_eq!(frontend.printed, ["first", "Stopped at breakpoint 1"]);
    assert_eq!(frontend.stops(), [0x102]);
}

#[test_log::test]
fn test_breakpoint_action_resumes() {
    let (mut session, mut machine, mut frontend, cpu) = setup(true, &[NOP; 8]);
    session.breakpoint_set(cpu, 0x101, None, Some("go"));
    run(&mut session, &mut machine, &mut frontend, cpu, 4);
    assert_eq!(frontend.commands, ["go"]);
    assert!(frontend.printed.is_empty());
    assert!(frontend.stops().is_empty());
}

#[test_log::test]
fn test_breakpoint_conditions() {
    let (mut session, mut machine, mut frontend, cpu) = setup(true, &[NOP; 8]);
    session.breakpoint_set(cpu, 0x101, Some(expr("0", |_| Ok(0))), None);
    session.breakpoint_set(
        cpu,
        0x102,
        Some(expr("nosuchsymbol", |ctx| ctx.symbol("nosuchsymbol"))),
        None,
    );
    let hit = session.breakpoint_set(
        cpu,
        0x103,
        Some(expr("pc == 103", |ctx| Ok(u64::from(ctx.symbol("pc")? == 0x103)))),
        None,
    );
    assert_eq!(hit, 3);

    run(&mut session, &mut machine, &mut frontend, cpu, 5);
    assert_eq!(frontend.printed, ["Stopped at breakpoint 3"]);
    assert_eq!(frontend.stops(), [0x103]);
}

#[test_log::test]
fn test_breakpoint_clear_and_enable() {
    let (mut session, mut machine, mut frontend, cpu) = setup(true, &[NOP; 8]);
    assert_eq!(session.breakpoint_set(cpu, 0x101, None, None), 1);
    assert!(session.breakpoint_clear(1));
    assert!(!session.breakpoint_clear(1));
    assert!(!session.cpu(cpu).flags().contains(DebugFlags::LIVE_BP));

    // indices are never reused
    assert_eq!(session.breakpoint_set(cpu, 0x101, None, None), 2);
    assert!(session.breakpoint_enable(2, false));
    assert!(!session.breakpoint_enable(99, false));
    assert!(!session.cpu(cpu).flags().contains(DebugFlags::LIVE_BP));
    assert_eq!(session.cpu(cpu).breakpoints()[0].to_string(), "2D 00000101");

    run(&mut session, &mut machine, &mut frontend, cpu, 3);
    assert!(frontend.stops().is_empty());

    session.breakpoint_enable_all(cpu, true);
    assert!(session.cpu(cpu).flags().contains(DebugFlags::LIVE_BP));
    machine.cpus[cpu.0].pc = 0x100;
    run(&mut session, &mut machine, &mut frontend, cpu, 3);
    assert_eq!(frontend.stops(), [0x101]);

    session.breakpoint_clear_all(cpu);
    assert!(session.cpu(cpu).breakpoints().is_empty());
    assert!(!session.cpu(cpu).flags().contains(DebugFlags::LIVE_BP));
}

#[test_log::test]
fn test_breakpoint_listing() {
    let (mut session, _machine, _frontend, cpu) = setup(true, &[]);
    session.breakpoint_set(
        cpu,
        0x1234,
        Some(expr("a == 0", |_| Err(ExpressionError::Other("unused".into())))),
        Some("go"),
    );
    assert_eq!(
        session.cpu(cpu).breakpoints()[0].to_string(),
        "1  00001234 if a == 0 do go"
    );
}

#[test_log::test]
fn test_initial_breakpoints() {
    let options = DebugOptions {
        start_running: true,
        breakpoints: vec![0x102],
        ..DebugOptions::default()
    };
    let mut session = DebugSession::new(&options).unwrap();
    let mut machine = TestMachine::new();
    let mut frontend = ScriptedFrontend::new();
    let cpu = machine.add_cpu(&mut session, "maincpu", ram_space());
    let audiocpu = machine.add_cpu(&mut session, "audiocpu", ram_space());
    assert_eq!(session.cpu(cpu).breakpoints().len(), 1);
    assert!(session.cpu(audiocpu).breakpoints().is_empty());
    machine.cpus[cpu.0].pc = 0x100;

    run(&mut session, &mut machine, &mut frontend, cpu, 4);
    assert_eq!(frontend.printed, ["Stopped at breakpoint 1"]);
    assert_eq!(frontend.stops(), [0x102]);
}

#[test_log::test]
fn test_halted_at_start() {
    let (mut session, mut machine, mut frontend, cpu) = setup(false, &[NOP; 8]);
    frontend.then(|session, _| session.go(Some(0x103)));
    run(&mut session, &mut machine, &mut frontend, cpu, 6);
    assert_eq!(frontend.stops(), [0x100, 0x103]);
    assert_eq!(
        frontend.printed,
        ["Stopped at temporary breakpoint 103 on CPU 'maincpu'"]
    );
    assert!(!session.cpu(cpu).flags().contains(DebugFlags::STOP_PC));
}
