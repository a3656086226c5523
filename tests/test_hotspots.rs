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

use emudbg::memory::SpaceNum;

mod utils;
use utils::*;

fn read_at(
    session: &mut emudbg::DebugSession,
    machine: &mut TestMachine,
    frontend: &mut ScriptedFrontend,
    address: u64,
) {
    let cpu = emudbg::CpuId(0);
    session.memory_read_hook(machine, frontend, cpu, SpaceNum::Program, address, 0xff);
}

fn entries(session: &emudbg::DebugSession) -> Vec<(u64, u32)> {
    session
        .cpu(emudbg::CpuId(0))
        .hotspots()
        .unwrap()
        .entries()
        .map(|e| (e.address, e.count))
        .collect()
}

#[test_log::test]
fn test_hotspot_eviction_order() {
    let (mut session, mut machine, mut frontend, cpu) = setup(true, &[NOP]);
    session.hotspot_track(&mut machine, cpu, 2, 1);
    for address in [0x10, 0x20, 0x30, 0x10] {
        read_at(&mut session, &mut machine, &mut frontend, address);
    }
    assert_eq!(entries(&session), [(0x10, 1), (0x30, 1)]);

    read_at(&mut session, &mut machine, &mut frontend, 0x40);
    assert_eq!(entries(&session), [(0x40, 1), (0x10, 1)]);
    assert!(frontend.printed.is_empty());
}

#[test_log::test]
fn test_hotspot_report() {
    let (mut session, mut machine, mut frontend, cpu) = setup(true, &[NOP]);
    session.hotspot_track(&mut machine, cpu, 2, 2);
    for address in [0x10, 0x10, 0x10, 0x20] {
        read_at(&mut session, &mut machine, &mut frontend, address);
    }
    assert_eq!(entries(&session), [(0x20, 1), (0x10, 3)]);
    assert!(frontend.printed.is_empty());

    read_at(&mut session, &mut machine, &mut frontend, 0x30);
    assert_eq!(
        frontend.printed,
        ["Hotspot @ program 00000010 (PC=00000100) hit 3 times (fell off bottom)"]
    );
    assert_eq!(entries(&session), [(0x30, 1), (0x20, 1)]);
}

#[test_log::test]
fn test_hotspot_records_reading_instruction() {
    let program = [
        LD_A_MEM, 0x00, 0x02, // 0x100
        JP, 0x00, 0x01, // 0x103
    ];
    let (mut session, mut machine, mut frontend, cpu) = setup(true, &program);
    session.hotspot_track(&mut machine, cpu, 4, 0);
    run(&mut session, &mut machine, &mut frontend, cpu, 6);

    let table = session.cpu(cpu).hotspots().unwrap();
    assert_eq!(table.capacity(), 4);
    assert_eq!(table.threshold(), 0);
    let hits = table.entries().copied().collect::<Vec<_>>();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].address, 0x200);
    assert_eq!(hits[0].space, SpaceNum::Program);
    assert_eq!(hits[0].count, 3);
    // the core has already advanced past the reading instruction
    assert_eq!(hits[0].pc, 0x103);
}

#[test_log::test]
fn test_hotspot_tracking_off() {
    let (mut session, mut machine, _, cpu) = setup(true, &[NOP]);
    session.hotspot_track(&mut machine, cpu, 8, 0);
    assert_eq!(machine.program(cpu).watchpoint_hooks(), (true, false));
    session.hotspot_track(&mut machine, cpu, 0, 0);
    assert!(session.cpu(cpu).hotspots().is_none());
    assert_eq!(machine.program(cpu).watchpoint_hooks(), (false, false));
}
