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

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, VecDeque},
    rc::Rc,
    time::Duration,
};

use emudbg::{
    disasm::{DasmFlags, Disassembler, Disassembly},
    machine::ScreenPosition,
    memory::*,
    CpuId, DebugOptions, DebugSession, Expression, ExpressionContext, ExpressionError, Frontend,
    Machine, ViewKind,
};

/// Where [`setup`] loads programs and points the program counter.
pub const PROGRAM_START: u64 = 0x100;

// Toy instruction set, 16-bit little-endian operands.
pub const NOP: u8 = 0x00;
/// `LD A,n`
pub const LD_A_IMM: u8 = 0x3e;
/// `LD A,(nn)`
pub const LD_A_MEM: u8 = 0x3a;
/// `LD (nn),A`
pub const LD_MEM_A: u8 = 0x32;
pub const JP: u8 = 0xc3;
pub const CALL: u8 = 0xcd;
pub const RET: u8 = 0xc9;

fn instruction_length(opcode: u8) -> u32 {
    match opcode {
        LD_A_IMM => 2,
        LD_A_MEM | LD_MEM_A | JP | CALL => 3,
        _ => 1,
    }
}

#[derive(Debug, Default)]
pub struct ToyDisassembler;

impl Disassembler for ToyDisassembler {
    fn max_opcode_bytes(&self) -> usize {
        3
    }

    fn disassemble(&self, _pc: u64, opcodes: &[u8], _arguments: &[u8]) -> Disassembly {
        let nn = u16::from_le_bytes([opcodes[1], opcodes[2]]);
        let (text, flags) = match opcodes[0] {
            LD_A_IMM => (format!("ld   a,${:02x}", opcodes[1]), DasmFlags::empty()),
            LD_A_MEM => (format!("ld   a,(${nn:04x})"), DasmFlags::empty()),
            LD_MEM_A => (format!("ld   (${nn:04x}),a"), DasmFlags::empty()),
            JP => (format!("jp   ${nn:04x}"), DasmFlags::empty()),
            CALL => (format!("call ${nn:04x}"), DasmFlags::STEP_OVER),
            RET => ("ret".to_string(), DasmFlags::STEP_OUT),
            _ => ("nop".to_string(), DasmFlags::empty()),
        };
        Disassembly {
            text,
            length: instruction_length(opcodes[0]),
            flags: flags | DasmFlags::SUPPORTED,
            extra_skip: 0,
        }
    }
}

/// 64KiB of RAM on an 8-bit little-endian bus.
pub fn ram_space() -> MemoryMap {
    let config = SpaceConfig::new("program", Endianness::Little, Width::_8, 16);
    MemoryMap::builder(config)
        .with_ram(0, 0x1_0000)
        .unwrap()
        .build()
}

#[derive(Debug, Default)]
pub struct TestCpu {
    pub spaces: [Option<MemoryMap>; SpaceNum::COUNT],
    pub pc: u64,
    pub a: u8,
    pub stack: Vec<u64>,
    pub registers: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct TestMachine {
    pub cpus: Vec<TestCpu>,
    pub regions: BTreeMap<String, MemoryRegion>,
    pub time: Duration,
    pub event_pending: bool,
    pub screen: Option<ScreenPosition>,
}

impl TestMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a CPU with both the machine and `session`.
    pub fn add_cpu(&mut self, session: &mut DebugSession, tag: &str, program: MemoryMap) -> CpuId {
        let id = session.add_cpu(tag, Box::new(ToyDisassembler));
        assert_eq!(id.0, self.cpus.len());
        let mut cpu = TestCpu::default();
        cpu.spaces[SpaceNum::Program.index()] = Some(program);
        self.cpus.push(cpu);
        id
    }

    pub fn program(&mut self, cpu: CpuId) -> &mut MemoryMap {
        self.cpus[cpu.0].spaces[SpaceNum::Program.index()]
            .as_mut()
            .unwrap()
    }

    fn read_byte(
        &mut self,
        session: &mut DebugSession,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        address: u64,
    ) -> u8 {
        if self.program(cpu).watchpoint_hooks().0 {
            session.memory_read_hook(self, frontend, cpu, SpaceNum::Program, address, 0xff);
        }
        self.program(cpu).read(address, 1) as u8
    }

    fn write_byte(
        &mut self,
        session: &mut DebugSession,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        address: u64,
        value: u8,
    ) {
        if self.program(cpu).watchpoint_hooks().1 {
            session.memory_write_hook(
                self,
                frontend,
                cpu,
                SpaceNum::Program,
                address,
                u64::from(value),
                0xff,
            );
        }
        self.program(cpu).write(address, 1, u64::from(value));
    }

    /// Executes the instruction at the program counter of `cpu`.
    pub fn execute_one(
        &mut self,
        session: &mut DebugSession,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
    ) {
        let pc = self.cpus[cpu.0].pc;
        let program = self.program(cpu);
        let opcode = program.read(pc, 1) as u8;
        let n = program.read(pc + 1, 1);
        let nn = program.read(pc + 1, 2);
        let next = pc + u64::from(instruction_length(opcode));
        self.cpus[cpu.0].pc = next;
        match opcode {
            LD_A_IMM => self.cpus[cpu.0].a = n as u8,
            LD_A_MEM => self.cpus[cpu.0].a = self.read_byte(session, frontend, cpu, nn),
            LD_MEM_A => {
                let a = self.cpus[cpu.0].a;
                self.write_byte(session, frontend, cpu, nn, a);
            }
            JP => self.cpus[cpu.0].pc = nn,
            CALL => {
                self.cpus[cpu.0].stack.push(next);
                self.cpus[cpu.0].pc = nn;
            }
            RET => {
                if let Some(ret) = self.cpus[cpu.0].stack.pop() {
                    self.cpus[cpu.0].pc = ret;
                }
            }
            _ => {}
        }
        self.time += Duration::from_micros(1);
    }
}

impl Machine for TestMachine {
    fn space(&mut self, cpu: CpuId, space: SpaceNum) -> Option<&mut dyn AddressSpace> {
        self.cpus[cpu.0].spaces[space.index()]
            .as_mut()
            .map(|s| s as &mut dyn AddressSpace)
    }

    fn region(&mut self, name: &str) -> Option<&mut MemoryRegion> {
        self.regions.get_mut(name)
    }

    fn pc(&self, cpu: CpuId) -> u64 {
        self.cpus[cpu.0].pc
    }

    fn register(&self, cpu: CpuId, name: &str) -> Option<u64> {
        match name {
            "pc" => Some(self.cpus[cpu.0].pc),
            "a" => Some(u64::from(self.cpus[cpu.0].a)),
            _ => self.cpus[cpu.0].registers.get(name).copied(),
        }
    }

    fn set_register(&mut self, cpu: CpuId, name: &str, value: u64) -> bool {
        match name {
            "pc" => self.cpus[cpu.0].pc = value,
            "a" => self.cpus[cpu.0].a = value as u8,
            _ => return false,
        }
        true
    }

    fn current_time(&self) -> Duration {
        self.time
    }

    fn scheduled_event_pending(&self) -> bool {
        self.event_pending
    }

    fn screen_position(&self) -> Option<ScreenPosition> {
        self.screen
    }
}

pub type OperatorAction = Box<dyn FnOnce(&mut DebugSession, &mut dyn Machine)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wait {
    pub cpu: CpuId,
    pub pc: u64,
    pub first_stop: bool,
}

/// A frontend replaying queued operator actions, one per debugger wait.
/// With nothing left to replay, it resumes execution.
#[derive(Default)]
pub struct ScriptedFrontend {
    pub actions: VecDeque<OperatorAction>,
    pub printed: Vec<String>,
    pub commands: Vec<String>,
    pub waits: Vec<Wait>,
    pub views: Vec<ViewKind>,
    pub muted: bool,
    pub ticks: u64,
    pub break_requested: bool,
}

impl ScriptedFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(&mut self, action: impl FnOnce(&mut DebugSession, &mut dyn Machine) + 'static) {
        self.actions.push_back(Box::new(action));
    }

    /// Program counters at which execution halted.
    pub fn stops(&self) -> Vec<u64> {
        self.waits
            .iter()
            .filter(|w| w.first_stop)
            .map(|w| w.pc)
            .collect()
    }
}

impl Frontend for ScriptedFrontend {
    fn wait_for_debugger(
        &mut self,
        session: &mut DebugSession,
        machine: &mut dyn Machine,
        cpu: CpuId,
        first_stop: bool,
    ) {
        self.waits.push(Wait {
            cpu,
            pc: machine.pc(cpu),
            first_stop,
        });
        match self.actions.pop_front() {
            Some(action) => action(session, machine),
            None => session.go(None),
        }
    }

    fn execute_command(
        &mut self,
        session: &mut DebugSession,
        _machine: &mut dyn Machine,
        command: &str,
    ) {
        self.commands.push(command.to_string());
        match command.split_once(' ') {
            _ if command == "go" => session.go(None),
            _ if command == "step" => session.set_single_step(1),
            Some(("print", text)) => self.printed.push(text.to_string()),
            _ => {}
        }
    }

    fn print(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }

    fn update_views(&mut self, kind: ViewKind) {
        self.views.push(kind);
    }

    fn mute_audio(&mut self, mute: bool) {
        self.muted = mute;
    }

    fn ticks(&self) -> u64 {
        self.ticks
    }

    fn ticks_per_second(&self) -> u64 {
        1000
    }

    fn break_requested(&mut self) -> bool {
        std::mem::take(&mut self.break_requested)
    }
}

/// Runs `count` instructions of `cpu`, calling the instruction hook the way
/// a CPU core does.
pub fn run(
    session: &mut DebugSession,
    machine: &mut TestMachine,
    frontend: &mut ScriptedFrontend,
    cpu: CpuId,
    count: usize,
) {
    for _ in 0..count {
        if session.needs_instruction_hook(cpu) {
            let pc = machine.cpus[cpu.0].pc;
            session.instruction_hook(machine, frontend, cpu, pc);
        }
        machine.execute_one(session, frontend, cpu);
    }
}

/// A session with one CPU called `maincpu` whose program is `program`,
/// loaded at [`PROGRAM_START`].
pub fn setup(
    start_running: bool,
    program: &[u8],
) -> (DebugSession, TestMachine, ScriptedFrontend, CpuId) {
    let options = DebugOptions {
        start_running,
        ..DebugOptions::default()
    };
    let mut session = DebugSession::new(&options).unwrap();
    let mut machine = TestMachine::new();
    let cpu = machine.add_cpu(&mut session, "maincpu", ram_space());
    machine.program(cpu).load(PROGRAM_START, program);
    machine.cpus[cpu.0].pc = PROGRAM_START;
    session.machine_started();
    (session, machine, ScriptedFrontend::new(), cpu)
}

type EvalFn = dyn Fn(&mut dyn ExpressionContext) -> Result<u64, ExpressionError>;

pub struct TestExpr {
    source: String,
    eval: Box<EvalFn>,
}

impl std::fmt::Debug for TestExpr {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_tuple("TestExpr").field(&self.source).finish()
    }
}

impl Expression for TestExpr {
    fn execute(&self, context: &mut dyn ExpressionContext) -> Result<u64, ExpressionError> {
        (self.eval)(context)
    }

    fn source(&self) -> &str {
        &self.source
    }
}

pub fn expr(
    source: &str,
    eval: impl Fn(&mut dyn ExpressionContext) -> Result<u64, ExpressionError> + 'static,
) -> Rc<dyn Expression> {
    Rc::new(TestExpr {
        source: source.to_string(),
        eval: Box::new(eval),
    })
}

#[macro_export]
macro_rules! assert_hex_eq {
    ($left: expr, $right: expr$(,)?) => {{
        let left: u64 = $left;
        let right: u64 = $right;
        assert_eq!(
            left,
            right,
            "Comparing {left_s} with {right_s} failed:\n0x{left:016x} {left_s}\n0x{right:016x} \
             {right_s}",
            left_s = stringify!($left),
            right_s = stringify!($right),
            left = left,
            right = right,
        );
    }};
}
