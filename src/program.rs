//! Contains the types related to programs that can be run on the system. The `Program` struct holds the bytes of a program image. The
//! `Instruction` enum is a decoded instruction word together with the functionality to run it on a given system state.

use std::fmt;
use std::fs;
use std::path::Path;

use log::debug;
use rand::Rng;

use crate::error::{Fault, LoadError};
use crate::system::{Reg, System, FONT_ADDRESS, FONT_GLYPH_SIZE, MAX_PROGRAM_SIZE, PROGRAM_START};
use crate::utils::{big_endian_4_2, big_endian_4_3, big_endian_8_2, nibbles};

/// Represents an instruction word as its four hexadecimal digits (unsigned 4-bit integers), most significant first.
///
/// This is the raw shape `Instruction::try_from` matches on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Opcode(pub u8, pub u8, pub u8, pub u8);

impl From<u16> for Opcode {

    /// Parses an Opcode from a single 16-bit unsigned integer.
    ///
    /// # Example
    /// ```
    /// use chip8_core::program::Opcode;
    ///
    /// let opcode: Opcode = 0xD01Fu16.into();
    /// assert_eq!(opcode.3, 0xF);
    /// ```
    fn from(value: u16) -> Self {
        let (b1, b2, b3, b4) = nibbles(value);
        Opcode(b1, b2, b3, b4)
    }
}

/// The register-to-register operations of the `8XYN` family.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AluOp {
    Assign,
    Or,
    And,
    Xor,
    Add,
    Sub,
    ShiftRight,
    SubReverse,
    ShiftLeft,
}

impl AluOp {

    /// Computes `vx <op> vy`, returning the new value of `vx` and, for the operations that have one, the new value of `VF`.
    ///
    /// Addition sets the flag on carry. Both subtractions clear it on borrow and set it otherwise. The shifts operate on `vx` alone and
    /// put the bit shifted out into the flag.
    pub fn apply(self, vx: u8, vy: u8) -> (u8, Option<u8>) {
        match self {
            AluOp::Assign => (vy, None),
            AluOp::Or => (vx | vy, None),
            AluOp::And => (vx & vy, None),
            AluOp::Xor => (vx ^ vy, None),
            AluOp::Add => {
                let (sum, carry) = vx.overflowing_add(vy);
                (sum, Some(carry as u8))
            }
            AluOp::Sub => {
                let (difference, borrow) = vx.overflowing_sub(vy);
                (difference, Some(!borrow as u8))
            }
            AluOp::ShiftRight => (vx >> 1, Some(vx & 0x01)),
            AluOp::SubReverse => {
                let (difference, borrow) = vy.overflowing_sub(vx);
                (difference, Some(!borrow as u8))
            }
            AluOp::ShiftLeft => (vx << 1, Some(vx >> 7)),
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Assign => "LD",
            AluOp::Or => "OR",
            AluOp::And => "AND",
            AluOp::Xor => "XOR",
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::ShiftRight => "SHR",
            AluOp::SubReverse => "SUBN",
            AluOp::ShiftLeft => "SHL",
        }
    }
}

/// A decoded CHIP-8 instruction.
///
/// Operands are already extracted from the instruction word: register indices as `Reg`, 8-bit immediates as `u8` and 12-bit addresses
/// as `u16`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `1NNN`
    Jump(u16),
    /// `2NNN`
    Call(u16),
    /// `3XNN`
    SkipEqImm(Reg, u8),
    /// `4XNN`
    SkipNeImm(Reg, u8),
    /// `5XY0`
    SkipEqReg(Reg, Reg),
    /// `6XNN`
    LoadImm(Reg, u8),
    /// `7XNN`: no carry.
    AddImm(Reg, u8),
    /// `8XY0` to `8XYE`
    Alu(AluOp, Reg, Reg),
    /// `9XY0`
    SkipNeReg(Reg, Reg),
    /// `ANNN`
    LoadIndex(u16),
    /// `BNNN`
    JumpOffset(u16),
    /// `CXNN`
    Random(Reg, u8),
    /// `DXYN`
    Draw(Reg, Reg, u8),
    /// `EX9E`
    SkipKeyPressed(Reg),
    /// `EXA1`
    SkipKeyNotPressed(Reg),
    /// `FX07`
    LoadDelay(Reg),
    /// `FX0A`
    WaitKey(Reg),
    /// `FX15`
    SetDelay(Reg),
    /// `FX18`
    SetSound(Reg),
    /// `FX1E`
    AddIndex(Reg),
    /// `FX29`
    LoadGlyph(Reg),
    /// `FX33`
    StoreBcd(Reg),
    /// `FX55`
    StoreRegisters(Reg),
    /// `FX65`
    LoadRegisters(Reg),
}

impl TryFrom<u16> for Instruction {
    type Error = Fault;

    /// Decodes an instruction word.
    ///
    /// Words that don't belong to the instruction set yield `Fault::UnknownOpcode` carrying the word.
    ///
    /// # Example
    /// ```
    /// use chip8_core::program::Instruction;
    /// use chip8_core::error::Fault;
    ///
    /// assert_eq!(Instruction::try_from(0x1234u16), Ok(Instruction::Jump(0x234)));
    /// assert_eq!(Instruction::try_from(0x5121u16), Err(Fault::UnknownOpcode(0x5121)));
    /// ```
    fn try_from(word: u16) -> Result<Self, Self::Error> {
        let reg = Reg::from_nibble;
        let instruction = match Opcode::from(word) {
            Opcode(0, 0, 0xE, 0) => Instruction::ClearScreen,
            Opcode(0, 0, 0xE, 0xE) => Instruction::Return,
            Opcode(1, n1, n2, n3) => Instruction::Jump(big_endian_4_3(n1, n2, n3)),
            Opcode(2, n1, n2, n3) => Instruction::Call(big_endian_4_3(n1, n2, n3)),
            Opcode(3, x, n1, n2) => Instruction::SkipEqImm(reg(x), big_endian_4_2(n1, n2)),
            Opcode(4, x, n1, n2) => Instruction::SkipNeImm(reg(x), big_endian_4_2(n1, n2)),
            Opcode(5, x, y, 0) => Instruction::SkipEqReg(reg(x), reg(y)),
            Opcode(6, x, n1, n2) => Instruction::LoadImm(reg(x), big_endian_4_2(n1, n2)),
            Opcode(7, x, n1, n2) => Instruction::AddImm(reg(x), big_endian_4_2(n1, n2)),
            Opcode(8, x, y, n) => {
                let op = match n {
                    0x0 => AluOp::Assign,
                    0x1 => AluOp::Or,
                    0x2 => AluOp::And,
                    0x3 => AluOp::Xor,
                    0x4 => AluOp::Add,
                    0x5 => AluOp::Sub,
                    0x6 => AluOp::ShiftRight,
                    0x7 => AluOp::SubReverse,
                    0xE => AluOp::ShiftLeft,
                    _ => return Err(Fault::UnknownOpcode(word)),
                };
                Instruction::Alu(op, reg(x), reg(y))
            }
            Opcode(9, x, y, 0) => Instruction::SkipNeReg(reg(x), reg(y)),
            Opcode(0xA, n1, n2, n3) => Instruction::LoadIndex(big_endian_4_3(n1, n2, n3)),
            Opcode(0xB, n1, n2, n3) => Instruction::JumpOffset(big_endian_4_3(n1, n2, n3)),
            Opcode(0xC, x, n1, n2) => Instruction::Random(reg(x), big_endian_4_2(n1, n2)),
            Opcode(0xD, x, y, n) => Instruction::Draw(reg(x), reg(y), n),
            Opcode(0xE, x, 0x9, 0xE) => Instruction::SkipKeyPressed(reg(x)),
            Opcode(0xE, x, 0xA, 0x1) => Instruction::SkipKeyNotPressed(reg(x)),
            Opcode(0xF, x, 0x0, 0x7) => Instruction::LoadDelay(reg(x)),
            Opcode(0xF, x, 0x0, 0xA) => Instruction::WaitKey(reg(x)),
            Opcode(0xF, x, 0x1, 0x5) => Instruction::SetDelay(reg(x)),
            Opcode(0xF, x, 0x1, 0x8) => Instruction::SetSound(reg(x)),
            Opcode(0xF, x, 0x1, 0xE) => Instruction::AddIndex(reg(x)),
            Opcode(0xF, x, 0x2, 0x9) => Instruction::LoadGlyph(reg(x)),
            Opcode(0xF, x, 0x3, 0x3) => Instruction::StoreBcd(reg(x)),
            Opcode(0xF, x, 0x5, 0x5) => Instruction::StoreRegisters(reg(x)),
            Opcode(0xF, x, 0x6, 0x5) => Instruction::LoadRegisters(reg(x)),
            _ => return Err(Fault::UnknownOpcode(word)),
        };
        Ok(instruction)
    }
}

impl Instruction {

    /// Executes the instruction on the mutable state of a `System`.
    ///
    /// Every instruction leaves the PC pointing at the next instruction to run: sequential instructions advance it by two, skips by
    /// four when their condition holds, and jumps, calls and returns set it outright. `WaitKey` leaves it in place until a key is down.
    ///
    /// All checks that can fail happen before the first write, so an `Err` means the system was not modified.
    pub fn execute(self, sys: &mut System) -> Result<(), Fault> {
        match self {
            Instruction::ClearScreen => {
                sys.display.clear();
                sys.increment_pc();
            }
            Instruction::Return => {
                sys.pc = sys.stack.pop()?;
                sys.increment_pc();
            }
            Instruction::Jump(address) => {
                sys.pc = address;
            }
            Instruction::Call(address) => {
                sys.stack.push(sys.pc)?;
                sys.pc = address;
            }
            Instruction::SkipEqImm(x, nn) => {
                let condition = sys.registers.get(x) == nn;
                sys.skip_if(condition);
            }
            Instruction::SkipNeImm(x, nn) => {
                let condition = sys.registers.get(x) != nn;
                sys.skip_if(condition);
            }
            Instruction::SkipEqReg(x, y) => {
                let condition = sys.registers.get(x) == sys.registers.get(y);
                sys.skip_if(condition);
            }
            Instruction::LoadImm(x, nn) => {
                sys.registers.set(x, nn);
                sys.increment_pc();
            }
            Instruction::AddImm(x, nn) => {
                sys.registers.set(x, sys.registers.get(x).wrapping_add(nn));
                sys.increment_pc();
            }
            Instruction::Alu(op, x, y) => {
                let (result, flag) = op.apply(sys.registers.get(x), sys.registers.get(y));
                sys.registers.set(x, result);
                // written last so the flag wins when x is VF
                if let Some(flag) = flag {
                    sys.registers.set_vf(flag);
                }
                sys.increment_pc();
            }
            Instruction::SkipNeReg(x, y) => {
                let condition = sys.registers.get(x) != sys.registers.get(y);
                sys.skip_if(condition);
            }
            Instruction::LoadIndex(address) => {
                sys.registers.set_i(address);
                sys.increment_pc();
            }
            Instruction::JumpOffset(address) => {
                sys.pc = address + sys.registers.get(Reg::V0) as u16;
            }
            Instruction::Random(x, nn) => {
                let r: u8 = sys.rng.gen();
                sys.registers.set(x, r & nn);
                sys.increment_pc();
            }
            Instruction::Draw(x, y, n) => {
                let sprite = sys.memory.slice(sys.registers.i(), n as usize)?;
                let collision = sys.display.draw_sprite(sys.registers.get(x), sys.registers.get(y), sprite);
                sys.registers.set_vf(collision as u8);
                sys.increment_pc();
            }
            Instruction::SkipKeyPressed(x) => {
                let condition = sys.keyboard.is_pressed(sys.registers.get(x));
                sys.skip_if(condition);
            }
            Instruction::SkipKeyNotPressed(x) => {
                let condition = !sys.keyboard.is_pressed(sys.registers.get(x));
                sys.skip_if(condition);
            }
            Instruction::LoadDelay(x) => {
                sys.registers.set(x, sys.delay_timer.get());
                sys.increment_pc();
            }
            Instruction::WaitKey(x) => {
                if let Some(key) = sys.keyboard.take_first_pressed() {
                    sys.registers.set(x, key);
                    sys.increment_pc();
                }
            }
            Instruction::SetDelay(x) => {
                sys.delay_timer.set(sys.registers.get(x));
                sys.increment_pc();
            }
            Instruction::SetSound(x) => {
                sys.sound_timer.set(sys.registers.get(x));
                sys.increment_pc();
            }
            Instruction::AddIndex(x) => {
                let i = sys.registers.i().wrapping_add(sys.registers.get(x) as u16);
                sys.registers.set_i(i);
                sys.increment_pc();
            }
            Instruction::LoadGlyph(x) => {
                let glyph = (sys.registers.get(x) & 0xF) as u16;
                sys.registers.set_i(FONT_ADDRESS + glyph * FONT_GLYPH_SIZE);
                sys.increment_pc();
            }
            Instruction::StoreBcd(x) => {
                let value = sys.registers.get(x);
                let digits = sys.memory.slice_mut(sys.registers.i(), 3)?;
                digits.copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
                sys.increment_pc();
            }
            Instruction::StoreRegisters(x) => {
                let len = x.index() as usize + 1;
                let dst = sys.memory.slice_mut(sys.registers.i(), len)?;
                dst.copy_from_slice(sys.registers.range(x));
                sys.increment_pc();
            }
            Instruction::LoadRegisters(x) => {
                let len = x.index() as usize + 1;
                let src = sys.memory.slice(sys.registers.i(), len)?;
                sys.registers.range_mut(x).copy_from_slice(src);
                sys.increment_pc();
            }
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {

    /// Formats the `Instruction` as an assembler mnemonic, e.g. `DRW V0, V1, 5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::ClearScreen => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump(address) => write!(f, "JP {:#05X}", address),
            Instruction::Call(address) => write!(f, "CALL {:#05X}", address),
            Instruction::SkipEqImm(x, nn) => write!(f, "SE {}, {:#04X}", x, nn),
            Instruction::SkipNeImm(x, nn) => write!(f, "SNE {}, {:#04X}", x, nn),
            Instruction::SkipEqReg(x, y) => write!(f, "SE {}, {}", x, y),
            Instruction::LoadImm(x, nn) => write!(f, "LD {}, {:#04X}", x, nn),
            Instruction::AddImm(x, nn) => write!(f, "ADD {}, {:#04X}", x, nn),
            Instruction::Alu(op @ (AluOp::ShiftRight | AluOp::ShiftLeft), x, _) => write!(f, "{} {}", op.mnemonic(), x),
            Instruction::Alu(op, x, y) => write!(f, "{} {}, {}", op.mnemonic(), x, y),
            Instruction::SkipNeReg(x, y) => write!(f, "SNE {}, {}", x, y),
            Instruction::LoadIndex(address) => write!(f, "LD I, {:#05X}", address),
            Instruction::JumpOffset(address) => write!(f, "JP V0, {:#05X}", address),
            Instruction::Random(x, nn) => write!(f, "RND {}, {:#04X}", x, nn),
            Instruction::Draw(x, y, n) => write!(f, "DRW {}, {}, {}", x, y, n),
            Instruction::SkipKeyPressed(x) => write!(f, "SKP {}", x),
            Instruction::SkipKeyNotPressed(x) => write!(f, "SKNP {}", x),
            Instruction::LoadDelay(x) => write!(f, "LD {}, DT", x),
            Instruction::WaitKey(x) => write!(f, "LD {}, K", x),
            Instruction::SetDelay(x) => write!(f, "LD DT, {}", x),
            Instruction::SetSound(x) => write!(f, "LD ST, {}", x),
            Instruction::AddIndex(x) => write!(f, "ADD I, {}", x),
            Instruction::LoadGlyph(x) => write!(f, "LD F, {}", x),
            Instruction::StoreBcd(x) => write!(f, "LD B, {}", x),
            Instruction::StoreRegisters(x) => write!(f, "LD [I], {}", x),
            Instruction::LoadRegisters(x) => write!(f, "LD {}, [I]", x),
        }
    }
}

/// Represents a program image as a list of bytes.
///
/// A `Program` is guaranteed to fit into memory above `PROGRAM_START`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {

    /// Attempts to load a program from a given file path.
    ///
    /// Fails with `LoadError::Io` if the file can't be read and with `LoadError::ProgramTooLarge` if it doesn't fit into memory.
    pub fn load<P>(path: P) -> Result<Program, LoadError>
        where P: AsRef<Path>, {
            let bytes = fs::read(path.as_ref())?;
            debug!("read {} bytes from {}", bytes.len(), path.as_ref().display());
            Program::from_bytes(bytes)
    }

    /// Wraps an in-memory program image.
    ///
    /// # Example
    /// ```
    /// use chip8_core::program::Program;
    ///
    /// let program = Program::from_bytes(vec![0x00, 0xE0]).unwrap();
    /// assert_eq!(program.to_string(), "0200: 00E0  CLS\n");
    /// ```
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Program, LoadError> {
        if bytes.len() > MAX_PROGRAM_SIZE {
            return Err(LoadError::ProgramTooLarge { size: bytes.len(), max: MAX_PROGRAM_SIZE });
        }
        Ok(Program { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for Program {

    /// Formats the `Program` as a listing of `<address>: <word>  <mnemonic>` lines, starting at `PROGRAM_START`. Words that don't
    /// decode are shown as `????`, and a trailing odd byte is shown on its own.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, chunk) in self.bytes.chunks(2).enumerate() {
            let address = PROGRAM_START as usize + idx * 2;
            match *chunk {
                [op1, op2] => {
                    let word = big_endian_8_2(op1, op2);
                    match Instruction::try_from(word) {
                        Ok(instruction) => writeln!(f, "{:0>4X}: {:0>4X}  {}", address, word, instruction)?,
                        Err(_) => writeln!(f, "{:0>4X}: {:0>4X}  ????", address, word)?,
                    }
                }
                [byte] => writeln!(f, "{:0>4X}: {:0>2X}", address, byte)?,
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{SCREEN_WIDTH, STACK_SIZE};

    fn v(idx: u8) -> Reg {
        Reg::from_nibble(idx)
    }

    /// Loads `code` and executes `steps` instructions, panicking on the first fault.
    fn run(code: &[u8], steps: usize) -> System {
        let mut sys = System::with_seed(0x5EED);
        sys.load_program(code).unwrap();
        for _ in 0..steps {
            sys.step().unwrap();
        }
        sys
    }

    #[test]
    fn decodes_operand_fields() {
        assert_eq!(Instruction::try_from(0xD12Fu16), Ok(Instruction::Draw(v(1), v(2), 0xF)));
        assert_eq!(Instruction::try_from(0x6A42u16), Ok(Instruction::LoadImm(v(0xA), 0x42)));
        assert_eq!(Instruction::try_from(0xA123u16), Ok(Instruction::LoadIndex(0x123)));
        assert_eq!(Instruction::try_from(0x8AB4u16), Ok(Instruction::Alu(AluOp::Add, v(0xA), v(0xB))));
        assert_eq!(Instruction::try_from(0xF565u16), Ok(Instruction::LoadRegisters(v(5))));
    }

    #[test]
    fn rejects_unassigned_words() {
        for word in [0x0000u16, 0x0123, 0x01E0, 0x01EE, 0x00E1, 0x5121, 0x8008, 0x800F, 0x9001, 0xE000, 0xE09F, 0xF000, 0xF0FF] {
            assert_eq!(Instruction::try_from(word), Err(Fault::UnknownOpcode(word)), "{:04X}", word);
        }
    }

    #[test]
    fn add_sets_carry_iff_sum_exceeds_255() {
        for (a, b) in [(0u8, 0u8), (200, 55), (200, 56), (255, 255), (1, 255), (128, 127)] {
            let (result, flag) = AluOp::Add.apply(a, b);
            assert_eq!(result as u16, (a as u16 + b as u16) % 256);
            assert_eq!(flag, Some((a as u16 + b as u16 > 255) as u8));
        }
    }

    #[test]
    fn sub_clears_flag_on_borrow() {
        for (a, b) in [(5u8, 3u8), (3, 5), (7, 7), (0, 255), (255, 0)] {
            let (result, flag) = AluOp::Sub.apply(a, b);
            assert_eq!(result, a.wrapping_sub(b));
            assert_eq!(flag, Some(if b > a { 0 } else { 1 }));

            let (result, flag) = AluOp::SubReverse.apply(a, b);
            assert_eq!(result, b.wrapping_sub(a));
            assert_eq!(flag, Some(if a > b { 0 } else { 1 }));
        }
    }

    #[test]
    fn shifts_put_the_lost_bit_into_the_flag() {
        assert_eq!(AluOp::ShiftRight.apply(0b1000_0011, 0xFF), (0b0100_0001, Some(1)));
        assert_eq!(AluOp::ShiftRight.apply(0b1000_0010, 0xFF), (0b0100_0001, Some(0)));
        assert_eq!(AluOp::ShiftLeft.apply(0b1000_0001, 0x00), (0b0000_0010, Some(1)));
        assert_eq!(AluOp::ShiftLeft.apply(0b0100_0001, 0x00), (0b1000_0010, Some(0)));
    }

    #[test]
    fn bitwise_ops_leave_flag_alone() {
        let sys = run(&[0x6F, 0x07, 0x60, 0b1100, 0x61, 0b1010, 0x80, 0x11, 0x82, 0x00, 0x82, 0x12, 0x83, 0x00, 0x83, 0x13], 8);
        assert_eq!(sys.registers.get(v(0)), 0b1110);
        assert_eq!(sys.registers.get(v(2)), 0b1010);
        assert_eq!(sys.registers.get(v(3)), 0b0100);
        assert_eq!(sys.registers.vf(), 0x07);
    }

    #[test]
    fn flag_wins_when_vf_is_the_destination() {
        // VF = 0xFF; VF += VF -> result 0xFE, then carry 1 overwrites it
        let sys = run(&[0x6F, 0xFF, 0x8F, 0xF4], 2);
        assert_eq!(sys.registers.vf(), 1);
    }

    #[test]
    fn add_immediate_wraps_without_touching_the_flag() {
        let sys = run(&[0x60, 0xFF, 0x70, 0x02], 2);
        assert_eq!(sys.registers.get(v(0)), 0x01);
        assert_eq!(sys.registers.vf(), 0);
    }

    #[test]
    fn conditional_skips_advance_by_four() {
        let mut sys = run(&[0x60, 0x10, 0x30, 0x10], 2);
        assert_eq!(sys.pc, 0x206);
        sys.pc = 0x202;
        Instruction::SkipNeImm(v(0), 0x10).execute(&mut sys).unwrap();
        assert_eq!(sys.pc, 0x204);
        sys.registers.set(v(1), 0x10);
        Instruction::SkipEqReg(v(0), v(1)).execute(&mut sys).unwrap();
        assert_eq!(sys.pc, 0x208);
        Instruction::SkipNeReg(v(0), v(1)).execute(&mut sys).unwrap();
        assert_eq!(sys.pc, 0x20A);
    }

    #[test]
    fn jumps_do_not_advance() {
        let sys = run(&[0x13, 0x00], 1);
        assert_eq!(sys.pc, 0x300);
        let sys = run(&[0x60, 0x04, 0xB3, 0x00], 2);
        assert_eq!(sys.pc, 0x304);
    }

    #[test]
    fn call_and_return_round_trip() {
        let mut code = vec![0u8; 0x102];
        code[0..2].copy_from_slice(&[0x23, 0x00]);
        code[0x100..0x102].copy_from_slice(&[0x00, 0xEE]);
        let mut sys = run(&code, 1);
        assert_eq!(sys.pc, 0x300);
        assert_eq!(sys.stack.pointer(), 1);
        assert_eq!(sys.stack.peek(), Some(0x200));
        sys.step().unwrap();
        assert_eq!(sys.pc, 0x202);
        assert!(sys.stack.is_empty());
    }

    #[test]
    fn call_overflow_leaves_state_untouched() {
        // 0x200: CALL 0x200, recursing until the stack is full
        let mut sys = run(&[0x22, 0x00], STACK_SIZE);
        assert_eq!(sys.step(), Err(Fault::StackOverflow));
        assert_eq!(sys.pc, 0x200);
        assert_eq!(sys.stack.pointer(), STACK_SIZE);
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut sys = run(&[], 0);
        sys.load_program(&[0x00, 0xEE]).unwrap();
        assert_eq!(sys.step(), Err(Fault::StackUnderflow));
        assert_eq!(sys.pc, 0x200);
    }

    #[test]
    fn unknown_opcode_is_reported_and_pc_stays() {
        let mut sys = run(&[0x60, 0x01, 0xFF, 0xFF], 1);
        assert_eq!(sys.step(), Err(Fault::UnknownOpcode(0xFFFF)));
        assert_eq!(sys.pc, 0x202);
        assert_eq!(sys.registers.get(v(0)), 1);
    }

    #[test]
    fn running_into_zeroed_memory_faults() {
        // JP 0x300, which was never written
        let mut sys = run(&[0x13, 0x00], 1);
        assert_eq!(sys.step(), Err(Fault::UnknownOpcode(0x0000)));
        assert_eq!(sys.pc, 0x300);
        assert!(!sys.display.is_dirty());
    }

    #[test]
    fn bcd_past_memory_end_writes_nothing() {
        let mut sys = run(&[0x60, 234, 0xAF, 0xFE, 0xF0, 0x33], 2);
        assert_eq!(sys.step(), Err(Fault::MemoryOutOfBounds(0x1000)));
        assert_eq!(sys.pc, 0x204);
        assert_eq!(sys.memory.slice(0xFFE, 2).unwrap(), &[0, 0]);
        assert_eq!(sys.registers.i(), 0xFFE);
    }

    #[test]
    fn register_load_past_memory_end_leaves_registers() {
        let mut sys = run(&[0x60, 0x11, 0x61, 0x22, 0x62, 0x33, 0xAF, 0xFE, 0xF2, 0x65], 4);
        sys.memory.store(0xFFE, 0xAA).unwrap();
        sys.memory.store(0xFFF, 0xBB).unwrap();
        assert_eq!(sys.step(), Err(Fault::MemoryOutOfBounds(0x1000)));
        assert_eq!(sys.pc, 0x208);
        assert_eq!(sys.registers.range(v(2)), &[0x11, 0x22, 0x33]);
    }

    #[test]
    fn random_is_masked_and_seeded() {
        let code = [0xC0, 0x0F, 0xC1, 0x00, 0xC2, 0xFF];
        let a = run(&code, 3);
        let b = run(&code, 3);
        assert_eq!(a.registers.get(v(0)) & 0xF0, 0);
        assert_eq!(a.registers.get(v(1)), 0);
        assert_eq!(a.registers.get(v(0)), b.registers.get(v(0)));
        assert_eq!(a.registers.get(v(2)), b.registers.get(v(2)));
    }

    #[test]
    fn draw_reports_collision_and_marks_dirty() {
        // I = 0x20A; V0 = 0; DRW V0, V0, 1; DRW V0, V0, 1; sprite 0xFF at 0x20A
        let code = [0xA2, 0x0A, 0x60, 0x00, 0xD0, 0x01, 0xD0, 0x01, 0x00, 0x00, 0xFF];
        let mut sys = run(&code, 3);
        assert!(sys.display.take_dirty());
        assert_eq!(&sys.display.pixels()[..8], &[1; 8]);
        assert_eq!(sys.display.pixels()[8], 0);
        assert_eq!(sys.registers.vf(), 0);
        sys.step().unwrap();
        assert!(sys.display.is_dirty());
        assert!(sys.display.pixels().iter().all(|&p| p == 0));
        assert_eq!(sys.registers.vf(), 1);
    }

    #[test]
    fn draw_skips_off_screen_pixels() {
        // V0 = 62, V1 = 0, I = font glyph 0 (0xF0 on the top row)
        let mut sys = run(&[0x60, 62, 0x61, 0x00, 0xA0, 0x00, 0xD0, 0x15], 4);
        assert_eq!(sys.display.pixel(62, 0), Some(1));
        assert_eq!(sys.display.pixel(63, 0), Some(1));
        assert_eq!(sys.display.pixel(0, 0), Some(0));
        assert_eq!(sys.display.pixel(1, 1), Some(0));

        // entirely off-screen still marks dirty and clears VF
        sys.display.clear_dirty();
        sys.registers.set_vf(1);
        sys.registers.set(v(0), SCREEN_WIDTH as u8);
        Instruction::Draw(v(0), v(1), 5).execute(&mut sys).unwrap();
        assert!(sys.display.is_dirty());
        assert_eq!(sys.registers.vf(), 0);
    }

    #[test]
    fn draw_from_beyond_memory_faults_before_drawing() {
        let mut sys = run(&[0xAF, 0xFE, 0xD0, 0x03], 1);
        assert_eq!(sys.step(), Err(Fault::MemoryOutOfBounds(0x1000)));
        assert!(!sys.display.is_dirty());
        assert_eq!(sys.pc, 0x202);
    }

    #[test]
    fn key_skip_does_not_consume_the_latch() {
        let mut sys = run(&[0x60, 0x07, 0xE0, 0x9E], 1);
        sys.keyboard.press(7).unwrap();
        sys.step().unwrap();
        assert_eq!(sys.pc, 0x206);
        assert!(sys.keyboard.is_pressed(7));

        sys.pc = 0x202;
        Instruction::SkipKeyNotPressed(v(0)).execute(&mut sys).unwrap();
        assert_eq!(sys.pc, 0x204);
        sys.keyboard.release(7).unwrap();
        Instruction::SkipKeyNotPressed(v(0)).execute(&mut sys).unwrap();
        assert_eq!(sys.pc, 0x208);
    }

    #[test]
    fn key_index_beyond_keyboard_reads_as_released() {
        let mut sys = run(&[0x60, 0x42, 0xE0, 0xA1], 1);
        sys.keyboard.press(0x2).unwrap();
        sys.step().unwrap();
        assert_eq!(sys.pc, 0x206);
    }

    #[test]
    fn wait_key_repeats_until_a_key_is_down() {
        let mut sys = run(&[0xF3, 0x0A], 0);
        sys.step().unwrap();
        sys.step().unwrap();
        assert_eq!(sys.pc, 0x200);
        sys.keyboard.press(0xB).unwrap();
        sys.keyboard.press(0x9).unwrap();
        sys.step().unwrap();
        assert_eq!(sys.pc, 0x202);
        assert_eq!(sys.registers.get(v(3)), 0x9);
        assert!(!sys.keyboard.is_pressed(0x9));
        assert!(sys.keyboard.is_pressed(0xB));
    }

    #[test]
    fn timers_move_through_registers() {
        let mut sys = run(&[0x60, 0x20, 0xF0, 0x15, 0xF0, 0x18], 3);
        assert_eq!(sys.delay_timer.get(), 0x20);
        assert_eq!(sys.sound_timer.get(), 0x20);
        sys.tick_timers();
        Instruction::LoadDelay(v(5)).execute(&mut sys).unwrap();
        assert_eq!(sys.registers.get(v(5)), 0x1F);
    }

    #[test]
    fn index_arithmetic() {
        let mut sys = run(&[0xA1, 0x00, 0x60, 0x0F, 0xF0, 0x1E], 3);
        assert_eq!(sys.registers.i(), 0x10F);
        assert_eq!(sys.registers.vf(), 0);
        sys.registers.set(v(0), 0x1B);
        Instruction::LoadGlyph(v(0)).execute(&mut sys).unwrap();
        assert_eq!(sys.registers.i(), 0xB * 5);
    }

    #[test]
    fn bcd_splits_digits() {
        let sys = run(&[0x60, 234, 0xA3, 0x00, 0xF0, 0x33], 3);
        assert_eq!(sys.memory.slice(0x300, 3).unwrap(), &[2, 3, 4]);
    }

    #[test]
    fn register_dump_and_load_are_inclusive() {
        let mut sys = run(&[0x60, 0x11, 0x61, 0x22, 0x62, 0x33, 0xA3, 0x00, 0xF1, 0x55, 0xA3, 0x01, 0xF1, 0x65], 5);
        assert_eq!(sys.memory.slice(0x300, 3).unwrap(), &[0x11, 0x22, 0x00]);
        assert_eq!(sys.registers.i(), 0x300);
        sys.step().unwrap();
        sys.step().unwrap();
        assert_eq!(sys.registers.get(v(0)), 0x22);
        assert_eq!(sys.registers.get(v(1)), 0x00);
        assert_eq!(sys.registers.get(v(2)), 0x33);
    }

    #[test]
    fn register_dump_past_memory_end_writes_nothing() {
        let mut sys = run(&[0xAF, 0xFE, 0xF2, 0x55], 1);
        assert_eq!(sys.step(), Err(Fault::MemoryOutOfBounds(0x1000)));
        assert_eq!(sys.memory.slice(0xFFE, 2).unwrap(), &[0, 0]);
    }

    #[test]
    fn disassembles_programs() {
        let program = Program::from_bytes(vec![0x12, 0x00, 0x8A, 0xB6, 0xD0, 0x15, 0x51, 0x21, 0xFF]).unwrap();
        let listing = program.to_string();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines, ["0200: 1200  JP 0x200", "0202: 8AB6  SHR VA", "0204: D015  DRW V0, V1, 5", "0206: 5121  ????", "0208: FF"]);
    }

    #[test]
    fn program_size_is_capped() {
        assert!(Program::from_bytes(vec![0; MAX_PROGRAM_SIZE]).is_ok());
        assert!(matches!(
            Program::from_bytes(vec![0; MAX_PROGRAM_SIZE + 1]),
            Err(LoadError::ProgramTooLarge { .. })
        ));
    }
}
