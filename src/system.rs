//! A collection of structs used to represent the state of a CHIP-8 system.
//!
//! Every component owns a fixed-size array and checks its own bounds. Nothing in here knows about instructions except
//! `System::step()`, which fetches a word and hands it to the execution engine in `program`.

use std::fmt;
use std::mem;
use std::ops::Range;

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Fault, InputError, LoadError};
use crate::program::{Instruction, Program};
use crate::utils::big_endian_8_2;

/// Size of the addressable main memory in bytes.
pub const MEMORY_SIZE: usize = 4096;
/// Address at which programs are loaded and execution starts.
pub const PROGRAM_START: u16 = 0x200;
/// Largest program image that fits between `PROGRAM_START` and the end of memory.
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
/// Address of the first font glyph.
pub const FONT_ADDRESS: u16 = 0x000;
/// Number of bytes (rows) per font glyph.
pub const FONT_GLYPH_SIZE: u16 = 5;
pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const REGISTER_COUNT: usize = 16;
pub const STACK_SIZE: usize = 16;
pub const KEY_COUNT: usize = 16;

/// Sprites for the 16 hexadecimal digits, 4x5 pixels each, stored one row per byte.
const FONT_SPRITES: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Represents the main memory of a CHIP-8 system. It contains 4096 bytes that can be accessed and modified using the `get(...)` and
/// `store(...)` methods, or in ranges through `slice(...)` and `slice_mut(...)`.
///
/// Every access is checked against the size of the memory. Reaching past the end yields `Fault::MemoryOutOfBounds` carrying the first
/// address that doesn't exist.
pub struct Memory {
    memory: [u8; MEMORY_SIZE],
}

impl Memory {

    /// Creates a new `Memory` object.
    ///
    /// Font data for the sprites of all 16 hexadecimal digits is immediately loaded into the address space 0x00-0x4F. Everything else is
    /// zeroed.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::Memory;
    ///
    /// let mem = Memory::new();
    /// assert_eq!(mem.get(0x000), Ok(0xF0));
    /// assert_eq!(mem.get(0x200), Ok(0x00));
    /// ```
    pub fn new() -> Memory {
        let mut mem = Memory { memory: [0u8; MEMORY_SIZE] };
        mem.load_font();
        mem
    }

    fn load_font(&mut self) {
        let start = FONT_ADDRESS as usize;
        self.memory[start..start + FONT_SPRITES.len()].copy_from_slice(&FONT_SPRITES);
    }

    /// Zeroes the whole memory and reloads the font.
    pub fn reset(&mut self) {
        self.memory = [0u8; MEMORY_SIZE];
        self.load_font();
    }

    /// Fetches the value of the byte at a given 12-bit address.
    ///
    /// The address is represented as a `u16` in Rust, but the address space only has a size of 12 bits. Accessing a higher address
    /// returns `Fault::MemoryOutOfBounds`.
    pub fn get(&self, address: u16) -> Result<u8, Fault> {
        self.memory
            .get(address as usize)
            .copied()
            .ok_or(Fault::MemoryOutOfBounds(address))
    }

    /// Stores a given 8-bit value to a 12-bit address.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::Memory;
    /// use chip8_core::error::Fault;
    ///
    /// let mut mem = Memory::new();
    /// mem.store(0x300, 42).unwrap();
    /// assert_eq!(mem.get(0x300), Ok(42));
    /// assert_eq!(mem.store(0x1000, 42), Err(Fault::MemoryOutOfBounds(0x1000)));
    /// ```
    pub fn store(&mut self, address: u16, value: u8) -> Result<(), Fault> {
        let byte = self
            .memory
            .get_mut(address as usize)
            .ok_or(Fault::MemoryOutOfBounds(address))?;
        *byte = value;
        Ok(())
    }

    /// Borrows `len` bytes starting at `address`.
    pub fn slice(&self, address: u16, len: usize) -> Result<&[u8], Fault> {
        let range = Self::checked_range(address, len)?;
        Ok(&self.memory[range])
    }

    /// Mutably borrows `len` bytes starting at `address`.
    pub fn slice_mut(&mut self, address: u16, len: usize) -> Result<&mut [u8], Fault> {
        let range = Self::checked_range(address, len)?;
        Ok(&mut self.memory[range])
    }

    fn checked_range(address: u16, len: usize) -> Result<Range<usize>, Fault> {
        if len == 0 {
            return Ok(0..0);
        }
        let start = address as usize;
        let end = start + len;
        if end > MEMORY_SIZE {
            let first_missing = start.max(MEMORY_SIZE) as u16;
            return Err(Fault::MemoryOutOfBounds(first_missing));
        }
        Ok(start..end)
    }

    /// Copies a program image into memory at `PROGRAM_START`.
    ///
    /// Images larger than `MAX_PROGRAM_SIZE` are rejected before anything is written.
    pub fn load_program(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        if bytes.len() > MAX_PROGRAM_SIZE {
            return Err(LoadError::ProgramTooLarge { size: bytes.len(), max: MAX_PROGRAM_SIZE });
        }
        let start = PROGRAM_START as usize;
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl fmt::Display for Memory {

    /// Formats the `Memory` struct as a table of width 32 and height 128, where each cell corresponds to the current value of the byte it
    /// represents in storage.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ROW: usize = 32;
        write!(f, "     ")?;
        for i in 0..ROW {
            write!(f, "{:0>2X} ", i)?;
        }
        writeln!(f)?;
        writeln!(f, "     {}", "-".repeat(ROW * 3))?;
        for (i, row) in self.memory.chunks(ROW).enumerate() {
            write!(f, "{:0>3X}: ", i * ROW)?;
            for byte in row {
                write!(f, "{:0>2X} ", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Index of one of the 16 `V` registers.
///
/// A `Reg` can only ever hold a value in 0x0-0xF, so indexing the register file with it never needs a bounds check at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(u8);

impl Reg {
    pub const V0: Reg = Reg(0x0);
    /// The carry/borrow/collision flag register.
    pub const VF: Reg = Reg(0xF);

    /// Returns `None` if `index` doesn't name one of the 16 registers.
    pub fn new(index: u8) -> Option<Reg> {
        ((index as usize) < REGISTER_COUNT).then_some(Reg(index))
    }

    /// Builds a register index from the low nibble of `nibble`.
    pub fn from_nibble(nibble: u8) -> Reg {
        Reg(nibble & 0xF)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{:X}", self.0)
    }
}

/// Represents the register array of the CHIP-8 processor.
///
/// A CHIP-8 processor consists of 16 `V` registers and one `I` register.
/// The `V` registers each hold a single unsigned byte and are named `V0, V1, ..., VF` respectively. `VF` is generally used as a flag
/// register to be set and reset by specific instructions under certain conditions, but nothing prevents a program from using it like
/// any other register.
/// The `I` register holds a 16-bit value of which 12 bits address the main memory. It is used by certain instructions to load
/// information such as sprite data from the main memory.
pub struct Registers {
    v: [u8; REGISTER_COUNT],
    i: u16,
}

impl Registers {

    /// Creates a new `Registers` object with every register set to `0`.
    pub fn new() -> Registers {
        Registers { v: [0u8; REGISTER_COUNT], i: 0 }
    }

    pub fn reset(&mut self) {
        *self = Registers::new();
    }

    /// Fetches the value of the `V` register addressed by `reg`.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::{Registers, Reg};
    ///
    /// let mut reg = Registers::new();
    /// reg.set(Reg::from_nibble(1), 42);
    /// assert_eq!(reg.get(Reg::from_nibble(1)), 42);
    /// ```
    pub fn get(&self, reg: Reg) -> u8 {
        self.v[reg.0 as usize]
    }

    /// Stores a given 8-bit value in the `V` register addressed by `reg`.
    pub fn set(&mut self, reg: Reg, val: u8) {
        self.v[reg.0 as usize] = val;
    }

    pub fn vf(&self) -> u8 {
        self.get(Reg::VF)
    }

    /// Sets the value of the `VF` flag register specifically.
    pub fn set_vf(&mut self, value: u8) {
        self.set(Reg::VF, value);
    }

    /// Fetches the current value inside the `I` register.
    pub fn i(&self) -> u16 {
        self.i
    }

    /// Stores a given value in the `I` register.
    pub fn set_i(&mut self, val: u16) {
        self.i = val;
    }

    /// Registers `V0` through `last`, inclusive.
    pub fn range(&self, last: Reg) -> &[u8] {
        &self.v[..=last.0 as usize]
    }

    pub fn range_mut(&mut self, last: Reg) -> &mut [u8] {
        &mut self.v[..=last.0 as usize]
    }
}

impl Default for Registers {
    fn default() -> Self {
        Registers::new()
    }
}

/// Represents the Stack used to store return addresses for `CALL` and `RETURN` instructions.
///
/// The stack has room for exactly `STACK_SIZE` addresses. The pointer counts occupied slots, so every slot touched by `push` or `pop` lies
/// in `[0, STACK_SIZE)`. A full stack refuses further pushes with `Fault::StackOverflow` and an empty one refuses pops with
/// `Fault::StackUnderflow`; neither wraps.
pub struct Stack {
    slots: [u16; STACK_SIZE],
    pointer: usize,
}

impl Stack {

    /// Creates a new, empty instance of the `Stack` struct.
    pub fn new() -> Stack {
        Stack { slots: [0u16; STACK_SIZE], pointer: 0 }
    }

    pub fn reset(&mut self) {
        *self = Stack::new();
    }

    /// Pushes a value to the top of the stack.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::Stack;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(0x200).unwrap();
    /// assert_eq!(stack.pointer(), 1);
    /// ```
    pub fn push(&mut self, val: u16) -> Result<(), Fault> {
        let slot = self.slots.get_mut(self.pointer).ok_or(Fault::StackOverflow)?;
        *slot = val;
        self.pointer += 1;
        Ok(())
    }

    /// Removes the topmost value from the stack and returns it.
    pub fn pop(&mut self) -> Result<u16, Fault> {
        let top = self.pointer.checked_sub(1).ok_or(Fault::StackUnderflow)?;
        let val = self.slots[top];
        self.pointer = top;
        Ok(val)
    }

    /// The topmost value, if any.
    pub fn peek(&self) -> Option<u16> {
        self.pointer.checked_sub(1).map(|top| self.slots[top])
    }

    /// Number of return addresses currently on the stack, in `0..=STACK_SIZE`.
    ///
    /// A full stack reports `STACK_SIZE`. The slot read or written by `push` and `pop` is always below it.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn is_empty(&self) -> bool {
        self.pointer == 0
    }
}

impl Default for Stack {
    fn default() -> Self {
        Stack::new()
    }
}

/// Represents a timer in the CHIP-8 system. Timers can be set to 8-bit values and are ticked down towards `0` by whoever drives the
/// system, conventionally at 60 Hz. A CHIP-8 has a `Delay Timer` and a `Sound Timer` with the same behaviour, both represented by this
/// struct.
#[derive(Default)]
pub struct Timer {
    value: u8,
}

impl Timer {

    /// Creates a new instance of the `Timer` struct, starting at value `0`.
    pub fn new() -> Timer {
        Timer { value: 0 }
    }

    /// Ticks down the timer by `1` if it is larger than `0`.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::Timer;
    ///
    /// let mut timer = Timer::new();
    /// timer.set(1);
    /// timer.tick();
    /// timer.tick();
    /// assert_eq!(timer.get(), 0);
    /// ```
    pub fn tick(&mut self) {
        self.value = self.value.saturating_sub(1);
    }

    /// Sets the timer to a given 8-bit value.
    pub fn set(&mut self, value: u8) {
        self.value = value
    }

    /// Gets the current value of the timer.
    pub fn get(&self) -> u8 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.value > 0
    }
}

/// Represents the state of the 16-key CHIP-8 keyboard as one latch per key.
///
/// The latches are written by an input source outside the core. Instructions only read them, except for the wait-for-key instruction,
/// which consumes the latch it reports.
#[derive(Default)]
pub struct Keyboard {
    keys: [bool; KEY_COUNT],
}

impl Keyboard {

    /// Creates a new instance of the `Keyboard` struct with all keys released.
    pub fn new() -> Keyboard {
        Keyboard { keys: [false; KEY_COUNT] }
    }

    /// Gets the current state of the key with the given index.
    ///
    /// `true` indicates that the key is currently pressed. Indices beyond 0xF are never pressed.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    /// Sets the latch of `key`.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::Keyboard;
    /// use chip8_core::error::InputError;
    ///
    /// let mut kb = Keyboard::new();
    /// kb.set(0xA, true).unwrap();
    /// assert!(kb.is_pressed(0xA));
    /// assert_eq!(kb.set(0x10, true), Err(InputError::InvalidKey(0x10)));
    /// ```
    pub fn set(&mut self, key: u8, pressed: bool) -> Result<(), InputError> {
        let latch = self.keys.get_mut(key as usize).ok_or(InputError::InvalidKey(key))?;
        *latch = pressed;
        Ok(())
    }

    pub fn press(&mut self, key: u8) -> Result<(), InputError> {
        self.set(key, true)
    }

    pub fn release(&mut self, key: u8) -> Result<(), InputError> {
        self.set(key, false)
    }

    /// Lowest index of a pressed key, if any.
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&pressed| pressed).map(|key| key as u8)
    }

    /// Releases and returns the lowest pressed key.
    pub fn take_first_pressed(&mut self) -> Option<u8> {
        let key = self.first_pressed()?;
        self.keys[key as usize] = false;
        Some(key)
    }

    /// Releases every key.
    pub fn clear(&mut self) {
        self.keys = [false; KEY_COUNT];
    }
}

/// The 64x32 monochrome frame buffer of the CHIP-8, stored as one byte per pixel holding `0` or `1` at index `y * 64 + x`.
///
/// Any write marks the frame dirty. A renderer reads the pixels and clears the flag once it has drawn them.
pub struct Display {
    pixels: [u8; SCREEN_WIDTH * SCREEN_HEIGHT],
    dirty: bool,
}

impl Display {

    /// Creates a new instance of the `Display` struct, initializing all pixels as `OFF` and the frame as clean.
    pub fn new() -> Display {
        Display { pixels: [0u8; SCREEN_WIDTH * SCREEN_HEIGHT], dirty: false }
    }

    /// Turns every pixel off and clears the dirty flag.
    pub fn reset(&mut self) {
        *self = Display::new();
    }

    /// Turns every pixel off and marks the frame dirty.
    pub fn clear(&mut self) {
        self.pixels = [0u8; SCREEN_WIDTH * SCREEN_HEIGHT];
        self.dirty = true;
    }

    /// The pixel at `(x, y)`, or `None` off-screen.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return None;
        }
        Some(self.pixels[y * SCREEN_WIDTH + x])
    }

    /// The whole buffer in row-major order.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Returns the dirty flag and clears it.
    pub fn take_dirty(&mut self) -> bool {
        mem::replace(&mut self.dirty, false)
    }

    /// Flips the pixel at the given coordinates.
    ///
    /// Returns `Some(true)` if the pixel was set before (and is now reset), `Some(false)` if it was off, and `None` without touching
    /// anything if the coordinates are off-screen.
    fn flip_pixel(&mut self, x: usize, y: usize) -> Option<bool> {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return None;
        }
        let pixel = &mut self.pixels[y * SCREEN_WIDTH + x];
        let was_set = *pixel == 1;
        *pixel ^= 1;
        Some(was_set)
    }

    /// XORs `sprite` onto the screen with its top-left corner at `(x, y)` and returns whether any pixel was turned off.
    ///
    /// Each byte of `sprite` is one row, most significant bit leftmost. Pixels landing beyond the right or bottom edge are skipped; the
    /// sprite never wraps around. The frame is marked dirty even if nothing visible changed.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::Display;
    ///
    /// let mut display = Display::new();
    /// assert!(!display.draw_sprite(0, 0, &[0xFF]));
    /// assert_eq!(display.pixel(7, 0), Some(1));
    /// assert!(display.draw_sprite(0, 0, &[0xFF]));
    /// assert_eq!(display.pixel(7, 0), Some(0));
    /// ```
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            let py = y as usize + row;
            if py >= SCREEN_HEIGHT {
                break;
            }
            for col in 0..8 {
                if byte & (0x80 >> col) == 0 {
                    continue;
                }
                if let Some(was_set) = self.flip_pixel(x as usize + col, py) {
                    collision |= was_set;
                }
            }
        }
        self.dirty = true;
        collision
    }
}

impl Default for Display {
    fn default() -> Self {
        Display::new()
    }
}

impl fmt::Display for Display {

    /// Draws the frame inside a box, two characters per pixel so the aspect ratio roughly survives a terminal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔{}╗", "═".repeat(SCREEN_WIDTH * 2))?;
        for row in self.pixels.chunks(SCREEN_WIDTH) {
            write!(f, "║")?;
            for &pixel in row {
                let c = if pixel == 0 { ' ' } else { '█' };
                write!(f, "{}{}", c, c)?;
            }
            writeln!(f, "║")?;
        }
        writeln!(f, "╚{}╝", "═".repeat(SCREEN_WIDTH * 2))
    }
}

/// A struct representing the state of a CHIP-8 processor and its peripherals.
///
/// `System` owns everything; `step()` borrows it mutably for exactly one instruction. Instances share nothing, so separate systems may
/// run on separate threads.
pub struct System {
    pub memory: Memory,
    pub registers: Registers,
    pub stack: Stack,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    pub keyboard: Keyboard,
    pub display: Display,

    pub(crate) rng: StdRng,

    pub pc: u16,
}

impl System {

    /// Creates a new instance of the `System` struct in its reset state, with a random source seeded from the operating system.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::{System, PROGRAM_START};
    ///
    /// let sys = System::new();
    /// assert_eq!(sys.pc, PROGRAM_START);
    /// ```
    pub fn new() -> System {
        System::with_rng(StdRng::from_entropy())
    }

    /// Like `new()`, but with a deterministic random source, so `RND` produces the same sequence on every run.
    pub fn with_seed(seed: u64) -> System {
        System::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> System {
        System {
            memory: Memory::new(),
            registers: Registers::new(),
            stack: Stack::new(),
            delay_timer: Timer::new(),
            sound_timer: Timer::new(),
            keyboard: Keyboard::new(),
            display: Display::new(),
            rng,
            pc: PROGRAM_START,
        }
    }

    /// Returns every component to its power-on state: memory zeroed apart from the font, registers, stack, timers, display and
    /// keyboard cleared, and the PC at `PROGRAM_START`. The random source keeps its state.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.registers.reset();
        self.stack.reset();
        self.delay_timer.set(0);
        self.sound_timer.set(0);
        self.keyboard.clear();
        self.display.reset();
        self.pc = PROGRAM_START;
        debug!("system reset");
    }

    /// Loads a program image into the system's main memory.
    ///
    /// The image lands at `PROGRAM_START` and the PC is moved there. Images larger than `MAX_PROGRAM_SIZE` are rejected with
    /// `LoadError::ProgramTooLarge` and leave the system untouched.
    ///
    /// # Example
    /// ```
    /// use chip8_core::system::System;
    ///
    /// let mut sys = System::new();
    /// sys.load_program(&[0x00, 0xE0]).unwrap();
    /// sys.step().unwrap();
    /// assert_eq!(sys.pc, 0x202);
    /// assert!(sys.display.is_dirty());
    /// ```
    pub fn load_program(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        self.memory.load_program(bytes)?;
        self.pc = PROGRAM_START;
        debug!("loaded {} byte program at {:#05X}", bytes.len(), PROGRAM_START);
        Ok(())
    }

    /// Loads a `Program` into the system's main memory, see `load_program(...)`.
    pub fn load(&mut self, program: &Program) -> Result<(), LoadError> {
        self.load_program(program.bytes())
    }

    /// Increments the CHIP-8's PC by two.
    pub fn increment_pc(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Increments the PC by four if `condition` holds, skipping the next instruction, and by two otherwise.
    pub(crate) fn skip_if(&mut self, condition: bool) {
        self.increment_pc();
        if condition {
            self.increment_pc();
        }
    }

    /// Reads the big endian instruction word at the PC.
    pub fn fetch(&self) -> Result<u16, Fault> {
        let op1 = self.memory.get(self.pc)?;
        let op2 = self.memory.get(self.pc.wrapping_add(1))?;
        Ok(big_endian_8_2(op1, op2))
    }

    /// Runs one fetch/decode/execute cycle.
    ///
    /// On success the PC points at the next instruction to execute. On a fault nothing has changed: the PC still points at the
    /// offending instruction and it is up to the caller to halt, skip it or try again.
    pub fn step(&mut self) -> Result<(), Fault> {
        let pc = self.pc;
        self.cycle().map_err(|fault| {
            warn!("{:#05X}: {}", pc, fault);
            fault
        })
    }

    fn cycle(&mut self) -> Result<(), Fault> {
        let word = self.fetch()?;
        let instruction = Instruction::try_from(word)?;
        trace!("{:#05X}: {:04X}  {}", self.pc, word, instruction);
        instruction.execute(self)
    }

    /// Ticks both timers once. Drivers call this at 60 Hz, independently of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.delay_timer.tick();
        self.sound_timer.tick();
    }

    /// Whether the buzzer should currently sound.
    pub fn sound_active(&self) -> bool {
        self.sound_timer.is_active()
    }
}

impl Default for System {
    fn default() -> Self {
        System::new()
    }
}
