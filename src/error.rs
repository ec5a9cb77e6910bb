//! Error types reported by the CHIP-8 core.
//!
//! Run-time faults are returned from `System::step()` and never leave the machine in an inconsistent state. Load-time errors reject a
//! program image before any byte of it reaches memory.

use std::io;
use thiserror::Error;

/// A condition raised while executing a single instruction.
///
/// Faults are reported, not fatal: the machine state is left exactly as it was before the faulting `step()` and the caller decides
/// whether to halt, skip the instruction or ignore it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("Unknown opcode {0:#06X}")]
    UnknownOpcode(u16),

    #[error("Stack overflow: call depth exceeds {} return addresses", crate::system::STACK_SIZE)]
    StackOverflow,

    #[error("Stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("Memory access out of bounds at address {0:#06X}")]
    MemoryOutOfBounds(u16),
}

/// Errors raised while bringing a program image into the machine.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Program is too large ({size} bytes), max size is {max} bytes")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("Couldn't read program image: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised by the input latches.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("Key {0:#04X} is not one of the 16 CHIP-8 keys")]
    InvalidKey(u8),
}
