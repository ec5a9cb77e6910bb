//! A headless CHIP-8 virtual machine core
//!
//! The core holds the complete machine state (memory, registers, stack, timers, display buffer and key latches) and advances it one
//! instruction at a time through `System::step()`. Everything around it is left to the caller: reading a program from storage,
//! rendering the display buffer, feeding key presses into the latches and ticking the timers at 60 Hz.
//!
//! ```
//! use chip8_core::System;
//!
//! let mut sys = System::with_seed(1);
//! // LD V0, 0x05; LD F, V0; DRW V0, V0, 5
//! sys.load_program(&[0x60, 0x05, 0xF0, 0x29, 0xD0, 0x05]).unwrap();
//! for _ in 0..3 {
//!     sys.step().unwrap();
//! }
//! assert!(sys.display.take_dirty());
//! assert_eq!(sys.display.pixel(5, 5), Some(1));
//! ```
//!
//! Faults never leave the machine half-updated. The caller decides whether to halt, skip the instruction or carry on.

pub mod error;
pub mod program;
pub mod system;
pub mod utils;

pub use error::{Fault, InputError, LoadError};
pub use program::{Instruction, Program};
pub use system::System;
