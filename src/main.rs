//! Runs a CHIP-8 program headlessly for a fixed number of cycles and prints the final frame.
//!
//! There is no real-time pacing and no keyboard: timers are ticked every `--timer-interval` instructions, which at the default of 12
//! approximates a 700 Hz machine with 60 Hz timers. Logging goes through `env_logger`, so `RUST_LOG=trace` shows every instruction.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use chip8_core::{Fault, Program, System};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program image to run
    rom: PathBuf,

    /// Number of instructions to execute
    #[arg(short, long, default_value_t = 700)]
    cycles: u64,

    /// Instructions executed between two timer ticks
    #[arg(short, long, default_value_t = 12)]
    timer_interval: u64,

    /// Seed for the random number generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop at the first fault instead of skipping the faulting instruction
    #[arg(long)]
    halt_on_fault: bool,

    /// Print a disassembly of the program and exit
    #[arg(short, long)]
    disassemble: bool,

    /// Print a hexdump of the memory after running
    #[arg(long)]
    dump_memory: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let program = Program::load(&args.rom)
        .with_context(|| format!("Failed to load {}", args.rom.display()))?;

    if args.disassemble {
        print!("{}", program);
        return Ok(());
    }

    let mut sys = match args.seed {
        Some(seed) => System::with_seed(seed),
        None => System::new(),
    };
    sys.load(&program)?;

    let result = run(&mut sys, &args);

    print!("{}", sys.display);
    if args.dump_memory {
        print!("{}", sys.memory);
    }
    result.context("Execution halted")
}

/// Steps the system `args.cycles` times, ticking the timers every `args.timer_interval` instructions.
fn run(sys: &mut System, args: &Args) -> Result<(), Fault> {
    let timer_interval = args.timer_interval.max(1);
    let mut frames = 0u64;

    for cycle in 0..args.cycles {
        if cycle > 0 && cycle % timer_interval == 0 {
            sys.tick_timers();
        }

        if let Err(fault) = sys.step() {
            if args.halt_on_fault {
                error!("halting after {} cycles at {:#05X}", cycle, sys.pc);
                return Err(fault);
            }
            sys.increment_pc();
        }

        if sys.display.take_dirty() {
            frames += 1;
        }
    }

    info!("ran {} cycles, {} frames drawn, PC at {:#05X}", args.cycles, frames, sys.pc);
    Ok(())
}
