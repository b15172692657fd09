//! Command-line front end: assemble, run, disassemble and debug Micro programs.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use thiserror::Error;

use libmicro::assembler::source_map::SourceMap;
use libmicro::disassembler::format_listing;
use libmicro::{
    assemble, assemble_file, disassemble, AssemblerError, Architecture, Debugger,
    DisassemblyOptions, Machine,
};

/// Assembler, emulator and debugger for the Micro4, Micro8 and Micro16 CPUs.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file into a flat binary and/or Intel HEX
    Asm {
        arch: Architecture,
        /// Assembly source
        input: PathBuf,
        /// Binary output (defaults to the input with `.bin`)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write Intel HEX to this path
        #[arg(long)]
        hex: Option<PathBuf>,
        /// Print the symbol table
        #[arg(long)]
        symbols: bool,
    },
    /// Load a program and run it until it halts
    Run {
        arch: Architecture,
        /// Binary image, or assembly source with `--asm`
        file: PathBuf,
        /// Treat the file as assembly source
        #[arg(long)]
        asm: bool,
        /// Load address for binaries (defaults to the architecture's origin)
        #[arg(long, value_parser = parse_number)]
        origin: Option<u32>,
        /// Cycle budget; 0 runs until the CPU stops
        #[arg(long, default_value_t = 0)]
        max_cycles: i64,
    },
    /// Disassemble a binary image
    Disasm {
        arch: Architecture,
        file: PathBuf,
        /// Address of the first byte (defaults to the architecture's origin)
        #[arg(long, value_parser = parse_number)]
        origin: Option<u32>,
    },
    /// Load a program into the interactive monitor
    Debug {
        arch: Architecture,
        /// Binary image, or assembly source with `--asm`
        file: PathBuf,
        #[arg(long)]
        asm: bool,
        #[arg(long, value_parser = parse_number)]
        origin: Option<u32>,
        /// Run these `;`-separated commands instead of reading stdin
        #[arg(short, long)]
        command: Option<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error("Cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Program does not fit in memory ({0} bytes dropped)")]
    Truncated(usize),

    #[error("CPU error: {0}")]
    Execution(String),
}

/// Accepts `0x1F`, `$1F`, `1Fh` or decimal.
fn parse_number(text: &str) -> Result<u32, String> {
    let t = text.trim();
    let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = t.strip_prefix('$') {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = t.strip_suffix('h').or_else(|| t.strip_suffix('H')) {
        u32::from_str_radix(hex, 16)
    } else {
        t.parse()
    };
    parsed.map_err(|_| format!("invalid number: {}", text))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    match execute(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<(), CliError> {
    match command {
        Command::Asm {
            arch,
            input,
            output,
            hex,
            symbols,
        } => {
            let out = assemble_file(arch, &input)?;
            let bin = output.unwrap_or_else(|| input.with_extension("bin"));
            out.write_binary(&bin)?;
            if let Some(hex) = hex {
                out.write_hex(&hex)?;
            }

            let stats = out.stats();
            println!(
                "Assembled {} lines, {} bytes at 0x{:X} -> {}",
                stats.lines_processed,
                stats.bytes_generated,
                out.origin(),
                bin.display()
            );
            if symbols {
                print!("{}", out.symbol_dump());
            }
            Ok(())
        }
        Command::Run {
            arch,
            file,
            asm,
            origin,
            max_cycles,
        } => {
            let (mut cpu, _) = load(arch, &file, asm, origin)?;
            let cycles = cpu.run(max_cycles);
            info!("ran {} cycles", cycles);

            println!("{}", cpu.register_dump());
            println!(
                "Cycles: {}  Instructions: {}  State: {:?}",
                cpu.cycles(),
                cpu.instructions(),
                cpu.state()
            );
            match cpu.error_message() {
                Some(msg) => Err(CliError::Execution(msg)),
                None => Ok(()),
            }
        }
        Command::Disasm { arch, file, origin } => {
            let bytes = read(&file)?;
            let options = DisassemblyOptions {
                start_address: origin.unwrap_or(arch.default_origin()),
                hex_dump: true,
                show_offsets: true,
            };
            print!("{}", format_listing(&disassemble(arch, &bytes, options), &options));
            Ok(())
        }
        Command::Debug {
            arch,
            file,
            asm,
            origin,
            command,
        } => {
            let (cpu, source) = load(arch, &file, asm, origin)?;
            let mut debugger = Debugger::new(cpu);
            if let Some((map, text)) = source {
                debugger.set_source(map, &text);
            }
            monitor(&mut debugger, command);
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Builds a CPU with the program loaded, plus the source map when assembling.
fn load(
    arch: Architecture,
    file: &Path,
    asm: bool,
    origin: Option<u32>,
) -> Result<(Box<dyn Machine>, Option<(SourceMap, String)>), CliError> {
    let mut cpu = arch.new_machine();

    let source = if asm {
        let text = fs::read_to_string(file).map_err(|source| CliError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let out = assemble(arch, &text)?;
        let dropped = cpu.load_program(out.bytes(), out.origin());
        if dropped > 0 {
            return Err(CliError::Truncated(dropped));
        }
        Some((out.source_map().clone(), text))
    } else {
        let bytes = read(file)?;
        let start = origin.unwrap_or(arch.default_origin());
        let dropped = cpu.load_program(&bytes, start);
        if dropped > 0 {
            return Err(CliError::Truncated(dropped));
        }
        None
    };

    Ok((cpu, source))
}

fn monitor(debugger: &mut Debugger<Box<dyn Machine>>, script: Option<String>) {
    println!("{}", debugger.current_instruction());

    if let Some(script) = script {
        for line in script.split(';') {
            respond(debugger, line);
            if !debugger.is_running() {
                break;
            }
        }
        return;
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while debugger.is_running() {
        print!("> ");
        let _ = io::stdout().flush();
        match lines.next() {
            Some(Ok(line)) => respond(debugger, &line),
            _ => break,
        }
    }
}

fn respond(debugger: &mut Debugger<Box<dyn Machine>>, line: &str) {
    match debugger.execute(line) {
        Ok(text) if text.is_empty() => {}
        Ok(text) => println!("{}", text),
        Err(e) => println!("{}", e),
    }
}
