use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lib4510::controller::ControllerSession;
use lib4510::disassembler::formatter::format_instruction;
use lib4510::link::IoTransport;
use lib4510::memory::Address;
use lib4510::stack::FrameDirection;
use lib4510::{Config, DebugInfo, LineLookup};
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

type Session = ControllerSession<IoTransport<BufReader<File>, File>>;

#[derive(Parser, Debug)]
#[command(name = "dbg4510")]
#[command(about = "Remote debugger for 4510 targets over the serial monitor", long_about = None)]
struct Args {
    /// Serial device (overrides the config file)
    #[arg(long)]
    device: Option<String>,

    /// Config file (default: <config dir>/dbg4510/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug information in TOML (functions, locals, line ranges)
    #[arg(long)]
    symbols: Option<PathBuf>,

    /// Select a caller frame before disassembling or reading locals
    #[arg(long, default_value_t = 0)]
    frame: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show registers
    Regs,

    /// Disassemble instructions (default: at the selected frame)
    Dis {
        address: Option<String>,
        #[arg(long, default_value_t = 16)]
        count: usize,
    },

    /// Dump memory
    Mem {
        address: String,
        #[arg(default_value_t = 64)]
        len: usize,
    },

    /// Assemble one instruction into target memory
    Asm { address: String, line: Vec<String> },

    /// Execute one instruction out of the scratch area
    Exec { line: Vec<String> },

    /// Continue, optionally up to a breakpoint
    ///
    /// A software breakpoint lives only as long as this process, so it is
    /// armed, waited on and removed within the one command.
    Cont {
        address: Option<String>,
        /// Use a self-jump software breakpoint instead of the hardware one
        #[arg(long, requires = "address")]
        soft: bool,
    },

    /// Single-step instructions
    Step {
        #[arg(default_value_t = 1)]
        count: u32,
    },

    /// Step over subroutine calls
    Next {
        #[arg(default_value_t = 1)]
        count: u32,
        /// Use the monitor's own step-over
        #[arg(long)]
        hardware: bool,
    },

    /// Run until the current subroutine returns
    Finish,

    /// Show the heuristic call stack
    Back,

    /// Show locals of the selected frame (needs --symbols)
    Locals,

    /// Arm the hardware breakpoint
    Break { address: String },

    /// Set the program counter
    Go { address: String },

    /// Search memory for a byte pattern
    Search {
        address: String,
        len: String,
        bytes: Vec<String>,
    },

    /// Copy memory
    Copy {
        source: String,
        destination: String,
        count: String,
    },
}

/// Parse a hex address, with or without a `$` or `0x` prefix.
fn parse_hex(text: &str) -> Result<u32> {
    let digits = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0x"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).with_context(|| format!("invalid hex value '{}'", text))
}

fn parse_address(text: &str) -> Result<Address> {
    let value = parse_hex(text)?;
    if value > 0xFFFF {
        Ok(Address::Flat(value))
    } else {
        Ok(Address::Cpu(value as u16))
    }
}

fn parse_cpu_address(text: &str) -> Result<u16> {
    let value = parse_hex(text)?;
    u16::try_from(value).with_context(|| format!("'{}' is not a 16-bit address", text))
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => match dirs::config_dir().map(|dir| dir.join("dbg4510").join("config.toml")) {
            Some(path) if path.exists() => Config::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            _ => Config::default(),
        },
    };

    if let Some(device) = &args.device {
        config.device = device.clone();
    }
    Ok(config)
}

fn load_symbols(path: Option<&Path>) -> Result<Option<DebugInfo>> {
    path.map(|path| {
        DebugInfo::load(path)
            .with_context(|| format!("failed to load symbols {}", path.display()))
    })
    .transpose()
}

fn open_session(config: Config) -> Result<Session> {
    let device = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&config.device)
        .with_context(|| format!("failed to open {}", config.device))?;
    let reader = BufReader::new(device.try_clone().context("failed to clone device handle")?);
    Ok(ControllerSession::new(IoTransport::new(reader, device), config))
}

fn print_dump(start: Address, bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        let text: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!(" :{:07X}: {:<47}  {}", start.offset((row * 16) as u32).physical(), hex.join(" "), text);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let symbols = load_symbols(args.symbols.as_deref())?;
    let mut session = open_session(config)?;

    let cancel = session.cancel_flag();
    ctrlc::set_handler(move || cancel.cancel()).context("failed to install Ctrl-C handler")?;

    for _ in 0..args.frame {
        session.move_frame(FrameDirection::Down);
    }

    match args.command {
        Command::Regs => {
            let regs = session.link().read_registers()?;
            println!("PC   A  X  Y  Z  B  SP   MAPH MAPL LAST-OP  P-FLAGS");
            println!(
                "{:04X} {:02X} {:02X} {:02X} {:02X} {:02X} {:04X} {:04X} {:04X} {:02X}       {}",
                regs.pc,
                regs.a,
                regs.x,
                regs.y,
                regs.z,
                regs.b,
                regs.sp,
                regs.maph,
                regs.mapl,
                regs.last_op,
                regs.flags
            );
        }
        Command::Dis { address, count } => {
            let address = address.as_deref().map(parse_address).transpose()?;
            for line in session.disassemble_at(address, count)? {
                println!("{}", line);
            }
        }
        Command::Mem { address, len } => {
            let start = parse_address(&address)?;
            let bytes = session.link().read_range(start, len)?;
            print_dump(start, &bytes);
        }
        Command::Asm { address, line } => {
            let address = parse_address(&address)?;
            let encoded = session.assemble_at(address, &line.join(" "))?;
            let hex: Vec<String> = encoded.bytes.iter().map(|b| format!("{:02X}", b)).collect();
            println!("{}  {}", address, hex.join(" "));
        }
        Command::Exec { line } => {
            let regs = session.execute_one_shot(&line.join(" "))?;
            println!(
                "A={:02X} X={:02X} Y={:02X} Z={:02X} B={:02X} SP={:04X} P={}",
                regs.a, regs.x, regs.y, regs.z, regs.b, regs.sp, regs.flags
            );
        }
        Command::Cont { address, soft } => {
            let target = address.as_deref().map(parse_hex).transpose()?;
            let stop = session.continue_execution(target, soft)?;
            println!("{}", stop);
        }
        Command::Step { count } => println!("{}", session.step(count)?),
        Command::Next { count, hardware } => {
            let lines = symbols.as_ref().map(|info| info as &dyn LineLookup);
            println!("{}", session.step_over(count, hardware, lines)?);
        }
        Command::Finish => println!("{}", session.finish()?),
        Command::Back => {
            for frame in session.backtrace()? {
                println!(
                    "#{}: ${:04X}  {}",
                    frame.index,
                    frame.address,
                    format_instruction(&frame.instruction)
                );
            }
        }
        Command::Locals => {
            let Some(info) = symbols.as_ref() else {
                bail!("locals need --symbols");
            };
            let locals = session.locals(info)?;
            if locals.is_empty() {
                println!("none found!");
            }
            for local in locals {
                println!("{}", local);
            }
        }
        Command::Break { address } => {
            session.set_hardware_breakpoint(parse_cpu_address(&address)?)?;
        }
        Command::Go { address } => session.set_pc(parse_cpu_address(&address)?)?,
        Command::Search { address, len, bytes } => {
            let start = parse_address(&address)?;
            let len = parse_hex(&len)? as usize;
            let pattern = bytes
                .iter()
                .map(|b| parse_hex(b).and_then(|v| u8::try_from(v).context("byte out of range")))
                .collect::<Result<Vec<u8>>>()?;
            for found in session.link().search(start, len, &pattern)? {
                println!("{}", found);
            }
        }
        Command::Copy {
            source,
            destination,
            count,
        } => {
            let source = parse_address(&source)?;
            let destination = parse_address(&destination)?;
            let count = parse_hex(&count)? as usize;
            session.link().copy(source, destination, count)?;
        }
    }

    Ok(())
}
