//! Command-line SMBus access, in the spirit of i2c-tools.

mod detect;
mod parse;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use linux_smbus::{BusAddress, BusConfig, BusHandle, I2cDevice, SmbusClient};
use parse::{parse_address, parse_u16, parse_u8};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Read and write SMBus devices through /dev/i2c-N
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bus number (default: $SMBUS_BUS)
    #[arg(short = 'b', long)]
    bus: Option<u32>,

    /// Device node, overriding /dev/i2c-<bus>
    #[arg(long)]
    device: Option<PathBuf>,

    /// Access addresses claimed by a kernel driver
    #[arg(short = 'f', long)]
    force: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a register byte (or word)
    Get {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_u8)]
        register: u8,
        /// Read a 16-bit word
        #[arg(short = 'w', long)]
        word: bool,
    },

    /// Write a register byte (or word)
    Set {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_u8)]
        register: u8,
        #[arg(value_parser = parse_u16)]
        value: u16,
        /// Write a 16-bit word
        #[arg(short = 'w', long)]
        word: bool,
    },

    /// Process call: send a word, print the word returned
    Call {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_u8)]
        register: u8,
        #[arg(value_parser = parse_u16)]
        value: u16,
    },

    /// Block read
    BlockRead {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_u8)]
        register: u8,
        /// Maximum (SMBus) or exact (--i2c) number of bytes
        #[arg(short = 'n', long, default_value_t = 32)]
        len: usize,
        /// Use I2C block framing (no count byte)
        #[arg(long)]
        i2c: bool,
    },

    /// Block write
    BlockWrite {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_u8)]
        register: u8,
        #[arg(value_parser = parse_u8, required = true)]
        data: Vec<u8>,
        /// Use I2C block framing (no count byte)
        #[arg(long)]
        i2c: bool,
    },

    /// Scan the bus for devices
    Detect {
        #[arg(long, value_parser = parse_address, default_value = "0x08")]
        first: u8,
        #[arg(long, value_parser = parse_address, default_value = "0x77")]
        last: u8,
    },

    /// List adapter functionality
    Funcs,
}

impl Command {
    /// Target address, for commands that talk to a single device.
    fn address(&self) -> Option<u8> {
        match self {
            Command::Get { address, .. }
            | Command::Set { address, .. }
            | Command::Call { address, .. }
            | Command::BlockRead { address, .. }
            | Command::BlockWrite { address, .. } => Some(*address),
            Command::Detect { .. } | Command::Funcs => None,
        }
    }
}

fn bus_config(args: &Args) -> Result<BusConfig> {
    let mut config = match (args.bus, BusConfig::from_env()) {
        (Some(bus), env) => BusConfig {
            bus,
            ..env.unwrap_or_else(|| BusConfig::new(bus))
        },
        (None, Some(env)) => env,
        // The node path stands in for the bus number
        (None, None) if args.device.is_some() => BusConfig::new(0),
        (None, None) => bail!("No bus given; pass -b/--bus, --device or set SMBUS_BUS"),
    };
    if args.force {
        config.force = true;
    }
    if let Some(device) = &args.device {
        config.device = Some(device.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging if requested
    if args.debug {
        linux_smbus::tracing::init_stdout(LevelFilter::TRACE);
    }

    let config = bus_config(&args)?;

    let Some(address) = args.command.address() else {
        return match args.command {
            Command::Detect { first, last } => run_detect(&config, first, last),
            _ => print_functionality(&config),
        };
    };

    let mut client = SmbusClient::open_with(&config, address)
        .with_context(|| format!("Failed to open {}", config.path().display()))?;
    tracing::debug!(?config, "Bus ready");

    match args.command {
        Command::Get { register, word, .. } => {
            if word {
                println!("{:#06x}", client.read_word_data(register)?);
            } else {
                println!("{:#04x}", client.read_byte_data(register)?);
            }
        }
        Command::Set {
            register,
            value,
            word,
            ..
        } => {
            if word {
                client.write_word_data(register, value)?;
            } else {
                let value = u8::try_from(value)
                    .with_context(|| format!("{:#x} does not fit in a byte; use --word", value))?;
                client.write_byte_data(register, value)?;
            }
        }
        Command::Call {
            register, value, ..
        } => {
            println!("{:#06x}", client.process_call(register, value)?);
        }
        Command::BlockRead {
            register, len, i2c, ..
        } => {
            let mut buf = vec![0u8; len];
            let n = if i2c {
                client.read_i2c_block_data(register, &mut buf)?
            } else {
                client.read_block_data(register, &mut buf)?
            };
            println!("{}", hex_line(&buf[..n]));
        }
        Command::BlockWrite {
            register,
            data,
            i2c,
            ..
        } => {
            let accepted = if i2c {
                client.write_i2c_block_data(register, &data)?
            } else {
                client.write_block_data(register, &data)?
            };
            if accepted < data.len() {
                bail!("Device accepted {} of {} bytes", accepted, data.len());
            }
        }
        Command::Detect { .. } | Command::Funcs => {}
    }

    client.close();
    Ok(())
}

fn run_detect(config: &BusConfig, first: u8, last: u8) -> Result<()> {
    if first > last {
        bail!("--first {:#04x} is above --last {:#04x}", first, last);
    }
    let device = I2cDevice::open_with(config)
        .with_context(|| format!("Failed to open {}", config.path().display()))?;

    // Selection happens per probe, so a claimed first address reads as UU
    let mut client = SmbusClient::deferred(device, BusAddress::new(first)?);
    let results = detect::scan(&mut client, first, last)?;
    print!("{}", detect::format_table(&results));

    client.close();
    Ok(())
}

fn print_functionality(config: &BusConfig) -> Result<()> {
    let mut device = I2cDevice::open_with(config)?;
    let funcs = device
        .functionality()
        .context("Failed to read adapter functionality")?;

    println!("Functionalities implemented by {}:", config.path().display());
    for (name, supported) in funcs.describe() {
        println!("{:<32}{}", name, if supported { "yes" } else { "no" });
    }
    Ok(())
}

fn hex_line(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:#04x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_line() {
        assert_eq!(hex_line(&[0x54, 0x49, 0x00]), "0x54 0x49 0x00");
        assert_eq!(hex_line(&[]), "");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["smbus-tool", "-b", "1", "get", "0x4c", "0xfe"]).unwrap();
        assert_eq!(args.bus, Some(1));
        assert_eq!(args.command.address(), Some(0x4c));

        let args = Args::try_parse_from(["smbus-tool", "-b", "1", "funcs"]).unwrap();
        assert_eq!(args.command.address(), None);

        let args = Args::try_parse_from(["smbus-tool", "-b", "1", "detect"]).unwrap();
        assert_eq!(args.command.address(), None);

        assert!(Args::try_parse_from(["smbus-tool", "get", "0x7c", "0x00"]).is_err());
        assert!(Args::try_parse_from(["smbus-tool", "block-write", "0x50", "0x00"]).is_err());
    }

    #[test]
    fn test_device_path_needs_no_bus() {
        let args =
            Args::try_parse_from(["smbus-tool", "--device", "/dev/i2c-mux-2", "funcs"]).unwrap();
        let config = bus_config(&args).unwrap();
        assert_eq!(config.path(), PathBuf::from("/dev/i2c-mux-2"));
    }
}
