//! nanorpc build front end.
//!
//! ```text
//! nanorpc <config.json> <interface.json>... [--emit <protocol.bin>]
//!
//!   config.json ─┐
//!   iface_0.json ├──▶ Protocol::build ──▶ table + layout report (stdout)
//!   iface_N.json ┘                   └──▶ postcard artifact (--emit)
//! ```
//!
//! Interfaces merge in argument order; a later file shadows methods of the
//! same name in earlier ones.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use nanorpc::protocol::{Command, CommandSource, Encoding};
use nanorpc::{Error, InterfaceDescription, Protocol, ProtocolConfig};

const USAGE: &str = "usage: nanorpc <config.json> <interface.json>... [--emit <path>]";

struct Args {
    config: PathBuf,
    interfaces: Vec<PathBuf>,
    emit: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut emit = None;
    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--emit" {
            let path = args.next().context("--emit needs a path")?;
            emit = Some(PathBuf::from(path));
        } else if arg == "-h" || arg == "--help" {
            println!("{USAGE}");
            std::process::exit(0);
        } else {
            positional.push(PathBuf::from(arg));
        }
    }
    if positional.len() < 2 {
        bail!("{USAGE}");
    }
    let config = positional.remove(0);
    Ok(Args {
        config,
        interfaces: positional,
        emit,
    })
}

fn load_config(path: &Path) -> Result<ProtocolConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    ProtocolConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_interface(path: &Path) -> Result<InterfaceDescription> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    InterfaceDescription::from_json(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_command(command: &Command<'_>) {
    let source = match command.entry.source {
        CommandSource::Builtin(_) => "builtin".to_string(),
        CommandSource::Interface(i) => format!("source {i}"),
    };
    let args = command
        .method()
        .arguments
        .iter()
        .map(|a| format!("{}: {}", a.name, a.ty))
        .collect::<Vec<_>>()
        .join(", ");
    let ret = command
        .method()
        .ret
        .map(|t| format!(" -> {t}"))
        .unwrap_or_default();
    let layout = command.layout;
    println!(
        "0x{:02x}  {}({}){}  [{}; struct {} B, response {} B]",
        command.code(),
        command.name(),
        args,
        ret,
        source,
        layout.struct_size,
        layout.response_size
    );
    for field in &layout.request_fields {
        match field.encoding {
            Encoding::Inline { width } => {
                println!("        +{:<3} {:<16} {} B inline", field.byte_offset, field.name, width);
            }
            Encoding::Descriptor {
                length_offset,
                data_offset_offset,
            } => println!(
                "        +{:<3} {:<16} descriptor (length @{}, data_offset @{})",
                field.byte_offset, field.name, length_offset, data_offset_offset
            ),
        }
    }
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config = load_config(&args.config)?;
    let interfaces = args
        .interfaces
        .iter()
        .map(|p| load_interface(p))
        .collect::<Result<Vec<_>>>()?;

    let protocol = Protocol::build(&interfaces, config)
        .map_err(Error::from)
        .context("building protocol")?;

    println!(
        "{} commands, node buffer {} B",
        protocol.table().len(),
        protocol.config().buffer_capacity
    );
    for command in protocol.commands() {
        print_command(&command);
    }

    if let Some(path) = args.emit {
        let bytes = protocol
            .to_bytes()
            .map_err(|e| anyhow::anyhow!("serializing protocol: {e}"))?;
        std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {} B to {}", bytes.len(), path.display());
    }

    Ok(())
}
