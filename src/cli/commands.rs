use crate::storage::AdaptationLevel;
use clap::{Parser, Subcommand};
use std::str::FromStr;

/// On/off switch for boolean settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleArg {
    On,
    Off,
}

impl FromStr for ToggleArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "true" | "1" => Ok(ToggleArg::On),
            "off" | "false" | "0" => Ok(ToggleArg::Off),
            _ => Err(format!("Invalid switch: {s}. Use 'on' or 'off'")),
        }
    }
}

impl From<ToggleArg> for bool {
    fn from(arg: ToggleArg) -> bool {
        arg == ToggleArg::On
    }
}

#[derive(Debug, Parser)]
#[command(name = "bitcoin-academy")]
pub struct Opt {
    #[arg(long = "data-dir", global = true, help = "Directory holding learner progress")]
    pub data_dir: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "modules", about = "List course modules and their status")]
    Modules {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(name = "next", about = "Show the module to attempt next")]
    Next,
    #[command(name = "step", about = "Complete one step of a module")]
    Step {
        #[arg(help = "Module id")]
        module: String,
        #[arg(help = "Step index, starting at 0")]
        index: usize,
    },
    #[command(name = "complete", about = "Complete every remaining step of a module")]
    Complete {
        #[arg(help = "Module id")]
        module: String,
    },
    #[command(name = "reset", about = "Erase all course progress")]
    Reset,
    #[command(name = "hash", about = "SHA-256 a piece of text")]
    Hash {
        #[arg(help = "Text to hash")]
        text: String,
        #[arg(long, help = "Also show hash256 = sha256(sha256(text))")]
        double: bool,
    },
    #[command(name = "merkle", about = "Build a Merkle tree and optionally prove a leaf")]
    Merkle {
        #[arg(required = true, help = "Leaf items, in order")]
        items: Vec<String>,
        #[arg(long, help = "Leaf index to build an inclusion proof for")]
        prove: Option<usize>,
    },
    #[command(name = "mine", about = "Run the mining simulator (not real proof-of-work)")]
    Mine {
        #[arg(long, default_value_t = 4, help = "Leading zeros shown on the fake hash")]
        difficulty: u32,
        #[arg(long, default_value_t = 100, help = "Give up after this many ticks")]
        ticks: u64,
        #[arg(long, help = "Seed for a repeatable run")]
        seed: Option<u64>,
    },
    #[command(name = "settings", about = "Show learner settings")]
    Settings,
    #[command(name = "set-audio", about = "Turn sound effects on or off")]
    SetAudio {
        #[arg(help = "on or off")]
        state: ToggleArg,
    },
    #[command(name = "set-volume", about = "Set sound volume between 0 and 1")]
    SetVolume {
        #[arg(help = "Volume, clamped to [0, 1]")]
        volume: f32,
    },
    #[command(name = "set-level", about = "Set lesson detail level")]
    SetLevel {
        #[arg(help = "beginner, intermediate or advanced")]
        level: AdaptationLevel,
    },
}
