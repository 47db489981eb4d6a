// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Savegame inspection tool.
// Run with: keepsake <command>

mod helpers;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use helpers::*;
use keepsake_core::{CodecKind, SavegameConfig, SavegameDirectory};
use keepsake_lanes::{PipelineOptions, SavegamePipeline};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "keepsake")]
#[command(about = "Inspect and locate savegame files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a savegame and print its contents.
    Inspect {
        /// Savegame file.
        file: PathBuf,
        /// RON configuration the savegame was written with.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Container codec.
        #[arg(long, value_enum)]
        codec: Option<Codec>,
        /// The file is gzip-compressed.
        #[arg(long)]
        compressed: bool,
        /// The file is encrypted.
        #[arg(long, requires = "key")]
        encrypted: bool,
        /// Decryption passphrase.
        #[arg(short, long)]
        key: Option<String>,
        /// PBKDF2 rounds.
        #[arg(long)]
        iterations: Option<u32>,
        /// Indent the output of `--dump`.
        #[arg(long)]
        pretty: bool,
        /// Re-encode the decoded container to stdout.
        #[arg(long)]
        dump: bool,
    },
    /// List savegames in a directory, newest first.
    List {
        /// Savegame directory.
        dir: PathBuf,
        /// Savegame file extension.
        #[arg(long, default_value = ".sav")]
        extension: String,
    },
    /// Print the most recent savegame in a directory.
    Newest {
        /// Savegame directory.
        dir: PathBuf,
        /// Savegame file extension.
        #[arg(long, default_value = ".sav")]
        extension: String,
    },
    /// Print the default configuration as RON.
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Codec {
    Json,
    Xml,
}

impl From<Codec> for CodecKind {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::Json => CodecKind::Json,
            Codec::Xml => CodecKind::Xml,
        }
    }
}

struct InspectArgs {
    file: PathBuf,
    config: Option<PathBuf>,
    codec: Option<Codec>,
    compressed: bool,
    encrypted: bool,
    key: Option<String>,
    iterations: Option<u32>,
    pretty: bool,
    dump: bool,
}

/// Starts from `--config` when given, otherwise from a bare codec; flags
/// only ever switch stages on.
fn pipeline_options(args: &InspectArgs) -> Result<PipelineOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let config = SavegameConfig::from_ron_file(path)
                .with_context(|| format!("reading config '{}'", path.display()))?;
            PipelineOptions::from(&config)
        }
        None => PipelineOptions {
            compress: false,
            encrypt: false,
            ..PipelineOptions::default()
        },
    };

    if let Some(codec) = args.codec {
        options.codec = codec.into();
    }
    options.compress |= args.compressed;
    if args.encrypted {
        options.encrypt = true;
    }
    if let Some(key) = &args.key {
        options.key = Some(key.clone());
    }
    if let Some(iterations) = args.iterations {
        options.iterations = iterations;
    }
    options.pretty = args.pretty;
    Ok(options)
}

fn inspect(args: InspectArgs) -> Result<()> {
    let pipeline = SavegamePipeline::new(pipeline_options(&args)?)?;
    let file = File::open(&args.file)
        .with_context(|| format!("opening '{}'", args.file.display()))?;
    let container = pipeline
        .read_from(BufReader::new(file))
        .with_context(|| format!("decoding '{}' through {}", args.file.display(), pipeline.describe()))?;

    print_title("Savegame");
    print_field("file", args.file.display());
    print_field("pipeline", pipeline.describe());
    print_field("scene", format!("#{} '{}'", container.scene.index, container.scene.name));
    print_field("entities", container.entities.len());
    print_field("spawned", container.spawned.len());
    for (template, count) in spawned_by_template(&container) {
        println!("    {CYAN}{template}{RESET} x{count}");
    }

    if args.dump {
        let text = pipeline.codec().encode(&container, args.pretty)?;
        print_title("Container");
        println!("{}", String::from_utf8_lossy(&text));
    }
    Ok(())
}

fn list(dir: PathBuf, extension: String) -> Result<()> {
    let directory = SavegameDirectory::new(dir, extension);
    let stems = directory.list()?;
    if stems.is_empty() {
        print_warning(&format!("No savegames in '{}'.", directory.path().display()));
        return Ok(());
    }
    for stem in stems {
        println!("{stem}");
    }
    Ok(())
}

fn newest(dir: PathBuf, extension: String) -> Result<()> {
    let directory = SavegameDirectory::new(dir, extension);
    match directory.newest()? {
        Some(stem) => {
            println!("{stem}");
            Ok(())
        }
        None => bail!("no savegames in '{}'", directory.path().display()),
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inspect {
            file,
            config,
            codec,
            compressed,
            encrypted,
            key,
            iterations,
            pretty,
            dump,
        } => {
            inspect(InspectArgs {
                file,
                config,
                codec,
                compressed,
                encrypted,
                key,
                iterations,
                pretty,
                dump,
            })?;
            print_success("Savegame decoded");
            Ok(())
        }
        Command::List { dir, extension } => list(dir, extension),
        Command::Newest { dir, extension } => newest(dir, extension),
        Command::Config => {
            print!("{}", SavegameConfig::default().to_ron_string()?);
            println!();
            Ok(())
        }
    }
}

fn main() {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER)).init();

    if let Err(e) = run(Cli::parse()) {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn args(key: Option<&str>) -> InspectArgs {
        InspectArgs {
            file: PathBuf::from("slot.sav"),
            config: None,
            codec: Some(Codec::Xml),
            compressed: true,
            encrypted: key.is_some(),
            key: key.map(str::to_string),
            iterations: Some(64),
            pretty: false,
            dump: false,
        }
    }

    #[test]
    fn logs_at_info_unless_overridden() {
        assert_eq!(
            DEFAULT_LOG_FILTER.parse::<log::LevelFilter>().unwrap(),
            log::LevelFilter::Info
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_switch_stages_on() {
        let options = pipeline_options(&args(Some("hunter2"))).unwrap();
        assert_eq!(options.codec, CodecKind::Xml);
        assert!(options.compress);
        assert!(options.encrypt);
        assert_eq!(options.key.as_deref(), Some("hunter2"));
        assert_eq!(options.iterations, 64);
    }

    #[test]
    fn bare_inspect_reads_plain_files() {
        let options = pipeline_options(&InspectArgs {
            compressed: false,
            ..args(None)
        })
        .unwrap();
        assert!(!options.compress);
        assert!(!options.encrypt);
    }

    #[test]
    fn encrypted_requires_a_key() {
        let parsed = Cli::try_parse_from(["keepsake", "inspect", "slot.sav", "--encrypted"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn inspect_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "keepsake", "inspect", "slot.sav", "--codec", "xml", "--compressed", "--dump",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Inspect {
                codec: Some(Codec::Xml),
                compressed: true,
                encrypted: false,
                dump: true,
                ..
            }
        ));
    }
}
