//! `tagcode`: inspect tag families and decode sampled code words.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use tagcode_family::{
    compute_minimum_hamming_distance, parse_code, FamilyConfigError, FamilySource,
    TagCodeFamily,
};

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Family(#[from] FamilyConfigError),
    #[error("invalid code word {text:?}: {source}")]
    Code {
        text: String,
        source: std::num::ParseIntError,
    },
    #[error("no family given (use --family or --config)")]
    NoFamily,
    #[error("tag id {id} out of range (family has {len} codes)")]
    IdOutOfRange { id: usize, len: usize },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tagcode", version, about = "Tag code family utilities")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct FamilyArgs {
    /// Built-in family name.
    #[arg(long)]
    family: Option<String>,
    /// JSON family config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl FamilyArgs {
    fn source(&self) -> Option<FamilySource> {
        match (&self.family, &self.config) {
            (_, Some(path)) => Some(FamilySource::Config(path.clone())),
            (Some(name), None) => Some(FamilySource::Builtin(name.clone())),
            (None, None) => None,
        }
    }

    fn load(&self) -> Result<TagCodeFamily, CliError> {
        let source = self.source().ok_or(CliError::NoFamily)?;
        Ok(source.load()?)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print family metadata.
    Info {
        #[command(flatten)]
        family: FamilyArgs,
    },
    /// Decode code words (hex `0x…` or decimal), one JSON detection per line.
    Decode {
        #[command(flatten)]
        family: FamilyArgs,
        /// Override the family's error recovery threshold.
        #[arg(long)]
        error_recovery_bits: Option<u32>,
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Print the module pattern of one tag as text.
    Pattern {
        #[command(flatten)]
        family: FamilyArgs,
        #[arg(long)]
        id: usize,
    },
}

fn print_info(family: &TagCodeFamily, out: &mut impl Write) -> std::io::Result<()> {
    let computed = compute_minimum_hamming_distance(family.bit_count(), family.codes());
    writeln!(out, "name: {}", family.name())?;
    writeln!(out, "bits: {}", family.bit_count())?;
    writeln!(out, "grid: {0}x{0}", family.grid_dimension())?;
    writeln!(out, "codes: {}", family.len())?;
    writeln!(out, "min hamming: {}", family.minimum_hamming_distance())?;
    match computed {
        Some(d) => writeln!(out, "min hamming (computed): {d}")?,
        None => writeln!(out, "min hamming (computed): n/a")?,
    }
    writeln!(out, "error recovery bits: {}", family.error_recovery_bits())?;
    writeln!(
        out,
        "borders: white {} black {}",
        family.white_border(),
        family.black_border()
    )
}

fn run(cli: Cli) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Info { family } => {
            let family = family.load()?;
            print_info(&family, &mut out)?;
        }
        Command::Decode {
            family,
            error_recovery_bits,
            codes,
        } => {
            let mut family = family.load()?;
            if let Some(bits) = error_recovery_bits {
                family.set_error_recovery_bits(bits);
            }
            for text in codes {
                let code = parse_code(&text).map_err(|source| CliError::Code {
                    text: text.clone(),
                    source,
                })?;
                let det = family.decode(code);
                if !det.good {
                    log::info!("{text}: best match id {} is {} bits off", det.id, det.hamming_distance);
                }
                writeln!(out, "{}", serde_json::to_string(&det)?)?;
            }
        }
        Command::Pattern { family, id } => {
            let family = family.load()?;
            let pattern = family.tag_pattern(id).ok_or(CliError::IdOutOfRange {
                id,
                len: family.len(),
            })?;
            write!(out, "{}", pattern.to_ascii())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        tagcode_core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    let _ = tagcode_core::init_with_level(level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn info_lists_metadata() {
        let family = tagcode_family::builtin_family("tag16h5").expect("builtin");
        let mut buf = Vec::new();
        print_info(&family, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("grid: 4x4"));
        assert!(text.contains("min hamming (computed): 5"));
    }

    #[test]
    fn config_wins_over_family_name() {
        let args = FamilyArgs {
            family: None,
            config: Some(PathBuf::from("fam.json")),
        };
        assert_eq!(args.source(), Some(FamilySource::Config(PathBuf::from("fam.json"))));
    }

    #[test]
    fn missing_family_is_an_error() {
        let args = FamilyArgs {
            family: None,
            config: None,
        };
        assert_eq!(args.source(), None);
        assert!(matches!(args.load(), Err(CliError::NoFamily)));
    }
}
