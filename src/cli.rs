
use clap::Parser;
use chrono::Datelike;
use lazy_static::lazy_static;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::block_gen::BlockMode;

/// The FORMAT tag used for phase groups unless the user asks for another
pub const DEFAULT_PHASE_TAG: &str = "HP";

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) 2021-{}
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input phased variant file in VCF/BCF format
    #[clap(required = true)]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub vcf_filename: PathBuf,

    /// Output phase block annotation file in GTF format (optional)
    #[clap(long = "gtf")]
    #[clap(value_name = "GTF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub gtf_filename: Option<PathBuf>,

    /// Output file containing all phase blocks (optional, csv/tsv)
    #[clap(long = "blocks-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub blocks_filename: Option<PathBuf>,

    /// How phase blocks are encoded in the VCF: "tag" uses a phase group FORMAT tag, "pipe" uses the "|" genotype separator
    #[clap(short = 'm')]
    #[clap(long = "mode")]
    #[clap(value_name = "MODE")]
    #[clap(default_value = "tag")]
    #[clap(help_heading = Some("Phase Blocks"))]
    pub mode: BlockMode,

    /// FORMAT tag containing the phase group in tag mode
    #[clap(long = "phase-tag")]
    #[clap(value_name = "TAG")]
    #[clap(default_value = DEFAULT_PHASE_TAG)]
    #[clap(help_heading = Some("Phase Blocks"))]
    pub phase_tag: String,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

/// Logs an optional output file
fn log_optional_filename(filename: &Option<PathBuf>, label: &str) {
    match filename {
        Some(f) => info!("{}: \"{}\"", label, f.display()),
        None => info!("{}: DISABLED", label)
    };
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// Also can modify settings if needed since we're passing it around.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(mut settings: Settings) -> Settings {
    check_required_filename(&settings.vcf_filename, "Variant file");

    settings.phase_tag = settings.phase_tag.trim().to_string();
    if settings.phase_tag.is_empty() {
        error!("--phase-tag cannot be empty");
        std::process::exit(exitcode::USAGE);
    }

    // dump stuff to the logger
    log_optional_filename(&settings.gtf_filename, "GTF output");
    log_optional_filename(&settings.blocks_filename, "Blocks output");

    info!("Phase block generation:");
    info!("\tMode: {}", settings.mode);
    match settings.mode {
        BlockMode::Tag => {
            info!("\tPhase tag: {}", settings.phase_tag);
        },
        BlockMode::Pipe => {
            if settings.phase_tag != DEFAULT_PHASE_TAG {
                warn!("\tOption \"--phase-tag {}\" is ignored in pipe mode.", settings.phase_tag);
            }
        }
    };

    //send the settings back
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::try_parse_from(["phaseblocks", "input.vcf"]).unwrap();
        assert_eq!(settings.vcf_filename, PathBuf::from("input.vcf"));
        assert_eq!(settings.mode, BlockMode::Tag);
        assert_eq!(settings.phase_tag, "HP");
        assert!(settings.gtf_filename.is_none());
        assert!(settings.blocks_filename.is_none());
        assert_eq!(settings.verbosity, 0);
    }

    #[test]
    fn test_full_options() {
        let settings = Settings::try_parse_from([
            "phaseblocks", "-m", "pipe", "--gtf", "out.gtf", "--blocks-file", "blocks.tsv",
            "--phase-tag", "PS", "-vv", "input.vcf.gz"
        ]).unwrap();
        assert_eq!(settings.mode, BlockMode::Pipe);
        assert_eq!(settings.gtf_filename, Some(PathBuf::from("out.gtf")));
        assert_eq!(settings.blocks_filename, Some(PathBuf::from("blocks.tsv")));
        assert_eq!(settings.phase_tag, "PS");
        assert_eq!(settings.verbosity, 2);
    }

    #[test]
    fn test_bad_options() {
        assert!(Settings::try_parse_from(["phaseblocks"]).is_err());
        assert!(Settings::try_parse_from(["phaseblocks", "-m", "bogus", "input.vcf"]).is_err());
    }
}
