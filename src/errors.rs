
/// Every failure that can come out of reading records, building blocks, or writing them.
#[derive(thiserror::Error, Debug)]
pub enum PhaseBlockError {
    /// A record is missing a field the active mode needs, or the field cannot be parsed
    #[error("malformed record at {location}: {reason}")]
    MalformedRecord { location: String, reason: String },
    /// A record breaks a VCF convention that block detection relies on
    #[error("invariant violated at {location}: {reason}")]
    InvariantViolation { location: String, reason: String },
    /// A block was about to be written with start >= end
    #[error("invalid interval for block {block_id:?}: {chrom}:{start}-{end}")]
    InvalidInterval { chrom: String, start: u64, end: u64, block_id: String },
    /// A record uses something we do not handle; this one is logged and skipped, never returned
    #[error("unsupported feature at {location}: {reason}")]
    UnsupportedFeature { location: String, reason: String },
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error)
}

impl PhaseBlockError {
    /// Shortcut for building a `MalformedRecord`
    pub fn malformed(location: &str, reason: impl Into<String>) -> PhaseBlockError {
        PhaseBlockError::MalformedRecord {
            location: location.to_string(),
            reason: reason.into()
        }
    }

    /// Shortcut for building an `InvariantViolation`
    pub fn invariant(location: &str, reason: impl Into<String>) -> PhaseBlockError {
        PhaseBlockError::InvariantViolation {
            location: location.to_string(),
            reason: reason.into()
        }
    }

    /// The process exit code for this error when it reaches `main`
    pub fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            PhaseBlockError::MalformedRecord { .. } |
            PhaseBlockError::InvariantViolation { .. } |
            PhaseBlockError::UnsupportedFeature { .. } => exitcode::DATAERR,
            PhaseBlockError::InvalidInterval { .. } => exitcode::SOFTWARE,
            PhaseBlockError::Htslib(_) |
            PhaseBlockError::Csv(_) |
            PhaseBlockError::Io(_) => exitcode::IOERR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(PhaseBlockError::malformed("chr1:10", "no GT").exit_code(), exitcode::DATAERR);
        assert_eq!(PhaseBlockError::invariant("chr1:10", "phased").exit_code(), exitcode::DATAERR);
        let interval = PhaseBlockError::InvalidInterval {
            chrom: "chr1".to_string(), start: 10, end: 10, block_id: "11".to_string()
        };
        assert_eq!(interval.exit_code(), exitcode::SOFTWARE);
        let io_error = PhaseBlockError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(io_error.exit_code(), exitcode::IOERR);
    }

    #[test]
    fn test_error_messages() {
        let error = PhaseBlockError::invariant("chr2:101", "phase tag found on a homozygous variant");
        assert_eq!(error.to_string(), "invariant violated at chr2:101: phase tag found on a homozygous variant");
    }
}
