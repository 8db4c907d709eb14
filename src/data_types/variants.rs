
/// All the variant types we currently distinguish
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum VariantType {
    /// REF and ALT are all length = 1 and drawn from ACGTN
    Snv=0,
    /// REF length = 1, ALT length > 1
    Insertion,
    /// REF length > 1, ALT length = 1
    Deletion,
    /// REF and ALT lengths > 1
    Indel,
    /// Something that doesn't match the above criteria, e.g. symbolic alleles or no ALT at all
    Unknown // make sure Unknown is always the last one in the list
}

/// Zygosity definitions, mostly used elsewhere
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Zygosity {
    HomozygousReference=0,
    Heterozygous,
    HomozygousAlternate,
    Unknown // make sure Unknown is always the last one in the list
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PhaseTagError {
    #[error("phase tag {raw:?} must have exactly 2 comma-separated entries, found {found}")]
    EntryCount { raw: String, found: usize },
    #[error("phase tag {raw:?} has an empty entry")]
    EmptyEntry { raw: String },
    #[error("phase tag {raw:?} has an empty block name")]
    EmptyBlockName { raw: String }
}

/// A parsed phase-group tag, e.g. `550267-1,550267-2`.
/// The block name is the stable prefix of the first entry, `550267` in the example.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PhaseGroup {
    /// The name shared by every variant in the group
    block_name: String,
    /// The original tag value
    raw: String
}

impl PhaseGroup {
    /// Parses a raw phase-group FORMAT value.
    /// # Arguments
    /// * `raw` - the FORMAT value for a single sample, e.g. `550267-1,550267-2`
    /// # Errors
    /// * if there are not exactly two entries
    /// * if either entry or the derived block name is empty
    pub fn parse(raw: &str) -> Result<PhaseGroup, PhaseTagError> {
        let entries: Vec<&str> = raw.split(',').collect();
        if entries.len() != 2 {
            return Err(PhaseTagError::EntryCount { raw: raw.to_string(), found: entries.len() });
        }
        if entries.iter().any(|e| e.is_empty()) {
            return Err(PhaseTagError::EmptyEntry { raw: raw.to_string() });
        }

        // everything after the first '-' is the per-variant suffix
        let block_name: &str = entries[0].split('-').next().unwrap_or_default();
        if block_name.is_empty() {
            return Err(PhaseTagError::EmptyBlockName { raw: raw.to_string() });
        }

        Ok(PhaseGroup {
            block_name: block_name.to_string(),
            raw: raw.to_string()
        })
    }

    pub fn block_name(&self) -> &str {
        &self.block_name
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A single VCF record reduced to what block detection needs.
/// Only the first sample of the file is represented.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantRecord {
    /// The chromosome name
    chrom: String,
    /// The coordinate of the event in the VCF file, 0-based
    position: u64,
    /// REF followed by every ALT allele
    alleles: Vec<Vec<u8>>,
    /// The zygosity of the sample call
    zygosity: Zygosity,
    /// True if the genotype separator before the second allele is '|'
    phased: bool,
    /// The phase group of the call, if the record has one
    phase_group: Option<PhaseGroup>
}

impl VariantRecord {
    /// Creates a new record.
    /// # Arguments
    /// * `chrom` - the chromosome
    /// * `position` - 0-based coordinate
    /// * `alleles` - REF first, then all ALT alleles
    /// * `zygosity` - the zygosity of the sample genotype
    /// * `phased` - whether the genotype is marked as phased
    /// * `phase_group` - the parsed phase group tag, if present
    pub fn new(
        chrom: String, position: u64, alleles: Vec<Vec<u8>>,
        zygosity: Zygosity, phased: bool, phase_group: Option<PhaseGroup>
    ) -> VariantRecord {
        VariantRecord {
            chrom,
            position,
            alleles,
            zygosity,
            phased,
            phase_group
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of ALT alleles, 0 if the ALT column was "."
    pub fn num_alt_alleles(&self) -> usize {
        self.alleles.len().saturating_sub(1)
    }

    pub fn zygosity(&self) -> Zygosity {
        self.zygosity
    }

    pub fn is_heterozygous(&self) -> bool {
        self.zygosity == Zygosity::Heterozygous
    }

    pub fn is_phased(&self) -> bool {
        self.phased
    }

    pub fn phase_group(&self) -> Option<&PhaseGroup> {
        self.phase_group.as_ref()
    }

    /// Human readable `chrom:pos` with a 1-based position, used in messages
    pub fn locus(&self) -> String {
        format!("{}:{}", self.chrom, self.position + 1)
    }

    /// Returns a variant type based on the allele lengths.
    pub fn variant_type(&self) -> VariantType {
        // if we have no ALT alleles, we have no idea what this is
        if self.alleles.len() <= 1 {
            return VariantType::Unknown;
        }

        // symbolic alleles, breakends, and '*' don't fit the small variant models
        let is_sequence = |allele: &Vec<u8>| {
            !allele.is_empty() && allele.iter().all(|b| b"ACGTNacgtn".contains(b))
        };
        if !self.alleles.iter().all(is_sequence) {
            return VariantType::Unknown;
        }

        // reference length is pulled out first, then we can look at the other alleles
        let ref_len = self.alleles[0].len();

        // we only care about max ALT length when defining small variant type
        let max_alt_len = self.alleles.iter().skip(1)
            .map(|a| a.len())
            .max()
            .unwrap_or_default();

        if ref_len == 1 {
            if max_alt_len == 1 {
                VariantType::Snv
            } else {
                VariantType::Insertion
            }
        } else if max_alt_len == 1 {
            VariantType::Deletion
        } else {
            VariantType::Indel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alleles(values: &[&str]) -> Vec<Vec<u8>> {
        values.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    fn record_with_alleles(values: &[&str]) -> VariantRecord {
        VariantRecord::new("chr1".to_string(), 99, alleles(values), Zygosity::Heterozygous, false, None)
    }

    #[test]
    fn test_phase_group_parse() {
        let group = PhaseGroup::parse("550267-1,550267-2").unwrap();
        assert_eq!(group.block_name(), "550267");
        assert_eq!(group.raw(), "550267-1,550267-2");

        // no suffix is still fine, the whole entry is the name
        let group = PhaseGroup::parse("100,100").unwrap();
        assert_eq!(group.block_name(), "100");
    }

    #[test]
    fn test_phase_group_errors() {
        assert_eq!(
            PhaseGroup::parse("550267-1"),
            Err(PhaseTagError::EntryCount { raw: "550267-1".to_string(), found: 1 })
        );
        assert_eq!(
            PhaseGroup::parse("1-1,1-2,1-3"),
            Err(PhaseTagError::EntryCount { raw: "1-1,1-2,1-3".to_string(), found: 3 })
        );
        assert_eq!(
            PhaseGroup::parse("1-1,"),
            Err(PhaseTagError::EmptyEntry { raw: "1-1,".to_string() })
        );
        assert_eq!(
            PhaseGroup::parse("-1,-2"),
            Err(PhaseTagError::EmptyBlockName { raw: "-1,-2".to_string() })
        );
    }

    #[test]
    fn test_variant_type() {
        assert_eq!(record_with_alleles(&["A", "C"]).variant_type(), VariantType::Snv);
        assert_eq!(record_with_alleles(&["A", "C", "T"]).variant_type(), VariantType::Snv);
        assert_eq!(record_with_alleles(&["A", "CT"]).variant_type(), VariantType::Insertion);
        assert_eq!(record_with_alleles(&["AT", "C"]).variant_type(), VariantType::Deletion);
        assert_eq!(record_with_alleles(&["AT", "CG"]).variant_type(), VariantType::Indel);
        assert_eq!(record_with_alleles(&["A"]).variant_type(), VariantType::Unknown);
        assert_eq!(record_with_alleles(&["A", "<DEL>"]).variant_type(), VariantType::Unknown);
        assert_eq!(record_with_alleles(&["A", "*"]).variant_type(), VariantType::Unknown);
    }

    #[test]
    fn test_record_accessors() {
        let record = VariantRecord::new(
            "chr2".to_string(), 9, alleles(&["G", "A", "T"]),
            Zygosity::Heterozygous, true, Some(PhaseGroup::parse("7-1,7-2").unwrap())
        );
        assert_eq!(record.locus(), "chr2:10");
        assert_eq!(record.num_alt_alleles(), 2);
        assert!(record.is_heterozygous());
        assert!(record.is_phased());
        assert_eq!(record.phase_group().map(|g| g.block_name()), Some("7"));
    }
}
