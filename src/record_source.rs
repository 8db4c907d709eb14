
use crate::data_types::variants::{PhaseGroup, VariantRecord, Zygosity};
use crate::errors::PhaseBlockError;

use log::{debug, trace};
use rust_htslib::bcf;
use rust_htslib::bcf::Read;
use rust_htslib::bcf::record::GenotypeAllele;
use std::path::Path;

/// The only sample we ever look at
const SAMPLE_INDEX: usize = 0;

/// Gets a list of sample names from a VCF header
/// # Arguments
/// * `vcf_header` - the header to pull names from
/// # Errors
/// * if a sample name fails to parse from utf8
pub fn get_vcf_samples(vcf_header: &bcf::header::HeaderView) -> Result<Vec<String>, PhaseBlockError> {
    let mut sample_names = vec![];
    for sv in vcf_header.samples().iter() {
        let vcf_sample_string: String = std::str::from_utf8(sv)
            .map_err(|e| PhaseBlockError::malformed("header", format!("sample name is not UTF-8: {e}")))?
            .to_string();
        sample_names.push(vcf_sample_string);
    }
    Ok(sample_names)
}

/// Looks at the first sample genotype and returns the zygosity and whether it is phased.
/// Any "." alleles lead to Unknown zygosity results. Haploid calls are treated as homozygous.
/// # Arguments
/// * `record` - the record to parse
/// * `location` - the `chrom:pos` of the record, for error messages
/// # Errors
/// * if rust_htslib fails to parse the genotype
/// * if the genotype field is completely empty
pub fn get_variant_genotype(record: &bcf::Record, location: &str) -> Result<(Zygosity, bool), PhaseBlockError> {
    let all_genotypes = record.genotypes()
        .map_err(|e| PhaseBlockError::malformed(location, format!("unable to read GT: {e}")))?;
    let genotype = all_genotypes.get(SAMPLE_INDEX);

    // if the genotype field is completely empty, something is wrong with the VCF
    if genotype.is_empty() {
        return Err(PhaseBlockError::malformed(location, "encountered empty GT field"));
    }

    // the separator in front of an allele is stored on that allele, so the first one is never phased
    let phased: bool = genotype.len() > 1 && matches!(
        genotype[1], GenotypeAllele::Phased(_) | GenotypeAllele::PhasedMissing
    );

    let gt1 = match genotype[0] {
        GenotypeAllele::Unphased(at) => at,
        GenotypeAllele::Phased(at) => at,
        GenotypeAllele::UnphasedMissing => return Ok((Zygosity::Unknown, phased)),
        GenotypeAllele::PhasedMissing => return Ok((Zygosity::Unknown, phased))
    };

    let gt2 = if genotype.len() == 1 {
        // if the genotype has only one entry, we will just assume that gt2 is identical to gt1
        gt1
    } else {
        match genotype[1] {
            GenotypeAllele::Unphased(at) => at,
            GenotypeAllele::Phased(at) => at,
            GenotypeAllele::UnphasedMissing => return Ok((Zygosity::Unknown, phased)),
            GenotypeAllele::PhasedMissing => return Ok((Zygosity::Unknown, phased))
        }
    };

    let zygosity = if gt1 == gt2 {
        if gt1 == 0 {
            Zygosity::HomozygousReference
        } else {
            Zygosity::HomozygousAlternate
        }
    } else {
        Zygosity::Heterozygous
    };
    Ok((zygosity, phased))
}

/// Pulls the phase group for the first sample out of a FORMAT tag.
/// Missing tags, either undefined in the header or absent on the record, and "." values are all None.
/// # Arguments
/// * `record` - the record to parse
/// * `phase_tag` - the FORMAT tag name, usually HP
/// * `location` - the `chrom:pos` of the record, for error messages
/// # Errors
/// * if the tag value is not UTF-8 or is not a valid phase group
/// * if htslib reports anything other than a missing tag
pub fn get_phase_group(record: &bcf::Record, phase_tag: &str, location: &str) -> Result<Option<PhaseGroup>, PhaseBlockError> {
    let values = match record.format(phase_tag.as_bytes()).string() {
        Ok(v) => v,
        Err(rust_htslib::errors::Error::BcfUndefinedTag { .. }) |
        Err(rust_htslib::errors::Error::BcfMissingTag { .. }) => {
            return Ok(None);
        },
        Err(rust_htslib::errors::Error::BcfUnexpectedType { .. }) => {
            return Err(PhaseBlockError::malformed(location, format!("{phase_tag} tag must be declared as Type=String")));
        },
        Err(e) => return Err(e.into())
    };

    let raw_bytes: &[u8] = match values.get(SAMPLE_INDEX) {
        Some(&rb) => rb,
        None => return Ok(None)
    };
    if raw_bytes.is_empty() || raw_bytes == b"." {
        return Ok(None);
    }

    let raw: &str = std::str::from_utf8(raw_bytes)
        .map_err(|e| PhaseBlockError::malformed(location, format!("{phase_tag} tag is not UTF-8: {e}")))?;
    let phase_group = PhaseGroup::parse(raw)
        .map_err(|e| PhaseBlockError::malformed(location, e.to_string()))?;
    Ok(Some(phase_group))
}

/// Streams `VariantRecord`s out of a single-sample VCF/VCF.gz/BCF file in file order.
pub struct VcfRecordSource {
    /// The underlying reader, does not need an index
    vcf_reader: bcf::Reader,
    /// A copy of the VCF header, cached here for performance
    vcf_header: bcf::header::HeaderView,
    /// The FORMAT tag holding the phase group, None skips phase group parsing
    phase_tag: Option<String>,
    /// The number of records read so far
    records_read: usize
}

impl VcfRecordSource {
    /// Opens a VCF file for reading.
    /// # Arguments
    /// * `filename` - the VCF to load; plain, bgzipped, or BCF
    /// * `phase_tag` - the FORMAT tag holding the phase group, usually HP; None if groups are not needed
    /// # Errors
    /// * if the file cannot be opened by htslib
    /// * if the file has no samples (`MalformedRecord`) or more than one (`InvariantViolation`)
    pub fn from_path(filename: &Path, phase_tag: Option<&str>) -> Result<VcfRecordSource, PhaseBlockError> {
        let vcf_reader: bcf::Reader = bcf::Reader::from_path(filename)?;
        let vcf_header: bcf::header::HeaderView = vcf_reader.header().clone();

        let sample_names: Vec<String> = get_vcf_samples(&vcf_header)?;
        let header_label: String = format!("{} header", filename.display());
        match sample_names.len() {
            0 => {
                return Err(PhaseBlockError::malformed(&header_label, "VCF has no samples"));
            },
            1 => {
                debug!("Single-sample VCF detected, sample name is {:?}.", sample_names[0]);
            },
            n => {
                return Err(PhaseBlockError::invariant(
                    &header_label,
                    format!("VCF has {n} samples, only single-sample VCFs are supported: {sample_names:?}")
                ));
            }
        };

        Ok(VcfRecordSource {
            vcf_reader,
            vcf_header,
            phase_tag: phase_tag.map(|t| t.to_string()),
            records_read: 0
        })
    }

    /// Converts an htslib record into our record type
    /// # Arguments
    /// * `record` - the freshly read record
    /// # Errors
    /// * if the chromosome or position is missing
    /// * if the genotype or phase tag cannot be parsed
    fn convert_record(&self, record: &bcf::Record) -> Result<VariantRecord, PhaseBlockError> {
        let fallback_location: String = format!("record #{}", self.records_read);
        let chrom: String = match record.rid() {
            Some(rid) => {
                let name: &[u8] = self.vcf_header.rid2name(rid)?;
                std::str::from_utf8(name)
                    .map_err(|e| PhaseBlockError::malformed(&fallback_location, format!("chromosome is not UTF-8: {e}")))?
                    .to_string()
            },
            None => {
                return Err(PhaseBlockError::malformed(&fallback_location, "record has no chromosome"));
            }
        };

        let position: u64 = u64::try_from(record.pos())
            .map_err(|_e| PhaseBlockError::malformed(&format!("{chrom}:{}", record.pos()), "negative position"))?;
        let location: String = format!("{chrom}:{}", position + 1);

        let alleles: Vec<Vec<u8>> = record.alleles().iter()
            .map(|a| a.to_vec())
            .collect();
        let (zygosity, phased) = get_variant_genotype(record, &location)?;
        let phase_group: Option<PhaseGroup> = match self.phase_tag.as_deref() {
            Some(phase_tag) => get_phase_group(record, phase_tag, &location)?,
            None => None
        };

        trace!("{} {:?} phased={} group={:?}", location, zygosity, phased, phase_group);
        Ok(VariantRecord::new(chrom, position, alleles, zygosity, phased, phase_group))
    }
}

impl Iterator for VcfRecordSource {
    type Item = Result<VariantRecord, PhaseBlockError>;

    fn next(&mut self) -> Option<Result<VariantRecord, PhaseBlockError>> {
        let mut record: bcf::Record = self.vcf_reader.empty_record();
        match self.vcf_reader.read(&mut record) {
            Some(Ok(())) => {
                self.records_read += 1;
                Some(self.convert_record(&record))
            },
            Some(Err(e)) => Some(Err(e.into())),
            None => {
                debug!("Finished reading {} VCF records", self.records_read);
                None
            }
        }
    }
}
