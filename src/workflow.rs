
use crate::block_gen::{BlockMode, BlockSegmenter, PipeBlockIterator, TagBlockIterator};
use crate::data_types::variants::VariantRecord;
use crate::errors::PhaseBlockError;
use crate::writers::block_stats::BlockStatsCollector;
use crate::writers::gtf_writer::GtfWriter;

use log::{debug, info};
use std::io::Write;

/// How often we print a progress update, in blocks
const UPDATE_SPEED: usize = 10000;

/// Runs a segmenter to the end, sending every block to the collector and the optional GTF writer.
/// # Arguments
/// * `segmenter` - the block iterator, consumed fully
/// * `gtf_writer` - if provided, each block is written here as soon as it is closed
/// # Errors
/// * the first error from the segmenter or the writer; nothing after it is processed
pub fn process_blocks<S, W>(
    segmenter: &mut S, mut gtf_writer: Option<&mut GtfWriter<W>>
) -> Result<BlockStatsCollector, PhaseBlockError>
where
    S: BlockSegmenter,
    W: Write
{
    let mut block_collector: BlockStatsCollector = BlockStatsCollector::new(segmenter.mode());
    for (i, block_result) in segmenter.by_ref().enumerate() {
        let block = block_result?;
        debug!("block {}: {:?} {}", i, block, block.bp_len());

        if let Some(writer) = gtf_writer.as_mut() {
            writer.write_block(&block)?;
        }
        block_collector.add_block(block);

        if (i + 1) % UPDATE_SPEED == 0 {
            info!("Processed {} phase blocks...", i + 1);
        }
    }

    block_collector.set_record_counts(segmenter.record_counts());
    Ok(block_collector)
}

/// Builds blocks from a record stream using the requested mode.
/// # Arguments
/// * `records` - ordered variant records
/// * `mode` - tag or pipe segmentation
/// * `gtf_writer` - optional GTF output
/// # Errors
/// * if any record is malformed or violates the mode's assumptions
/// * if writing the GTF fails
pub fn summarize_records<I, W>(
    records: I, mode: BlockMode, gtf_writer: Option<&mut GtfWriter<W>>
) -> Result<BlockStatsCollector, PhaseBlockError>
where
    I: Iterator<Item = Result<VariantRecord, PhaseBlockError>>,
    W: Write
{
    match mode {
        BlockMode::Tag => process_blocks(&mut TagBlockIterator::new(records), gtf_writer),
        BlockMode::Pipe => process_blocks(&mut PipeBlockIterator::new(records), gtf_writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_source::VcfRecordSource;
    use std::path::PathBuf;

    fn run_file(filename: &str, mode: BlockMode) -> Result<(String, String), PhaseBlockError> {
        let vcf_path: PathBuf = filename.into();
        let phase_tag: Option<&str> = match mode {
            BlockMode::Tag => Some("HP"),
            BlockMode::Pipe => None
        };
        let source = VcfRecordSource::from_path(&vcf_path, phase_tag)?;
        let mut gtf_writer = GtfWriter::from_writer(vec![]);
        let collector = summarize_records(source, mode, Some(&mut gtf_writer))?;

        let mut report: Vec<u8> = vec![];
        collector.write_report(&mut report)?;
        let gtf: Vec<u8> = gtf_writer.into_inner()?;
        Ok((String::from_utf8(report).unwrap(), String::from_utf8(gtf).unwrap()))
    }

    #[test]
    fn test_tag_mode_file() {
        let (report, gtf) = run_file("./test_data/tagged.vcf", BlockMode::Tag).unwrap();
        let expected_gtf = "chr1\tPhasing\texon\t200\t300\t.\t+\t.\tgene_id \"200\"; transcript_id \"200.1\";
chr1\tPhasing\texon\t600\t700\t.\t+\t.\tgene_id \"600\"; transcript_id \"600.1\";
chr2\tPhasing\texon\t100\t100\t.\t+\t.\tgene_id \"200\"; transcript_id \"200.1\";
";
        assert_eq!(gtf, expected_gtf);

        let expected_report = "Variants in VCF: 8
Usable variants with phasing information: 5
blocks: 3
Largest block: 2
Smallest block: 1
Median block size: 2
";
        assert_eq!(report, expected_report);
    }

    #[test]
    fn test_pipe_mode_file() {
        let (report, gtf) = run_file("./test_data/pipe.vcf", BlockMode::Pipe).unwrap();
        assert_eq!(gtf, "chr1\tPhasing\texon\t100\t600\t.\t+\t.\tgene_id \"100\"; transcript_id \"100.1\";\n");

        let expected_report = "Variants in VCF: 7
Usable variants with phasing information: 5
blocks: 1
Largest block: 501
Smallest block: 501
Median block size: 501
Average block: 501.00
Singletons (unphased variants not within a block): 1
";
        assert_eq!(report, expected_report);
    }

    #[test]
    fn test_no_phase_tags() {
        // pipe-only file read in tag mode has no blocks at all
        let (report, gtf) = run_file("./test_data/pipe.vcf", BlockMode::Tag).unwrap();
        assert_eq!(gtf, "");
        assert!(report.contains("blocks: 0\n"));
        assert!(!report.contains("Median"));
    }

    #[test]
    fn test_wrong_mode_fails() {
        // chr2 starts with a phased call, which pipe mode refuses
        let result = run_file("./test_data/tagged.vcf", BlockMode::Pipe);
        assert!(matches!(result, Err(PhaseBlockError::InvariantViolation { .. })));
    }

    #[test]
    fn test_malformed_tag_fails() {
        let result = run_file("./test_data/bad_tag.vcf", BlockMode::Tag);
        assert!(matches!(result, Err(PhaseBlockError::MalformedRecord { .. })));
    }

    #[test]
    fn test_without_gtf() {
        let records: Vec<Result<VariantRecord, PhaseBlockError>> = vec![];
        let collector = summarize_records(records.into_iter(), BlockMode::Pipe, None::<&mut GtfWriter<Vec<u8>>>).unwrap();
        assert!(collector.blocks().is_empty());
        assert!(collector.block_sizes().is_empty());
    }
}
