
use log::debug;
use rustc_hash::FxHashMap as HashMap;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::block_gen::{BlockMode, PhaseBlock, RecordCounts};

/// Collects blocks and record counts, then reports statistics on them
pub struct BlockStatsCollector {
    /// Controls how block sizes are measured and which lines get reported
    mode: BlockMode,
    /// Blocks in the order they were emitted
    blocks: Vec<PhaseBlock>,
    /// Tag mode only: variants per phase group, key is (chromosome, block_id)
    group_sizes: HashMap<(String, String), usize>,
    /// Counts handed over from the segmenter
    record_counts: RecordCounts
}

/// Contains all the data written to each row of our blocks file
#[derive(Serialize)]
struct BlockRow {
    /// the chromosome of the block
    chrom: String,
    /// the position of the first variant, 1-based
    start: u64,
    /// the position of the last variant, 1-based
    end: u64,
    /// Phase set ID, either the group name or the position of the first variant
    phase_block_id: String,
    /// the number of variants in the block
    num_variants: usize,
    /// the number of base pairs covered by the block
    basepairs: u64
}

/// Summary values over the block sizes, only exists when there is at least one block
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSizeStats {
    pub largest: u64,
    pub smallest: u64,
    pub median: u64,
    pub mean: f64
}

impl BlockSizeStats {
    /// Builds stats from unsorted sizes, returns None if `sizes` is empty
    /// # Arguments
    /// * `sizes` - one size per block
    pub fn from_sizes(mut sizes: Vec<u64>) -> Option<BlockSizeStats> {
        sizes.sort_unstable();
        let median: u64 = calculate_weighted_median(&sizes)?;
        let total: u64 = sizes.iter().sum();
        Some(BlockSizeStats {
            largest: *sizes.last()?,
            smallest: *sizes.first()?,
            median,
            mean: total as f64 / sizes.len() as f64
        })
    }
}

impl BlockStatsCollector {
    /// Creates a new collector for the given mode
    /// # Arguments
    /// * `mode` - tag mode sizes are variants per group, pipe mode sizes are base pairs per block
    pub fn new(mode: BlockMode) -> BlockStatsCollector {
        BlockStatsCollector {
            mode,
            blocks: Default::default(),
            group_sizes: Default::default(),
            record_counts: Default::default()
        }
    }

    /// Adds a block to our collection
    /// # Arguments
    /// * `block` - the block to add, no checks are performed on the input
    pub fn add_block(&mut self, block: PhaseBlock) {
        if self.mode == BlockMode::Tag {
            // runs of the same group are pieces of one block for the stats
            let key = (block.get_chrom().to_string(), block.get_block_id().to_string());
            *self.group_sizes.entry(key).or_insert(0) += block.get_num_variants();
        }
        self.blocks.push(block);
    }

    /// Stores the final counts from the segmenter
    pub fn set_record_counts(&mut self, record_counts: RecordCounts) {
        self.record_counts = record_counts;
    }

    pub fn blocks(&self) -> &[PhaseBlock] {
        &self.blocks
    }

    /// One size per block as used for the statistics
    pub fn block_sizes(&self) -> Vec<u64> {
        match self.mode {
            BlockMode::Tag => self.group_sizes.values().map(|&s| s as u64).collect(),
            BlockMode::Pipe => self.blocks.iter().map(|b| b.bp_len()).collect()
        }
    }

    /// Writes the human readable report, one statistic per line.
    /// Block size lines are left out when there are no blocks.
    /// # Arguments
    /// * `out` - where to write, usually stderr
    pub fn write_report<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let block_sizes: Vec<u64> = self.block_sizes();
        debug!("Reporting on {} blocks from {} runs", block_sizes.len(), self.blocks.len());

        writeln!(out, "Variants in VCF: {}", self.record_counts.num_records)?;
        writeln!(out, "Usable variants with phasing information: {}", self.record_counts.num_usable)?;
        writeln!(out, "blocks: {}", block_sizes.len())?;
        if let Some(stats) = BlockSizeStats::from_sizes(block_sizes) {
            writeln!(out, "Largest block: {}", stats.largest)?;
            writeln!(out, "Smallest block: {}", stats.smallest)?;
            writeln!(out, "Median block size: {}", stats.median)?;
            if self.mode == BlockMode::Pipe {
                writeln!(out, "Average block: {:.2}", stats.mean)?;
            }
        }
        if let Some(num_singletons) = self.record_counts.num_singletons {
            writeln!(out, "Singletons (unphased variants not within a block): {}", num_singletons)?;
        }
        out.flush()
    }

    /// Will write all blocks to a CSV filename in emission order
    /// # Arguments
    /// * `filename` - the filename for the output (tsv/csv)
    pub fn write_blocks(&self, filename: &Path) -> csv::Result<()> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;

        for block in self.blocks.iter() {
            let block_row = BlockRow {
                chrom: block.get_chrom().to_string(),
                start: block.get_start()+1,
                end: block.get_end(),
                phase_block_id: block.get_block_id().to_string(),
                num_variants: block.get_num_variants(),
                basepairs: block.bp_len()
            };
            csv_writer.serialize(&block_row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Median where every block is weighted by its own size.
/// Walks the sorted sizes until the running sum reaches `ceil((1 + total) / 2)`; for an even total this
/// picks the lower of the two middle values.
/// # Arguments
/// * `sorted_sizes` - block sizes sorted in ascending order
/// # Panics
/// * if while iterating it detects unsorted blocks
fn calculate_weighted_median(sorted_sizes: &[u64]) -> Option<u64> {
    let total: u64 = sorted_sizes.iter().sum();
    let middle: u64 = (total + 2) / 2;

    let mut last_size: u64 = 0;
    let mut running_sum: u64 = 0;
    for &size in sorted_sizes.iter() {
        assert!(size >= last_size);
        last_size = size;

        running_sum += size;
        if running_sum >= middle {
            return Some(size);
        }
    }

    // only reachable for empty (or all zero) input
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(collector: &BlockStatsCollector) -> String {
        let mut buffer: Vec<u8> = vec![];
        collector.write_report(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_calculate_weighted_median() {
        // middle = ceil(12 / 2) = 6, reached on the second 3
        assert_eq!(calculate_weighted_median(&[3, 3, 5]), Some(3));
        // middle = 7, only reached once the 10 is added
        assert_eq!(calculate_weighted_median(&[1, 1, 1, 10]), Some(10));
        // even total picks the lower value, middle = ceil(5 / 2) = 3
        assert_eq!(calculate_weighted_median(&[2, 2]), Some(2));
        assert_eq!(calculate_weighted_median(&[1, 3]), Some(3));
        assert_eq!(calculate_weighted_median(&[7]), Some(7));
        assert_eq!(calculate_weighted_median(&[]), None);
    }

    #[test]
    fn test_block_size_stats() {
        let stats = BlockSizeStats::from_sizes(vec![5, 3, 3]).unwrap();
        assert_eq!(stats.largest, 5);
        assert_eq!(stats.smallest, 3);
        assert_eq!(stats.median, 3);
        assert!((stats.mean - 11.0 / 3.0).abs() < 1e-9);
        assert!(BlockSizeStats::from_sizes(vec![]).is_none());
    }

    #[test]
    fn test_tag_report() {
        let mut collector = BlockStatsCollector::new(BlockMode::Tag);
        // group 1 is split into two runs but counts as one block of 3
        collector.add_block(PhaseBlock::new("chr1".to_string(), 10, 21, "1".to_string(), 2));
        collector.add_block(PhaseBlock::new("chr1".to_string(), 30, 31, "2".to_string(), 1));
        collector.add_block(PhaseBlock::new("chr1".to_string(), 40, 41, "1".to_string(), 1));
        // same name on another chromosome is its own block
        collector.add_block(PhaseBlock::new("chr2".to_string(), 40, 91, "1".to_string(), 5));
        collector.set_record_counts(RecordCounts { num_records: 12, num_usable: 9, num_singletons: None });

        let mut sizes = collector.block_sizes();
        sizes.sort();
        assert_eq!(sizes, vec![1, 3, 5]);
        assert_eq!(collector.blocks().len(), 4);

        let expected = "Variants in VCF: 12
Usable variants with phasing information: 9
blocks: 3
Largest block: 5
Smallest block: 1
Median block size: 5
";
        assert_eq!(report(&collector), expected);
    }

    #[test]
    fn test_pipe_report() {
        let mut collector = BlockStatsCollector::new(BlockMode::Pipe);
        collector.add_block(PhaseBlock::new("chr1".to_string(), 19, 41, "20".to_string(), 3));
        collector.add_block(PhaseBlock::new("chr1".to_string(), 49, 61, "50".to_string(), 2));
        collector.set_record_counts(RecordCounts { num_records: 8, num_usable: 6, num_singletons: Some(1) });

        assert_eq!(collector.block_sizes(), vec![22, 12]);
        let expected = "Variants in VCF: 8
Usable variants with phasing information: 6
blocks: 2
Largest block: 22
Smallest block: 12
Median block size: 22
Average block: 17.00
Singletons (unphased variants not within a block): 1
";
        assert_eq!(report(&collector), expected);
    }

    #[test]
    fn test_zero_block_report() {
        let mut collector = BlockStatsCollector::new(BlockMode::Pipe);
        collector.set_record_counts(RecordCounts { num_records: 4, num_usable: 3, num_singletons: Some(3) });
        let expected = "Variants in VCF: 4
Usable variants with phasing information: 3
blocks: 0
Singletons (unphased variants not within a block): 3
";
        assert_eq!(report(&collector), expected);

        let collector = BlockStatsCollector::new(BlockMode::Tag);
        let text = report(&collector);
        assert!(text.contains("blocks: 0\n"));
        assert!(!text.contains("Largest"));
        assert!(!text.contains("Median"));
        assert!(!text.contains("Smallest"));
    }

    #[test]
    fn test_write_blocks() {
        let mut collector = BlockStatsCollector::new(BlockMode::Tag);
        collector.add_block(PhaseBlock::new("chr1".to_string(), 199, 300, "200".to_string(), 2));
        collector.add_block(PhaseBlock::new("chr2".to_string(), 99, 100, "200".to_string(), 1));

        let tsv_path = std::env::temp_dir().join(format!("phaseblocks_test_{}.tsv", std::process::id()));
        collector.write_blocks(&tsv_path).unwrap();
        let tsv_text = std::fs::read_to_string(&tsv_path).unwrap();
        std::fs::remove_file(&tsv_path).unwrap();
        let expected = "chrom\tstart\tend\tphase_block_id\tnum_variants\tbasepairs
chr1\t200\t300\t200\t2\t101
chr2\t100\t100\t200\t1\t1
";
        assert_eq!(tsv_text, expected);

        let csv_path = std::env::temp_dir().join(format!("phaseblocks_test_{}.csv", std::process::id()));
        collector.write_blocks(&csv_path).unwrap();
        let csv_text = std::fs::read_to_string(&csv_path).unwrap();
        std::fs::remove_file(&csv_path).unwrap();
        assert!(csv_text.starts_with("chrom,start,end,phase_block_id,num_variants,basepairs\nchr1,200,300,200,2,101\n"));
    }
}
