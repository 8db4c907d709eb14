
use crate::data_types::variants::{VariantRecord, VariantType};
use crate::errors::PhaseBlockError;

use log::{debug, trace, warn};

/// The two ways phase blocks can be encoded in a VCF
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BlockMode {
    /// Blocks come from a per-sample phase-group FORMAT tag (e.g. HP)
    Tag,
    /// Blocks are runs of consecutive '|' genotypes
    Pipe
}

/// A closed run of co-phased variants on one chromosome.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PhaseBlock {
    // NOTE: order matters here because we're deriving the comparisons
    /// The chromosome of the block.
    chrom: String,
    /// The coordinate of the first variant in the block, 0-based inclusive.
    start: u64,
    /// One past the coordinate of the last variant in the block, 0-based exclusive.
    end: u64,
    /// The block identifier, either the phase group name or the 1-based position of the first variant
    block_id: String,
    /// The total number of variants in the block.
    num_variants: usize
}

impl std::fmt::Debug for PhaseBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // main purpose of custom was to munge the coordinates into a single string
        f.debug_struct("PhaseBlock")
            .field("block_id", &self.block_id)
            .field("coordinates", &format!("{}:{}-{}", self.chrom, self.start, self.end))
            .field("num_variants", &self.num_variants)
            .finish()
    }
}

impl PhaseBlock {
    /// Creates a closed phase block
    /// # Arguments
    /// * `chrom` - the chromosome of the phase block
    /// * `start` - 0-based position of the first variant
    /// * `end` - 0-based exclusive end, i.e. last variant position + 1
    /// * `block_id` - the block identifier
    /// * `num_variants` - the number of variants in the block
    pub fn new(chrom: String, start: u64, end: u64, block_id: String, num_variants: usize) -> PhaseBlock {
        PhaseBlock {
            chrom,
            start,
            end,
            block_id,
            num_variants
        }
    }

    pub fn get_chrom(&self) -> &str {
        &self.chrom
    }

    pub fn get_start(&self) -> u64 {
        self.start
    }

    pub fn get_end(&self) -> u64 {
        self.end
    }

    pub fn get_block_id(&self) -> &str {
        &self.block_id
    }

    pub fn get_num_variants(&self) -> usize {
        self.num_variants
    }

    /// Returns the number of contained base pairs in the phase block.
    pub fn bp_len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Record counters gathered by a segmenter while iterating
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RecordCounts {
    /// Every record pulled from the source
    pub num_records: usize,
    /// Records that took part in block detection (tagged records or considered het SNVs)
    pub num_usable: usize,
    /// Considered records that ended up outside any block; pipe mode only
    pub num_singletons: Option<usize>
}

/// Shared behavior of the block iterators, mostly so the workflow can stay generic.
pub trait BlockSegmenter: Iterator<Item = Result<PhaseBlock, PhaseBlockError>> {
    /// The mode this segmenter implements
    fn mode(&self) -> BlockMode;

    /// Counts so far; only complete once the iterator has returned `None`
    fn record_counts(&self) -> RecordCounts;
}

/// The block that is currently being extended
#[derive(Clone, Debug, Eq, PartialEq)]
struct OpenBlock {
    /// Block identifier
    block_id: String,
    /// 0-based position of the first variant
    start: u64,
    /// Variants added so far
    num_variants: usize
}

/// Everything carried from one record to the next.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct RunningState {
    /// (chromosome, position) of the previous record, None at the start of a stream or chromosome
    previous: Option<(String, u64)>,
    /// The block that the previous record belongs to, if any
    open_block: Option<OpenBlock>
}

impl RunningState {
    /// Returns true if `record` is on a different chromosome than the previous record, or there is no previous record
    fn is_new_chromosome(&self, record: &VariantRecord) -> bool {
        match self.previous.as_ref() {
            Some((chrom, _pos)) => chrom != record.chrom(),
            None => true
        }
    }

    /// Makes sure positions never go backwards within a chromosome
    /// # Errors
    /// * if `record` is before the previous record on the same chromosome
    fn check_order(&self, record: &VariantRecord) -> Result<(), PhaseBlockError> {
        if let Some((chrom, pos)) = self.previous.as_ref() {
            if chrom == record.chrom() && *pos > record.position() {
                return Err(PhaseBlockError::invariant(
                    &record.locus(),
                    format!("records are not sorted, previous position was {}", pos + 1)
                ));
            }
        }
        Ok(())
    }

    /// Closes the open block at the previous record, if there is one
    fn close_block(&mut self) -> Option<PhaseBlock> {
        let open_block = self.open_block.take()?;
        let (chrom, pos) = self.previous.as_ref()?;
        let block = PhaseBlock::new(
            chrom.clone(), open_block.start, pos + 1,
            open_block.block_id, open_block.num_variants
        );
        trace!("Closed {:?}", block);
        Some(block)
    }

    fn set_previous(&mut self, record: &VariantRecord) {
        self.previous = Some((record.chrom().to_string(), record.position()));
    }
}

/// Iterator that builds phase blocks from a phase-group FORMAT tag.
/// Each yielded block is one contiguous run of records sharing a group name; a group that is
/// interrupted by another group or by untagged records will be yielded as multiple runs.
pub struct TagBlockIterator<I> {
    /// The ordered record source
    records: I,
    /// Carried state between records
    state: RunningState,
    /// Counters for the summary
    num_records: usize,
    num_phased: usize,
    /// Set once the source is exhausted or an error was returned
    finished: bool
}

impl<I> TagBlockIterator<I>
where
    I: Iterator<Item = Result<VariantRecord, PhaseBlockError>>
{
    /// Wraps an ordered record source
    /// # Arguments
    /// * `records` - the records, sorted by chromosome and position
    pub fn new(records: I) -> TagBlockIterator<I> {
        TagBlockIterator {
            records,
            state: RunningState::default(),
            num_records: 0,
            num_phased: 0,
            finished: false
        }
    }

    /// Handles one record and returns a block if this record closed one.
    /// # Errors
    /// * if a multi-allelic or non-heterozygous record carries a phase tag
    /// * if the records are out of order
    fn process_record(&mut self, record: VariantRecord) -> Result<Option<PhaseBlock>, PhaseBlockError> {
        self.num_records += 1;
        self.state.check_order(&record)?;

        // phasing tools do not phase these, so a tag here means something upstream is off
        if let Some(group) = record.phase_group() {
            if record.num_alt_alleles() > 1 {
                return Err(PhaseBlockError::invariant(
                    &record.locus(),
                    format!("phase tag {:?} found on a multi-allelic variant", group.raw())
                ));
            }
            if !record.is_heterozygous() {
                return Err(PhaseBlockError::invariant(
                    &record.locus(),
                    format!("phase tag {:?} found on a non-heterozygous variant", group.raw())
                ));
            }
            self.num_phased += 1;
        }

        let block_name: Option<&str> = record.phase_group().map(|g| g.block_name());
        let open_name: Option<&str> = self.state.open_block.as_ref().map(|b| b.block_id.as_str());

        let mut closed_block: Option<PhaseBlock> = None;
        if self.state.is_new_chromosome(&record) || open_name != block_name {
            // some type of transition is occurring here
            closed_block = self.state.close_block();
            if let Some(name) = block_name {
                self.state.open_block = Some(OpenBlock {
                    block_id: name.to_string(),
                    start: record.position(),
                    num_variants: 0
                });
            }
        }

        if let Some(open_block) = self.state.open_block.as_mut() {
            open_block.num_variants += 1;
        }
        self.state.set_previous(&record);

        Ok(closed_block)
    }
}

impl<I> Iterator for TagBlockIterator<I>
where
    I: Iterator<Item = Result<VariantRecord, PhaseBlockError>>
{
    type Item = Result<PhaseBlock, PhaseBlockError>;

    fn next(&mut self) -> Option<Result<PhaseBlock, PhaseBlockError>> {
        if self.finished {
            return None;
        }

        while let Some(record_result) = self.records.next() {
            let record = match record_result {
                Ok(r) => r,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            match self.process_record(record) {
                Ok(Some(block)) => return Some(Ok(block)),
                Ok(None) => {},
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };
        }

        // source is done, flush whatever is left open
        self.finished = true;
        debug!("Tag segmentation finished after {} records", self.num_records);
        self.state.close_block().map(Ok)
    }
}

impl<I> BlockSegmenter for TagBlockIterator<I>
where
    I: Iterator<Item = Result<VariantRecord, PhaseBlockError>>
{
    fn mode(&self) -> BlockMode {
        BlockMode::Tag
    }

    fn record_counts(&self) -> RecordCounts {
        RecordCounts {
            num_records: self.num_records,
            num_usable: self.num_phased,
            num_singletons: None
        }
    }
}

/// Iterator that builds phase blocks from runs of '|' genotypes.
/// Per VCF convention the first variant of a phased run is written unphased, so a block is
/// opened retroactively at the previous variant once a phased one shows up.
/// Only heterozygous, bi-allelic SNVs take part; everything else is skipped.
pub struct PipeBlockIterator<I> {
    /// The ordered record source
    records: I,
    /// Carried state between considered records
    state: RunningState,
    /// Counters for the summary
    num_records: usize,
    num_considered: usize,
    num_singletons: usize,
    /// Set once the source is exhausted or an error was returned
    finished: bool
}

impl<I> PipeBlockIterator<I>
where
    I: Iterator<Item = Result<VariantRecord, PhaseBlockError>>
{
    /// Wraps an ordered record source
    /// # Arguments
    /// * `records` - the records, sorted by chromosome and position
    pub fn new(records: I) -> PipeBlockIterator<I> {
        PipeBlockIterator {
            records,
            state: RunningState::default(),
            num_records: 0,
            num_considered: 0,
            num_singletons: 0,
            finished: false
        }
    }

    /// Returns true if the record should take part in block detection
    fn is_considered(record: &VariantRecord) -> bool {
        if record.variant_type() != VariantType::Snv {
            trace!("Skipping non-SNV at {}", record.locus());
            return false;
        }
        if record.num_alt_alleles() > 1 {
            let unsupported = PhaseBlockError::UnsupportedFeature {
                location: record.locus(),
                reason: format!("{} ALT alleles, multi-allelic sites are skipped", record.num_alt_alleles())
            };
            warn!("{}", unsupported);
            return false;
        }
        if !record.is_heterozygous() {
            trace!("Skipping {:?} call at {}", record.zygosity(), record.locus());
            return false;
        }
        true
    }

    /// Handles one record and returns a block if this record closed one.
    /// # Errors
    /// * if the first considered record of a chromosome is phased
    /// * if the records are out of order
    fn process_record(&mut self, record: VariantRecord) -> Result<Option<PhaseBlock>, PhaseBlockError> {
        self.num_records += 1;
        if !Self::is_considered(&record) {
            return Ok(None);
        }
        self.num_considered += 1;
        self.state.check_order(&record)?;

        // a chromosome change ends whatever we had going
        let mut closed_block: Option<PhaseBlock> = None;
        if self.state.is_new_chromosome(&record) {
            closed_block = self.state.close_block();
            self.state.previous = None;
        }

        if record.is_phased() {
            let previous_pos: u64 = match self.state.previous.as_ref() {
                Some((_chrom, pos)) => *pos,
                None => {
                    return Err(PhaseBlockError::invariant(
                        &record.locus(),
                        "first variant of a chromosome is phased, the first variant of a block must be unphased"
                    ));
                }
            };

            match self.state.open_block.as_mut() {
                Some(open_block) => {
                    open_block.num_variants += 1;
                },
                None => {
                    // the previous variant starts the block, so it is no longer a singleton
                    self.num_singletons -= 1;
                    self.state.open_block = Some(OpenBlock {
                        block_id: (previous_pos + 1).to_string(),
                        start: previous_pos,
                        num_variants: 2
                    });
                }
            };
        } else {
            // unphased always ends the current block at the previous variant
            if let Some(block) = self.state.close_block() {
                assert!(closed_block.is_none());
                closed_block = Some(block);
            }
            self.num_singletons += 1;
        }

        self.state.set_previous(&record);
        Ok(closed_block)
    }
}

impl<I> Iterator for PipeBlockIterator<I>
where
    I: Iterator<Item = Result<VariantRecord, PhaseBlockError>>
{
    type Item = Result<PhaseBlock, PhaseBlockError>;

    fn next(&mut self) -> Option<Result<PhaseBlock, PhaseBlockError>> {
        if self.finished {
            return None;
        }

        while let Some(record_result) = self.records.next() {
            let record = match record_result {
                Ok(r) => r,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            match self.process_record(record) {
                Ok(Some(block)) => return Some(Ok(block)),
                Ok(None) => {},
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };
        }

        // source is done, flush whatever is left open
        self.finished = true;
        debug!("Pipe segmentation finished after {} records ({} considered)", self.num_records, self.num_considered);
        self.state.close_block().map(Ok)
    }
}

impl<I> BlockSegmenter for PipeBlockIterator<I>
where
    I: Iterator<Item = Result<VariantRecord, PhaseBlockError>>
{
    fn mode(&self) -> BlockMode {
        BlockMode::Pipe
    }

    fn record_counts(&self) -> RecordCounts {
        RecordCounts {
            num_records: self.num_records,
            num_usable: self.num_considered,
            num_singletons: Some(self.num_singletons)
        }
    }
}
