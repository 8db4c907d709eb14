
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::block_gen::PhaseBlock;
use crate::errors::PhaseBlockError;

/// Value of the GTF source column
const GTF_SOURCE: &str = "Phasing";
/// Value of the GTF feature column, IGV joins exons with the same gene_id
const GTF_FEATURE: &str = "exon";

/// Writes phase blocks as GTF features, one line per block.
/// Every block becomes an "exon" whose gene_id is the block identifier, so a block that is
/// split into multiple runs shows up as one gene with multiple exons.
pub struct GtfWriter<W: Write> {
    /// Handle for the CSV writer, configured for tabs and no quoting
    csv_writer: csv::Writer<W>
}

/// A single GTF line, fields are in column order
#[derive(Serialize)]
struct GtfRow<'a> {
    seqname: &'a str,
    source: &'a str,
    feature: &'a str,
    /// 1-based, inclusive
    start: u64,
    /// 1-based, inclusive
    end: u64,
    score: &'a str,
    strand: &'a str,
    frame: &'a str,
    attributes: String
}

impl GtfWriter<File> {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write the GTF to, any existing file is replaced
    pub fn from_path(filename: &Path) -> Result<GtfWriter<File>, PhaseBlockError> {
        let file: File = File::create(filename)?;
        Ok(GtfWriter::from_writer(file))
    }
}

impl<W: Write> GtfWriter<W> {
    /// Wraps any writer; nothing is buffered beyond what `writer` does itself
    pub fn from_writer(writer: W) -> GtfWriter<W> {
        let csv_writer: csv::Writer<W> = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        GtfWriter {
            csv_writer
        }
    }

    /// Writes a single block and flushes it.
    /// # Arguments
    /// * `block` - the block to write, coordinates are 0-based half-open
    /// # Errors
    /// * if the block does not satisfy start < end
    /// * if the underlying writer has any errors
    pub fn write_block(&mut self, block: &PhaseBlock) -> Result<(), PhaseBlockError> {
        if block.get_start() >= block.get_end() {
            return Err(PhaseBlockError::InvalidInterval {
                chrom: block.get_chrom().to_string(),
                start: block.get_start(),
                end: block.get_end(),
                block_id: block.get_block_id().to_string()
            });
        }

        let block_id: &str = block.get_block_id();
        let row = GtfRow {
            seqname: block.get_chrom(),
            source: GTF_SOURCE,
            feature: GTF_FEATURE,
            start: block.get_start() + 1,
            // half-open end is already the 1-based inclusive end
            end: block.get_end(),
            score: ".",
            strand: "+",
            frame: ".",
            attributes: format!("gene_id \"{block_id}\"; transcript_id \"{block_id}.1\";")
        };
        self.csv_writer.serialize(&row)?;
        self.csv_writer.flush()?;
        Ok(())
    }

    /// Flushes and hands back the underlying writer
    pub fn into_inner(self) -> Result<W, PhaseBlockError> {
        self.csv_writer.into_inner()
            .map_err(|e| PhaseBlockError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}
