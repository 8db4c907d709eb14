
use phaseblocks::block_gen::BlockMode;
use phaseblocks::cli::{Settings, check_settings, get_raw_settings};
use phaseblocks::record_source::VcfRecordSource;
use phaseblocks::workflow::summarize_records;
use phaseblocks::writers::block_stats::BlockStatsCollector;
use phaseblocks::writers::gtf_writer::GtfWriter;

use log::{LevelFilter, error, info};
use std::fs::File;
use std::time::Instant;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);
    let start_time: Instant = Instant::now();

    // phase groups are only read in tag mode
    let phase_tag: Option<&str> = match cli_settings.mode {
        BlockMode::Tag => Some(&cli_settings.phase_tag),
        BlockMode::Pipe => None
    };
    let record_source: VcfRecordSource = match VcfRecordSource::from_path(&cli_settings.vcf_filename, phase_tag) {
        Ok(rs) => rs,
        Err(e) => {
            error!("Error while opening {:?}: {}", cli_settings.vcf_filename, e);
            std::process::exit(e.exit_code());
        }
    };

    let mut gtf_writer: Option<GtfWriter<File>> = match cli_settings.gtf_filename {
        Some(ref filename) => {
            match GtfWriter::from_path(filename) {
                Ok(gw) => Some(gw),
                Err(e) => {
                    error!("Error during GTF writer creation: {}", e);
                    std::process::exit(e.exit_code());
                }
            }
        },
        None => None
    };

    // this is the main pass over the records, nothing is reported until it is complete
    info!("Generating {} mode phase blocks...", cli_settings.mode);
    let block_collector: BlockStatsCollector = match summarize_records(record_source, cli_settings.mode, gtf_writer.as_mut()) {
        Ok(bc) => bc,
        Err(e) => {
            error!("Error while generating phase blocks: {}", e);
            std::process::exit(e.exit_code());
        }
    };
    info!("Generated {} phase blocks.", block_collector.blocks().len());

    if let Some(gw) = gtf_writer {
        match gw.into_inner() {
            Ok(_file) => {},
            Err(e) => {
                error!("Error while finalizing GTF file: {}", e);
                std::process::exit(e.exit_code());
            }
        };
    }

    // the summary report always goes to stderr
    let mut report_out = std::io::stderr().lock();
    match block_collector.write_report(&mut report_out) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while writing phase block statistics: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    if let Some(ref filename) = cli_settings.blocks_filename {
        // this will save all block information to a csv/tsv file
        info!("Saving all blocks to {:?}...", filename);
        match block_collector.write_blocks(filename) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing blocks file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
    }

    info!("Total time: {:.2} seconds.", start_time.elapsed().as_secs_f64());
    info!("All phase blocks summarized successfully.");
}
