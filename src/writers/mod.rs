
/// Contains the phase block statistics collector and the blocks table writer
pub mod block_stats;
/// Contains the GTF writer for phase blocks
pub mod gtf_writer;
