/// Functionality that iterates over variant records to form phase blocks
pub mod block_gen;
/// CLI functionality and checks
pub mod cli;
/// Contains wrappers for the variant data types
pub mod data_types;
/// The error type shared by the whole crate
pub mod errors;
/// Loads variant records from VCF/BCF files
pub mod record_source;
/// Organizes the primary workflow from records to blocks, statistics, and annotations
pub mod workflow;
/// Contains all the various output writer functionality
pub mod writers;
