
/// Contains the VariantRecord type as well as supporting definitions
pub mod variants;
