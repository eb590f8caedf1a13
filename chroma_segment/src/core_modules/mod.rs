pub mod block_classifier;
pub mod color_distribution;
pub mod region;
pub mod region_sampler;
pub mod template_matcher;
pub mod template_store;
pub mod utils;
