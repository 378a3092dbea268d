pub mod config;
pub mod page_compilers;
pub mod plan;
pub mod posts;
pub mod site;
pub mod utils;
