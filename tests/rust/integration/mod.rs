//! Integration tests - configuration files, environment and serialized query
//! trees flowing through the full compilation pipeline.

mod config_pipeline_tests;
mod serialized_query_tests;
