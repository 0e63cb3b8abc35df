pub mod config;
pub mod environment;
pub mod errors;
pub mod log;
pub mod matching;
pub mod normalize;
pub mod ride;
pub mod routes;
pub mod store;
