pub mod aql;
pub mod download;
pub mod fetch;
pub mod probe;
