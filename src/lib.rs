//! Synchronization service for a dock workers' portal: ingests published
//! spreadsheet CSV exports (schedule, census, door cutoffs), normalizes them
//! into relational records and serves queue-position queries.

pub mod cache;
pub mod config;
pub mod csv;
pub mod db;
pub mod doors;
pub mod fetch;
pub mod model;
pub mod queue;
pub mod read;
pub mod roster;
pub mod schedule;
pub mod sync;
