/// Job module - asynchronous resource-loading task runner

pub mod job_system;

pub use job_system::*;
