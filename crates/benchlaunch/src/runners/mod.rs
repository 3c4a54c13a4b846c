pub mod process_runner;

pub use process_runner::ProcessRunner;
