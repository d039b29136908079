pub mod demo;

pub use demo::{run_with_limit, DemoOptions, DemoReport, LoopbackDemo};
