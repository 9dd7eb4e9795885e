mod build;
mod trim;

pub use build::cmd_build;
pub use trim::cmd_trim;
