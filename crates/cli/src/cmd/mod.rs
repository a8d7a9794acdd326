mod areas;
mod build;
mod info;

pub use areas::cmd_areas;
pub use build::cmd_build;
pub use info::cmd_info;
