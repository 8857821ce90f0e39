mod download;
mod info;

pub use download::run_download;
pub use info::run_info;
