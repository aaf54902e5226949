pub mod command;
pub mod work_path;
