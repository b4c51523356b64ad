pub mod record;
pub mod sink;
pub mod layer;

pub mod console;
pub mod file_sink;
pub mod router;

pub mod env;
pub mod error;
pub mod init;
