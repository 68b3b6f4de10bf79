pub mod cli_detect;
pub mod feed;
pub mod formatter;
pub mod handlers;
pub mod launcher;
