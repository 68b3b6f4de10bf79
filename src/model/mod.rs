pub mod feed;
pub mod intent;
