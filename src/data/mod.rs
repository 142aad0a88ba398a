pub mod bitmap;
pub mod export;
pub mod formats;
pub mod source;
