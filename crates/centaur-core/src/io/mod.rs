pub mod fits;

pub use fits::{FitsHeader, FitsReader, HeaderValue, ImageLayout};
