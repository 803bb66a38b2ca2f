pub mod array2d;
pub mod config;
pub mod consts;
pub mod dct;
pub mod embed;
pub mod frame;
pub mod message;
pub mod rng;
pub mod server;
pub mod tile;
pub mod tiled;
pub mod util;
