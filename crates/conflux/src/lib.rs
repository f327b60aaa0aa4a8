#![doc = include_str!("../README.md")]

mod broadcast;
mod cancel;
mod error;
mod fan;
mod pipeline;
mod pool;
mod rate;
mod stream;

pub use crate::broadcast::*;
pub use crate::cancel::*;
pub use crate::error::*;
pub use crate::fan::*;
pub use crate::pipeline::{Pipeline, Stage, map_stage};
pub use crate::pool::*;
pub use crate::rate::*;
pub use crate::stream::{STREAM_CAPACITY, source};
