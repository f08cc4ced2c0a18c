//! Data models for Corkboard

mod board;
mod image;

pub use board::{Board, BoardId, CanvasSize};
pub use image::{CanvasImageRef, ImageLocation, ImageMetadata, Placement};
