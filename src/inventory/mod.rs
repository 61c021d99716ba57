pub mod download;
pub mod grid;
pub mod monument;
pub mod near_json;
pub mod portal;
pub mod trees;
