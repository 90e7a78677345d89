pub mod classify;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod models;
pub mod order;
pub mod planner;
pub mod render;
pub mod reorder;
pub mod tree;
