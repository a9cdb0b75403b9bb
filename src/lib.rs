//! HunchWorks - a social network for hunches, the evidence behind them, and
//! the groups that research them

pub mod collab;
pub mod commands;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod server;
pub mod views;
