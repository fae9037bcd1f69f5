//! Leadboard - CRM pipeline board with optimistic drag-and-drop stage management
//!
//! This library provides the core functionality for Leadboard, including:
//! - Database operations and migrations
//! - Data models for stages, leads, and lead notes
//! - Repository layer for data access
//! - The `CrmApi` collaborator contract and a SQLite-backed implementation
//! - The board state engine: observable stores, drag coordination,
//!   optimistic transactions with rollback, and deleted-lead tombstones
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use leadboard::api::LocalApi;
//! use leadboard::board::{Board, DragEvent, Notice};
//! use leadboard::config::BoardConfig;
//! use leadboard::db::DbConnection;
//!
//! let conn = DbConnection::connect().unwrap();
//! let api = LocalApi::new(conn);
//! let mut board = Board::new(api, Vec::<Notice>::new(), BoardConfig::default());
//! board.refresh().unwrap();
//! board.handle_drag(DragEvent::end("1", Some("stage-contacted"))).unwrap();
//! ```

pub mod api;
pub mod board;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod repo;
