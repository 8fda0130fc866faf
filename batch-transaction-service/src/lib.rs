//! Batch Transaction Service - CSV batch payment uploads with a maker/approver workflow.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
