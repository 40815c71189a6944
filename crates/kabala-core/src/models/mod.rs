//! Data models for expenses and configuration.

pub mod config;
pub mod expense;

pub use expense::{
    format_amount, parse_amount, total_of, AttachmentRef, EmployeeDetails, ExpenseEntry,
    ExpenseField, ExpenseStore,
};
