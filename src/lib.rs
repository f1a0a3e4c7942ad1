//! Rango - a small site for sharing categorised links to useful web pages
//!
//! Users browse categories and their pages, register and log in, add new
//! categories and pages, and like categories.

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod templates;
pub mod web;
