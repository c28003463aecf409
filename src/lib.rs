pub mod catalog;
pub mod config;
pub mod db;
pub mod exporter;
pub mod http;
pub mod importer;
pub mod media;
pub mod model;
