pub mod archive;
pub mod bootstrap;
pub mod class_list;
pub mod config;
pub mod csv;
pub mod storage;
pub mod survey_clients;
