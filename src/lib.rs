//! Form-tag library.
//!
//! Parses the bracketed form-tag syntax, renders and validates `select` and
//! `textarea` controls, checks application form configuration (mail
//! templates, labels, messages) and models the admin tag generator.

pub mod application;
pub mod config;
pub mod config_validator;
pub mod controls;
pub mod error;
pub mod form_tag;
pub mod generator;
pub mod mail_tag;
pub mod mailbox;
pub mod markup;
pub mod pipes;
pub mod renderer;
pub mod store;
pub mod submission;
pub mod types;
