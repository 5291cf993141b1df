//! Diagnosis Chat - phased personality assessment over an AI conversation
//!
//! The engine asks a fixed number of questions per personality element,
//! opening each phase with a canned question and generating the rest from
//! that phase's history, with candidate answers offered after every question.

pub mod adapters;
pub mod application;
pub mod config;
pub mod container;
pub mod domain;
pub mod ports;
