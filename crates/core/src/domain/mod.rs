pub mod action;
pub mod lead;
pub mod message;
pub mod run;
