pub mod embed;
pub mod run;
pub mod schedule;
