pub mod rank;
pub mod run;
pub mod status;
