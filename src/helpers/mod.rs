pub mod running_average;
pub mod settings;
