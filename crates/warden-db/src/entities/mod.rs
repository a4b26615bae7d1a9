pub mod exec_commands;
pub mod settings;
pub mod status;
