pub mod file_size;
pub mod prefs;
