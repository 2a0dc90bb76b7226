pub mod toml_loader;

pub use toml_loader::{filter_roster, load_roster};
