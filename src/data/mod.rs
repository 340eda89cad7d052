//! Data bags loaded from `data/` and exposed to templates as `data`.
//!
//! Every `*.json` and `*.yaml` file directly inside the data directory becomes
//! one bag named after the file's base name:
//!
//! | File                 | Template access        |
//! |----------------------|------------------------|
//! | `data/people.json`   | `data.people`          |
//! | `data/site.yaml`     | `data.site.title`      |
//!
//! When both `foo.json` and `foo.yaml` exist, the YAML file wins.

mod store;

pub use store::{DATA_EXTENSIONS, DataStore, load_data_dir};
