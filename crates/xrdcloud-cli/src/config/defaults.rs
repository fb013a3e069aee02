use std::path::PathBuf;

/// Locations used when neither the config file nor the command line names one.
/// Pipeline parameters fall back to the library defaults instead.
pub struct DefaultsConfig {
    pub catalog: PathBuf,
    pub intermediate: PathBuf,
    pub output_root: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("raw_data/custom_MPdata.csv"),
            intermediate: PathBuf::from("raw_data/compute_xrd.csv"),
            output_root: PathBuf::from("data"),
        }
    }
}
