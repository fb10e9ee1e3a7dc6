use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;

/// Options recognized by the duplicate finder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Number of worker threads. Zero or negative means auto-detect.
    pub cpu_cores: i32,
    /// Group files by both size and filename in the first stage, so only
    /// files sharing a name can ever be reported as duplicates.
    pub filter_by_filename: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            cpu_cores: 0,
            filter_by_filename: false,
        }
    }
}

impl FinderConfig {
    pub fn with_cpu_cores(mut self, cpu_cores: i32) -> Self {
        self.cpu_cores = cpu_cores;
        self
    }

    pub fn with_filename_filter(mut self, enabled: bool) -> Self {
        self.filter_by_filename = enabled;
        self
    }

    /// Effective worker count: auto-detect for non-positive values,
    /// explicit values clamped to [1, logical CPUs].
    pub fn worker_count(&self) -> usize {
        let cpus = num_cpus::get().max(1);
        if self.cpu_cores <= 0 {
            cpus
        } else {
            (self.cpu_cores as usize).min(cpus)
        }
    }
}

pub fn load_configuration() -> Result<FinderConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("DupeScout").required(false))
        .build()?;
    builder.try_deserialize::<FinderConfig>()
}
