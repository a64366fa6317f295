use clap::ValueEnum;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Verbosity {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub fn directive(&self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "info,bpmon=debug,bpmon_scoring=debug,bpmon_storage=debug",
            Verbosity::Trace => "debug,bpmon=trace,bpmon_scoring=trace,bpmon_storage=trace",
        }
    }
}
