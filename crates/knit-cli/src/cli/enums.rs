use clap::ValueEnum;
use knit_config::{ConfigLoader, Format, LogLevel, Platform, SourcemapKeyword, SourcemapOption};

/// Output format
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum FormatArg {
    /// ECMAScript modules
    #[value(name = "esm", alias = "es", alias = "module")]
    Esm,

    /// CommonJS modules
    #[value(name = "cjs", alias = "commonjs")]
    Cjs,

    /// Immediately invoked function expression
    #[value(name = "iife")]
    Iife,

    /// Universal module definition
    #[value(name = "umd")]
    Umd,
}

impl From<FormatArg> for Format {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Esm => Format::Es,
            FormatArg::Cjs => Format::Cjs,
            FormatArg::Iife => Format::Iife,
            FormatArg::Umd => Format::Umd,
        }
    }
}

/// Target platform
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum PlatformArg {
    Node,
    Neutral,
    Browser,
}

impl From<PlatformArg> for Platform {
    fn from(platform: PlatformArg) -> Self {
        match platform {
            PlatformArg::Node => Platform::Node,
            PlatformArg::Neutral => Platform::Neutral,
            PlatformArg::Browser => Platform::Browser,
        }
    }
}

/// Source map mode
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum SourcemapArg {
    /// Separate `.map` files
    #[value(name = "true")]
    File,

    /// Maps embedded as data URLs
    Inline,

    /// `.map` files without a `sourceMappingURL` comment
    Hidden,
}

impl From<SourcemapArg> for SourcemapOption {
    fn from(mode: SourcemapArg) -> Self {
        match mode {
            SourcemapArg::File => SourcemapOption::Enabled(true),
            SourcemapArg::Inline => SourcemapOption::Mode(SourcemapKeyword::Inline),
            SourcemapArg::Hidden => SourcemapOption::Mode(SourcemapKeyword::Hidden),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum LogLevelArg {
    Silent,
    Error,
    Warn,
    Info,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Silent => LogLevel::Silent,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
        }
    }
}

/// How script config files are evaluated
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum ConfigLoaderArg {
    /// Native runtime when possible, transform loader otherwise
    Auto,
    /// Import with the installed `node`
    Native,
    /// Import through a TypeScript-transforming loader
    Transform,
}

impl From<ConfigLoaderArg> for ConfigLoader {
    fn from(loader: ConfigLoaderArg) -> Self {
        match loader {
            ConfigLoaderArg::Auto => ConfigLoader::Auto,
            ConfigLoaderArg::Native => ConfigLoader::Native,
            ConfigLoaderArg::Transform => ConfigLoader::Transform,
        }
    }
}
