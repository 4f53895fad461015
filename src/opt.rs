use amdtemp_core::{Config, Features};
use clap::{Parser, ValueEnum};
use crossterm::style::Color;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Opts {
    #[arg(short, long, num_args = 1.., value_enum, default_values_t = [Category::Gpu, Category::Cpu])]
    pub category: Vec<Category>,
    /// Specify the output file, e.g., -o result.{svg,json,csv}
    #[arg(short, long, num_args = 1..)]
    pub output: Vec<PathBuf>,
    #[arg(short, long, default_value_t = 1)]
    pub interval: u64,
    #[arg(short = 'n')]
    pub count: Option<usize>,
    /// Recording time limit, e.g., --time 1h30m59s
    #[arg(long)]
    pub time: Option<humantime::Duration>,
    /// ADL library name or path
    #[arg(long)]
    adl_library: Option<PathBuf>,
    /// Ryzen Master Monitoring SDK bin directory
    #[arg(long)]
    ryzen_sdk: Option<PathBuf>,
    /// Ryzen Master driver service name
    #[arg(long)]
    driver_service: Option<String>,
}

impl Opts {
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(path) = &self.adl_library {
            config.adl_library = path.clone();
        }
        if let Some(dir) = &self.ryzen_sdk {
            config.ryzen_sdk_dir = dir.clone();
        }
        if let Some(service) = &self.driver_service {
            config.driver_service = service.clone();
        }
        config
    }

    pub fn features(&self) -> Features {
        self.category
            .iter()
            .fold(Features::empty(), |features, c| features | c.feature())
    }
}

#[derive(ValueEnum, Serialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gpu,
    Cpu,
}

impl Category {
    pub fn feature(self) -> Features {
        match self {
            Self::Gpu => Features::GPU,
            Self::Cpu => Features::CPU,
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            Self::Gpu => "GPU Temperature",
            Self::Cpu => "CPU Temperature",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Gpu => Color::AnsiValue(208),
            Self::Cpu => Color::DarkGreen,
        }
    }
}
