use crate::adl::{self, AdapterRecord, GpuMonitor};
#[cfg(all(
    target_os = "windows",
    target_arch = "x86_64",
    feature = "ryzen-sdk"
))]
use crate::ryzen::{self, CpuMonitor};
use crate::{Config, Error};
use bitflags::bitflags;

/// Both temperature sources, each initialized independently.
pub struct System {
    features: Features,
    gpu: Option<Result<GpuMonitor, adl::InitStatus>>,
    #[cfg(all(
        target_os = "windows",
        target_arch = "x86_64",
        feature = "ryzen-sdk"
    ))]
    cpu: Option<Result<CpuMonitor<crate::platform::SdkPlatform>, ryzen::InitStatus>>,
}

impl System {
    pub fn new(features: Features, config: &Config) -> Self {
        let mut system = System {
            features,
            gpu: None,
            #[cfg(all(
                target_os = "windows",
                target_arch = "x86_64",
                feature = "ryzen-sdk"
            ))]
            cpu: None,
        };

        if features.contains(Features::GPU) {
            system.gpu = Some(GpuMonitor::open(config));
        }

        if features.contains(Features::CPU) {
            #[cfg(all(
                target_os = "windows",
                target_arch = "x86_64",
                feature = "ryzen-sdk"
            ))]
            {
                system.cpu = Some(CpuMonitor::open(config));
            }
            #[cfg(not(all(
                target_os = "windows",
                target_arch = "x86_64",
                feature = "ryzen-sdk"
            )))]
            {
                tracing::warn!("built without Ryzen Master SDK support");
            }
        }

        system
    }

    pub fn features(&self) -> Features {
        self.features
    }

    fn gpu(&self) -> Result<&GpuMonitor, Error> {
        match self.gpu.as_ref() {
            None => Err(Error::FeatureMissing(Features::GPU)),
            Some(Err(status)) => Err(Error::Gpu(*status)),
            Some(Ok(monitor)) => Ok(monitor),
        }
    }

    pub fn gpu_adapters(&self) -> Result<&[AdapterRecord], Error> {
        Ok(self.gpu()?.adapters())
    }

    pub fn gpu_temperature(&self, idx: usize) -> Result<f32, Error> {
        Ok(self.gpu()?.temperature(idx)?)
    }

    pub fn cpu_temperature(&mut self) -> Result<f64, Error> {
        #[cfg(all(
            target_os = "windows",
            target_arch = "x86_64",
            feature = "ryzen-sdk"
        ))]
        {
            match self.cpu.as_mut() {
                None => Err(Error::FeatureMissing(Features::CPU)),
                Some(Err(status)) => Err(Error::Cpu(*status)),
                Some(Ok(monitor)) => Ok(monitor.temperature()?),
            }
        }
        #[cfg(not(all(
            target_os = "windows",
            target_arch = "x86_64",
            feature = "ryzen-sdk"
        )))]
        {
            if self.features.contains(Features::CPU) {
                Err(Error::UnsupportedFeatures(Features::CPU))
            } else {
                Err(Error::FeatureMissing(Features::CPU))
            }
        }
    }
}

bitflags! {
    #[derive(Default)]
    pub struct Features: u32 {
        const GPU =             1 << 0;
        const CPU =             1 << 1;
    }
}
