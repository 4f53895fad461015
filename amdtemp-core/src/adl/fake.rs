use super::*;
use std::cell::RefCell;
use std::ffi::{c_char, c_int};
use std::ptr;
use std::rc::Rc;

const FAILED: AdlStatus = AdlStatus(-1);

#[derive(Default)]
struct Calls {
    created: usize,
    destroyed: usize,
    temperature_reads: usize,
    odn_kinds: Vec<OdnTemperatureType>,
}

/// Programmable stand-in for the vendor library.
#[derive(Clone, Default)]
pub struct FakeAdl {
    caps: Vec<AdlResult<OverdriveCaps>>,
    names: Vec<(usize, String)>,
    buses: Vec<(usize, c_int)>,
    absent: Vec<usize>,
    reading: c_int,
    edge: SingleSensorData,
    fail_create: bool,
    fail_count: bool,
    fail_info: bool,
    fail_reads: bool,
    calls: Rc<RefCell<Calls>>,
}

impl FakeAdl {
    pub fn with_adapters(caps: Vec<AdlResult<OverdriveCaps>>) -> Self {
        Self {
            caps,
            ..Default::default()
        }
    }

    pub fn named(mut self, idx: usize, name: &str) -> Self {
        self.names.push((idx, name.to_string()));
        self
    }

    pub fn on_bus(mut self, idx: usize, bus: c_int) -> Self {
        self.buses.push((idx, bus));
        self
    }

    pub fn absent(mut self, idx: usize) -> Self {
        self.absent.push(idx);
        self
    }

    pub fn reading(mut self, milli_degrees: c_int) -> Self {
        self.reading = milli_degrees;
        self
    }

    pub fn edge(mut self, supported: bool, value: c_int) -> Self {
        self.edge = SingleSensorData {
            supported: supported as c_int,
            value,
        };
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    pub fn failing_info(mut self) -> Self {
        self.fail_info = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn created(&self) -> usize {
        self.calls.borrow().created
    }

    pub fn destroyed(&self) -> usize {
        self.calls.borrow().destroyed
    }

    pub fn temperature_reads(&self) -> usize {
        self.calls.borrow().temperature_reads
    }

    pub fn odn_kinds(&self) -> Vec<OdnTemperatureType> {
        self.calls.borrow().odn_kinds.clone()
    }

    fn read(&self) -> AdlResult<()> {
        self.calls.borrow_mut().temperature_reads += 1;
        if self.fail_reads {
            Err(FAILED)
        } else {
            Ok(())
        }
    }
}

impl AdlApi for FakeAdl {
    fn main_control_create(
        &self,
        _callback: MallocCallback,
        _connected_only: bool,
    ) -> AdlResult<AdlContext> {
        if self.fail_create {
            return Err(FAILED);
        }
        self.calls.borrow_mut().created += 1;
        Ok(AdlContext(ptr::null_mut()))
    }

    fn main_control_destroy(&self, _context: AdlContext) -> AdlResult<()> {
        self.calls.borrow_mut().destroyed += 1;
        Ok(())
    }

    fn number_of_adapters(&self, _context: AdlContext) -> AdlResult<c_int> {
        if self.fail_count {
            return Err(FAILED);
        }
        Ok(self.caps.len() as c_int)
    }

    fn adapter_info(&self, _context: AdlContext, buffer: &mut [AdapterInfo]) -> AdlResult<()> {
        if self.fail_info {
            return Err(FAILED);
        }
        for (idx, info) in buffer.iter_mut().enumerate() {
            info.iAdapterIndex = idx as c_int;
            info.iBusNumber = idx as c_int;
            info.iVendorID = 1002;
            info.iPresent = !self.absent.contains(&idx) as c_int;
        }
        for &(idx, bus) in &self.buses {
            buffer[idx].iBusNumber = bus;
        }
        for (idx, name) in &self.names {
            let dst = &mut buffer[*idx].strAdapterName;
            for (d, s) in dst.iter_mut().zip(name.bytes()) {
                *d = s as c_char;
            }
        }
        Ok(())
    }

    fn overdrive_caps(&self, _context: AdlContext, adapter: c_int) -> AdlResult<OverdriveCaps> {
        self.caps[adapter as usize]
    }

    fn overdrive5_temperature(
        &self,
        _context: AdlContext,
        _adapter: c_int,
        _thermal_controller: c_int,
    ) -> AdlResult<AdlTemperature> {
        self.read()?;
        Ok(AdlTemperature {
            iSize: 0,
            iTemperature: self.reading,
        })
    }

    fn overdrive6_temperature(&self, _context: AdlContext, _adapter: c_int) -> AdlResult<c_int> {
        self.read()?;
        Ok(self.reading)
    }

    fn overdrive_n_temperature(
        &self,
        _context: AdlContext,
        _adapter: c_int,
        kind: OdnTemperatureType,
    ) -> AdlResult<c_int> {
        self.calls.borrow_mut().odn_kinds.push(kind);
        self.read()?;
        Ok(self.reading)
    }

    fn pmlog_data(&self, _context: AdlContext, _adapter: c_int) -> AdlResult<PmLogDataOutput> {
        self.read()?;
        let mut output = PmLogDataOutput::zeroed();
        output.sensors[PMLOG_TEMPERATURE_EDGE] = self.edge;
        Ok(output)
    }
}

pub struct FakeLoader {
    result: Result<FakeAdl, InitStatus>,
}

impl FakeLoader {
    pub fn new(adl: FakeAdl) -> Self {
        Self { result: Ok(adl) }
    }

    pub fn failing(status: InitStatus) -> Self {
        Self {
            result: Err(status),
        }
    }
}

impl AdlLoader for FakeLoader {
    type Api = FakeAdl;

    fn load(&self) -> Result<FakeAdl, InitStatus> {
        self.result.clone()
    }
}
