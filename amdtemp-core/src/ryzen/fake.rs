use super::*;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct Calls {
    inits: usize,
    uninits: usize,
    reads: usize,
}

/// Programmable stand-in for the SDK platform.
#[derive(Clone)]
pub struct FakePlatform {
    init_ok: bool,
    cpu_present: bool,
    params: CpuParameters,
    calls: Rc<RefCell<Calls>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            init_ok: true,
            cpu_present: true,
            params: CpuParameters {
                result: 0,
                temperature: 40.0,
            },
            calls: Default::default(),
        }
    }
}

impl FakePlatform {
    pub fn failing_init(mut self) -> Self {
        self.init_ok = false;
        self
    }

    pub fn without_cpu(mut self) -> Self {
        self.cpu_present = false;
        self
    }

    pub fn reporting(mut self, result: i32, temperature: f64) -> Self {
        self.params = CpuParameters {
            result,
            temperature,
        };
        self
    }

    pub fn inits(&self) -> usize {
        self.calls.borrow().inits
    }

    pub fn uninits(&self) -> usize {
        self.calls.borrow().uninits
    }

    pub fn reads(&self) -> usize {
        self.calls.borrow().reads
    }
}

impl RyzenPlatform for FakePlatform {
    type Cpu = u32;

    fn init(&mut self) -> bool {
        self.calls.borrow_mut().inits += 1;
        self.init_ok
    }

    fn uninit(&mut self) {
        self.calls.borrow_mut().uninits += 1;
    }

    fn cpu(&mut self, index: u32) -> Option<u32> {
        self.cpu_present.then_some(index)
    }

    fn cpu_parameters(&mut self, _cpu: u32) -> CpuParameters {
        self.calls.borrow_mut().reads += 1;
        self.params
    }
}

pub struct FakeProbe(pub bool);

impl DriverProbe for FakeProbe {
    fn driver_running(&self) -> bool {
        self.0
    }
}
