//! Shared test rig: a controller over the simulation driver, its surface,
//! and the simulator override handle.

use std::path::PathBuf;
use std::sync::Arc;

use g5500_common::cal::CalStore;
use g5500_common::consts::TICK;
use g5500_common::state::SimMode;
use g5500_control::{Controller, SharedState, Surface};
use g5500_hal::{SimControls, SimHal};
use tempfile::TempDir;

pub struct Rig {
    pub controller: Controller,
    pub shared: Arc<SharedState>,
    pub surface: Surface,
    pub sim: Arc<SimControls>,
    dir: TempDir,
}

/// Build an unspawned rig; tests drive `tick` by hand.
pub fn rig(mode: SimMode) -> Rig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cal.txt");
    let hal = SimHal::new(mode);
    let sim = hal.controls();
    let shared = Arc::new(SharedState::new());
    let controller = Controller::new(Box::new(hal), Arc::clone(&shared), CalStore::new(&path));
    let surface = Surface::new(Arc::clone(&shared), CalStore::new(&path));
    Rig {
        controller,
        shared,
        surface,
        sim,
        dir,
    }
}

impl Rig {
    /// Run `n` control cycles at the nominal tick period.
    pub fn tick(&mut self, n: usize) {
        for _ in 0..n {
            self.controller.tick(TICK);
        }
    }

    pub fn cal_path(&self) -> PathBuf {
        self.dir.path().join("cal.txt")
    }

    pub fn pins_all_low(&self) -> bool {
        !self.sim.any_pin_high()
    }
}
