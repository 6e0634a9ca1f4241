//! A toy rail yard playing the host role for the wear engine.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use junction_wear::{
    Branch, FlipDecision, Junction, OutBranches, RunThroughOutcome, SaveDocument, SwitchMode,
    TrackId, Vec3, Vehicle, VehicleSource, WearEngine, WearError, WearSettings,
};

/// Distance between neighbouring junctions; far beyond the speed search radius.
const JUNCTION_SPACING_M: f32 = 200.0;
/// How far from the points the probe wagon sits when an event fires.
const WAGON_OFFSET_M: f32 = 2.0;
pub const TICK_SEC: f32 = 0.2;

#[derive(Debug)]
pub struct SimJunction {
    name: String,
    at: Vec3,
    inbound: Branch,
    outs: OutBranches,
    selected: Cell<u8>,
}

impl SimJunction {
    fn new(index: usize, out_count: usize) -> Self {
        let base = u32::try_from(index).unwrap_or(u32::MAX).saturating_mul(10);
        let outs = (1..=out_count)
            .map(|offset| {
                let offset = u32::try_from(offset).unwrap_or(0);
                Branch::new(TrackId(base.saturating_add(offset)), false)
            })
            .collect();
        let x = f32::from(u16::try_from(index).unwrap_or(u16::MAX)) * JUNCTION_SPACING_M;
        Self {
            name: format!("junction-{index:03}"),
            at: Vec3::new(x, 0.0, 0.0),
            inbound: Branch::new(TrackId(base), true),
            outs,
            selected: Cell::new(0),
        }
    }

    #[must_use]
    pub const fn inbound(&self) -> Branch {
        self.inbound
    }

    #[must_use]
    pub fn selected_out(&self) -> Option<Branch> {
        self.outs.get(usize::from(self.selected.get())).copied()
    }

    fn throw(&self) {
        let count = self.outs.len().max(1);
        let next = (usize::from(self.selected.get()) + 1) % count;
        self.selected.set(u8::try_from(next).unwrap_or(0));
    }
}

impl Junction for SimJunction {
    fn stable_key(&self) -> Result<String, WearError> {
        Ok(format!("{}@{:.0}", self.name, self.at.x))
    }

    fn display_name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn position(&self) -> Option<Vec3> {
        Some(self.at)
    }

    fn in_branch(&self) -> Option<Branch> {
        Some(self.inbound)
    }

    fn out_branches(&self) -> OutBranches {
        self.outs.clone()
    }

    fn selected_branch(&self) -> u8 {
        self.selected.get()
    }
}

#[derive(Debug)]
pub struct SimWagon {
    at: Cell<Vec3>,
    mps: Cell<f32>,
}

impl Vehicle for SimWagon {
    fn position(&self) -> Vec3 {
        self.at.get()
    }

    fn velocity_mps(&self) -> Option<f32> {
        Some(self.mps.get())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimFleet(Rc<RefCell<Vec<Rc<SimWagon>>>>);

impl VehicleSource for SimFleet {
    fn live_vehicles(&self) -> Option<Vec<Weak<dyn Vehicle>>> {
        Some(
            self.0
                .borrow()
                .iter()
                .map(|wagon| {
                    let wagon: Rc<dyn Vehicle> = wagon.clone();
                    Rc::downgrade(&wagon)
                })
                .collect(),
        )
    }
}

/// Junctions, one probe wagon, a save document and the engine under test.
pub struct SimYard {
    pub engine: WearEngine,
    pub document: SaveDocument,
    junctions: Vec<Rc<SimJunction>>,
    wagon: Rc<SimWagon>,
    fleet: SimFleet,
}

impl SimYard {
    #[must_use]
    pub fn new(settings: WearSettings, seed: u64, junction_count: usize) -> Self {
        let fleet = SimFleet::default();
        let wagon = Rc::new(SimWagon {
            at: Cell::new(Vec3::new(-1_000.0, 0.0, 0.0)),
            mps: Cell::new(0.0),
        });
        fleet.0.borrow_mut().push(Rc::clone(&wagon));
        let junctions = (0..junction_count.max(1))
            .map(|index| Rc::new(SimJunction::new(index, 2)))
            .collect();
        Self {
            engine: WearEngine::new(settings, Box::new(fleet.clone()), seed),
            document: SaveDocument::new(),
            junctions,
            wagon,
            fleet,
        }
    }

    #[must_use]
    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    #[must_use]
    pub fn sim_junction(&self, index: usize) -> Rc<SimJunction> {
        Rc::clone(&self.junctions[index % self.junctions.len()])
    }

    #[must_use]
    pub fn junction(&self, index: usize) -> Rc<dyn Junction> {
        self.sim_junction(index)
    }

    #[must_use]
    pub fn vehicle_count(&self) -> usize {
        self.fleet.0.borrow().len()
    }

    pub fn tick(&mut self) {
        self.engine.on_tick(TICK_SEC);
    }

    fn park_wagon_at(&self, index: usize, kmh: f32) {
        let junction = self.sim_junction(index);
        let at = junction.position().unwrap_or_default();
        self.wagon
            .at
            .set(Vec3::new(at.x + WAGON_OFFSET_M, at.y, at.z));
        self.wagon.mps.set(kmh / 3.6);
    }

    /// A train trails through junction `index` against the points at `kmh`.
    pub fn run_through(&mut self, index: usize, kmh: f32) -> Option<RunThroughOutcome> {
        self.tick();
        self.park_wagon_at(index, kmh);
        let sim = self.sim_junction(index);
        let junction: Rc<dyn Junction> = sim.clone();
        if !self
            .engine
            .on_switch_requested(&junction, SwitchMode::Forced, None)
        {
            return None;
        }
        sim.throw();
        self.engine
            .on_forced_run_through(&junction, SwitchMode::Forced, sim.selected_branch())
    }

    /// The operator throws junction `index`. Returns whether the points moved.
    pub fn manual_switch(&mut self, index: usize) -> bool {
        self.tick();
        let sim = self.sim_junction(index);
        let junction: Rc<dyn Junction> = sim.clone();
        let allowed = self
            .engine
            .on_switch_requested(&junction, SwitchMode::Manual, None);
        if allowed {
            sim.throw();
        }
        allowed
    }

    /// A train enters junction `index` from its in-branch at `kmh`; the host
    /// asks `queries` times within the same tick which branch comes next.
    pub fn diverge(
        &mut self,
        index: usize,
        kmh: f32,
        queries: usize,
    ) -> (Option<Branch>, Vec<FlipDecision>) {
        self.tick();
        self.park_wagon_at(index, kmh);
        let sim = self.sim_junction(index);
        let junction: Rc<dyn Junction> = sim.clone();
        let inbound = sim.inbound();
        let expected = sim.selected_out();
        let mut routed = expected;
        let mut decisions = Vec::with_capacity(queries);
        for _ in 0..queries.max(1) {
            let decision =
                self.engine
                    .evaluate_branch_query(&junction, inbound.track, inbound.first, expected);
            if let Some(branch) = decision.override_branch() {
                routed = Some(branch);
            }
            decisions.push(decision);
        }
        (routed, decisions)
    }

    pub fn save(&mut self) -> bool {
        self.engine.on_save(&mut self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yard() -> SimYard {
        SimYard::new(WearSettings::default(), 42, 3)
    }

    #[test]
    fn junction_keys_are_unique_and_stable() {
        let yard = yard();
        let keys: Vec<String> = (0..yard.junction_count())
            .map(|i| yard.junction(i).stable_key().unwrap())
            .collect();
        assert_eq!(keys[0], "junction-000@0");
        assert_eq!(keys[2], "junction-002@400");
        assert_eq!(yard.vehicle_count(), 1);
    }

    #[test]
    fn run_through_throws_points_and_damages() {
        let mut yard = yard();
        let sim = yard.sim_junction(1);
        let before = sim.selected_branch();
        let outcome = yard.run_through(1, 35.0).expect("damage");
        assert_ne!(sim.selected_branch(), before);
        assert!((outcome.added - 0.03).abs() < 1e-6);
    }

    #[test]
    fn pristine_junction_routes_as_set() {
        let mut yard = yard();
        let expected = yard.sim_junction(0).selected_out();
        let (routed, decisions) = yard.diverge(0, 80.0, 1);
        assert_eq!(routed, expected);
        assert_eq!(decisions, vec![FlipDecision::Pristine]);
    }
}
