use super::{DEVStoneAtomic, DEVStoneSeeder, SharedProbe};
use crate::modeling::Coupled;
use crate::{with_cell, ModelError};

/// DEVStone LI (Low level of Interconnections) model generator.
pub struct LI;

impl LI {
    /// Creates an LI model seeded by a single event at time 0.
    pub fn create(
        width: usize,
        depth: usize,
        int_delay: u64,
        ext_delay: u64,
    ) -> Result<Coupled, ModelError> {
        Self::seeded(width, depth, int_delay, ext_delay, None)
    }

    #[cfg(test)]
    pub(crate) fn create_probed(
        width: usize,
        depth: usize,
        int_delay: u64,
        ext_delay: u64,
        probe: SharedProbe,
    ) -> Result<Coupled, ModelError> {
        Self::seeded(width, depth, int_delay, ext_delay, Some(probe))
    }

    fn seeded(
        width: usize,
        depth: usize,
        int_delay: u64,
        ext_delay: u64,
        probe: Option<SharedProbe>,
    ) -> Result<Coupled, ModelError> {
        let mut top = Coupled::new("LI");
        let inner = Self::coupled(width, depth, int_delay, ext_delay, probe)?;
        let inner_name = inner.get_id().to_string();
        top.add_component(DEVStoneSeeder::new("seeder")?)?;
        top.add_coupled(inner)?;
        top.add_ic("seeder", "output", &inner_name, "input")?;
        Ok(top)
    }

    fn coupled(
        width: usize,
        depth: usize,
        int_delay: u64,
        ext_delay: u64,
        probe: Option<SharedProbe>,
    ) -> Result<Coupled, ModelError> {
        assert!(width >= 1, "width must be greater than or equal to 1");
        assert!(depth >= 1, "depth must be greater than or equal to 1");
        let mut coupled = Coupled::new(&format!("coupled_{depth}"));
        coupled.add_in_port::<usize>("input")?;
        coupled.add_out_port::<usize>("output")?;
        if depth == 1 {
            // innermost level: one atomic bridges the interface
            let atomic = DEVStoneAtomic::new("inner_atomic", int_delay, ext_delay, probe.clone())?;
            coupled.add_component(atomic)?;
            coupled.add_eic("input", "inner_atomic", "input")?;
            coupled.add_eoc("inner_atomic", "output", "output")?;
        } else {
            let subcoupled = Self::coupled(width, depth - 1, int_delay, ext_delay, probe.clone())?;
            let subcoupled_name = subcoupled.get_id().to_string();
            coupled.add_coupled(subcoupled)?;
            coupled.add_eic("input", &subcoupled_name, "input")?;
            coupled.add_eoc(&subcoupled_name, "output", "output")?;
            for i in 1..width {
                // the depth suffix keeps atomic IDs unique across levels
                let atomic_name = format!("atomic_{i}_{depth}");
                let atomic =
                    DEVStoneAtomic::new(&atomic_name, int_delay, ext_delay, probe.clone())?;
                coupled.add_component(atomic)?;
                coupled.add_eic("input", &atomic_name, "input")?;
            }
        }
        if let Some(probe) = probe {
            with_cell(&probe, |probe| {
                probe.n_eics += coupled.n_eics();
                probe.n_ics += coupled.n_ics();
                probe.n_eocs += coupled.n_eocs();
            });
        }
        Ok(coupled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devstone::TestProbe;
    use crate::shared_cell;
    use crate::simulation::RootCoordinator;

    fn expected_atomics(width: usize, depth: usize) -> usize {
        (width - 1) * (depth - 1) + 1
    }

    fn expected_eics(width: usize, depth: usize) -> usize {
        width * (depth - 1) + 1
    }

    #[test]
    fn test_li() {
        for width in (1..50).step_by(7) {
            for depth in (1..50).step_by(7) {
                let probe = shared_cell(TestProbe::default());
                let coupled = LI::create_probed(width, depth, 0, 0, probe.clone()).unwrap();
                with_cell(&probe, |p| {
                    assert_eq!(expected_atomics(width, depth), p.n_atomics);
                    assert_eq!(expected_eics(width, depth), p.n_eics);
                    assert_eq!(0, p.n_ics);
                    assert_eq!(depth, p.n_eocs);
                });
                let mut root = RootCoordinator::new(coupled);
                root.start();
                root.simulate_time(f64::INFINITY).unwrap();
                root.stop();
                with_cell(&probe, |p| {
                    assert_eq!(expected_atomics(width, depth), p.n_internals);
                    assert_eq!(expected_atomics(width, depth), p.n_externals);
                    assert_eq!(expected_atomics(width, depth), p.n_events);
                });
            }
        }
    }

    /// A flattened LI model preserves the transition and event counts.
    #[test]
    fn test_li_flattened() {
        let probe = shared_cell(TestProbe::default());
        let mut coupled = LI::create_probed(5, 5, 0, 0, probe.clone()).unwrap();
        coupled.flatten().unwrap();
        // 17 atomics plus the seeder, all of them direct children now
        assert_eq!(18, coupled.n_components());
        let mut root = RootCoordinator::new(coupled);
        root.start();
        root.simulate_time(f64::INFINITY).unwrap();
        root.stop();
        with_cell(&probe, |p| {
            assert_eq!(17, p.n_atomics);
            assert_eq!(17, p.n_internals);
            assert_eq!(17, p.n_externals);
            assert_eq!(17, p.n_events);
        });
    }
}
