use super::{DEVStoneAtomic, DEVStoneSeeder, SharedProbe};
use crate::modeling::Coupled;
use crate::{with_cell, ModelError};

/// DEVStone HO (High level of Output couplings) model generator.
pub struct HO;

impl HO {
    /// Creates an HO model seeded by a single event at time 0.
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
        let mut top = Coupled::new("HO");
        let inner = Self::coupled(width, depth, int_delay, ext_delay, probe)?;
        let inner_name = inner.get_id().to_string();
        top.add_component(DEVStoneSeeder::new("seeder")?)?;
        top.add_coupled(inner)?;
        top.add_ic("seeder", "output", &inner_name, "input_1")?;
        top.add_ic("seeder", "output", &inner_name, "input_2")?;
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
        coupled.add_in_port::<usize>("input_1")?;
        coupled.add_in_port::<usize>("input_2")?;
        coupled.add_out_port::<usize>("output_1")?;
        coupled.add_out_port::<usize>("output_2")?;
        if depth == 1 {
            let atomic = DEVStoneAtomic::new("inner_atomic", int_delay, ext_delay, probe.clone())?;
            coupled.add_component(atomic)?;
            coupled.add_eic("input_1", "inner_atomic", "input")?;
            coupled.add_eoc("inner_atomic", "output", "output_1")?;
        } else {
            let subcoupled = Self::coupled(width, depth - 1, int_delay, ext_delay, probe.clone())?;
            let subcoupled_name = subcoupled.get_id().to_string();
            coupled.add_coupled(subcoupled)?;
            coupled.add_eic("input_1", &subcoupled_name, "input_1")?;
            coupled.add_eic("input_1", &subcoupled_name, "input_2")?;
            coupled.add_eoc(&subcoupled_name, "output_1", "output_1")?;
            for i in 1..width {
                // the depth suffix keeps atomic IDs unique across levels
                let atomic_name = format!("atomic_{i}_{depth}");
                let atomic =
                    DEVStoneAtomic::new(&atomic_name, int_delay, ext_delay, probe.clone())?;
                coupled.add_component(atomic)?;
                coupled.add_eic("input_2", &atomic_name, "input")?;
                if i > 1 {
                    let prev_atomic_name = format!("atomic_{}_{depth}", i - 1);
                    coupled.add_ic(&prev_atomic_name, "output", &atomic_name, "input")?;
                }
                coupled.add_eoc(&atomic_name, "output", "output_2")?;
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
