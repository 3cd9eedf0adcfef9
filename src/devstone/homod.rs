use super::{DEVStoneAtomic, DEVStoneSeeder, SharedProbe};
use crate::modeling::Coupled;
use crate::{with_cell, ModelError};

/// DEVStone HOmod (HO modified) model generator. Every level carries a
/// fully-interconnected triangular second layer of atomics.
pub struct HOmod;

impl HOmod {
    /// Creates an HOmod model seeded by a single event at time 0.
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
        let mut top = Coupled::new("HOmod");
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
        coupled.add_out_port::<usize>("output")?;
        if depth == 1 {
            let atomic = DEVStoneAtomic::new("inner_atomic", int_delay, ext_delay, probe.clone())?;
            coupled.add_component(atomic)?;
            coupled.add_eic("input_1", "inner_atomic", "input")?;
            coupled.add_eoc("inner_atomic", "output", "output")?;
        } else {
            let subcoupled = Self::coupled(width, depth - 1, int_delay, ext_delay, probe.clone())?;
            let subcoupled_name = subcoupled.get_id().to_string();
            coupled.add_coupled(subcoupled)?;
            coupled.add_eic("input_1", &subcoupled_name, "input_1")?;
            coupled.add_eoc(&subcoupled_name, "output", "output")?;
            // first row: width - 1 atomics feeding the nested coupled model
            let mut prev_row = Vec::new();
            for i in 1..width {
                let atomic_name = format!("atomic_1_{i}_{depth}");
                prev_row.push(atomic_name.clone());
                let atomic =
                    DEVStoneAtomic::new(&atomic_name, int_delay, ext_delay, probe.clone())?;
                coupled.add_component(atomic)?;
                coupled.add_eic("input_2", &atomic_name, "input")?;
                coupled.add_ic(&atomic_name, "output", &subcoupled_name, "input_2")?;
            }
            // second row: width - 1 atomics, each coupled to the whole first row
            let mut current_row = Vec::new();
            for i in 1..width {
                let atomic_name = format!("atomic_2_{i}_{depth}");
                current_row.push(atomic_name.clone());
                let atomic =
                    DEVStoneAtomic::new(&atomic_name, int_delay, ext_delay, probe.clone())?;
                coupled.add_component(atomic)?;
                if i == 1 {
                    coupled.add_eic("input_2", &atomic_name, "input")?;
                }
                for prev_name in &prev_row {
                    coupled.add_ic(&atomic_name, "output", prev_name, "input")?;
                }
            }
            // remaining rows shrink by one atomic each; row r couples one-to-one
            // with row r - 1
            for row in 3..(width + 1) {
                prev_row = current_row;
                current_row = Vec::new();
                for i in 1..prev_row.len() {
                    let atomic_name = format!("atomic_{row}_{i}_{depth}");
                    current_row.push(atomic_name.clone());
                    let atomic =
                        DEVStoneAtomic::new(&atomic_name, int_delay, ext_delay, probe.clone())?;
                    coupled.add_component(atomic)?;
                    if i == 1 {
                        coupled.add_eic("input_2", &atomic_name, "input")?;
                    }
                    coupled.add_ic(&atomic_name, "output", &prev_row[i], "input")?;
                }
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
