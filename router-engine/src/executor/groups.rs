use num_bigint::BigUint;
use router_common::{
    math::apply_percent,
    models::{Group, SwapStep},
};

/// Running amount of every bucket of a route, indexed by bucket id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutputs {
    amounts: Vec<BigUint>,
}

impl GroupOutputs {
    /// Seeds each parent group's bucket with its share of `amount_in`.
    ///
    /// Ids must be below `group_count`. Routes are validated before seeding, which also keeps
    /// `group_count` within `MAX_GROUP_COUNT`.
    pub fn seed(group_count: u32, parent_groups: &[Group], amount_in: &BigUint) -> Self {
        let mut amounts = vec![BigUint::default(); group_count as usize];
        for group in parent_groups {
            if let Some(bucket) = amounts.get_mut(group.id as usize) {
                *bucket += apply_percent(amount_in, group.percent);
            }
        }
        Self { amounts }
    }

    pub fn get(&self, id: u32) -> Option<&BigUint> {
        self.amounts.get(id as usize)
    }

    /// Input of `step`: its share of the parent bucket. The bucket itself is left untouched, so
    /// sibling steps split the same base amount.
    pub fn draw(&self, step: &SwapStep) -> BigUint {
        self.get(step.parent_group_id)
            .map(|amount| apply_percent(amount, step.percent))
            .unwrap_or_default()
    }

    pub fn credit(&mut self, id: u32, amount: &BigUint) {
        if let Some(bucket) = self.amounts.get_mut(id as usize) {
            *bucket += amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use router_common::{models::Address, Bytes};

    use super::*;

    fn step(parent: u32, percent: u32) -> SwapStep {
        SwapStep {
            venue: "uniswap_v2".to_string(),
            path: [Address::from(1u8), Address::from(2u8)],
            pool: Bytes::new(),
            percent,
            group_id: 2,
            parent_group_id: parent,
            aux_data: Bytes::new(),
        }
    }

    #[test]
    fn test_seed_and_draw() {
        let groups = [Group { id: 0, percent: 33_333 }, Group { id: 1, percent: 66_667 }];
        let mut outputs = GroupOutputs::seed(3, &groups, &BigUint::from(100u32));

        assert_eq!(outputs.get(0), Some(&BigUint::from(33u32)));
        assert_eq!(outputs.get(1), Some(&BigUint::from(66u32)));
        assert_eq!(outputs.draw(&step(1, 50_000)), BigUint::from(33u32));
        assert_eq!(outputs.draw(&step(1, 50_000)), BigUint::from(33u32));
        assert_eq!(outputs.draw(&step(2, 100_000)), BigUint::default());

        outputs.credit(2, &BigUint::from(7u32));
        outputs.credit(2, &BigUint::from(5u32));
        assert_eq!(outputs.draw(&step(2, 100_000)), BigUint::from(12u32));
    }
}
