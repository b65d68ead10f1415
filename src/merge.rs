//! Merge engine: folds N committed coins of one denomination into the next one up,
//! repeatedly, until no rule applies.

use crate::coin::{CoinArena, CoinId, Denomination, Place, Variant};
use crate::events::{Event, EventQueue};
use crate::slots::SlotBoard;
use crate::tray::{InsertHint, TraySequencer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRule {
    pub input: Denomination,
    pub required: usize,
    pub output: Denomination,
}

impl MergeRule {
    pub const fn new(input: Denomination, required: usize, output: Denomination) -> Self {
        Self {
            input,
            required,
            output,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeRuleError {
    #[error("rule for {0} needs at least 2 coins")]
    TooFewInputs(Denomination),
    #[error("rule {input} -> {output} does not go up in value")]
    NotUpward {
        input: Denomination,
        output: Denomination,
    },
    #[error("more than one rule consumes {0}")]
    Duplicate(Denomination),
}

/// Ordered merge rules. Earlier rules win when several are satisfied at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MergeRule>", into = "Vec<MergeRule>")]
pub struct MergeTable {
    rules: Vec<MergeRule>,
}

impl Default for MergeTable {
    fn default() -> Self {
        use Denomination::*;
        Self {
            rules: vec![
                MergeRule::new(Half, 2, One),
                MergeRule::new(One, 5, Five),
                MergeRule::new(Five, 2, Ten),
                MergeRule::new(Ten, 5, Fifty),
                MergeRule::new(Fifty, 2, OneHundred),
                MergeRule::new(OneHundred, 5, FiveHundred),
                MergeRule::new(FiveHundred, 2, OneThousand),
            ],
        }
    }
}

impl TryFrom<Vec<MergeRule>> for MergeTable {
    type Error = MergeRuleError;

    fn try_from(rules: Vec<MergeRule>) -> Result<Self, Self::Error> {
        Self::new(rules)
    }
}

impl From<MergeTable> for Vec<MergeRule> {
    fn from(table: MergeTable) -> Self {
        table.rules
    }
}

impl MergeTable {
    /// Every rule consumes at least two coins and produces a higher denomination, so each
    /// merge strictly shrinks the tray and the fixpoint loop terminates.
    pub fn new(rules: Vec<MergeRule>) -> Result<Self, MergeRuleError> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.required < 2 {
                return Err(MergeRuleError::TooFewInputs(rule.input));
            }
            if rule.output <= rule.input {
                return Err(MergeRuleError::NotUpward {
                    input: rule.input,
                    output: rule.output,
                });
            }
            if rules[..i].iter().any(|r| r.input == rule.input) {
                return Err(MergeRuleError::Duplicate(rule.input));
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[MergeRule] {
        &self.rules
    }

    pub fn rule_for(&self, input: Denomination) -> Option<&MergeRule> {
        self.rules.iter().find(|r| r.input == input)
    }

    /// Some rule is met by the tray's coins, pending ones included.
    pub fn is_available(&self, tray: &TraySequencer) -> bool {
        self.rules
            .iter()
            .any(|r| tray.count(r.input) >= r.required)
    }

    /// The next merge to run on committed coins: the first satisfied rule, fed by the
    /// oldest-placed (leftmost) committed coins of its input.
    pub fn plan(&self, tray: &TraySequencer) -> Option<MergePlan> {
        self.rules.iter().find_map(|rule| {
            let inputs: Vec<CoinId> = tray
                .committed()
                .filter(|e| e.denomination == rule.input)
                .take(rule.required)
                .map(|e| e.coin)
                .collect();
            if inputs.len() < rule.required {
                return None;
            }
            let site = tray.index_of(inputs[0])?;
            Some(MergePlan {
                rule: *rule,
                inputs,
                site,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub rule: MergeRule,
    pub inputs: Vec<CoinId>,
    /// Tray position of the first input before removal.
    pub site: usize,
}

/// What a run of the engine produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub merges: usize,
    /// Merged coins that matched a slot and are now flying there.
    pub to_slots: Vec<CoinId>,
}

/// Run merges until no rule is satisfied by committed coins.
///
/// Inputs leave the tray and the arena. The merged coin goes to a matching slot if there
/// is one; otherwise it is placed in the tray (at the merge site unless its denomination
/// already has a group) and committed straight away, which may enable the next merge.
pub fn run_to_fixpoint(
    table: &MergeTable,
    tray: &mut TraySequencer,
    coins: &mut CoinArena,
    slots: &SlotBoard,
    events: &mut EventQueue,
) -> MergeReport {
    let mut report = MergeReport::default();
    while let Some(plan) = table.plan(tray) {
        let mut position = None;
        for &id in &plan.inputs {
            tray.remove(id);
            if let Some(coin) = coins.remove(id) {
                position.get_or_insert(coin.position);
            }
        }
        let output = plan.rule.output;
        let merged = coins.spawn(
            output,
            Variant::Normal,
            position.unwrap_or_default(),
            Place::Tray,
        );
        log::info!(
            "merged {} x {} into {} {}",
            plan.inputs.len(),
            plan.rule.input,
            output,
            merged
        );
        events.push(Event::MergeStarted {
            inputs: plan.inputs,
            output,
            merged,
        });
        report.merges += 1;

        if let Some(slot) = slots.matching(output) {
            if let Some(coin) = coins.get_mut(merged) {
                coin.place = Place::SlotFlight(slot);
            }
            events.push(Event::CoinToSlot { coin: merged, slot });
            report.to_slots.push(merged);
            continue;
        }

        match tray.request_insert_with(merged, output, InsertHint::At(plan.site)) {
            Ok(_) => {
                if let Some(index) = tray.confirm_insert(merged) {
                    events.push(Event::CoinSettled {
                        coin: merged,
                        index,
                    });
                }
            }
            Err(e) => {
                // Inputs were removed first, so there is always room.
                log::error!("could not place merged coin {}: {}", merged, e);
                break;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Denomination::{Five, Half, One, Ten};
    use crate::grid::WorldPos;
    use crate::tray::{InsertPolicy, Phase};

    struct Rig {
        tray: TraySequencer,
        coins: CoinArena,
        slots: SlotBoard,
        events: EventQueue,
        table: MergeTable,
    }

    impl Rig {
        fn new(capacity: usize, slots: &[Denomination]) -> Self {
            Self {
                tray: TraySequencer::new(capacity, InsertPolicy::GroupSameType),
                coins: CoinArena::new(),
                slots: SlotBoard::new(slots.iter().copied()),
                events: EventQueue::new(),
                table: MergeTable::default(),
            }
        }

        fn land(&mut self, denomination: Denomination) -> CoinId {
            let id = self.coins.spawn(
                denomination,
                Variant::Normal,
                WorldPos::default(),
                Place::Tray,
            );
            self.tray.request_insert(id, denomination).unwrap();
            self.tray.confirm_insert(id).unwrap();
            id
        }

        fn run(&mut self) -> MergeReport {
            run_to_fixpoint(
                &self.table,
                &mut self.tray,
                &mut self.coins,
                &self.slots,
                &mut self.events,
            )
        }

        fn denominations(&self) -> Vec<Denomination> {
            self.tray.layout().map(|(_, e)| e.denomination).collect()
        }

        fn merges(&self) -> Vec<&Event> {
            self.events
                .iter()
                .filter(|e| matches!(e, Event::MergeStarted { .. }))
                .collect()
        }
    }

    #[test]
    fn default_table_is_valid() {
        let table = MergeTable::default();
        assert!(MergeTable::new(table.rules().to_vec()).is_ok());
        assert_eq!(table.rule_for(One).map(|r| r.required), Some(5));
    }

    #[test]
    fn rejects_rules_that_would_not_terminate() {
        assert_eq!(
            MergeTable::new(vec![MergeRule::new(Half, 1, One)]),
            Err(MergeRuleError::TooFewInputs(Half))
        );
        assert_eq!(
            MergeTable::new(vec![MergeRule::new(Ten, 2, Five)]),
            Err(MergeRuleError::NotUpward {
                input: Ten,
                output: Five
            })
        );
        assert_eq!(
            MergeTable::new(vec![MergeRule::new(Half, 2, One), MergeRule::new(Half, 3, Five)]),
            Err(MergeRuleError::Duplicate(Half))
        );
    }

    #[test]
    fn table_deserializes_with_validation() {
        let ok: MergeTable =
            serde_json::from_str(r#"[{"input":"Half","required":3,"output":"One"}]"#).unwrap();
        assert_eq!(ok.rules().len(), 1);
        let bad = serde_json::from_str::<MergeTable>(
            r#"[{"input":"Half","required":0,"output":"One"}]"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn two_halves_become_one_in_place() {
        let mut rig = Rig::new(10, &[]);
        let a = rig.land(Half);
        let b = rig.land(Half);
        rig.land(Five);
        assert_eq!(rig.denominations(), vec![Half, Half, Five]);

        let report = rig.run();
        assert_eq!(report.merges, 1);
        assert_eq!(rig.denominations(), vec![One, Five]);
        let merges = rig.merges();
        assert_eq!(merges.len(), 1);
        assert!(matches!(
            merges[0],
            Event::MergeStarted { inputs, output: One, .. } if inputs == &vec![a, b]
        ));
        assert!(rig.coins.get(a).is_none());
    }

    #[test]
    fn pending_coins_are_never_consumed() {
        let mut rig = Rig::new(10, &[]);
        rig.land(Half);
        let flying = rig.coins.spawn(Half, Variant::Normal, WorldPos::default(), Place::Tray);
        rig.tray.request_insert(flying, Half).unwrap();

        assert_eq!(rig.run().merges, 0);
        assert_eq!(rig.tray.phase_of(flying), Some(Phase::Pending));
        // Still counts as "a merge is coming" for the full check.
        assert!(rig.table.is_available(&rig.tray));
    }

    #[test]
    fn third_half_at_capacity_merges_instead_of_failing() {
        let mut rig = Rig::new(3, &[]);
        rig.land(Half);
        rig.land(Half);
        rig.land(Half);
        assert_eq!(rig.tray.len(), 3);
        assert!(!rig.tray.is_full(&rig.table));

        rig.run();
        assert_eq!(rig.denominations(), vec![One, Half]);
        assert!(!rig.tray.is_full(&rig.table));
    }

    #[test]
    fn merges_chain_until_nothing_applies() {
        let mut rig = Rig::new(10, &[]);
        for _ in 0..4 {
            rig.land(One);
        }
        rig.land(Five);
        rig.land(Half);
        rig.land(Half);

        let report = rig.run();
        // 2 Half -> One, 5 One -> Five, 2 Five -> Ten.
        assert_eq!(report.merges, 3);
        assert_eq!(rig.denominations(), vec![Ten]);
    }

    #[test]
    fn merged_coin_matching_a_slot_flies_there() {
        let mut rig = Rig::new(10, &[Ten, One]);
        rig.land(Half);
        rig.land(Half);
        let report = rig.run();
        assert_eq!(report.to_slots.len(), 1);
        let merged = report.to_slots[0];
        assert!(rig.tray.is_empty());
        assert_eq!(
            rig.coins.get(merged).map(|c| c.place),
            Some(Place::SlotFlight(1))
        );
        assert!(rig.events.iter().any(|e| *e == Event::CoinToSlot { coin: merged, slot: 1 }));
    }

    #[test]
    fn earlier_rule_wins() {
        let mut rig = Rig::new(10, &[]);
        rig.land(Five);
        rig.land(Five);
        rig.land(Half);
        rig.land(Half);
        rig.run();
        let first = rig.merges().first().map(|e| match e {
            Event::MergeStarted { output, .. } => *output,
            _ => Half,
        });
        assert_eq!(first, Some(One));
        assert_eq!(rig.denominations(), vec![Ten, One]);
    }
}
