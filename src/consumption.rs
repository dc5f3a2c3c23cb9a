use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{DailyConsumedTotals, MacroTotals, MealEntry, MealSlot, MealSlotSummary};

/// Totals of a list of entries, truncated to whole kcal and grams.
pub fn sum_entries(entries: &[MealEntry]) -> MacroTotals {
    let (kcal, protein, fat, carbs) = entries.iter().fold(
        (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64),
        |(kcal, protein, fat, carbs), e| {
            (kcal + e.kcal, protein + e.protein, fat + e.fat, carbs + e.carbs)
        },
    );
    MacroTotals {
        kcal: kcal as i64,
        carbs: carbs as i64,
        protein: protein as i64,
        fat: fat as i64,
    }
}

/// Fold a new round of entries into a slot.
///
/// With no existing summary the entries' totals become the summary; otherwise
/// they are added onto it, so saving breakfast twice keeps both rounds.
pub fn merge_meal_slot(existing: Option<&MealSlotSummary>, entries: &[MealEntry]) -> MealSlotSummary {
    let delta = sum_entries(entries);
    match existing {
        Some(summary) => *summary + delta,
        None => delta,
    }
}

/// Elementwise sum of slot summaries. Order doesn't matter.
pub fn aggregate_consumed<'a, I>(summaries: I) -> DailyConsumedTotals
where
    I: IntoIterator<Item = &'a MealSlotSummary>,
{
    summaries
        .into_iter()
        .fold(MacroTotals::default(), |total, summary| total + *summary)
}

/// The slot summaries saved for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayMeals {
    slots: BTreeMap<MealSlot, MealSlotSummary>,
}

impl DayMeals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary for a slot; an unsaved slot reads as zero.
    pub fn get(&self, slot: MealSlot) -> MealSlotSummary {
        self.slots.get(&slot).copied().unwrap_or_default()
    }

    pub fn contains(&self, slot: MealSlot) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Replace a slot's summary, as read back from storage.
    pub fn set(&mut self, slot: MealSlot, summary: MealSlotSummary) {
        self.slots.insert(slot, summary);
    }

    pub fn apply(&mut self, slot: MealSlot, entries: &[MealEntry]) -> MealSlotSummary {
        let merged = merge_meal_slot(self.slots.get(&slot), entries);
        self.slots.insert(slot, merged);
        merged
    }

    pub fn delete(&mut self, slot: MealSlot) -> Option<MealSlotSummary> {
        self.slots.remove(&slot)
    }

    pub fn totals(&self) -> DailyConsumedTotals {
        aggregate_consumed(self.slots.values())
    }

    /// All four slots in display order, unsaved ones as zero.
    pub fn iter(&self) -> impl Iterator<Item = (MealSlot, MealSlotSummary)> + '_ {
        MealSlot::ALL.into_iter().map(|slot| (slot, self.get(slot)))
    }
}

/// Products picked for a meal that hasn't been saved yet.
#[derive(Debug, Clone, Default)]
pub struct MealDraft {
    entries: Vec<MealEntry>,
}

impl MealDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: MealEntry) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, index: usize) -> Option<MealEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn entries(&self) -> &[MealEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn totals(&self) -> MacroTotals {
        sum_entries(&self.entries)
    }

    /// Hand the entries over for saving, leaving the draft empty.
    pub fn take(&mut self) -> Vec<MealEntry> {
        std::mem::take(&mut self.entries)
    }
}
