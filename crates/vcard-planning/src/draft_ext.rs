//! Plan access on [`Draft`]

use vcard_core::{Draft, VIBE_PLAN_KEY};

use crate::plan::{normalize_vibe_plan, VibePlan};

/// Read and replace the plan embedded in a draft
pub trait DraftPlanExt {
    /// Normalized embedded plan, if one is stored
    fn vibe_plan(&self) -> Option<VibePlan>;

    /// New draft with `plan` stored under `vibePlan`
    fn with_vibe_plan(&self, plan: &VibePlan) -> Draft;

    /// New draft with no embedded plan
    fn without_vibe_plan(&self) -> Draft;
}

impl DraftPlanExt for Draft {
    fn vibe_plan(&self) -> Option<VibePlan> {
        self.vibe_plan_value().map(normalize_vibe_plan)
    }

    fn with_vibe_plan(&self, plan: &VibePlan) -> Draft {
        let mut next = self.clone();
        let value = plan.to_value();
        // Keep the key's position when replacing an existing plan
        match next.raw.data_extensions.get_mut(VIBE_PLAN_KEY) {
            Some(slot) => *slot = value,
            None => {
                next.raw
                    .data_extensions
                    .insert(VIBE_PLAN_KEY.to_string(), value);
            }
        }
        next
    }

    fn without_vibe_plan(&self) -> Draft {
        let mut next = self.clone();
        next.raw.data_extensions.shift_remove(VIBE_PLAN_KEY);
        next
    }
}
