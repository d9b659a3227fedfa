use crate::params::{GuideLength, ShotParamStore, ShotType};

/// Cycles the closed shot-type set. The machine gates calls to the phases
/// where the parameters are still mutable.
pub struct TypeSelector;

impl TypeSelector {
    pub fn cycle(store: &mut ShotParamStore) {
        store.set_draft_type(store.draft_type().next());
    }

    /// Boundary entry point for externally configured names.
    pub fn set_named(store: &mut ShotParamStore, name: &str) {
        store.set_draft_type(ShotType::from_name(name));
    }
}

/// Cycles the discrete guide-length category. Only the category is
/// recorded here; how far the preview is drawn is the renderer's business.
pub struct GuideSelector;

impl GuideSelector {
    pub fn cycle(store: &mut ShotParamStore) {
        store.set_draft_guide(store.draft_guide().next());
    }

    pub fn set_named(store: &mut ShotParamStore, name: &str) {
        store.set_draft_guide(GuideLength::from_name(name));
    }
}
