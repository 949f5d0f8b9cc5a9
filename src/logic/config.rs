#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

// Safety kill-switches. Runtime-only state; nothing here is persisted,
// so they reset to defaults on restart.
static TERMINATION_ENABLED: AtomicBool = AtomicBool::new(true);
static SUPPRESSION_ENABLED: AtomicBool = AtomicBool::new(true);

pub struct SafetyConfig;

impl SafetyConfig {
    pub fn is_termination_enabled() -> bool {
        TERMINATION_ENABLED.load(Ordering::Relaxed)
    }

    pub fn is_suppression_enabled() -> bool {
        SUPPRESSION_ENABLED.load(Ordering::Relaxed)
    }

    // Setters (e.g. from an emergency control surface)
    pub fn set_termination(val: bool) {
        TERMINATION_ENABLED.store(val, Ordering::Relaxed);
    }

    pub fn set_suppression(val: bool) {
        SUPPRESSION_ENABLED.store(val, Ordering::Relaxed);
    }
}
