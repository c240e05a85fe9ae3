//! Default values for sidecar fields.
//!
//! Fields added after the first sidecar schema are back-filled from these when
//! an older record is loaded. Addition defaults mirror the values maskmaker
//! assumes for arguments it is not given.

pub const LICENSE: &str = "Copyright 2017 - General Workings Inc. - All rights reserved.";
pub const WEBSITE: &str = "http://streamlabs.com";
pub const COMBO_CATEGORY: &str = "Combo";

/// Number of part slots in a combo record.
pub const COMBO_SLOTS: usize = 10;

/// Maximum number of `key=value` strings in a tweak addition.
pub const TWEAK_SLOTS: usize = 10;

/// Effect every material addition is created against.
pub const MATERIAL_EFFECT: &str = "effectDefault";

pub fn tier() -> u8 {
    1
}

pub fn r#false() -> bool {
    false
}

pub fn r#true() -> bool {
    true
}

pub fn intro_fade_time() -> f64 {
    0.0
}

pub fn intro_duration() -> f64 {
    0.0
}

pub mod material {
    pub fn wrap() -> String {
        "clamp".into()
    }
}

pub mod sequence {
    pub fn grid() -> i64 {
        1
    }

    pub fn rate() -> f64 {
        4.0
    }

    pub fn mode() -> String {
        "repeat".into()
    }
}

pub mod emitter {
    pub fn part() -> String {
        "emitter1".into()
    }

    pub fn lifetime() -> f64 {
        3.0
    }

    pub fn one() -> f64 {
        1.0
    }

    pub fn rate() -> f64 {
        4.0
    }

    pub fn friction() -> f64 {
        0.9
    }

    pub fn num_particles() -> i64 {
        1000
    }

    pub fn force() -> [f64; 3] {
        [0.0, 100.0, 0.0]
    }

    pub fn initial_velocity() -> [f64; 3] {
        [0.0, 0.0, 5000.0]
    }
}
