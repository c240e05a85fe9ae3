//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [tools] Section Defaults
// ============================================================================

pub mod tools {
    use std::path::PathBuf;

    pub fn maskmaker() -> Vec<String> {
        vec!["maskmaker".into()]
    }

    pub fn svn() -> Vec<String> {
        vec!["svn".into()]
    }

    pub fn morph_rest() -> PathBuf {
        "morphs/morph_rest.fbx".into()
    }
}

// ============================================================================
// [meta] Section Defaults
// ============================================================================

pub mod meta {
    use crate::meta::defaults;

    pub fn license() -> String {
        defaults::LICENSE.into()
    }

    pub fn website() -> String {
        defaults::WEBSITE.into()
    }

    pub fn author() -> String {
        String::new()
    }
}

// ============================================================================
// [upload] Section Defaults
// ============================================================================

pub mod upload {
    pub fn command() -> Vec<String> {
        vec!["aws".into(), "s3".into(), "cp".into()]
    }

    pub fn bucket() -> String {
        String::new()
    }

    pub fn prefix() -> String {
        String::new()
    }
}

// ============================================================================
// Window Defaults
// ============================================================================

pub mod window {
    pub fn x() -> i32 {
        50
    }

    pub fn y() -> i32 {
        50
    }
}
