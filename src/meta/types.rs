//! Sidecar record types.

use super::{MetaError, additions::Addition, defaults};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, path::Path};

// ============================================================================
// Asset kind
// ============================================================================

/// What a source path describes. Resolved once from the extension when the
/// record is loaded and carried on the record from then on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssetKind {
    /// A single FBX model
    #[default]
    Mask,
    /// A JSON manifest merging several masks
    Combo,
}

impl AssetKind {
    /// `.fbx` (any case) is a mask, `.json` is a combo, anything else is not an asset.
    pub fn from_source(source: &Path) -> Option<Self> {
        let ext = source.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("fbx") {
            Some(Self::Mask)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Combo)
        } else {
            None
        }
    }

    pub const fn sidecar_extension(self) -> &'static str {
        match self {
            Self::Mask => "meta",
            Self::Combo => "combo",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mask => "mask",
            Self::Combo => "combo",
        })
    }
}

// ============================================================================
// Texture size
// ============================================================================

/// Maximum texture edge in pixels, a power of two between 32 and 16384.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TextureSize(u32);

impl TextureSize {
    pub const MIN: u32 = 32;
    pub const MAX: u32 = 16384;

    pub const fn new(px: u32) -> Option<Self> {
        if px >= Self::MIN && px <= Self::MAX && px.is_power_of_two() {
            Some(Self(px))
        } else {
            None
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for TextureSize {
    fn default() -> Self {
        Self(256)
    }
}

impl TryFrom<u32> for TextureSize {
    type Error = String;

    fn try_from(px: u32) -> Result<Self, Self::Error> {
        Self::new(px).ok_or_else(|| {
            format!(
                "texture_max must be a power of two in {}..={}, got {px}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<TextureSize> for u32 {
    fn from(size: TextureSize) -> Self {
        size.0
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// One recorded build input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub file: String,
    /// Seconds since the epoch at the last build, `0.0` when the file was missing
    pub modtime: f64,
}

/// The `additions` list: addition records for a mask, part slots for a combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum Additions {
    Mask(Vec<Addition>),
    /// Source paths of the merged masks, empty string for an unused slot
    Parts(Vec<String>),
}

impl Default for Additions {
    fn default() -> Self {
        Self::Mask(Vec::new())
    }
}

impl TryFrom<Value> for Additions {
    type Error = String;

    /// All strings is a slot list; anything else must be addition records.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let items = match value {
            Value::Null => return Ok(Self::default()),
            Value::Array(items) => items,
            other => return Err(format!("`additions` must be a list, found {other}")),
        };
        if !items.is_empty() && items.iter().all(Value::is_string) {
            let slots = items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect();
            return Ok(Self::Parts(slots));
        }
        items
            .into_iter()
            .map(Addition::from_loose)
            .collect::<Result<_, _>>()
            .map(Self::Mask)
    }
}

impl Additions {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Mask(list) => list.is_empty(),
            Self::Parts(slots) => slots.is_empty(),
        }
    }

    /// Coerce to the shape `kind` expects. An empty list fits either kind;
    /// a combo with no slots is padded to the full slot count.
    pub(super) fn reconcile(&mut self, kind: AssetKind) -> Result<(), &'static str> {
        match (kind, &*self) {
            (AssetKind::Mask, Self::Mask(_)) => Ok(()),
            (AssetKind::Mask, Self::Parts(slots)) if slots.iter().all(String::is_empty) => {
                *self = Self::Mask(Vec::new());
                Ok(())
            }
            (AssetKind::Combo, Self::Parts(slots)) if !slots.is_empty() => Ok(()),
            (AssetKind::Combo, a) if a.is_empty() => {
                *self = Self::Parts(vec![String::new(); defaults::COMBO_SLOTS]);
                Ok(())
            }
            (AssetKind::Mask, Self::Parts(_)) => Err("part slots"),
            (AssetKind::Combo, _) => Err("addition records"),
        }
    }
}

/// Contents of one sidecar file.
///
/// Keys are the snake_case names used on disk. Fields introduced after the
/// first schema carry serde defaults so older sidecars load with the
/// documented values; keys this version does not know are kept in `extra`
/// and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Source path (FBX or combo JSON) relative to the working copy root
    #[serde(default)]
    pub fbx: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    /// Comma-joined, normalized on save
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub website: String,
    #[serde(default = "defaults::tier")]
    pub tier: u8,
    /// `None` when the key is absent, which marks the record as corrupt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_morph: Option<bool>,
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default = "defaults::r#false")]
    pub is_intro: bool,
    #[serde(default = "defaults::r#false")]
    pub draw_video_with_mask: bool,
    #[serde(default)]
    pub depth_head: bool,
    #[serde(default)]
    pub do_not_release: bool,
    #[serde(default = "defaults::r#false")]
    pub release_with_plugin: bool,
    #[serde(default)]
    pub texture_max: TextureSize,
    #[serde(default = "defaults::intro_fade_time")]
    pub intro_fade_time: f64,
    #[serde(default = "defaults::intro_duration")]
    pub intro_duration: f64,
    #[serde(default)]
    pub additions: Additions,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Set by the store from the source extension
    #[serde(skip)]
    pub kind: AssetKind,
}

impl Metadata {
    /// Fresh record for `source` with a new UUID.
    pub fn new(source: &str, kind: AssetKind) -> Self {
        let mut meta = Self {
            fbx: source.to_owned(),
            uuid: uuid::Uuid::new_v4().to_string(),
            name: String::new(),
            description: String::new(),
            author: String::new(),
            tags: String::new(),
            category: String::new(),
            license: defaults::LICENSE.to_owned(),
            website: defaults::WEBSITE.to_owned(),
            tier: defaults::tier(),
            is_morph: Some(false),
            is_vip: false,
            is_intro: false,
            draw_video_with_mask: false,
            depth_head: false,
            do_not_release: false,
            release_with_plugin: false,
            texture_max: TextureSize::default(),
            intro_fade_time: defaults::intro_fade_time(),
            intro_duration: defaults::intro_duration(),
            additions: Additions::default(),
            dependencies: Vec::new(),
            extra: Map::new(),
            kind,
        };
        if kind == AssetKind::Combo {
            meta.category = defaults::COMBO_CATEGORY.to_owned();
            meta.additions = Additions::Parts(vec![String::new(); defaults::COMBO_SLOTS]);
        }
        meta
    }

    pub fn source(&self) -> &Path {
        Path::new(&self.fbx)
    }

    pub fn is_morph(&self) -> bool {
        self.is_morph.unwrap_or(false)
    }

    /// Lowercase, trim each tag, drop empty ones, join without spaces.
    pub fn normalize_tags(&mut self) {
        self.tags = self
            .tags
            .to_lowercase()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",");
    }

    // ------------------------------------------------------------------------
    // Field editing
    // ------------------------------------------------------------------------

    /// Set a scalar field from text, parsed to the field's type.
    ///
    /// `fbx`, `uuid`, `license`, `additions` and `dependencies` are not editable.
    pub fn set_field(&mut self, field: &str, text: &str) -> Result<(), MetaError> {
        let invalid = || MetaError::InvalidValue {
            field: field.to_owned(),
            value: text.to_owned(),
        };

        match field {
            "name" => self.name = text.to_owned(),
            "description" => self.description = text.to_owned(),
            "author" => self.author = text.to_owned(),
            "tags" => self.tags = text.to_owned(),
            "category" => self.category = text.to_owned(),
            "website" => self.website = text.to_owned(),
            "tier" => {
                self.tier = text
                    .parse()
                    .ok()
                    .filter(|t| (1..=3).contains(t))
                    .ok_or_else(invalid)?;
            }
            "texture_max" => {
                self.texture_max = text
                    .parse()
                    .ok()
                    .and_then(TextureSize::new)
                    .ok_or_else(invalid)?;
            }
            "intro_fade_time" => self.intro_fade_time = text.parse().map_err(|_| invalid())?,
            "intro_duration" => self.intro_duration = text.parse().map_err(|_| invalid())?,
            "is_morph" => self.is_morph = Some(parse_flag(text).ok_or_else(invalid)?),
            _ => {
                let flag = self.flag_mut(field)?;
                *flag = parse_flag(text).ok_or_else(invalid)?;
            }
        }
        Ok(())
    }

    fn flag_mut(&mut self, field: &str) -> Result<&mut bool, MetaError> {
        Ok(match field {
            "is_vip" => &mut self.is_vip,
            "is_intro" => &mut self.is_intro,
            "draw_video_with_mask" => &mut self.draw_video_with_mask,
            "depth_head" => &mut self.depth_head,
            "do_not_release" => &mut self.do_not_release,
            "release_with_plugin" => &mut self.release_with_plugin,
            _ => return Err(MetaError::UnknownField(field.to_owned())),
        })
    }

    // ------------------------------------------------------------------------
    // Additions editing (masks)
    // ------------------------------------------------------------------------

    /// Addition records, empty for a combo.
    pub fn addition_list(&self) -> &[Addition] {
        match &self.additions {
            Additions::Mask(list) => list,
            Additions::Parts(_) => &[],
        }
    }

    fn addition_list_mut(&mut self) -> Result<&mut Vec<Addition>, MetaError> {
        match &mut self.additions {
            Additions::Mask(list) => Ok(list),
            Additions::Parts(_) => Err(MetaError::NotAMask(self.fbx.clone())),
        }
    }

    pub fn push_addition(&mut self, addition: Addition) -> Result<(), MetaError> {
        self.addition_list_mut()?.push(addition);
        Ok(())
    }

    /// Set one field of the addition at `idx`. Returns false when there is none.
    pub fn edit_addition(&mut self, idx: usize, key: &str, text: &str) -> Result<bool, MetaError> {
        match self.addition_list_mut()?.get_mut(idx) {
            Some(addition) => addition.set_field(key, text).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn remove_addition(&mut self, idx: usize) -> Result<Option<Addition>, MetaError> {
        let list = self.addition_list_mut()?;
        Ok((idx < list.len()).then(|| list.remove(idx)))
    }

    /// Insert a copy of the addition at `idx` right after it.
    pub fn duplicate_addition(&mut self, idx: usize) -> Result<bool, MetaError> {
        let list = self.addition_list_mut()?;
        let Some(copy) = list.get(idx).cloned() else {
            return Ok(false);
        };
        list.insert(idx + 1, copy);
        Ok(true)
    }

    pub fn move_addition_up(&mut self, idx: usize) -> Result<bool, MetaError> {
        let list = self.addition_list_mut()?;
        if idx == 0 || idx >= list.len() {
            return Ok(false);
        }
        list.swap(idx - 1, idx);
        Ok(true)
    }

    pub fn move_addition_down(&mut self, idx: usize) -> Result<bool, MetaError> {
        let list = self.addition_list_mut()?;
        if idx + 1 >= list.len() {
            return Ok(false);
        }
        list.swap(idx, idx + 1);
        Ok(true)
    }

    /// Append deep copies of `additions` (paste-all).
    pub fn paste_additions(&mut self, additions: &[Addition]) -> Result<(), MetaError> {
        self.addition_list_mut()?.extend_from_slice(additions);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Part slots (combos)
    // ------------------------------------------------------------------------

    /// Non-empty part slots, in slot order. Empty for a mask.
    pub fn parts(&self) -> Vec<&str> {
        match &self.additions {
            Additions::Parts(slots) => slots
                .iter()
                .map(String::as_str)
                .filter(|s| !s.is_empty())
                .collect(),
            Additions::Mask(_) => Vec::new(),
        }
    }

    pub fn set_part(&mut self, slot: usize, source: &str) -> Result<(), MetaError> {
        let Additions::Parts(slots) = &mut self.additions else {
            return Err(MetaError::NotACombo(self.fbx.clone()));
        };
        let cell = slots.get_mut(slot).ok_or_else(|| MetaError::InvalidValue {
            field: "slot".into(),
            value: slot.to_string(),
        })?;
        *cell = source.to_owned();
        Ok(())
    }
}

pub(super) fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mask() -> Metadata {
        Metadata::new("masks/hat.fbx", AssetKind::Mask)
    }

    #[test]
    fn test_kind_from_source() {
        assert_eq!(AssetKind::from_source(Path::new("a/Hat.FBX")), Some(AssetKind::Mask));
        assert_eq!(AssetKind::from_source(Path::new("a/duo.json")), Some(AssetKind::Combo));
        assert_eq!(AssetKind::from_source(Path::new("a/tex.png")), None);
        assert_eq!(AssetKind::Combo.sidecar_extension(), "combo");
    }

    #[test]
    fn test_texture_size_bounds() {
        assert!(TextureSize::new(32).is_some());
        assert!(TextureSize::new(16384).is_some());
        assert!(TextureSize::new(16).is_none());
        assert!(TextureSize::new(300).is_none());
        assert!(TextureSize::new(32768).is_none());
    }

    #[test]
    fn test_texture_size_serializes_as_int() {
        let meta = mask();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["texture_max"], 256);
        assert!(serde_json::from_value::<TextureSize>(json!(100)).is_err());
    }

    #[test]
    fn test_new_mask_defaults() {
        let meta = mask();
        assert_eq!(uuid::Uuid::parse_str(&meta.uuid).unwrap().get_version_num(), 4);
        assert_eq!(meta.tier, 1);
        assert_eq!(meta.is_morph, Some(false));
        assert_eq!(meta.license, defaults::LICENSE);
        assert_eq!(meta.additions, Additions::Mask(Vec::new()));
    }

    #[test]
    fn test_new_combo_has_slots_and_category() {
        let meta = Metadata::new("combos/duo.json", AssetKind::Combo);
        assert_eq!(meta.category, "Combo");
        assert_eq!(meta.additions, Additions::Parts(vec![String::new(); 10]));
        assert!(meta.parts().is_empty());
    }

    #[test]
    fn test_old_record_backfills_and_keeps_unknown_keys() {
        let meta: Metadata = serde_json::from_value(json!({
            "fbx": "masks/hat.fbx",
            "uuid": "0b6f0a3e-8f7e-4a51-9d3c-1f6c2b9c2f10",
            "name": "Hat",
            "is_morph": false,
            "texture_max": 512,
            "fbx_modtime": 1500000000.5,
            "additions": []
        }))
        .unwrap();

        assert_eq!(meta.tier, 1);
        assert!(!meta.is_intro);
        assert!(!meta.release_with_plugin);
        assert_eq!(meta.intro_duration, 0.0);
        assert_eq!(meta.texture_max.get(), 512);
        assert_eq!(meta.extra["fbx_modtime"], json!(1500000000.5));

        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["tier"], 1);
        assert_eq!(value["fbx_modtime"], json!(1500000000.5));
    }

    #[test]
    fn test_missing_is_morph_stays_absent() {
        let meta: Metadata = serde_json::from_value(json!({ "fbx": "a.fbx" })).unwrap();
        assert_eq!(meta.is_morph, None);
        let value = serde_json::to_value(&meta).unwrap();
        assert!(value.get("is_morph").is_none());
    }

    #[test]
    fn test_reconcile_additions() {
        let mut a = Additions::Mask(Vec::new());
        a.reconcile(AssetKind::Combo).unwrap();
        assert_eq!(a, Additions::Parts(vec![String::new(); 10]));

        let mut a = Additions::Parts(vec!["masks/a.fbx".into()]);
        assert!(a.reconcile(AssetKind::Mask).is_err());

        let mut a = Additions::Mask(vec![Addition::new("image", "x").unwrap()]);
        assert!(a.reconcile(AssetKind::Combo).is_err());
    }

    #[test]
    fn test_normalize_tags() {
        let mut meta = mask();
        meta.tags = "Hat, Funny ,,WINTER".into();
        meta.normalize_tags();
        assert_eq!(meta.tags, "hat,funny,winter");
    }

    #[test]
    fn test_set_field_coerces_by_type() {
        let mut meta = mask();
        meta.set_field("name", "Big Hat").unwrap();
        meta.set_field("tier", "3").unwrap();
        meta.set_field("depth_head", "true").unwrap();
        meta.set_field("intro_duration", "1.5").unwrap();
        meta.set_field("texture_max", "1024").unwrap();
        assert_eq!(meta.name, "Big Hat");
        assert_eq!(meta.tier, 3);
        assert!(meta.depth_head);
        assert_eq!(meta.intro_duration, 1.5);
        assert_eq!(meta.texture_max.get(), 1024);

        assert!(matches!(
            meta.set_field("tier", "7"),
            Err(MetaError::InvalidValue { .. })
        ));
        assert!(matches!(
            meta.set_field("uuid", "x"),
            Err(MetaError::UnknownField(_))
        ));
    }

    #[test]
    fn test_addition_list_editing() {
        let mut meta = mask();
        for name in ["a", "b", "c"] {
            meta.push_addition(Addition::new("image", name).unwrap()).unwrap();
        }
        let names = |m: &Metadata| m.addition_list().iter().map(|a| a.name().to_owned()).collect::<Vec<_>>();

        assert!(meta.move_addition_up(2).unwrap());
        assert_eq!(names(&meta), ["a", "c", "b"]);
        assert!(!meta.move_addition_up(0).unwrap());

        assert!(meta.move_addition_down(0).unwrap());
        assert_eq!(names(&meta), ["c", "a", "b"]);
        assert!(!meta.move_addition_down(2).unwrap());

        assert!(meta.duplicate_addition(1).unwrap());
        assert_eq!(names(&meta), ["c", "a", "a", "b"]);

        let removed = meta.remove_addition(0).unwrap().unwrap();
        assert_eq!(removed.name(), "c");
        assert!(meta.remove_addition(9).unwrap().is_none());

        assert!(meta.edit_addition(1, "name", "z").unwrap());
        assert_eq!(names(&meta), ["a", "z", "b"]);
        assert!(!meta.edit_addition(7, "name", "z").unwrap());

        let copied = meta.addition_list().to_vec();
        meta.paste_additions(&copied).unwrap();
        assert_eq!(meta.addition_list().len(), 6);
    }

    #[test]
    fn test_combo_rejects_addition_edits() {
        let mut meta = Metadata::new("duo.json", AssetKind::Combo);
        assert!(matches!(
            meta.push_addition(Addition::new("image", "x").unwrap()),
            Err(MetaError::NotAMask(_))
        ));
        meta.set_part(1, "masks/hat.fbx").unwrap();
        assert_eq!(meta.parts(), vec!["masks/hat.fbx"]);
        assert!(meta.set_part(10, "x").is_err());
    }
}
