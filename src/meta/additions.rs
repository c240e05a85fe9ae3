//! Addition records: declarative sub-resources attached to a mask.
//!
//! Stored only inside the owning sidecar's `additions` list, tagged by `type`:
//!
//! ```json
//! { "type": "emitter", "name": "sparks", "rate-min": 2.0, "rate-max": 2.0, ... }
//! ```

use super::{MetaError, defaults, types::parse_flag};
use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt};

/// One addition, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Addition {
    Image(ImageAddition),
    Sequence(SequenceAddition),
    Material(MaterialAddition),
    Model(ModelAddition),
    Emitter(EmitterAddition),
    Tweak(TweakAddition),
}

impl Addition {
    /// Fresh addition of the named kind with default fields.
    pub fn new(kind: &str, name: &str) -> Option<Self> {
        let name = name.to_owned();
        Some(match kind {
            "image" => Self::Image(ImageAddition { name, ..Default::default() }),
            "sequence" => Self::Sequence(SequenceAddition { name, ..Default::default() }),
            "material" => Self::Material(MaterialAddition { name, ..Default::default() }),
            "model" => Self::Model(ModelAddition { name, ..Default::default() }),
            "emitter" => Self::Emitter(EmitterAddition { name, ..Default::default() }),
            "tweak" => Self::Tweak(TweakAddition { name, ..Default::default() }),
            _ => return None,
        })
    }

    /// Parse a stored addition. Numbers, flags and vectors written as strings
    /// are read as the type the field has.
    pub(super) fn from_loose(mut value: Value) -> Result<Self, String> {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
        let template = Self::new(kind, "").and_then(|a| serde_json::to_value(a).ok());
        if let (Some(Value::Object(template)), Some(fields)) = (template, value.as_object_mut()) {
            for (key, field) in fields.iter_mut() {
                let (Value::String(text), Some(current)) = (&*field, template.get(key)) else {
                    continue;
                };
                if current.is_string() {
                    continue;
                }
                let coerced = coerce_like(current, text);
                if let Some(coerced) = coerced {
                    *field = coerced;
                }
            }
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Sequence(_) => "sequence",
            Self::Material(_) => "material",
            Self::Model(_) => "model",
            Self::Emitter(_) => "emitter",
            Self::Tweak(_) => "tweak",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Image(a) => &a.name,
            Self::Sequence(a) => &a.name,
            Self::Material(a) => &a.name,
            Self::Model(a) => &a.name,
            Self::Emitter(a) => &a.name,
            Self::Tweak(a) => &a.name,
        }
    }

    /// Set one field from text, using its on-disk key (`rate-min`, `culling`).
    ///
    /// The text is parsed to the type the field already has: `true`/`false`
    /// for flags, numbers, `x,y,z` for vectors. `params.<name>` sets a
    /// material parameter and `settings.<n>` a tweak slot.
    pub fn set_field(&mut self, key: &str, text: &str) -> Result<(), MetaError> {
        let invalid = || MetaError::InvalidValue {
            field: key.to_owned(),
            value: text.to_owned(),
        };
        if key == "type" {
            return Err(MetaError::UnknownField(key.to_owned()));
        }

        let mut value = serde_json::to_value(&*self).map_err(|_| invalid())?;
        let Some(fields) = value.as_object_mut() else {
            return Err(invalid());
        };

        match key.split_once('.') {
            Some(("params", param)) if matches!(self, Self::Material(_)) => {
                let params = fields
                    .entry("params")
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Some(params) = params.as_object_mut() {
                    params.insert(param.to_owned(), Value::String(text.to_owned()));
                }
            }
            Some(("settings", slot)) if matches!(self, Self::Tweak(_)) => {
                let slot: usize = slot
                    .parse()
                    .ok()
                    .filter(|s| *s < defaults::TWEAK_SLOTS)
                    .ok_or_else(invalid)?;
                let Some(settings) = fields.get_mut("settings").and_then(Value::as_array_mut) else {
                    return Err(invalid());
                };
                if settings.len() <= slot {
                    settings.resize(slot + 1, Value::String(String::new()));
                }
                settings[slot] = Value::String(text.to_owned());
            }
            _ => {
                let field = fields
                    .get_mut(key)
                    .ok_or_else(|| MetaError::UnknownField(key.to_owned()))?;
                *field = coerce_like(field, text).ok_or_else(invalid)?;
            }
        }

        *self = serde_json::from_value(value).map_err(|_| invalid())?;
        Ok(())
    }
}

/// Parse `text` into a JSON value of the same shape as `current`.
fn coerce_like(current: &Value, text: &str) -> Option<Value> {
    let text = text.trim();
    Some(match current {
        Value::Bool(_) => Value::Bool(parse_flag(text)?),
        Value::Number(n) if n.is_f64() => Value::from(text.parse::<f64>().ok()?),
        Value::Number(_) => Value::from(text.parse::<i64>().ok()?),
        Value::Array(_) => {
            let parts = text
                .split(',')
                .map(|x| x.trim().parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()?;
            Value::from(parts)
        }
        _ => Value::String(text.to_owned()),
    })
}

impl fmt::Display for Addition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.kind(), self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageAddition {
    pub name: String,
    /// Image file, relative to the working directory
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct SequenceAddition {
    pub name: String,
    /// Name of the image resource the frames are cut from
    pub image: String,
    #[educe(Default = defaults::sequence::grid())]
    pub rows: i64,
    #[educe(Default = defaults::sequence::grid())]
    pub cols: i64,
    pub first: i64,
    pub last: i64,
    #[educe(Default = defaults::sequence::rate())]
    pub rate: f64,
    pub delay: f64,
    #[educe(Default = defaults::sequence::mode())]
    pub mode: String,
    pub random_start: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Culling {
    #[default]
    Back,
    Front,
    Neither,
}

impl Culling {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Back => "back",
            Self::Front => "front",
            Self::Neither => "neither",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepthTest {
    Never,
    #[default]
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    NotEqual,
    Always,
}

impl DepthTest {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Less => "less",
            Self::LessEqual => "less-equal",
            Self::Equal => "equal",
            Self::GreaterEqual => "greater-equal",
            Self::Greater => "greater",
            Self::NotEqual => "not-equal",
            Self::Always => "always",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct MaterialAddition {
    pub name: String,
    pub culling: Culling,
    pub depth_test: DepthTest,
    pub depth_only: bool,
    #[educe(Default = defaults::r#true())]
    pub opaque: bool,
    #[educe(Default = defaults::material::wrap())]
    pub u_wrap: String,
    #[educe(Default = defaults::material::wrap())]
    pub v_wrap: String,
    /// Shader parameters, `name -> "type,value"` (e.g. `"texture,hat_png"`)
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelAddition {
    pub name: String,
    pub mesh: String,
    pub material: String,
}

/// Particle emitter. Each `-min`/`-max` pair describes a random range.
#[derive(Debug, Clone, PartialEq, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct EmitterAddition {
    pub name: String,
    pub model: String,
    #[educe(Default = defaults::emitter::part())]
    pub part: String,
    #[educe(Default = defaults::emitter::lifetime())]
    pub lifetime: f64,
    #[educe(Default = defaults::emitter::one())]
    pub scale_start: f64,
    #[educe(Default = defaults::emitter::one())]
    pub scale_end: f64,
    #[educe(Default = defaults::emitter::one())]
    pub alpha_start: f64,
    #[educe(Default = defaults::emitter::one())]
    pub alpha_end: f64,
    #[educe(Default = defaults::emitter::num_particles())]
    pub num_particles: i64,
    #[educe(Default = defaults::r#true())]
    pub world_space: bool,
    pub inverse_rate: bool,
    pub z_sort_offset: f64,
    #[educe(Default = defaults::emitter::rate())]
    pub rate_min: f64,
    #[educe(Default = defaults::emitter::rate())]
    pub rate_max: f64,
    #[educe(Default = defaults::emitter::friction())]
    pub friction_min: f64,
    #[educe(Default = defaults::emitter::friction())]
    pub friction_max: f64,
    #[educe(Default = defaults::emitter::force())]
    pub force_min: [f64; 3],
    #[educe(Default = defaults::emitter::force())]
    pub force_max: [f64; 3],
    #[educe(Default = defaults::emitter::initial_velocity())]
    pub initial_velocity_min: [f64; 3],
    #[educe(Default = defaults::emitter::initial_velocity())]
    pub initial_velocity_max: [f64; 3],
}

/// Raw edits applied to the derived JSON. Each setting is `"key=value"`,
/// where dotted keys address nested objects; blank slots are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweakAddition {
    pub name: String,
    pub settings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emitter_from_partial_json_uses_defaults() {
        let addn: Addition = serde_json::from_value(json!({
            "type": "emitter",
            "name": "sparks",
            "rate-min": 2.0,
            "force-min": [1, 2, 3]
        }))
        .unwrap();

        let Addition::Emitter(e) = addn else {
            panic!("expected emitter");
        };
        assert_eq!(e.name, "sparks");
        assert_eq!(e.rate_min, 2.0);
        assert_eq!(e.rate_max, 4.0);
        assert_eq!(e.force_min, [1.0, 2.0, 3.0]);
        assert_eq!(e.num_particles, 1000);
        assert!(e.world_space);
    }

    #[test]
    fn test_from_loose_reads_typed_strings() {
        let addn = Addition::from_loose(json!({
            "type": "emitter",
            "name": "12",
            "rate-min": "2.5",
            "num-particles": "40",
            "world-space": "false",
            "force-min": "1, 2, 3"
        }))
        .unwrap();
        let Addition::Emitter(e) = addn else {
            panic!("expected emitter");
        };
        assert_eq!(e.name, "12");
        assert_eq!(e.rate_min, 2.5);
        assert_eq!(e.num_particles, 40);
        assert!(!e.world_space);
        assert_eq!(e.force_min, [1.0, 2.0, 3.0]);

        assert!(Addition::from_loose(json!({ "type": "emitter", "rate-min": "fast" })).is_err());
        assert!(Addition::from_loose(json!({ "type": "sticker" })).is_err());
    }

    #[test]
    fn test_material_enums_are_kebab_case() {
        let addn = Addition::Material(MaterialAddition {
            name: "glass".into(),
            depth_test: DepthTest::LessEqual,
            culling: Culling::Neither,
            ..Default::default()
        });
        let value = serde_json::to_value(&addn).unwrap();
        assert_eq!(value["type"], "material");
        assert_eq!(value["depth-test"], "less-equal");
        assert_eq!(value["culling"], "neither");
        assert_eq!(DepthTest::LessEqual.as_str(), "less-equal");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<Addition, _> =
            serde_json::from_value(json!({ "type": "light", "name": "sun" }));
        assert!(result.is_err());
        assert!(Addition::new("light", "sun").is_none());
    }

    #[test]
    fn test_set_field_parses_by_existing_type() {
        let mut addn = Addition::new("emitter", "sparks").unwrap();
        addn.set_field("rate-min", "2.5").unwrap();
        addn.set_field("num-particles", "40").unwrap();
        addn.set_field("world-space", "false").unwrap();
        addn.set_field("force-max", "1, 2, 3").unwrap();

        let Addition::Emitter(e) = &addn else {
            panic!("expected emitter");
        };
        assert_eq!(e.rate_min, 2.5);
        assert_eq!(e.num_particles, 40);
        assert!(!e.world_space);
        assert_eq!(e.force_max, [1.0, 2.0, 3.0]);

        assert!(matches!(
            addn.set_field("num-particles", "lots"),
            Err(MetaError::InvalidValue { .. })
        ));
        assert!(matches!(
            addn.set_field("colour", "red"),
            Err(MetaError::UnknownField(_))
        ));
        assert!(addn.set_field("type", "model").is_err());
    }

    #[test]
    fn test_set_field_enums_params_and_slots() {
        let mut mat = Addition::new("material", "glass").unwrap();
        mat.set_field("depth-test", "greater-equal").unwrap();
        mat.set_field("params.diffuseMap", "texture,glass_png").unwrap();
        assert!(mat.set_field("culling", "sideways").is_err());
        let Addition::Material(m) = &mat else {
            panic!("expected material");
        };
        assert_eq!(m.depth_test, DepthTest::GreaterEqual);
        assert_eq!(m.params["diffuseMap"], "texture,glass_png");

        let mut tweak = Addition::new("tweak", "speedup").unwrap();
        tweak.set_field("settings.2", "speed=2").unwrap();
        assert!(tweak.set_field("settings.10", "x=1").is_err());
        let Addition::Tweak(t) = &tweak else {
            panic!("expected tweak");
        };
        assert_eq!(t.settings, vec!["", "", "speed=2"]);
    }

    #[test]
    fn test_display_matches_list_entry() {
        let addn = Addition::new("tweak", "speedup").unwrap();
        assert_eq!(addn.to_string(), "tweak : speedup");
        assert_eq!(addn.kind(), "tweak");
    }
}
