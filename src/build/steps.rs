//! Translation of metadata into maskmaker invocations.
//!
//! Each function returns the maskmaker command and its arguments; the target
//! JSON is supplied by the caller.

use crate::{
    log,
    maskmaker::{ToolArgs, ToolValue},
    meta::{
        Metadata,
        additions::{
            Addition, EmitterAddition, ImageAddition, MaterialAddition, ModelAddition,
            SequenceAddition, TweakAddition,
        },
        defaults,
    },
};
use std::path::Path;

/// One maskmaker invocation, minus the target file.
pub type Step = (&'static str, ToolArgs);

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// `import` (or `morphimport` for morph masks) carrying the descriptive fields.
pub fn import(meta: &Metadata, morph_rest: &Path) -> Step {
    let mut args = ToolArgs::new()
        .with("name", meta.name.as_str())
        .with("uuid", meta.uuid.as_str())
        .with("description", meta.description.as_str())
        .with("author", meta.author.as_str())
        .with("tags", meta.tags.as_str())
        .with("category", meta.category.as_str())
        .with("license", meta.license.as_str())
        .with("website", meta.website.as_str())
        .with("tier", i64::from(meta.tier))
        .with("texture_max", meta.texture_max.get())
        .with("is_intro", meta.is_intro)
        .with("draw_video_with_mask", meta.draw_video_with_mask)
        .with("intro_fade_time", meta.intro_fade_time)
        .with("intro_duration", meta.intro_duration);

    let fbx = absolute(meta.source());
    if meta.is_morph() {
        args.set("restfile", morph_rest.to_string_lossy().into_owned());
        args.set("posefile", fbx);
        ("morphimport", args)
    } else {
        args.set("file", fbx);
        ("import", args)
    }
}

/// Depth-only head: a material, a model using it, and a part showing the model.
pub fn depth_head() -> [Step; 3] {
    [
        (
            "addres",
            ToolArgs::new()
                .with("type", "material")
                .with("name", "depth_head_mat")
                .with("effect", defaults::MATERIAL_EFFECT)
                .with("depth-only", true),
        ),
        (
            "addres",
            ToolArgs::new()
                .with("type", "model")
                .with("name", "depth_head_mdl")
                .with("mesh", "meshHead")
                .with("material", "depth_head_mat"),
        ),
        (
            "addpart",
            ToolArgs::new()
                .with("type", "model")
                .with("name", "depth_head")
                .with("resource", "depth_head_mdl"),
        ),
    ]
}

/// The invocation that applies one addition.
pub fn addition(addn: &Addition) -> Step {
    match addn {
        Addition::Image(a) => ("addres", image(a)),
        Addition::Sequence(a) => ("addres", sequence(a)),
        Addition::Material(a) => ("addres", material(a)),
        Addition::Model(a) => ("addres", model(a)),
        Addition::Emitter(a) => ("addres", emitter(a)),
        Addition::Tweak(a) => ("tweak", tweak(a)),
    }
}

fn image(a: &ImageAddition) -> ToolArgs {
    ToolArgs::new()
        .with("type", "image")
        .with("name", a.name.as_str())
        .with("file", absolute(Path::new(&a.file)))
}

fn sequence(a: &SequenceAddition) -> ToolArgs {
    ToolArgs::new()
        .with("type", "sequence")
        .with("name", a.name.as_str())
        .with("image", a.image.as_str())
        .with("rows", a.rows)
        .with("cols", a.cols)
        .with("first", a.first)
        .with("last", a.last)
        .with("rate", a.rate)
        .with("delay", a.delay)
        .with("mode", a.mode.as_str())
        .with("random-start", a.random_start)
}

fn material(a: &MaterialAddition) -> ToolArgs {
    let mut args = ToolArgs::new()
        .with("type", "material")
        .with("name", a.name.as_str())
        .with("effect", defaults::MATERIAL_EFFECT)
        .with("culling", a.culling.as_str())
        .with("depth-test", a.depth_test.as_str())
        .with("depth-only", a.depth_only)
        .with("opaque", a.opaque)
        .with("u-wrap", a.u_wrap.as_str())
        .with("v-wrap", a.v_wrap.as_str());
    // Params never override the fixed keys
    for (param, value) in &a.params {
        if args.contains(param) {
            log!("warn"; "material `{}`: ignoring param `{}`, it names a fixed key", a.name, param);
            continue;
        }
        args.set(param, value.as_str());
    }
    args
}

fn model(a: &ModelAddition) -> ToolArgs {
    ToolArgs::new()
        .with("type", "model")
        .with("name", a.name.as_str())
        .with("mesh", a.mesh.as_str())
        .with("material", a.material.as_str())
}

fn vector(v: [f64; 3]) -> String {
    v.iter()
        .map(|x| ToolValue::Float(*x).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn emitter(a: &EmitterAddition) -> ToolArgs {
    let mut args = ToolArgs::new()
        .with("type", "emitter")
        .with("name", a.name.as_str())
        .with("model", a.model.as_str())
        .with("part", a.part.as_str())
        .with("lifetime", a.lifetime)
        .with("scale-start", a.scale_start)
        .with("scale-end", a.scale_end)
        .with("alpha-start", a.alpha_start)
        .with("alpha-end", a.alpha_end)
        .with("num-particles", a.num_particles)
        .with("world-space", a.world_space)
        .with("inverse-rate", a.inverse_rate)
        .with("z-sort-offset", a.z_sort_offset)
        .with("rate-min", a.rate_min)
        .with("rate-max", a.rate_max)
        .with("friction-min", a.friction_min)
        .with("friction-max", a.friction_max)
        .with("force-min", vector(a.force_min))
        .with("force-max", vector(a.force_max))
        .with("initial-velocity-min", vector(a.initial_velocity_min))
        .with("initial-velocity-max", vector(a.initial_velocity_max));

    // A range with equal ends is a constant
    for base in ["rate", "friction", "force", "initial-velocity"] {
        let (min, max) = (format!("{base}-min"), format!("{base}-max"));
        if args.get(&min).is_some() && args.get(&min) == args.get(&max) {
            if let Some(value) = args.remove(&min) {
                args.remove(&max);
                args.set(base, value);
            }
        }
    }
    args
}

/// Settings are `key=value`; values become int, float or string, in that
/// order of preference. Blank or malformed slots are skipped.
fn tweak(a: &TweakAddition) -> ToolArgs {
    let mut args = ToolArgs::new();
    for setting in a.settings.iter().take(defaults::TWEAK_SLOTS) {
        if let Some((key, value)) = setting.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                args.set(key, ToolValue::coerce(value.trim()));
            }
        }
    }
    args
}
