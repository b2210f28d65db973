//! Save a scene built from a prefab, then load it into a fresh scene.
//!
//! Run with: `RUST_LOG=debug cargo run -p askr --example scene_save_load`

use std::sync::OnceLock;

use askr::prelude::*;
use serde_json::json;

#[derive(Default)]
struct Health {
    base: ComponentBase,
    points: i32,
}

impl Health {
    const POINTS: Property<Health, i32> = Property::new("Points", Health::points, Health::set_points);

    fn points(&self) -> i32 {
        self.points
    }

    fn set_points(&mut self, points: i32) {
        self.points = points;
    }
}

impl Serialized for Health {
    fn reflection() -> &'static Reflection<Self> {
        static REFLECTION: OnceLock<Reflection<Health>> = OnceLock::new();
        REFLECTION.get_or_init(|| Reflection::new().field(Health::POINTS))
    }
}

impl Component for Health {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }
}

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register::<Health>();
    registry
}

fn main() -> Result<(), SceneError> {
    env_logger::init();

    let mut scene = Scene::new(registry());
    scene.load_prefab(
        "goblin",
        &json!({
            "properties": {"Id": "goblin", "MetaData": {"faction": "cave"}},
            "components": [{"type": "Health", "properties": {"Points": 12}}]
        }),
    );
    scene.load_json(&json!({
        "gameObjects": [{
            "properties": {"Id": "level"},
            "gameObjects": [
                {"prefab": "goblin", "properties": {"Id": "grunt"}},
                {"prefab": "goblin", "properties": {"Id": "boss"},
                 "components": [{"type": "Health", "properties": {"Points": 80}}]}
            ]
        }]
    }));
    scene.update(0.0);

    let path = std::env::temp_dir().join("askr_scene_save_load.json");
    scene.save_to_file(&path)?;
    log::info!("Saved scene to {}", path.display());

    let mut loaded = Scene::new(registry());
    loaded.load_from_file(&path)?;
    loaded.update(0.0);

    for id in ["grunt", "boss"] {
        let points = loaded
            .find(&format!("level/{id}"))
            .and_then(|node| loaded.get_component::<Health>(node))
            .map(|health| health.points);
        println!("{id}: {points:?} hp");
    }
    println!("{}", loaded.to_json_string()?);

    std::fs::remove_file(&path).map_err(|source| SceneError::Io {
        path: path.display().to_string(),
        source,
    })
}
