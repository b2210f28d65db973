//! Orbits: a sun with planets, each planet with a moon.
//!
//! Each body carries an `Orbit` component that rotates its children around
//! it. The simulation clock eases in from a standstill through a tween on a
//! shared `Clock`, the outer planet's orbit widens through a tween on its
//! `Orbit` component, and halfway through a moon is detached mid-frame.
//!
//! Run with: `RUST_LOG=info cargo run -p askr --example orbit`

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;

use askr::prelude::*;
use serde_json::json;

// ── Orbit component ─────────────────────────────────────────────────────

struct Orbit {
    base: ComponentBase,
    radius: f32,
    speed: f32,
    angle: f32,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            base: ComponentBase::new(ComponentFlags::UPDATE | ComponentFlags::TRANSFORM),
            radius: 0.0,
            speed: 0.0,
            angle: 0.0,
        }
    }
}

impl Orbit {
    const RADIUS: Property<Orbit, f32> = Property::new("Radius", Orbit::radius, Orbit::set_radius);

    fn radius(&self) -> f32 {
        self.radius
    }

    fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    fn new(radius: f32, speed: f32) -> Box<dyn Component> {
        Box::new(Self {
            radius,
            speed,
            ..Self::default()
        })
    }
}

impl Serialized for Orbit {
    fn reflection() -> &'static Reflection<Self> {
        static REFLECTION: OnceLock<Reflection<Orbit>> = OnceLock::new();
        REFLECTION.get_or_init(|| {
            Reflection::new()
                .property(
                    "Radius",
                    |o: &Orbit| json!(o.radius),
                    |o, v| {
                        if let Some(radius) = v.as_f64() {
                            o.radius = radius as f32;
                        }
                    },
                )
                .property(
                    "Speed",
                    |o: &Orbit| json!(o.speed),
                    |o, v| {
                        if let Some(speed) = v.as_f64() {
                            o.speed = speed as f32;
                        }
                    },
                )
        })
    }
}

impl Component for Orbit {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn on_update(&mut self, _scene: &mut Scene, dt: f32) {
        self.angle += self.speed * dt;
    }

    fn on_transform(&mut self, _scene: &mut Scene, inherited: Mat4) -> Mat4 {
        let spin = Transform::IDENTITY.with_angle(self.angle);
        inherited * spin.matrix() * Transform::from_xy(self.radius, 0.0).matrix()
    }
}

// ── Clock ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Clock {
    scale: f32,
}

impl Clock {
    const SCALE: Property<Clock, f32> = Property::new("scale", Clock::scale, Clock::set_scale);

    fn scale(&self) -> f32 {
        self.scale
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }
}

fn main() {
    env_logger::init();

    let mut registry = ComponentRegistry::new();
    registry.register::<Orbit>();
    let mut scene = Scene::new(registry);

    let sun = scene.create_game_object("sun");
    scene.add_root(sun);

    for (i, (radius, speed)) in [(120.0, 1.0), (200.0, 0.6), (300.0, 0.4)].into_iter().enumerate() {
        let planet = scene.create_game_object(format!("planet{i}"));
        scene.add_component(planet, Orbit::new(radius, speed));
        let moon = scene.create_game_object("moon");
        scene.add_component(moon, Orbit::new(30.0, 2.5));
        scene.add_game_object(planet, moon);
        scene.add_game_object(sun, planet);
    }

    let clock = Rc::new(RefCell::new(Clock::default()));
    let mut tweener = Tweener::new();
    tweener.start_tween(Tween::new(Clock::SCALE.bind(&clock), 1.0, 2.0).with_easing::<CubicOut>());

    // Confirm the bodies so the outer planet can be looked up by path.
    scene.update(0.0);
    if let Some(planet) = scene.find("sun/planet2") {
        let radius = SceneProperty::component(planet, Orbit::RADIUS);
        let widen = Tween::new(radius, 420.0, 4.0).with_easing::<SineInOut>().with_delay(1.0);
        tweener.start_scene_tween(widen);
    }

    let dt = 1.0 / 60.0;
    for frame in 0..300 {
        tweener.process_tweens(dt);
        tweener.process_scene_tweens(&mut scene, dt);
        scene.update(dt * clock.borrow().scale);

        if frame == 150 {
            if let Some(planet) = scene.find("sun/planet1") {
                scene.remove_game_object_by_id(planet, "moon");
            }
        }

        if frame % 60 == 0 {
            log::info!("frame {frame}, clock scale {:.2}", clock.borrow().scale);
            for path in ["sun/planet0", "sun/planet0/moon", "sun/planet1/moon"] {
                let Some(node) = scene.find(path) else {
                    log::info!("  {path}: gone");
                    continue;
                };
                if let Some(go) = scene.get(node) {
                    let p = go.transform().w_axis;
                    log::info!("  {path}: ({:.1}, {:.1})", p.x, p.y);
                }
            }
        }
    }

    if let Some(planet) = scene.find("sun/planet2") {
        log::info!("planet2: {}", scene.to_json(planet));
    }
}
