//! # Tweens — Animating Bound Properties
//!
//! A [`Tween`] drives one property from its current value to a target over a
//! fixed duration. The [`Tweener`] owns running tweens and advances them once
//! per frame:
//!
//! ```ignore
//! // A field of a shared owner.
//! tweener.start_tween(Tween::new(Ship::SPEED.bind(&ship), 10.0, 2.0).with_easing::<QuadOut>());
//!
//! // A field of a game object or of one of its components.
//! let radius = SceneProperty::component(planet, Orbit::RADIUS);
//! tweener.start_scene_tween(Tween::new(radius, 300.0, 4.0));
//!
//! // Each frame:
//! tweener.process_tweens(dt);
//! tweener.process_scene_tweens(&mut scene, dt);
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! NotStarted ──(delay elapsed, source captured)──► InProgress
//! InProgress ──(elapsed ≥ duration, target written)──► Complete
//! Complete   ──(next process pass)──► removed from the Tweener
//! ```
//!
//! The source value is read when the tween starts, not when it is built, so a
//! delayed tween picks up whatever earlier tweens left behind. A tween whose
//! owner cannot be reached on the completing tick (borrowed elsewhere, or a
//! component in the middle of its own hook) stays `InProgress` and writes
//! the target on a later pass.
//!
//! ## Easing
//!
//! The curve is a type parameter: zero-sized markers such as [`QuadOut`] each
//! map to an [`EaseFunction`]. The value type only needs [`Lerp`].
//!
//! Tweens are keyed by [`PropertyId`], so starting a second tween on the same
//! property replaces the first instead of fighting it.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::math::Lerp;
use crate::property::{Bound, PropertyId, SceneProperty};
use crate::scene::Scene;

/// Easing curve shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EaseFunction {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SineIn,
    SineOut,
    SineInOut,
}

impl EaseFunction {
    /// Evaluate the easing function at `t` (clamped to \[0, 1\]).
    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::SineIn => 1.0 - (t * std::f32::consts::FRAC_PI_2).cos(),
            Self::SineOut => (t * std::f32::consts::FRAC_PI_2).sin(),
            Self::SineInOut => -(std::f32::consts::PI * t).cos() / 2.0 + 0.5,
        }
    }
}

/// Compile-time choice of easing curve for a [`Tween`].
pub trait Easing: 'static {
    const CURVE: EaseFunction;

    /// Value at `elapsed` seconds into a tween of `duration` seconds.
    fn interpolate<T: Lerp>(elapsed: f32, from: &T, to: &T, duration: f32) -> T {
        let t = if duration > 0.0 { elapsed / duration } else { 1.0 };
        T::lerp(from, to, Self::CURVE.sample(t))
    }
}

macro_rules! easing_markers {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("[`EaseFunction::", stringify!($name), "`] as a type.")]
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl Easing for $name {
                const CURVE: EaseFunction = EaseFunction::$name;
            }
        )*
    };
}

easing_markers!(
    Linear, QuadIn, QuadOut, QuadInOut, CubicIn, CubicOut, CubicInOut, SineIn, SineOut, SineInOut,
);

/// A property a [`Tween`] can drive.
///
/// `World` is what must be handed in to reach the value: nothing for a
/// [`Bound`] shared owner, the [`Scene`] for a [`SceneProperty`].
pub trait TweenTarget {
    type Value: Lerp + Clone;
    type World: ?Sized;

    fn read(&self, world: &Self::World) -> Option<Self::Value>;

    /// `false` if the owner could not be reached this time.
    fn write(&self, world: &mut Self::World, value: Self::Value) -> bool;

    /// `false` once the owner is gone for good.
    fn is_alive(&self, world: &Self::World) -> bool;

    fn id(&self) -> PropertyId;

    fn name(&self) -> &'static str;
}

impl<O, T: Lerp + Clone> TweenTarget for Bound<O, T> {
    type Value = T;
    type World = ();

    fn read(&self, _: &()) -> Option<T> {
        self.get()
    }

    fn write(&self, _: &mut (), value: T) -> bool {
        self.set(value)
    }

    fn is_alive(&self, _: &()) -> bool {
        Bound::is_alive(self)
    }

    fn id(&self) -> PropertyId {
        Bound::id(self)
    }

    fn name(&self) -> &'static str {
        Bound::name(self)
    }
}

impl<O, T: Lerp + Clone> TweenTarget for SceneProperty<O, T> {
    type Value = T;
    type World = Scene;

    fn read(&self, scene: &Scene) -> Option<T> {
        self.get(scene)
    }

    fn write(&self, scene: &mut Scene, value: T) -> bool {
        self.set(scene, value)
    }

    fn is_alive(&self, scene: &Scene) -> bool {
        SceneProperty::is_alive(self, scene)
    }

    fn id(&self) -> PropertyId {
        SceneProperty::id(self)
    }

    fn name(&self) -> &'static str {
        SceneProperty::name(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenState {
    NotStarted,
    InProgress,
    Complete,
}

/// Interpolates one property towards `to` over `duration` seconds.
pub struct Tween<P: TweenTarget, E = Linear> {
    property: P,
    from: Option<P::Value>,
    to: P::Value,
    duration: f32,
    /// Negative while the start delay runs.
    elapsed: f32,
    state: TweenState,
    _easing: PhantomData<E>,
}

impl<P: TweenTarget> Tween<P, Linear> {
    pub fn new(property: P, to: P::Value, duration: f32) -> Self {
        Self {
            property,
            from: None,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
            state: TweenState::NotStarted,
            _easing: PhantomData,
        }
    }
}

impl<P: TweenTarget, E: Easing> Tween<P, E> {
    /// Switch the easing curve.
    pub fn with_easing<F: Easing>(self) -> Tween<P, F> {
        Tween {
            property: self.property,
            from: self.from,
            to: self.to,
            duration: self.duration,
            elapsed: self.elapsed,
            state: self.state,
            _easing: PhantomData,
        }
    }

    /// Wait `seconds` before capturing the source value and starting.
    pub fn with_delay(mut self, seconds: f32) -> Self {
        self.elapsed = -seconds.max(0.0);
        self
    }

    pub fn state(&self) -> TweenState {
        self.state
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn curve(&self) -> EaseFunction {
        E::CURVE
    }

    pub fn property(&self) -> &P {
        &self.property
    }

    pub fn advance(&mut self, world: &mut P::World, dt: f32) {
        if self.state == TweenState::Complete {
            return;
        }
        if !self.property.is_alive(world) {
            self.state = TweenState::Complete;
            return;
        }

        self.elapsed += dt;
        if self.state == TweenState::NotStarted {
            if self.elapsed < 0.0 {
                return;
            }
            let Some(from) = self.property.read(world) else {
                // Owner unreachable; try again next frame.
                return;
            };
            self.from = Some(from);
            self.state = TweenState::InProgress;
        }

        if self.elapsed >= self.duration {
            if self.property.write(world, self.to.clone()) {
                self.state = TweenState::Complete;
            }
        } else if let Some(from) = &self.from {
            let value = E::interpolate(self.elapsed, from, &self.to, self.duration);
            self.property.write(world, value);
        }
    }
}

impl<P: TweenTarget, E> fmt::Debug for Tween<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("property", &self.property.name())
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("state", &self.state)
            .finish()
    }
}

/// Type-erased view the [`Tweener`] stores. `W` is the target's
/// [`TweenTarget::World`].
pub trait AnyTween<W: ?Sized = ()> {
    fn state(&self) -> TweenState;
    fn advance(&mut self, world: &mut W, dt: f32);
    fn property_id(&self) -> PropertyId;
}

impl<P: TweenTarget, E: Easing> AnyTween<P::World> for Tween<P, E> {
    fn state(&self) -> TweenState {
        self.state
    }

    fn advance(&mut self, world: &mut P::World, dt: f32) {
        Tween::advance(self, world, dt);
    }

    fn property_id(&self) -> PropertyId {
        self.property.id()
    }
}

/// Owns running tweens, at most one per property.
///
/// Tweens of shared owners and tweens of scene objects are kept apart because
/// only the latter need the [`Scene`] to advance.
#[derive(Default)]
pub struct Tweener {
    tweens: HashMap<PropertyId, Box<dyn AnyTween>>,
    scene_tweens: HashMap<PropertyId, Box<dyn AnyTween<Scene>>>,
}

impl Tweener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `tween`, replacing any tween already driving the same property.
    pub fn start_tween(&mut self, tween: impl AnyTween + 'static) -> PropertyId {
        let id = tween.property_id();
        if self.tweens.insert(id, Box::new(tween)).is_some() {
            log::trace!("Replaced running tween on property {id}");
        }
        id
    }

    /// [`start_tween`](Self::start_tween) for a [`SceneProperty`] target.
    pub fn start_scene_tween(&mut self, tween: impl AnyTween<Scene> + 'static) -> PropertyId {
        let id = tween.property_id();
        if self.scene_tweens.insert(id, Box::new(tween)).is_some() {
            log::trace!("Replaced running scene tween on property {id}");
        }
        id
    }

    /// Drop tweens that finished last pass, then advance the rest.
    pub fn process_tweens(&mut self, dt: f32) {
        self.tweens.retain(|_, tween| tween.state() != TweenState::Complete);
        for tween in self.tweens.values_mut() {
            tween.advance(&mut (), dt);
        }
    }

    /// [`process_tweens`](Self::process_tweens) for scene tweens.
    pub fn process_scene_tweens(&mut self, scene: &mut Scene, dt: f32) {
        self.scene_tweens.retain(|_, tween| tween.state() != TweenState::Complete);
        for tween in self.scene_tweens.values_mut() {
            tween.advance(scene, dt);
        }
    }

    pub fn has_tween(&self, id: PropertyId) -> bool {
        self.tweens.contains_key(&id) || self.scene_tweens.contains_key(&id)
    }

    pub fn state(&self, id: PropertyId) -> Option<TweenState> {
        match self.tweens.get(&id) {
            Some(tween) => Some(tween.state()),
            None => self.scene_tweens.get(&id).map(|tween| tween.state()),
        }
    }

    /// Stop a tween where it is. The property keeps its current value.
    pub fn kill_tween(&mut self, id: PropertyId) -> bool {
        self.tweens.remove(&id).is_some() || self.scene_tweens.remove(&id).is_some()
    }

    pub fn kill_tweens_of<P: TweenTarget>(&mut self, property: &P) -> bool {
        self.kill_tween(property.id())
    }

    pub fn kill_all_tweens(&mut self) {
        self.tweens.clear();
        self.scene_tweens.clear();
    }

    pub fn len(&self) -> usize {
        self.tweens.len() + self.scene_tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty() && self.scene_tweens.is_empty()
    }
}

impl fmt::Debug for Tweener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tweener")
            .field("tweens", &self.tweens.len())
            .field("scene_tweens", &self.scene_tweens.len())
            .finish()
    }
}
