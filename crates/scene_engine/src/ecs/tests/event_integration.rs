//! Event delivery across scene and entity buses during ticks

use super::running_scene;
use crate::ecs::components::{EntityDiedEvent, HealthAttribute};
use crate::ecs::{Behaviour, EntityHandle};
use crate::error::EcsResult;
use crate::events::{Event, SubscriptionToken};
use crate::scene::SceneRef;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug)]
struct Alarm;

impl Event for Alarm {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct Census(usize);

impl Event for Census {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Drains ten points of its own health per tick and listens for its death
#[derive(Default)]
struct Wither {
    died: Rc<Cell<u32>>,
    subscription: Option<SubscriptionToken>,
}

impl Behaviour for Wither {
    fn create(&mut self, owner: &EntityHandle) -> EcsResult<()> {
        let died = Rc::clone(&self.died);
        self.subscription = Some(owner.subscribe_named("EntityDiedEvent", move |_| died.set(died.get() + 1))?);
        Ok(())
    }

    fn update(&mut self, owner: &EntityHandle, _delta_time: f32) -> EcsResult<()> {
        let health = owner.attribute_by_name_as::<HealthAttribute>("HealthAttribute")?;
        health.borrow_mut().decrease(10.0);
        Ok(())
    }
}

/// Counts scene alarms while its owner lives
struct Listener {
    heard: Rc<Cell<u32>>,
    token: Option<SubscriptionToken>,
}

impl Behaviour for Listener {
    fn create(&mut self, owner: &EntityHandle) -> EcsResult<()> {
        let heard = Rc::clone(&self.heard);
        let token = owner
            .scene()?
            .subscribe_for(owner, move |_: &Alarm| heard.set(heard.get() + 1))?;
        self.token = Some(token);
        Ok(())
    }

    fn update(&mut self, _owner: &EntityHandle, _delta_time: f32) -> EcsResult<()> {
        Ok(())
    }
}

/// Posts a census event and destroys its owner in the same update
struct PostThenDie;

impl Behaviour for PostThenDie {
    fn update(&mut self, owner: &EntityHandle, _delta_time: f32) -> EcsResult<()> {
        let scene = owner.scene()?;
        scene.post(Census(0))?;
        owner.destroy();
        Ok(())
    }
}

#[test]
fn test_named_components_drive_a_death() {
    let mut scene = running_scene();
    let player = scene.create_entity("Player").unwrap();
    player.create_attribute("HealthAttribute").unwrap();
    let wither = player.add_behaviour(Wither::default()).unwrap();
    let died = Rc::clone(&wither.borrow().died);

    for _ in 0..9 {
        scene.update(0.016).unwrap();
    }
    assert!(player.alive());
    assert_eq!(died.get(), 0);

    scene.update(0.016).unwrap();
    assert_eq!(died.get(), 1);
    assert!(player.is_released());
}

#[test]
fn test_owner_bound_scene_subscription_ends_with_owner() {
    let scene = running_scene();
    let heard = Rc::new(Cell::new(0));
    let entity = scene.create_entity("guard").unwrap();
    entity
        .add_behaviour(Listener { heard: Rc::clone(&heard), token: None })
        .unwrap();

    assert_eq!(scene.publish(Alarm).unwrap(), 1);
    entity.destroy();
    assert_eq!(scene.publish(Alarm).unwrap(), 0);
    assert_eq!(heard.get(), 1);
}

#[test]
fn test_posted_events_arrive_after_purge() {
    let mut scene = running_scene();
    scene.create_entity("messenger").unwrap().add_behaviour(PostThenDie).unwrap();
    scene.create_entity("bystander").unwrap();

    let handle = scene.handle();
    let counts = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&counts);
    let _token = scene
        .subscribe(move |_: &Census| sink.borrow_mut().push(handle.entity_count().unwrap_or(0)))
        .unwrap();

    scene.update(0.1).unwrap();

    assert_eq!(*counts.borrow(), vec![1]);
    assert_eq!(scene.stats().events_flushed_last_tick, 1);
}

#[test]
fn test_events_posted_during_flush_wait_a_tick() {
    let mut scene = running_scene();
    let handle = scene.handle();
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    let _token = scene
        .subscribe(move |census: &Census| {
            counter.set(counter.get() + 1);
            if census.0 == 0 {
                let _ = handle.post(Census(1));
            }
        })
        .unwrap();

    scene.post(Census(0)).unwrap();
    scene.update(0.1).unwrap();
    assert_eq!(seen.get(), 1);
    scene.update(0.1).unwrap();
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_broadcast_reaches_live_entity_buses() {
    let scene = running_scene();
    let heard = Rc::new(Cell::new(0));
    let mut tokens = Vec::new();
    for name in ["a", "b", "c"] {
        let entity = scene.create_entity(name).unwrap();
        let counter = Rc::clone(&heard);
        tokens.push(entity.subscribe(move |_: &Alarm| counter.set(counter.get() + 1)).unwrap());
    }
    let counter = Rc::clone(&heard);
    tokens.push(scene.subscribe(move |_: &Alarm| counter.set(counter.get() + 1)).unwrap());

    scene.find_entity("b").unwrap().destroy();

    assert_eq!(scene.broadcast(Alarm).unwrap(), 3);
    assert_eq!(heard.get(), 3);
}

#[test]
fn test_scene_destroy_deactivates_outside_tokens() {
    let mut scene = running_scene();
    let entity = scene.create_entity("watcher").unwrap();
    let scene_token = scene.subscribe(|_: &EntityDiedEvent| {}).unwrap();
    let entity_token = entity.subscribe(|_: &Alarm| {}).unwrap();
    let named = scene
        .handle()
        .subscribe_named("EntityDiedEvent", |_| {})
        .unwrap();

    scene.destroy().unwrap();

    assert!(!scene_token.is_active());
    assert!(!entity_token.is_active());
    assert!(!named.is_active());
}

#[test]
fn test_unknown_event_name_rejected() {
    let scene = running_scene();
    let result = scene.handle().subscribe_named("Explosion", |_| {});
    assert!(result.is_err());

    let event = scene.handle().create_event("EntityDiedEvent").unwrap();
    assert!(event.as_any().is::<EntityDiedEvent>());
}

#[test]
fn test_death_observer_sees_the_deaths_it_causes() {
    let mut scene = running_scene();
    let a = scene.create_entity("a").unwrap();
    a.set_attribute(HealthAttribute::default()).unwrap();
    let b = scene.create_entity("b").unwrap();
    b.set_attribute(HealthAttribute::default()).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let next = b.clone();
    let _token = scene
        .subscribe(move |event: &EntityDiedEvent| {
            sink.borrow_mut().push(event.name.clone());
            if event.name == "a" {
                let _ = next.with_attribute(|h: &mut HealthAttribute| h.decrease(1000.0));
            }
        })
        .unwrap();

    a.with_attribute(|h: &mut HealthAttribute| h.decrease(1000.0)).unwrap();

    assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
    assert!(!b.alive());
    scene.update(0.1).unwrap();
    assert!(scene.entities().unwrap().is_empty());
}

#[test]
fn test_handler_may_read_scene_during_tick() {
    let mut scene = running_scene();
    let handle: SceneRef = scene.handle();
    let totals = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&totals);
    let _token = scene
        .subscribe(move |event: &EntityDiedEvent| {
            let alive = handle.entities().map(|set| set.alive().len()).unwrap_or(0);
            sink.borrow_mut().push((event.name.clone(), alive));
        })
        .unwrap();

    let victim = scene.create_entity("victim").unwrap();
    victim.set_attribute(HealthAttribute::new(5.0)).unwrap();
    scene.create_entity("witness").unwrap();
    victim.with_attribute(|h: &mut HealthAttribute| h.decrease(5.0)).unwrap();
    scene.update(0.1).unwrap();

    // the death is published before the owner is marked dead
    assert_eq!(*totals.borrow(), vec![("victim".to_string(), 2)]);
    assert_eq!(scene.entities().unwrap().len(), 1);
}
