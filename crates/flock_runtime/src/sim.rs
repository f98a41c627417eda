//! Headless boid arena
//!
//! One `Boid` component carries the kinematic state. Forces accumulate
//! across the frame's passes and are consumed by `integrate` at the start of
//! the next frame:
//!
//! | order | system            | threads | touches                          |
//! |-------|-------------------|---------|----------------------------------|
//! | 100   | integrate         | inline  | own `Boid`                       |
//! | 300   | avoid walls       | 8       | own `Boid.force`                 |
//! | 400   | count neighbours  | 8       | reads every `Boid`, own `Crowding` |
//! | 410   | separate          | 8       | own `Crowding`, own `Boid.force` |
//! | 430   | cull escaped      | 8       | defers destroys                  |
//!
//! `count neighbours` reads positions of other entities, so nothing that
//! writes `Boid.position` may run in parallel with it; the write half lives
//! in `separate`.

use crate::settings::SimSettings;
use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use flock_core::ecs::{ComponentMask, Ecs, Entity, SystemDescriptor};
use flock_core::glam::Vec2;
use flock_core::math::DeterministicRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Parallel passes never ask for more workers than this.
const MAX_WORKERS: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Boid {
    pub position: Vec2,
    pub velocity: Vec2,
    pub force: Vec2,
}

/// Result of the neighbour scan, consumed by `separate`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Crowding {
    /// Sum of offsets from each neighbour to this boid.
    pub away: Vec2,
    pub neighbours: u32,
    _pad: u32,
}

/// Counters shared with the systems.
#[derive(Default)]
pub struct SimStats {
    pub culled: AtomicUsize,
}

/// Component bits and shared state of a running arena.
pub struct Sim {
    pub boid: ComponentMask,
    pub crowding: ComponentMask,
    pub stats: Arc<SimStats>,
}

/// Register components and systems, and queue the initial spawn. The spawn
/// runs at the next `run_tasks`.
pub fn init(ecs: &mut Ecs, settings: &SimSettings) -> Result<Sim> {
    let boid = ecs.register_component::<Boid>()?;
    let crowding = ecs.register_component::<Crowding>()?;
    let stats = Arc::new(SimStats::default());
    let arena = Vec2::new(settings.width, settings.height);

    let max_speed = settings.max_speed;
    ecs.enable_system(
        SystemDescriptor::new("integrate").all(boid).order(100),
        move |ctx| {
            let dt = ctx.delta_time();
            for &entity in ctx.entities() {
                ctx.update(entity, boid, |b: &mut Boid| {
                    b.velocity = (b.velocity + b.force * dt).clamp_length_max(max_speed);
                    b.position += b.velocity * dt;
                    b.force = Vec2::ZERO;
                });
            }
        },
    )?;

    let margin = settings.wall_margin;
    ecs.enable_system(
        SystemDescriptor::new("avoid walls")
            .all(boid)
            .max_threads(MAX_WORKERS)
            .order(300),
        move |ctx| {
            for &entity in ctx.entities() {
                ctx.update(entity, boid, |b: &mut Boid| {
                    b.force += wall_force(b.position, arena, margin) * max_speed;
                });
            }
        },
    )?;

    let radius_sq = settings.neighbour_radius * settings.neighbour_radius;
    ecs.enable_system(
        SystemDescriptor::new("count neighbours")
            .all(boid | crowding)
            .max_threads(MAX_WORKERS)
            .order(400),
        move |ctx| {
            let world = ctx.world();
            let positions: Vec<(Entity, Vec2)> = world
                .iter()
                .filter(|(_, mask)| mask.contains(boid))
                .filter_map(|(e, _)| world.read::<Boid>(e, boid).map(|b| (e, b.position)))
                .collect();

            for &entity in ctx.entities() {
                let Some(me) = world.read::<Boid>(entity, boid) else {
                    continue;
                };
                let mut scan = Crowding::default();
                for &(other, position) in &positions {
                    let offset = me.position - position;
                    if other != entity && offset.length_squared() < radius_sq {
                        scan.away += offset;
                        scan.neighbours += 1;
                    }
                }
                world.write(entity, crowding, scan);
            }
        },
    )?;

    ecs.enable_system(
        SystemDescriptor::new("separate")
            .all(boid | crowding)
            .max_threads(MAX_WORKERS)
            .order(410),
        move |ctx| {
            for &entity in ctx.entities() {
                let Some(scan) = ctx.read::<Crowding>(entity, crowding) else {
                    continue;
                };
                if scan.neighbours == 0 {
                    continue;
                }
                let push = scan.away.normalize_or_zero() * max_speed;
                ctx.update(entity, boid, |b: &mut Boid| b.force += push);
            }
        },
    )?;

    let escape = margin * 4.0;
    let culled = Arc::clone(&stats);
    ecs.enable_system(
        SystemDescriptor::new("cull escaped")
            .all(boid)
            .max_threads(MAX_WORKERS)
            .order(430),
        move |ctx| {
            for &entity in ctx.entities() {
                let Some(b) = ctx.read::<Boid>(entity, boid) else {
                    continue;
                };
                if !escaped(b.position, arena, escape) {
                    continue;
                }
                let stats = Arc::clone(&culled);
                ctx.defer(move |world| {
                    if world.destroy_entity(entity) {
                        stats.culled.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        },
    )?;

    let count = settings.boids;
    let seed = settings.seed;
    let speed = settings.max_speed * 0.5;
    ecs.enqueue(move |world| {
        let mut rng = DeterministicRng::new(seed);
        let mut spawned = 0;
        for _ in 0..count {
            let entity = world.create_entity(boid | crowding);
            if entity.is_none() {
                break;
            }
            let state = Boid {
                position: Vec2::new(rng.range_f32(0.0, arena.x), rng.range_f32(0.0, arena.y)),
                velocity: Vec2::new(rng.range_f32(-speed, speed), rng.range_f32(-speed, speed)),
                force: Vec2::ZERO,
            };
            world.write(entity, boid, state);
            spawned += 1;
        }
        tracing::info!(spawned, requested = count, "spawned boids");
    });

    Ok(Sim {
        boid,
        crowding,
        stats,
    })
}

/// Unit-scaled push back towards the arena, growing as the boid enters the
/// margin.
fn wall_force(position: Vec2, arena: Vec2, margin: f32) -> Vec2 {
    if margin <= 0.0 {
        return Vec2::ZERO;
    }
    let axis = |p: f32, extent: f32| {
        if p < margin {
            (margin - p) / margin
        } else if p > extent - margin {
            -(p - (extent - margin)) / margin
        } else {
            0.0
        }
    };
    Vec2::new(axis(position.x, arena.x), axis(position.y, arena.y))
}

fn escaped(position: Vec2, arena: Vec2, slack: f32) -> bool {
    position.x < -slack
        || position.y < -slack
        || position.x > arena.x + slack
        || position.y > arena.y + slack
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::EcsConfig;

    fn settings(boids: usize) -> SimSettings {
        SimSettings {
            boids,
            width: 200.0,
            height: 100.0,
            seed: 7,
            ..SimSettings::default()
        }
    }

    fn ecs() -> Ecs {
        Ecs::init(EcsConfig {
            min_chunk_len: 4,
            worker_threads: Some(2),
            ..EcsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn setup_spawns_on_first_task_flush() {
        let mut ecs = ecs();
        let sim = init(&mut ecs, &settings(32)).unwrap();
        assert_eq!(ecs.world().entity_count(), 0);
        assert_eq!(ecs.run_tasks(), 1);
        assert_eq!(ecs.world().entity_count(), 32);

        for (entity, mask) in ecs.world().iter() {
            assert!(mask.contains(sim.boid | sim.crowding));
            let b: Boid = ecs.read(entity, sim.boid).unwrap();
            assert!(b.position.x >= 0.0 && b.position.x <= 200.0);
            assert!(b.position.y >= 0.0 && b.position.y <= 100.0);
        }
    }

    #[test]
    fn neighbours_are_counted_both_ways() {
        let mut ecs = ecs();
        let sim = init(&mut ecs, &settings(0)).unwrap();
        ecs.run_tasks();

        let place = |ecs: &mut Ecs, x: f32| {
            let e = ecs.create_entity(sim.boid | sim.crowding);
            ecs.write(
                e,
                sim.boid,
                Boid {
                    position: Vec2::new(x, 50.0),
                    ..Boid::default()
                },
            );
            e
        };
        let a = place(&mut ecs, 100.0);
        let b = place(&mut ecs, 104.0);
        let far = place(&mut ecs, 150.0);

        ecs.run_systems(0.0);

        let scan_a: Crowding = ecs.read(a, sim.crowding).unwrap();
        let scan_b: Crowding = ecs.read(b, sim.crowding).unwrap();
        let scan_far: Crowding = ecs.read(far, sim.crowding).unwrap();
        assert_eq!(scan_a.neighbours, 1);
        assert_eq!(scan_b.neighbours, 1);
        assert_eq!(scan_far.neighbours, 0);
        assert!(scan_a.away.x < 0.0);
        assert!(scan_b.away.x > 0.0);

        // separation pushes them apart through the accumulated force
        let boid_a: Boid = ecs.read(a, sim.boid).unwrap();
        assert!(boid_a.force.x < 0.0);
    }

    #[test]
    fn escaped_boids_are_culled_after_the_frame() {
        let mut ecs = ecs();
        let sim = init(&mut ecs, &settings(0)).unwrap();
        ecs.run_tasks();

        let runaway = ecs.create_entity(sim.boid | sim.crowding);
        ecs.write(
            runaway,
            sim.boid,
            Boid {
                position: Vec2::new(10_000.0, 50.0),
                ..Boid::default()
            },
        );

        ecs.run_systems_only(0.0);
        assert_eq!(ecs.component_mask(runaway), sim.boid | sim.crowding);
        ecs.run_tasks();
        assert_eq!(ecs.component_mask(runaway), ComponentMask::NONE);
        assert_eq!(sim.stats.culled.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn walls_push_inwards() {
        let arena = Vec2::new(100.0, 100.0);
        assert!(wall_force(Vec2::new(5.0, 50.0), arena, 20.0).x > 0.0);
        assert!(wall_force(Vec2::new(95.0, 50.0), arena, 20.0).x < 0.0);
        assert_eq!(wall_force(Vec2::new(50.0, 50.0), arena, 20.0), Vec2::ZERO);
        assert_eq!(wall_force(Vec2::new(5.0, 5.0), arena, 0.0), Vec2::ZERO);
    }

    #[test]
    fn long_runs_stay_bounded() {
        let mut ecs = ecs();
        let sim = init(&mut ecs, &settings(64)).unwrap();
        ecs.run_tasks();
        for _ in 0..120 {
            ecs.run_systems(1.0 / 60.0);
        }
        let survivors = ecs.world().entity_count();
        let culled = sim.stats.culled.load(Ordering::Relaxed);
        assert_eq!(survivors + culled, 64);
        assert!(survivors > 0);
    }
}
